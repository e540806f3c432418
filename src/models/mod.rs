//! Precursor selection domain models.
//!
//! Provides the data types shared by the model builder, the solver adapter,
//! and the scheduling drivers.
//!
//! # Domain Mappings
//!
//! | u-precursor | Resource scheduling | LC-MS/MS |
//! |-------------|---------------------|----------|
//! | Candidate | Job | Precursor ion / feature |
//! | Scan | Time slot with capacity | MS1 survey scan, RT bin |
//! | IndexTriple | Job × slot decision | "fragment precursor p in scan s" |
//! | Solution | Schedule | Inclusion list |

mod candidate;
mod params;
mod solution;
mod triple;

pub use candidate::{Candidate, ScanRegion};
pub use params::{ConstraintToggles, InfeasiblePolicy, SchedulingParams};
pub use solution::{InclusionEntry, Solution, SolveStatus};
pub use triple::{sort_triples, IndexTriple, TripleOrder};
