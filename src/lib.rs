//! Precursor ion selection scheduling for LC-MS/MS.
//!
//! Decides which precursor candidates to fragment in which chromatographic
//! scan, under instrument duty-cycle limits, by building an integer linear
//! program and handing it to a solver backend.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Candidate`, `ScanRegion`, `IndexTriple`,
//!   `SchedulingParams`, `Solution`, `InclusionEntry`
//! - **`signal`**: `SignalSource` abstraction and signal weight extraction
//! - **`ilp`**: Linear model, constraint/objective builders, window patches,
//!   and the `SolverBackend` adapter (`good_lp` + `microlp`)
//! - **`scheduler`**: Feature, combined protein+feature, and sequential
//!   drivers, plus selection KPIs
//! - **`validation`**: Input integrity checks (count mismatches, duplicate IDs,
//!   region bounds, parameter ranges)
//! - **`error`**: Crate error type
//!
//! # Architecture
//!
//! Data flows leaf to root: signal → weights → variable index → model →
//! solver → solution → inclusion list. The crate defines the model handed to
//! a solver and the orchestration around repeated solves; it does not
//! implement a solver, read raw spectra, or perform protein inference.
//!
//! # References
//!
//! - Zerck et al. (2013), "Optimal precursor ion selection for LC-MALDI MS/MS",
//!   BMC Bioinformatics 14:56
//! - Zerck et al. (2009), "An iterative strategy for precursor ion selection
//!   for LC-MS/MS based shotgun proteomics", J. Proteome Res. 8(7)

pub mod error;
pub mod ilp;
pub mod models;
pub mod scheduler;
pub mod signal;
pub mod validation;

pub use error::{Result, ScheduleError};
