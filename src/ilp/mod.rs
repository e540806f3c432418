//! ILP formulation of precursor selection.
//!
//! Builds a [`LinearModel`] from candidates and scheduling parameters,
//! derives rolling-window versions of it, and hands it to a
//! [`SolverBackend`].
//!
//! # Formulation
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `x_{c,s}` | fragment candidate `c` in scan `s` |
//! | `y_p` | protein `p` is covered (combined formulation) |
//!
//! | Row family | Constraint |
//! |------------|-----------|
//! | RT-bin capacity | `Σ_c x_{c,s} <= ms2_spectra_per_rt_bin` |
//! | Acquisition cap | `Σ_s x_{c,s} <= number_of_msms_per_precursor` |
//! | List size | `Σ x <= max_list_size` |
//! | Protein coverage | `y_p <= Σ_{c ∈ p} x_{c,s}` |
//! | Step window | `Σ_{s ∉ window} x_{c,s} <= 0` |
//! | Committed | `Σ_{committed} x_{c,s} <= 0` (later windows) |
//!
//! # Reference
//! Zerck et al. (2013), "Optimal precursor ion selection for LC-MALDI MS/MS",
//! BMC Bioinformatics 14:56

mod builder;
mod model;
mod solver;
mod window;

pub use builder::{
    add_acquisition_cap, add_committed_mask, add_list_size, add_protein_coverage,
    add_rt_bin_capacity, add_step_window, create_selection_variables, selection_coefficient,
    set_objective, withdraw_coverage_bonus, BuiltModel, ProteinIndicators, SelectionIlpBuilder,
};
pub use model::{ConstraintRow, LinearModel, ModelVariable, RowFamily, Sense, VariableKind};
pub use solver::{GoodLpSolver, SolverBackend};
pub use window::{patch, SelectionLedger, StepWindow};
