//! Scheduling parameters.
//!
//! Experiment-wide settings that shape the selection model: instrument duty
//! cycle (bin capacity), per-precursor and list-size budgets, objective
//! weighting, and which constraint families are active.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::Result;
use crate::validation::{ValidationError, ValidationErrorKind};

/// Constraint families that can be switched on or off independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintToggles {
    /// Per-scan MS2 capacity.
    pub rt_bin_capacity: bool,
    /// Per-candidate acquisition cap.
    pub acquisition_cap: bool,
    /// Global inclusion-list size cap (only when `max_list_size` is set).
    pub list_size: bool,
    /// Protein coverage indicators (combined formulation only).
    pub protein_coverage: bool,
    /// Step-size window (sequential formulation only).
    pub step_window: bool,
}

impl Default for ConstraintToggles {
    fn default() -> Self {
        Self {
            rt_bin_capacity: true,
            acquisition_cap: true,
            list_size: true,
            protein_coverage: true,
            step_window: true,
        }
    }
}

/// What the sequential driver does when a window has no feasible solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InfeasiblePolicy {
    /// Log the window and continue with the next one.
    #[default]
    Skip,
    /// Stop the run; selections committed so far are kept.
    Abort,
}

/// Parameters for building and driving a selection model.
///
/// # Example
/// ```
/// use u_precursor::models::SchedulingParams;
///
/// let params = SchedulingParams::from_json(
///     r#"{ "allowed_charges": [2, 3], "ms2_spectra_per_rt_bin": 3, "max_list_size": 100 }"#,
/// ).unwrap();
/// assert_eq!(params.ms2_spectra_per_rt_bin, 3);
/// assert_eq!(params.number_of_msms_per_precursor, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingParams {
    /// Charge states eligible for selection.
    pub allowed_charges: BTreeSet<i32>,
    /// Maximum MS2 events per scan.
    pub ms2_spectra_per_rt_bin: u32,
    /// Maximum number of times one candidate may be fragmented.
    pub number_of_msms_per_precursor: u32,
    /// Maximum size of the whole inclusion list. `None` = unbounded.
    pub max_list_size: Option<u32>,
    /// Divide each candidate's weights by its maximum weight.
    pub normalize_intensity: bool,
    /// Multiply signal weights by the candidate's RT probability.
    pub use_rt_probability: bool,
    /// Objective reward for each covered protein.
    pub coverage_bonus: f64,
    /// Scans per window in the sequential formulation.
    pub step_size: usize,
    /// Lowest-variable-id tie-break bonus. `0.0` leaves ties to the backend.
    pub tie_break_epsilon: f64,
    /// Active constraint families.
    pub constraints: ConstraintToggles,
    /// Sequential driver reaction to an infeasible window.
    pub infeasible_policy: InfeasiblePolicy,
}

impl Default for SchedulingParams {
    fn default() -> Self {
        Self {
            allowed_charges: [1, 2, 3, 4].into_iter().collect(),
            ms2_spectra_per_rt_bin: 5,
            number_of_msms_per_precursor: 1,
            max_list_size: None,
            normalize_intensity: true,
            use_rt_probability: false,
            coverage_bonus: 1.0,
            step_size: 10,
            tie_break_epsilon: 0.0,
            constraints: ConstraintToggles::default(),
            infeasible_policy: InfeasiblePolicy::Skip,
        }
    }
}

impl SchedulingParams {
    /// Creates default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses parameters from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Replaces the allowed charge set.
    pub fn with_charges(mut self, charges: impl IntoIterator<Item = i32>) -> Self {
        self.allowed_charges = charges.into_iter().collect();
        self
    }

    /// Sets the per-scan MS2 capacity.
    pub fn with_bin_capacity(mut self, capacity: u32) -> Self {
        self.ms2_spectra_per_rt_bin = capacity;
        self
    }

    /// Sets the per-candidate acquisition cap.
    pub fn with_msms_per_precursor(mut self, cap: u32) -> Self {
        self.number_of_msms_per_precursor = cap;
        self
    }

    /// Sets the inclusion-list size cap.
    pub fn with_max_list_size(mut self, size: u32) -> Self {
        self.max_list_size = Some(size);
        self
    }

    /// Enables or disables per-candidate weight normalisation.
    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize_intensity = normalize;
        self
    }

    /// Enables or disables RT-probability weighting.
    pub fn with_rt_probability(mut self, enabled: bool) -> Self {
        self.use_rt_probability = enabled;
        self
    }

    /// Sets the protein coverage bonus.
    pub fn with_coverage_bonus(mut self, bonus: f64) -> Self {
        self.coverage_bonus = bonus;
        self
    }

    /// Sets the sequential window size.
    pub fn with_step_size(mut self, step_size: usize) -> Self {
        self.step_size = step_size;
        self
    }

    /// Sets the tie-break epsilon.
    pub fn with_tie_break(mut self, epsilon: f64) -> Self {
        self.tie_break_epsilon = epsilon;
        self
    }

    /// Replaces the constraint toggles.
    pub fn with_constraints(mut self, constraints: ConstraintToggles) -> Self {
        self.constraints = constraints;
        self
    }

    /// Sets the infeasible-window policy.
    pub fn with_infeasible_policy(mut self, policy: InfeasiblePolicy) -> Self {
        self.infeasible_policy = policy;
        self
    }

    /// Checks parameter ranges, returning every problem found.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.allowed_charges.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyChargeSet,
                "Allowed charge set is empty",
            ));
        }
        if self.ms2_spectra_per_rt_bin == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NonPositiveCapacity,
                "ms2_spectra_per_rt_bin must be positive",
            ));
        }
        if self.number_of_msms_per_precursor == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NonPositiveCapacity,
                "number_of_msms_per_precursor must be positive",
            ));
        }
        if self.max_list_size == Some(0) {
            errors.push(ValidationError::new(
                ValidationErrorKind::NonPositiveCapacity,
                "max_list_size must be positive when set",
            ));
        }
        if self.step_size == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NonPositiveCapacity,
                "step_size must be positive",
            ));
        }
        if !self.coverage_bonus.is_finite() || self.coverage_bonus < 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidParameter,
                format!("coverage_bonus must be finite and >= 0, got {}", self.coverage_bonus),
            ));
        }
        if !self.tie_break_epsilon.is_finite() || self.tie_break_epsilon < 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidParameter,
                format!(
                    "tie_break_epsilon must be finite and >= 0, got {}",
                    self.tie_break_epsilon
                ),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
