//! Input validation for precursor selection problems.
//!
//! Checks structural integrity of candidates, their scan regions, and the
//! scheduling parameters before a model is built. Detects:
//! - Candidate / region list size mismatches
//! - Duplicate candidate IDs
//! - Regions outside the signal source, or repeating a scan
//! - Empty charge sets and non-positive capacities
//! - Scores that cannot be used as objective weights
//!
//! Every problem is collected; nothing is silently corrected.

use std::collections::HashSet;

use crate::models::{Candidate, ScanRegion, SchedulingParams};
use crate::signal::SignalSource;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Number of region lists differs from the number of candidates.
    CandidateCountMismatch,
    /// No charge state is allowed.
    EmptyChargeSet,
    /// A capacity, budget, or window size is zero.
    NonPositiveCapacity,
    /// A scan region is malformed or outside the signal source.
    InvalidRegion,
    /// Two candidates share the same ID.
    DuplicateId,
    /// A parameter or score is out of range.
    InvalidParameter,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the input data for a selection problem.
///
/// Checks:
/// 1. Parameter ranges (see [`SchedulingParams::validate`])
/// 2. One region list per candidate
/// 3. No duplicate candidate IDs
/// 4. RT probability and detectability are finite and non-negative
/// 5. Every region lies inside the signal source
/// 6. No candidate lists the same scan twice
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input<S: SignalSource + ?Sized>(
    candidates: &[Candidate],
    mass_ranges: &[Vec<ScanRegion>],
    signal: &S,
    params: &SchedulingParams,
) -> ValidationResult {
    let mut errors = match params.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => errors,
    };

    if candidates.len() != mass_ranges.len() {
        errors.push(ValidationError::new(
            ValidationErrorKind::CandidateCountMismatch,
            format!(
                "{} candidates but {} region lists",
                candidates.len(),
                mass_ranges.len()
            ),
        ));
    }

    let mut ids = HashSet::new();
    for c in candidates {
        if !ids.insert(c.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate candidate ID: {}", c.id),
            ));
        }
        let scores = [
            ("rt_probability", c.rt_probability),
            ("detectability", c.detectability),
        ];
        for (name, value) in scores {
            if !value.is_finite() || value < 0.0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidParameter,
                    format!("Candidate '{}' has invalid {}: {}", c.id, name, value),
                ));
            }
        }
    }

    let scan_count = signal.scan_count();
    for (c, regions) in candidates.iter().zip(mass_ranges) {
        let mut scans = HashSet::new();
        for r in regions {
            if !scans.insert(r.scan) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidRegion,
                    format!("Candidate '{}' lists scan {} more than once", c.id, r.scan),
                ));
            }
            if r.first > r.last {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidRegion,
                    format!(
                        "Candidate '{}' has reversed region in scan {} ({} > {})",
                        c.id, r.scan, r.first, r.last
                    ),
                ));
            }
            if r.scan >= scan_count {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidRegion,
                    format!(
                        "Candidate '{}' references scan {} but the source has {} scans",
                        c.id, r.scan, scan_count
                    ),
                ));
            } else if r.last >= signal.sample_count(r.scan) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidRegion,
                    format!(
                        "Candidate '{}' references sample {} of scan {} which has {} samples",
                        c.id,
                        r.last,
                        r.scan,
                        signal.sample_count(r.scan)
                    ),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
