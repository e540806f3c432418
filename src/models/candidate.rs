//! Precursor candidate model.
//!
//! A candidate is an ion detected in the survey (MS1) data that could be
//! sent to fragmentation. Its elution profile is described separately as
//! a list of [`ScanRegion`]s: one contiguous run of sample indices per scan
//! in which the candidate's mass window has signal.
//!
//! # Reference
//! Zerck et al. (2013), "Optimal precursor ion selection for LC-MALDI MS/MS",
//! BMC Bioinformatics 14:56

use serde::{Deserialize, Serialize};

use crate::validation::{ValidationError, ValidationErrorKind};

/// A precursor ion eligible for MS2 selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique candidate identifier.
    pub id: String,
    /// Mass-to-charge ratio of the monoisotopic peak.
    pub mz: f64,
    /// Observed charge states.
    pub charges: Vec<i32>,
    /// Probability that the candidate elutes in the scans it is mapped to.
    pub rt_probability: f64,
    /// Peptide detectability score (1.0 = always detectable).
    pub detectability: f64,
    /// Accessions of proteins this candidate's peptide belongs to.
    pub protein_accessions: Vec<String>,
}

impl Candidate {
    /// Creates a candidate with no charge, unit scores and no proteins.
    pub fn new(id: impl Into<String>, mz: f64) -> Self {
        Self {
            id: id.into(),
            mz,
            charges: Vec::new(),
            rt_probability: 1.0,
            detectability: 1.0,
            protein_accessions: Vec::new(),
        }
    }

    /// Adds an observed charge state.
    pub fn with_charge(mut self, charge: i32) -> Self {
        self.charges.push(charge);
        self
    }

    /// Sets the retention-time probability.
    pub fn with_rt_probability(mut self, p: f64) -> Self {
        self.rt_probability = p;
        self
    }

    /// Sets the detectability score.
    pub fn with_detectability(mut self, d: f64) -> Self {
        self.detectability = d;
        self
    }

    /// Associates a protein accession.
    pub fn with_protein(mut self, accession: impl Into<String>) -> Self {
        self.protein_accessions.push(accession.into());
        self
    }

    /// Whether any observed charge is in `allowed`.
    pub fn passes_charge_filter<'a>(&self, mut allowed: impl Iterator<Item = &'a i32>) -> bool {
        allowed.any(|z| self.charges.contains(z))
    }

    /// First associated protein, if any.
    pub fn primary_protein(&self) -> Option<&str> {
        self.protein_accessions.first().map(String::as_str)
    }
}

/// Samples `first..=last` of one scan, delimiting a candidate's mass window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRegion {
    /// Scan (RT bin) index.
    pub scan: usize,
    /// First sample index (inclusive).
    pub first: usize,
    /// Last sample index (inclusive).
    pub last: usize,
}

impl ScanRegion {
    /// Creates a region.
    pub fn new(scan: usize, first: usize, last: usize) -> Self {
        Self { scan, first, last }
    }

    /// Number of samples covered.
    #[inline]
    pub fn sample_count(&self) -> usize {
        (self.last + 1).saturating_sub(self.first)
    }

    /// Parses a flat sequence of boundary pairs.
    ///
    /// Consecutive entries `(scan, first)`, `(scan, last)` delimit one region.
    /// The sequence length must be even, both entries of a pair must name the
    /// same scan, and `first <= last`.
    pub fn from_end_points(end_points: &[(usize, usize)]) -> Result<Vec<Self>, ValidationError> {
        if end_points.len() % 2 != 0 {
            return Err(ValidationError::new(
                ValidationErrorKind::InvalidRegion,
                format!("Boundary pair sequence has odd length {}", end_points.len()),
            ));
        }

        end_points
            .chunks_exact(2)
            .map(|pair| {
                let (scan, first) = pair[0];
                let (end_scan, last) = pair[1];
                if scan != end_scan {
                    return Err(ValidationError::new(
                        ValidationErrorKind::InvalidRegion,
                        format!("Boundary pair spans scans {} and {}", scan, end_scan),
                    ));
                }
                if first > last {
                    return Err(ValidationError::new(
                        ValidationErrorKind::InvalidRegion,
                        format!(
                            "Boundary pair in scan {} is reversed ({} > {})",
                            scan, first, last
                        ),
                    ));
                }
                Ok(Self::new(scan, first, last))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_builder() {
        let c = Candidate::new("P1", 523.77)
            .with_charge(2)
            .with_charge(3)
            .with_rt_probability(0.8)
            .with_protein("P02769");

        assert_eq!(c.charges, vec![2, 3]);
        assert_eq!(c.primary_protein(), Some("P02769"));
        assert!((c.rt_probability - 0.8).abs() < 1e-12);
        assert!(c.passes_charge_filter([3].iter()));
        assert!(!c.passes_charge_filter([1, 4].iter()));
    }

    #[test]
    fn test_from_end_points() {
        let regions = ScanRegion::from_end_points(&[(0, 3), (0, 5), (1, 2), (1, 2)]).unwrap();
        assert_eq!(regions, vec![ScanRegion::new(0, 3, 5), ScanRegion::new(1, 2, 2)]);
        assert_eq!(regions[0].sample_count(), 3);
        assert_eq!(regions[1].sample_count(), 1);
    }

    #[test]
    fn test_from_end_points_odd_length() {
        let err = ScanRegion::from_end_points(&[(0, 1), (0, 2), (1, 0)]).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::InvalidRegion);
    }

    #[test]
    fn test_from_end_points_mismatched_scan() {
        let err = ScanRegion::from_end_points(&[(0, 1), (1, 2)]).unwrap_err();
        assert!(err.message.contains("spans scans"));
    }

    #[test]
    fn test_from_end_points_reversed() {
        assert!(ScanRegion::from_end_points(&[(2, 7), (2, 4)]).is_err());
    }
}
