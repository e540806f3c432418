//! Extracted-ion chromatogram (XIC) weights.
//!
//! Each scan region of a candidate is reduced to one scalar: the summed
//! intensity of its samples. Optionally the weights of one candidate are
//! divided by their maximum so every candidate peaks at 1.0.

use log::warn;

use super::SignalSource;
use crate::error::{Result, ScheduleError};
use crate::models::ScanRegion;
use crate::validation::{ValidationError, ValidationErrorKind};

/// Sums intensities over each region (inclusive bounds).
///
/// With `normalize`, every weight is divided by the largest weight of the
/// batch. A batch whose maximum is not positive is returned unnormalised, so
/// silent regions weigh 0 instead of NaN.
///
/// # Errors
/// [`ScheduleError::Configuration`] if a region reaches outside the source.
///
/// # Example
/// ```
/// use u_precursor::models::ScanRegion;
/// use u_precursor::signal::{extract_weights, DenseSignal};
///
/// let signal = DenseSignal::new(vec![vec![1.0, 3.0, 4.0], vec![2.0, 2.0]]);
/// let regions = [ScanRegion::new(0, 1, 2), ScanRegion::new(1, 0, 1)];
///
/// assert_eq!(extract_weights(&regions, &signal, false).unwrap(), vec![7.0, 4.0]);
/// ```
pub fn extract_weights<S: SignalSource + ?Sized>(
    regions: &[ScanRegion],
    signal: &S,
    normalize: bool,
) -> Result<Vec<f64>> {
    let mut max_weight = 0.0_f64;
    let mut weights = Vec::with_capacity(regions.len());

    for r in regions {
        let mut weight = 0.0;
        for index in r.first..=r.last {
            weight += signal.intensity(r.scan, index).ok_or_else(|| {
                ScheduleError::Configuration(vec![ValidationError::new(
                    ValidationErrorKind::InvalidRegion,
                    format!("No sample {} in scan {}", index, r.scan),
                )])
            })?;
        }
        max_weight = max_weight.max(weight);
        weights.push(weight);
    }

    if normalize {
        if max_weight > 0.0 {
            for w in &mut weights {
                *w /= max_weight;
            }
        } else if !weights.is_empty() {
            warn!(
                "XIC over {} region(s) has no positive signal; weights left unnormalised",
                weights.len()
            );
        }
    }

    Ok(weights)
}

/// Computes the weights of every candidate, one batch per candidate.
pub fn calculate_xics<S: SignalSource + ?Sized>(
    mass_ranges: &[Vec<ScanRegion>],
    signal: &S,
    normalize: bool,
) -> Result<Vec<Vec<f64>>> {
    mass_ranges
        .iter()
        .map(|regions| extract_weights(regions, signal, normalize))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::DenseSignal;

    fn make_signal() -> DenseSignal {
        DenseSignal::new(vec![
            vec![0.0, 10.0, 30.0, 0.0],
            vec![5.0, 15.0, 20.0],
            vec![0.0, 0.0],
        ])
    }

    #[test]
    fn test_sums_inclusive_range() {
        let regions = [ScanRegion::new(0, 1, 2), ScanRegion::new(1, 0, 2)];
        let weights = extract_weights(&regions, &make_signal(), false).unwrap();
        assert_eq!(weights, vec![40.0, 40.0]);
    }

    #[test]
    fn test_normalizes_by_batch_maximum() {
        let regions = [ScanRegion::new(0, 1, 1), ScanRegion::new(1, 1, 2)];
        let weights = extract_weights(&regions, &make_signal(), true).unwrap();
        assert!((weights[0] - 10.0 / 35.0).abs() < 1e-12);
        assert!((weights[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_signal_normalization_is_defined() {
        let regions = [ScanRegion::new(2, 0, 1), ScanRegion::new(0, 3, 3)];
        let weights = extract_weights(&regions, &make_signal(), true).unwrap();
        assert_eq!(weights, vec![0.0, 0.0]);
        assert!(weights.iter().all(|w| w.is_finite()));
    }

    #[test]
    fn test_empty_batch() {
        assert!(extract_weights(&[], &make_signal(), true).unwrap().is_empty());
    }

    #[test]
    fn test_out_of_range_region_is_configuration_error() {
        let regions = [ScanRegion::new(1, 2, 5)];
        let err = extract_weights(&regions, &make_signal(), false).unwrap_err();
        assert!(matches!(err, ScheduleError::Configuration(_)));
    }

    #[test]
    fn test_calculate_xics_per_candidate() {
        let ranges = vec![
            vec![ScanRegion::new(0, 1, 1), ScanRegion::new(0, 2, 2)],
            vec![ScanRegion::new(1, 0, 0)],
        ];
        let xics = calculate_xics(&ranges, &make_signal(), true).unwrap();
        assert_eq!(xics.len(), 2);
        assert!((xics[0][1] - 1.0).abs() < 1e-12);
        // Each candidate is normalised on its own.
        assert!((xics[1][0] - 1.0).abs() < 1e-12);
    }
}
