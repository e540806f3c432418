//! Signal access and weight extraction.
//!
//! The selection model only ever needs "intensity at (scan, sample)". Spectral
//! storage is hidden behind [`SignalSource`]; [`DenseSignal`] is a simple
//! in-memory implementation.
//!
//! # Submodules
//!
//! - [`xic`]: Reduces each candidate's scan regions to per-scan weights

pub mod xic;

pub use xic::{calculate_xics, extract_weights};

/// Read-only, random-access intensity lookup.
pub trait SignalSource {
    /// Number of scans (RT bins).
    fn scan_count(&self) -> usize;

    /// Number of samples in `scan`. Zero for unknown scans.
    fn sample_count(&self, scan: usize) -> usize;

    /// Intensity of sample `index` in `scan`, or `None` if out of range.
    fn intensity(&self, scan: usize, index: usize) -> Option<f64>;
}

/// In-memory signal: one intensity vector per scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DenseSignal {
    scans: Vec<Vec<f64>>,
}

impl DenseSignal {
    /// Creates a source from per-scan intensity vectors.
    pub fn new(scans: Vec<Vec<f64>>) -> Self {
        Self { scans }
    }

    /// Appends a scan, returning its index.
    pub fn push_scan(&mut self, intensities: Vec<f64>) -> usize {
        self.scans.push(intensities);
        self.scans.len() - 1
    }
}

impl SignalSource for DenseSignal {
    fn scan_count(&self) -> usize {
        self.scans.len()
    }

    fn sample_count(&self, scan: usize) -> usize {
        self.scans.get(scan).map_or(0, Vec::len)
    }

    fn intensity(&self, scan: usize, index: usize) -> Option<f64> {
        self.scans.get(scan)?.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_lookup() {
        let mut signal = DenseSignal::new(vec![vec![1.0, 2.0]]);
        assert_eq!(signal.push_scan(vec![7.5]), 1);

        assert_eq!(signal.scan_count(), 2);
        assert_eq!(signal.sample_count(0), 2);
        assert_eq!(signal.sample_count(9), 0);
        assert_eq!(signal.intensity(1, 0), Some(7.5));
        assert_eq!(signal.intensity(0, 2), None);
        assert_eq!(signal.intensity(5, 0), None);
    }
}
