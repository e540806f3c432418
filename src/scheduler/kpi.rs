//! Selection quality metrics (KPIs).
//!
//! Summarises an inclusion list against the model it was solved from.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Selected | Number of scheduled MS2 events |
//! | Distinct candidates | Candidates fragmented at least once |
//! | Total signal weight | Sum of signal weights of selected triples |
//! | Bins used | Scans with at least one MS2 event |
//! | Avg Utilization | Mean of selected / capacity over scans with variables |
//! | Proteins covered | Proteins with at least one selected peptide |

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{Candidate, IndexTriple, SchedulingParams, Solution};

/// Inclusion list performance indicators.
#[derive(Debug, Clone)]
pub struct SelectionKpi {
    /// Number of selected triples.
    pub selected: usize,
    /// Candidates selected at least once.
    pub distinct_candidates: usize,
    /// Sum of signal weights of the selection.
    pub total_signal_weight: f64,
    /// Scans with at least one selection.
    pub bins_used: usize,
    /// Mean bin utilisation (0.0..1.0) over scans that had variables.
    pub avg_utilization: f64,
    /// Per-scan utilisation.
    pub utilization_by_scan: BTreeMap<usize, f64>,
    /// Accessions of covered proteins.
    pub proteins_covered: BTreeSet<String>,
}

impl SelectionKpi {
    /// Computes KPIs from a solution and its variable index.
    ///
    /// # Arguments
    /// * `solution` - The solve outcome.
    /// * `triples` - Variable index the solution refers to.
    /// * `candidates` - Input candidates (for protein associations).
    /// * `params` - Parameters the model was built with (for bin capacity).
    pub fn calculate(
        solution: &Solution,
        triples: &[IndexTriple],
        candidates: &[Candidate],
        params: &SchedulingParams,
    ) -> Self {
        let selected = solution.selected_triples(triples);

        let mut per_scan: BTreeMap<usize, usize> =
            triples.iter().map(|t| (t.scan, 0)).collect();
        let mut distinct = BTreeSet::new();
        let mut proteins_covered = BTreeSet::new();
        let mut total_signal_weight = 0.0;

        for t in &selected {
            *per_scan.entry(t.scan).or_insert(0) += 1;
            distinct.insert(t.candidate);
            total_signal_weight += t.signal_weight;
            if let Some(c) = candidates.get(t.candidate) {
                proteins_covered.extend(c.protein_accessions.iter().cloned());
            }
        }

        let capacity = f64::from(params.ms2_spectra_per_rt_bin.max(1));
        let utilization_by_scan: BTreeMap<usize, f64> = per_scan
            .iter()
            .map(|(&scan, &n)| (scan, n as f64 / capacity))
            .collect();

        let avg_utilization = if utilization_by_scan.is_empty() {
            0.0
        } else {
            let sum: f64 = utilization_by_scan.values().sum();
            sum / utilization_by_scan.len() as f64
        };

        Self {
            selected: selected.len(),
            distinct_candidates: distinct.len(),
            total_signal_weight,
            bins_used: per_scan.values().filter(|&&n| n > 0).count(),
            avg_utilization,
            utilization_by_scan,
            proteins_covered,
        }
    }

    /// Whether the selection meets the given quality thresholds.
    pub fn meets_thresholds(&self, min_proteins: usize, min_utilization: f64) -> bool {
        self.proteins_covered.len() >= min_proteins && self.avg_utilization >= min_utilization
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_triple(candidate: usize, scan: usize, variable: usize, weight: f64) -> IndexTriple {
        IndexTriple {
            candidate,
            scan,
            variable,
            rt_probability: 1.0,
            signal_weight: weight,
            protein_accession: None,
        }
    }

    fn make_test_data() -> (Vec<IndexTriple>, Vec<Candidate>) {
        let triples = vec![
            make_triple(0, 0, 0, 2.0),
            make_triple(0, 1, 1, 1.0),
            make_triple(1, 1, 2, 4.0),
            make_triple(2, 2, 3, 0.5),
        ];
        let candidates = vec![
            Candidate::new("A", 400.0).with_protein("P1"),
            Candidate::new("B", 500.0).with_protein("P2").with_protein("P3"),
            Candidate::new("C", 600.0),
        ];
        (triples, candidates)
    }

    #[test]
    fn test_kpi_basic() {
        let (triples, candidates) = make_test_data();
        let params = SchedulingParams::default().with_bin_capacity(2);
        let solution = Solution::optimal(vec![0, 2], 6.0);

        let kpi = SelectionKpi::calculate(&solution, &triples, &candidates, &params);
        assert_eq!(kpi.selected, 2);
        assert_eq!(kpi.distinct_candidates, 2);
        assert!((kpi.total_signal_weight - 6.0).abs() < 1e-10);
        assert_eq!(kpi.bins_used, 2);
        // Scans 0: 1/2, 1: 1/2, 2: 0/2
        assert!((kpi.utilization_by_scan[&0] - 0.5).abs() < 1e-10);
        assert!((kpi.avg_utilization - 1.0 / 3.0).abs() < 1e-10);
        assert_eq!(
            kpi.proteins_covered.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["P1", "P2", "P3"]
        );
    }

    #[test]
    fn test_kpi_empty() {
        let kpi = SelectionKpi::calculate(
            &Solution::infeasible(),
            &[],
            &[],
            &SchedulingParams::default(),
        );
        assert_eq!(kpi.selected, 0);
        assert_eq!(kpi.bins_used, 0);
        assert!((kpi.avg_utilization - 0.0).abs() < 1e-10);
        assert!(kpi.proteins_covered.is_empty());
    }

    #[test]
    fn test_meets_thresholds() {
        let (triples, candidates) = make_test_data();
        let params = SchedulingParams::default().with_bin_capacity(1);
        let solution = Solution::optimal(vec![0, 2, 3], 6.5);

        let kpi = SelectionKpi::calculate(&solution, &triples, &candidates, &params);
        assert!(kpi.meets_thresholds(3, 1.0));
        assert!(!kpi.meets_thresholds(4, 0.0));
    }
}
