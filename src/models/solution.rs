//! Solve outcome and inclusion list.
//!
//! A [`Solution`] is the set of variable ids the solver set to 1. Callers
//! turn it into an inclusion list by joining against the variable index.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Candidate, IndexTriple};

/// Outcome of one solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// An optimal assignment was found.
    Optimal,
    /// No assignment satisfies every active constraint.
    Infeasible,
}

/// Variable ids selected by a solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Solve status.
    pub status: SolveStatus,
    /// Selected variable ids, ascending.
    pub selected: Vec<usize>,
    /// Objective value of the assignment.
    pub objective: f64,
}

/// One scheduled MS2 event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InclusionEntry {
    /// Index into the candidate slice.
    pub candidate: usize,
    /// Candidate identifier.
    pub candidate_id: String,
    /// Precursor m/z.
    pub mz: f64,
    /// Scan in which the precursor is fragmented.
    pub scan: usize,
    /// Protein the selection was attributed to.
    pub protein: Option<String>,
}

impl Solution {
    /// Creates an optimal solution; `selected` is sorted and deduplicated.
    pub fn optimal(mut selected: Vec<usize>, objective: f64) -> Self {
        selected.sort_unstable();
        selected.dedup();
        Self {
            status: SolveStatus::Optimal,
            selected,
            objective,
        }
    }

    /// Creates the infeasible marker (empty selection).
    pub fn infeasible() -> Self {
        Self {
            status: SolveStatus::Infeasible,
            selected: Vec::new(),
            objective: 0.0,
        }
    }

    /// Whether the solve succeeded.
    pub fn is_feasible(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// Number of selected variables.
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Whether nothing was selected.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Whether `variable` is selected.
    pub fn contains(&self, variable: usize) -> bool {
        self.selected.binary_search(&variable).is_ok()
    }

    /// Triples whose variable is selected, in variable order.
    ///
    /// Variables without a triple (e.g. protein indicators) are skipped.
    pub fn selected_triples<'a>(&self, triples: &'a [IndexTriple]) -> Vec<&'a IndexTriple> {
        let by_variable: HashMap<usize, &IndexTriple> =
            triples.iter().map(|t| (t.variable, t)).collect();
        self.selected
            .iter()
            .filter_map(|v| by_variable.get(v).copied())
            .collect()
    }

    /// Builds the inclusion list, ordered by scan then candidate.
    pub fn inclusion_list(
        &self,
        triples: &[IndexTriple],
        candidates: &[Candidate],
    ) -> Vec<InclusionEntry> {
        let mut entries: Vec<InclusionEntry> = self
            .selected_triples(triples)
            .into_iter()
            .filter_map(|t| {
                candidates.get(t.candidate).map(|c| InclusionEntry {
                    candidate: t.candidate,
                    candidate_id: c.id.clone(),
                    mz: c.mz,
                    scan: t.scan,
                    protein: t.protein_accession.clone(),
                })
            })
            .collect();
        entries.sort_by_key(|e| (e.scan, e.candidate));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triples() -> Vec<IndexTriple> {
        [(0, 3, 0), (1, 1, 1), (1, 2, 2)]
            .into_iter()
            .map(|(candidate, scan, variable)| IndexTriple {
                candidate,
                scan,
                variable,
                rt_probability: 1.0,
                signal_weight: 1.0,
                protein_accession: None,
            })
            .collect()
    }

    #[test]
    fn test_optimal_sorts_and_dedups() {
        let sol = Solution::optimal(vec![4, 1, 4, 2], 3.0);
        assert_eq!(sol.selected, vec![1, 2, 4]);
        assert!(sol.is_feasible());
        assert!(sol.contains(2));
        assert!(!sol.contains(3));
    }

    #[test]
    fn test_infeasible_is_empty() {
        let sol = Solution::infeasible();
        assert!(!sol.is_feasible());
        assert!(sol.is_empty());
    }

    #[test]
    fn test_inclusion_list_order() {
        let candidates = vec![Candidate::new("A", 400.2), Candidate::new("B", 650.8)];
        // Variable 7 has no triple (an indicator) and is ignored.
        let sol = Solution::optimal(vec![0, 1, 7], 2.0);
        let list = sol.inclusion_list(&triples(), &candidates);

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].candidate_id, "B");
        assert_eq!(list[0].scan, 1);
        assert_eq!(list[1].candidate_id, "A");
        assert_eq!(list[1].scan, 3);
    }
}
