//! Decision variable index.
//!
//! Every binary selection variable in the model corresponds to exactly one
//! `(candidate, scan)` pair. The [`IndexTriple`] table is the bridge between
//! solver variable ids and the domain objects they represent.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Relates a candidate and a scan to a model variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexTriple {
    /// Index into the candidate slice.
    pub candidate: usize,
    /// Scan (RT bin) index.
    pub scan: usize,
    /// Model variable id.
    pub variable: usize,
    /// RT probability copied from the candidate.
    pub rt_probability: f64,
    /// Extracted signal weight for this scan.
    pub signal_weight: f64,
    /// Protein the triple is attributed to (protein-based formulations).
    pub protein_accession: Option<String>,
}

impl fmt::Display for IndexTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "candidate: {} scan: {} variable: {}",
            self.candidate, self.scan, self.variable
        )?;
        if let Some(acc) = &self.protein_accession {
            write!(f, " protein: {}", acc)?;
        }
        Ok(())
    }
}

/// Sort key for a triple table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TripleOrder {
    /// By candidate index.
    Candidate,
    /// By scan index.
    Scan,
    /// By variable id (creation order).
    #[default]
    Variable,
}

impl TripleOrder {
    #[inline]
    fn key(self, triple: &IndexTriple) -> usize {
        match self {
            Self::Candidate => triple.candidate,
            Self::Scan => triple.scan,
            Self::Variable => triple.variable,
        }
    }
}

/// Stable sort of `triples` by the given key.
///
/// Entries with equal keys keep their relative order, so sorting a table in
/// creation order by scan leaves each scan's triples ordered by variable id.
pub fn sort_triples(triples: &mut [IndexTriple], order: TripleOrder) {
    triples.sort_by_key(|t| order.key(t));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(candidate: usize, scan: usize, variable: usize) -> IndexTriple {
        IndexTriple {
            candidate,
            scan,
            variable,
            rt_probability: 1.0,
            signal_weight: 1.0,
            protein_accession: None,
        }
    }

    #[test]
    fn test_sort_by_scan_is_stable() {
        let mut triples = vec![triple(0, 2, 0), triple(0, 1, 1), triple(1, 1, 2), triple(1, 2, 3)];
        sort_triples(&mut triples, TripleOrder::Scan);

        let order: Vec<usize> = triples.iter().map(|t| t.variable).collect();
        assert_eq!(order, vec![1, 2, 0, 3]);
    }

    #[test]
    fn test_sort_round_trip_to_variable_order() {
        let original = vec![triple(1, 0, 0), triple(0, 3, 1), triple(2, 1, 2)];
        let mut triples = original.clone();
        sort_triples(&mut triples, TripleOrder::Candidate);
        assert_eq!(triples[0].candidate, 0);
        sort_triples(&mut triples, TripleOrder::Variable);
        assert_eq!(triples, original);
    }

    #[test]
    fn test_display() {
        let mut t = triple(4, 7, 9);
        t.protein_accession = Some("P12345".into());
        assert_eq!(t.to_string(), "candidate: 4 scan: 7 variable: 9 protein: P12345");
    }
}
