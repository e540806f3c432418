//! Constraint and objective builders for precursor selection.
//!
//! Translates candidates, their extracted signal weights, and scheduling
//! parameters into a [`LinearModel`]:
//!
//! - one binary variable `x_{c,s}` per candidate `c` and compatible scan `s`
//! - RT-bin capacity: `Σ_c x_{c,s} <= ms2_spectra_per_rt_bin` for every scan
//! - acquisition cap: `Σ_s x_{c,s} <= number_of_msms_per_precursor`
//! - list size: `Σ x <= max_list_size`
//! - protein coverage: `y_p <= Σ_{c ∈ p} x_{c,s}` (indicator implies a selection)
//! - step window: `Σ_{s ∉ window} x_{c,s} <= 0`
//! - committed: `Σ_{committed} x_{c,s} <= 0` (later windows of a sequential run)
//! - objective: maximise `Σ w_{c,s} x_{c,s} + bonus · Σ y_p`
//!
//! # Reference
//! - Zerck et al. (2013), "Optimal precursor ion selection for LC-MALDI MS/MS"
//! - Zerck et al. (2009), "An iterative strategy for precursor ion selection
//!   for LC-MS/MS based shotgun proteomics"

use log::debug;
use std::collections::BTreeMap;
use std::ops::Range;

use super::model::{ConstraintRow, LinearModel, RowFamily, Sense, VariableKind};
use super::window::{apply_window_rows, SelectionLedger, StepWindow};
use crate::error::Result;
use crate::models::{Candidate, IndexTriple, ScanRegion, SchedulingParams};
use crate::signal::{calculate_xics, SignalSource};
use crate::validation::validate_input;

/// Protein accession → indicator variable id.
pub type ProteinIndicators = BTreeMap<String, usize>;

/// A freshly built model with its variable index.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltModel {
    /// The linear model.
    pub model: LinearModel,
    /// One triple per selection variable, in variable order.
    pub triples: Vec<IndexTriple>,
    /// Coverage indicators (empty unless protein coverage is active).
    pub protein_indicators: ProteinIndicators,
}

/// Builds a selection model from candidates and a signal source.
///
/// # Example
/// ```
/// use u_precursor::ilp::SelectionIlpBuilder;
/// use u_precursor::models::{Candidate, ScanRegion, SchedulingParams};
/// use u_precursor::signal::DenseSignal;
///
/// let candidates = vec![Candidate::new("P1", 512.3).with_charge(2)];
/// let ranges = vec![vec![ScanRegion::new(0, 0, 1), ScanRegion::new(1, 0, 0)]];
/// let signal = DenseSignal::new(vec![vec![1.0, 2.0], vec![4.0]]);
/// let params = SchedulingParams::default();
///
/// let built = SelectionIlpBuilder::new(&candidates, &ranges, &signal, &params)
///     .build()
///     .unwrap();
/// assert_eq!(built.triples.len(), 2);
/// assert_eq!(built.model.variable_count(), 2);
/// ```
pub struct SelectionIlpBuilder<'a, S: SignalSource + ?Sized> {
    candidates: &'a [Candidate],
    mass_ranges: &'a [Vec<ScanRegion>],
    signal: &'a S,
    params: &'a SchedulingParams,
    protein_coverage: bool,
    window: Option<StepWindow>,
}

impl<'a, S: SignalSource + ?Sized> SelectionIlpBuilder<'a, S> {
    /// Creates a feature-based builder.
    pub fn new(
        candidates: &'a [Candidate],
        mass_ranges: &'a [Vec<ScanRegion>],
        signal: &'a S,
        params: &'a SchedulingParams,
    ) -> Self {
        Self {
            candidates,
            mass_ranges,
            signal,
            params,
            protein_coverage: false,
            window: None,
        }
    }

    /// Adds protein coverage indicators (if enabled in the toggles).
    pub fn with_protein_coverage(mut self) -> Self {
        self.protein_coverage = true;
        self
    }

    /// Scopes the window-dependent rows to `window`.
    pub fn with_window(mut self, window: StepWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Builds the model.
    ///
    /// Deterministic: identical inputs give identical variable ids, rows,
    /// and coefficients.
    ///
    /// # Errors
    /// [`ScheduleError::Configuration`](crate::error::ScheduleError::Configuration)
    /// with every validation problem found.
    pub fn build(&self) -> Result<BuiltModel> {
        validate_input(self.candidates, self.mass_ranges, self.signal, self.params)?;

        let weights = calculate_xics(
            self.mass_ranges,
            self.signal,
            self.params.normalize_intensity,
        )?;

        let mut model = LinearModel::new();
        let triples = create_selection_variables(
            &mut model,
            self.candidates,
            self.mass_ranges,
            &weights,
            self.params,
        );

        let with_proteins = self.protein_coverage && self.params.constraints.protein_coverage;
        let protein_indicators = if with_proteins {
            add_protein_coverage(&mut model, &triples, self.candidates)
        } else {
            ProteinIndicators::new()
        };

        match &self.window {
            Some(window) => {
                apply_window_rows(&mut model, &triples, window, &SelectionLedger::new(), self.params)
            }
            None => add_global_rows(&mut model, &triples, self.params),
        }

        set_objective(
            &mut model,
            &triples,
            self.candidates,
            self.params,
            &protein_indicators,
            self.protein_coverage,
        );

        debug!(
            "Built selection model: {} variables ({} selections, {} proteins), {} rows",
            model.variable_count(),
            triples.len(),
            protein_indicators.len(),
            model.row_count()
        );

        Ok(BuiltModel {
            model,
            triples,
            protein_indicators,
        })
    }
}

/// Whole-experiment rows: capacity of every scan, acquisition cap, list size.
fn add_global_rows(model: &mut LinearModel, triples: &[IndexTriple], params: &SchedulingParams) {
    let toggles = params.constraints;
    let ledger = SelectionLedger::new();
    if toggles.rt_bin_capacity {
        add_rt_bin_capacity(model, triples, None, params.ms2_spectra_per_rt_bin, &ledger);
    }
    if toggles.acquisition_cap {
        add_acquisition_cap(model, triples, params.number_of_msms_per_precursor, &ledger);
    }
    if toggles.list_size {
        if let Some(max) = params.max_list_size {
            add_list_size(model, triples, max, &ledger);
        }
    }
}

/// Creates one selection variable per charge-compatible `(candidate, scan)`.
///
/// Candidates are visited in slice order and their regions in list order,
/// so variable ids follow creation order.
pub fn create_selection_variables(
    model: &mut LinearModel,
    candidates: &[Candidate],
    mass_ranges: &[Vec<ScanRegion>],
    weights: &[Vec<f64>],
    params: &SchedulingParams,
) -> Vec<IndexTriple> {
    let mut triples = Vec::new();

    for (c, (candidate, regions)) in candidates.iter().zip(mass_ranges).enumerate() {
        if !candidate.passes_charge_filter(params.allowed_charges.iter()) {
            continue;
        }
        let candidate_weights = weights.get(c).map(Vec::as_slice).unwrap_or(&[]);

        for (k, region) in regions.iter().enumerate() {
            let variable = model.add_variable(
                format!("x_{}_{}", c, region.scan),
                VariableKind::Selection {
                    candidate: c,
                    scan: region.scan,
                },
            );
            triples.push(IndexTriple {
                candidate: c,
                scan: region.scan,
                variable,
                rt_probability: candidate.rt_probability,
                signal_weight: candidate_weights.get(k).copied().unwrap_or(0.0),
                protein_accession: candidate.primary_protein().map(str::to_string),
            });
        }
    }

    triples
}

/// `Σ_c x_{c,s} <= capacity - committed(s)` for every scan with variables,
/// optionally restricted to `scans`.
pub fn add_rt_bin_capacity(
    model: &mut LinearModel,
    triples: &[IndexTriple],
    scans: Option<Range<usize>>,
    capacity: u32,
    ledger: &SelectionLedger,
) {
    let mut by_scan: BTreeMap<usize, Vec<(usize, f64)>> = BTreeMap::new();
    for t in triples {
        if scans.as_ref().map_or(true, |r| r.contains(&t.scan)) {
            by_scan.entry(t.scan).or_default().push((t.variable, 1.0));
        }
    }

    for (scan, terms) in by_scan {
        let remaining = capacity.saturating_sub(ledger.committed_in(scan));
        model.add_row(ConstraintRow {
            family: RowFamily::RtBinCapacity { scan },
            terms,
            sense: Sense::Le,
            rhs: f64::from(remaining),
        });
    }
}

/// `Σ_s x_{c,s} <= cap - committed(c)` for every candidate with variables.
pub fn add_acquisition_cap(
    model: &mut LinearModel,
    triples: &[IndexTriple],
    cap: u32,
    ledger: &SelectionLedger,
) {
    let mut by_candidate: BTreeMap<usize, Vec<(usize, f64)>> = BTreeMap::new();
    for t in triples {
        by_candidate
            .entry(t.candidate)
            .or_default()
            .push((t.variable, 1.0));
    }

    for (candidate, terms) in by_candidate {
        let remaining = cap.saturating_sub(ledger.acquisitions(candidate));
        model.add_row(ConstraintRow {
            family: RowFamily::AcquisitionCap { candidate },
            terms,
            sense: Sense::Le,
            rhs: f64::from(remaining),
        });
    }
}

/// `Σ x <= max - committed`.
pub fn add_list_size(
    model: &mut LinearModel,
    triples: &[IndexTriple],
    max: u32,
    ledger: &SelectionLedger,
) {
    let committed = u32::try_from(ledger.total()).unwrap_or(u32::MAX);
    model.add_row(ConstraintRow {
        family: RowFamily::ListSize,
        terms: triples.iter().map(|t| (t.variable, 1.0)).collect(),
        sense: Sense::Le,
        rhs: f64::from(max.saturating_sub(committed)),
    });
}

/// `Σ_{s ∉ window} x <= 0`. No row when every variable is inside.
pub fn add_step_window(model: &mut LinearModel, triples: &[IndexTriple], window: &StepWindow) {
    let terms: Vec<(usize, f64)> = triples
        .iter()
        .filter(|t| !window.contains(t.scan))
        .map(|t| (t.variable, 1.0))
        .collect();
    if terms.is_empty() {
        return;
    }
    model.add_row(ConstraintRow {
        family: RowFamily::StepWindow,
        terms,
        sense: Sense::Le,
        rhs: 0.0,
    });
}

/// `Σ_{committed} x <= 0`. No row while nothing is committed.
pub fn add_committed_mask(model: &mut LinearModel, ledger: &SelectionLedger) {
    if ledger.total() == 0 {
        return;
    }
    model.add_row(ConstraintRow {
        family: RowFamily::Committed,
        terms: ledger.committed().iter().map(|&v| (v, 1.0)).collect(),
        sense: Sense::Le,
        rhs: 0.0,
    });
}

/// Adds one indicator `y_p` per protein and the rows `y_p - Σ_{c ∈ p} x <= 0`.
///
/// A candidate contributes to every protein it is associated with.
/// Indicators are created in accession order after all selection variables.
pub fn add_protein_coverage(
    model: &mut LinearModel,
    triples: &[IndexTriple],
    candidates: &[Candidate],
) -> ProteinIndicators {
    let mut members: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for t in triples {
        if let Some(candidate) = candidates.get(t.candidate) {
            for acc in &candidate.protein_accessions {
                members.entry(acc.as_str()).or_default().push(t.variable);
            }
        }
    }

    let mut indicators = ProteinIndicators::new();
    for (acc, vars) in members {
        let y = model.add_variable(
            format!("y_{}", acc),
            VariableKind::ProteinIndicator {
                accession: acc.to_string(),
            },
        );
        let mut terms = Vec::with_capacity(vars.len() + 1);
        terms.push((y, 1.0));
        terms.extend(vars.into_iter().map(|v| (v, -1.0)));
        model.add_row(ConstraintRow {
            family: RowFamily::ProteinCoverage {
                accession: acc.to_string(),
            },
            terms,
            sense: Sense::Le,
            rhs: 0.0,
        });
        indicators.insert(acc.to_string(), y);
    }
    indicators
}

/// Sets the coverage bonus of every protein for which `withdraw` holds to 0.
///
/// Returns the number of indicators whose coefficient changed.
pub fn withdraw_coverage_bonus(
    model: &mut LinearModel,
    protein_indicators: &ProteinIndicators,
    mut withdraw: impl FnMut(&str) -> bool,
) -> usize {
    let mut changed = 0;
    for (acc, &y) in protein_indicators {
        let active = model.objective().get(y).is_some_and(|&c| c != 0.0);
        if active && withdraw(acc) {
            model.set_objective_coefficient(y, 0.0);
            changed += 1;
        }
    }
    changed
}

/// Objective coefficient of one selection variable, without tie-break.
pub fn selection_coefficient(
    triple: &IndexTriple,
    candidate: Option<&Candidate>,
    params: &SchedulingParams,
    use_detectability: bool,
) -> f64 {
    let mut coefficient = triple.signal_weight;
    if params.use_rt_probability {
        coefficient *= triple.rt_probability;
    }
    if use_detectability {
        coefficient *= candidate.map_or(1.0, |c| c.detectability);
    }
    coefficient
}

/// Sets every objective coefficient.
///
/// With `tie_break_epsilon > 0`, selection `i` of `n` gets an extra
/// `epsilon * (n - i) / n`, so lower variable ids win exact ties.
pub fn set_objective(
    model: &mut LinearModel,
    triples: &[IndexTriple],
    candidates: &[Candidate],
    params: &SchedulingParams,
    protein_indicators: &ProteinIndicators,
    use_detectability: bool,
) {
    let n = triples.len() as f64;
    for t in triples {
        let mut coefficient =
            selection_coefficient(t, candidates.get(t.candidate), params, use_detectability);
        if params.tie_break_epsilon > 0.0 {
            coefficient += params.tie_break_epsilon * (n - t.variable as f64) / n;
        }
        model.set_objective_coefficient(t.variable, coefficient);
    }
    for &y in protein_indicators.values() {
        model.set_objective_coefficient(y, params.coverage_bonus);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScheduleError;
    use crate::signal::DenseSignal;
    use crate::validation::ValidationErrorKind;

    fn make_test_data() -> (Vec<Candidate>, Vec<Vec<ScanRegion>>, DenseSignal) {
        let candidates = vec![
            Candidate::new("A", 400.0).with_charge(2).with_protein("P1"),
            Candidate::new("B", 500.0).with_charge(1),
            Candidate::new("C", 600.0)
                .with_charge(3)
                .with_protein("P2")
                .with_protein("P1"),
        ];
        let ranges = vec![
            vec![ScanRegion::new(0, 0, 1), ScanRegion::new(1, 0, 0)],
            vec![ScanRegion::new(1, 1, 1)],
            vec![ScanRegion::new(1, 0, 1), ScanRegion::new(2, 0, 0)],
        ];
        let signal = DenseSignal::new(vec![vec![2.0, 2.0], vec![1.0, 3.0], vec![5.0]]);
        (candidates, ranges, signal)
    }

    fn params() -> SchedulingParams {
        SchedulingParams::default()
            .with_charges([2, 3])
            .with_bin_capacity(1)
            .with_normalization(false)
    }

    #[test]
    fn test_variable_count_follows_charge_filter() {
        let (candidates, ranges, signal) = make_test_data();
        let params = params();
        let built = SelectionIlpBuilder::new(&candidates, &ranges, &signal, &params)
            .build()
            .unwrap();

        // B (charge 1) is filtered: 2 + 2 selections.
        assert_eq!(built.triples.len(), 4);
        assert!(built.triples.iter().all(|t| t.candidate != 1));
        let ids: Vec<usize> = built.triples.iter().map(|t| t.variable).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(built.triples[0].signal_weight, 4.0);
        assert_eq!(built.triples[2].signal_weight, 4.0);
        assert_eq!(built.triples[3].protein_accession.as_deref(), Some("P2"));
    }

    #[test]
    fn test_feature_rows() {
        let (candidates, ranges, signal) = make_test_data();
        let params = params().with_max_list_size(2);
        let built = SelectionIlpBuilder::new(&candidates, &ranges, &signal, &params)
            .build()
            .unwrap();
        let model = &built.model;

        // Scans 0, 1, 2 have variables.
        assert_eq!(
            model
                .rows_where(|f| matches!(f, RowFamily::RtBinCapacity { .. }))
                .count(),
            3
        );
        assert_eq!(
            model
                .rows_where(|f| matches!(f, RowFamily::AcquisitionCap { .. }))
                .count(),
            2
        );
        let list = model.rows_where(|f| *f == RowFamily::ListSize).next().unwrap();
        assert_eq!(list.terms.len(), 4);
        assert_eq!(list.rhs, 2.0);
        assert!(built.protein_indicators.is_empty());
    }

    #[test]
    fn test_toggles_disable_families() {
        let (candidates, ranges, signal) = make_test_data();
        let mut params = params().with_max_list_size(2);
        params.constraints.rt_bin_capacity = false;
        params.constraints.list_size = false;
        let built = SelectionIlpBuilder::new(&candidates, &ranges, &signal, &params)
            .build()
            .unwrap();
        assert!(built
            .model
            .rows()
            .iter()
            .all(|r| matches!(r.family, RowFamily::AcquisitionCap { .. })));
    }

    #[test]
    fn test_protein_coverage_rows() {
        let (candidates, ranges, signal) = make_test_data();
        let params = params().with_coverage_bonus(10.0);
        let built = SelectionIlpBuilder::new(&candidates, &ranges, &signal, &params)
            .with_protein_coverage()
            .build()
            .unwrap();

        assert_eq!(built.protein_indicators.len(), 2);
        let y1 = built.protein_indicators["P1"];
        let y2 = built.protein_indicators["P2"];
        assert_eq!((y1, y2), (4, 5));
        assert_eq!(built.model.objective()[y1], 10.0);

        let p1 = built
            .model
            .rows_where(|f| *f == RowFamily::ProteinCoverage { accession: "P1".into() })
            .next()
            .unwrap();
        // Indicator plus every selection of A and C.
        assert_eq!(p1.terms.len(), 5);
        assert_eq!(p1.terms[0], (y1, 1.0));
        assert!(built.model.is_satisfied_by(&[]));
        assert!(!built.model.is_satisfied_by(&[y2]));
        assert!(built.model.is_satisfied_by(&[3, y2]));
    }

    #[test]
    fn test_windowed_build_masks_outside_scans() {
        let (candidates, ranges, signal) = make_test_data();
        let params = params();
        let built = SelectionIlpBuilder::new(&candidates, &ranges, &signal, &params)
            .with_window(StepWindow::new(0, 1))
            .build()
            .unwrap();

        let mask = built
            .model
            .rows_where(|f| *f == RowFamily::StepWindow)
            .next()
            .unwrap();
        assert_eq!(mask.terms.len(), 3);
        assert_eq!(
            built
                .model
                .rows_where(|f| matches!(f, RowFamily::RtBinCapacity { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn test_objective_weighting_and_tie_break() {
        let (mut candidates, ranges, signal) = make_test_data();
        candidates[0].rt_probability = 0.5;
        let params = params().with_rt_probability(true).with_tie_break(1e-3);
        let built = SelectionIlpBuilder::new(&candidates, &ranges, &signal, &params)
            .build()
            .unwrap();
        let obj = built.model.objective();

        assert!((obj[0] - (4.0 * 0.5 + 1e-3)).abs() < 1e-12);
        assert!((obj[3] - (5.0 + 1e-3 * 0.25)).abs() < 1e-12);
        assert!(obj[2] > 4.0);
        assert!(obj[2] < obj[1] + 4.0);
    }

    #[test]
    fn test_build_is_deterministic() {
        let (candidates, ranges, signal) = make_test_data();
        let params = params().with_max_list_size(3);
        let build = || {
            SelectionIlpBuilder::new(&candidates, &ranges, &signal, &params)
                .with_protein_coverage()
                .build()
                .unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_build_rejects_mismatched_input() {
        let (candidates, mut ranges, signal) = make_test_data();
        ranges.pop();
        let params = params();
        let err = SelectionIlpBuilder::new(&candidates, &ranges, &signal, &params)
            .build()
            .unwrap_err();
        match err {
            ScheduleError::Configuration(errors) => assert!(errors
                .iter()
                .any(|e| e.kind == ValidationErrorKind::CandidateCountMismatch)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_build_rejects_empty_charge_set() {
        let (candidates, ranges, signal) = make_test_data();
        let params = params().with_charges(Vec::new());
        assert!(SelectionIlpBuilder::new(&candidates, &ranges, &signal, &params)
            .build()
            .is_err());
    }
}
