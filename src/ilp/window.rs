//! Rolling-horizon state and window patches.
//!
//! The sequential formulation solves one step window of scans at a time.
//! Between windows, [`patch`] derives the next model version from the
//! current one: the window mask and RT-bin capacity rows move to the new
//! window, committed selections are fixed out, and the capacity, acquisition
//! and list-size budgets shrink by what earlier windows already committed.
//! Variables and protein rows are untouched.

use log::debug;
use std::collections::{BTreeSet, HashMap};

use super::builder::{
    add_acquisition_cap, add_committed_mask, add_list_size, add_rt_bin_capacity, add_step_window,
};
use super::model::{LinearModel, RowFamily};
use crate::models::{IndexTriple, SchedulingParams, Solution};

/// Scans `start..start + size` are eligible in the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepWindow {
    /// First scan of the window.
    pub start: usize,
    /// Number of scans in the window.
    pub size: usize,
}

impl StepWindow {
    /// Creates a window.
    pub fn new(start: usize, size: usize) -> Self {
        Self { start, size }
    }

    /// One past the last scan of the window.
    #[inline]
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.size)
    }

    /// Whether `scan` lies in the window.
    #[inline]
    pub fn contains(&self, scan: usize) -> bool {
        scan >= self.start && scan < self.end()
    }

    /// The window `step` scans further, `step` scans wide.
    pub fn advanced(&self, step: usize) -> Self {
        Self {
            start: self.start.saturating_add(step),
            size: step,
        }
    }

    /// Whether the window starts beyond the last scan.
    pub fn is_exhausted(&self, scan_count: usize) -> bool {
        self.start >= scan_count
    }
}

/// Selections committed by earlier windows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionLedger {
    committed: BTreeSet<usize>,
    per_candidate: HashMap<usize, u32>,
    per_scan: HashMap<usize, u32>,
}

impl SelectionLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the selection variables of `solution`.
    ///
    /// Returns the number of newly committed variables. Variables without a
    /// triple and variables already committed are ignored.
    pub fn commit(&mut self, solution: &Solution, triples: &[IndexTriple]) -> usize {
        let mut added = 0;
        for t in solution.selected_triples(triples) {
            if self.committed.insert(t.variable) {
                *self.per_candidate.entry(t.candidate).or_insert(0) += 1;
                *self.per_scan.entry(t.scan).or_insert(0) += 1;
                added += 1;
            }
        }
        added
    }

    /// Times `candidate` has been committed.
    pub fn acquisitions(&self, candidate: usize) -> u32 {
        self.per_candidate.get(&candidate).copied().unwrap_or(0)
    }

    /// Selections committed in `scan`.
    pub fn committed_in(&self, scan: usize) -> u32 {
        self.per_scan.get(&scan).copied().unwrap_or(0)
    }

    /// Total committed selections.
    pub fn total(&self) -> usize {
        self.committed.len()
    }

    /// Committed variable ids, ascending.
    pub fn committed(&self) -> &BTreeSet<usize> {
        &self.committed
    }

    /// Committed ids as a sorted vector.
    pub fn to_vec(&self) -> Vec<usize> {
        self.committed.iter().copied().collect()
    }
}

/// Derives the model for `window` from `model`.
///
/// Returns a new model whose version is one higher. Rows of the window,
/// committed, RT-bin capacity, acquisition-cap and list-size families are
/// rebuilt; every other row and all variables and objective coefficients
/// carry over.
pub fn patch(
    model: &LinearModel,
    triples: &[IndexTriple],
    window: &StepWindow,
    ledger: &SelectionLedger,
    params: &SchedulingParams,
) -> LinearModel {
    let mut next = model.next_version();
    next.remove_rows(|family| {
        matches!(
            family,
            RowFamily::RtBinCapacity { .. }
                | RowFamily::AcquisitionCap { .. }
                | RowFamily::ListSize
                | RowFamily::StepWindow
                | RowFamily::Committed
        )
    });
    apply_window_rows(&mut next, triples, window, ledger, params);

    debug!(
        "Patched model to v{} for scans {}..{} ({} rows, {} committed)",
        next.version(),
        window.start,
        window.end(),
        next.row_count(),
        ledger.total()
    );
    next
}

/// Adds every window-scoped row family enabled in `params`.
///
/// Capacity rows cover only the window while the window mask is active and
/// every scan otherwise.
pub(crate) fn apply_window_rows(
    model: &mut LinearModel,
    triples: &[IndexTriple],
    window: &StepWindow,
    ledger: &SelectionLedger,
    params: &SchedulingParams,
) {
    let toggles = params.constraints;
    add_committed_mask(model, ledger);
    if toggles.step_window {
        add_step_window(model, triples, window);
    }
    if toggles.rt_bin_capacity {
        let scans = toggles.step_window.then(|| window.start..window.end());
        add_rt_bin_capacity(model, triples, scans, params.ms2_spectra_per_rt_bin, ledger);
    }
    if toggles.acquisition_cap {
        add_acquisition_cap(model, triples, params.number_of_msms_per_precursor, ledger);
    }
    if toggles.list_size {
        if let Some(max) = params.max_list_size {
            add_list_size(model, triples, max, ledger);
        }
    }
}
