//! Sequential (rolling-horizon) scheduler.
//!
//! Solves one step window of scans at a time. After each solve the selected
//! variables are committed to a [`SelectionLedger`]; the window then advances
//! by `step_size` and the model is patched rather than rebuilt. Committed
//! acquisitions count against the per-candidate cap and the list size of
//! every later window, so the union of the per-window solutions respects the
//! global budgets.
//!
//! With protein coverage enabled, a protein covered by a committed selection
//! stops earning its bonus in later windows, so the run keeps favouring
//! proteins it has not reached yet.
//!
//! The run terminates because the window strictly advances and the scan
//! range is finite.

use log::{info, warn};

use super::{invalid_state, solve_model, transition, DriverState};
use crate::error::{Result, ScheduleError};
use crate::ilp::{
    patch, withdraw_coverage_bonus, BuiltModel, GoodLpSolver, LinearModel, ProteinIndicators,
    RowFamily, SelectionIlpBuilder, SelectionLedger, SolverBackend, StepWindow,
};
use crate::models::{
    Candidate, IndexTriple, InfeasiblePolicy, ScanRegion, SchedulingParams, Solution, SolveStatus,
};
use crate::signal::SignalSource;
use crate::validation::{ValidationError, ValidationErrorKind};

const DRIVER: &str = "sequential scheduler";

/// Record of one solved window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowOutcome {
    /// Scans eligible in this window.
    pub window: StepWindow,
    /// Version of the model that was solved.
    pub model_version: u64,
    /// Solve status.
    pub status: SolveStatus,
    /// Selections newly committed by this window.
    pub committed: usize,
}

/// Result of a full sequential run.
#[derive(Debug, Clone)]
pub struct SequentialOutcome {
    /// Union of every committed selection.
    pub solution: Solution,
    /// Per-window history, in solve order.
    pub windows: Vec<WindowOutcome>,
    /// Number of window advances.
    pub advances: usize,
    /// Whether the run stopped early on an infeasible window.
    pub aborted: bool,
}

/// Rolling-horizon driver.
///
/// # Example
///
/// ```
/// use u_precursor::ilp::GoodLpSolver;
/// use u_precursor::models::{Candidate, ScanRegion, SchedulingParams};
/// use u_precursor::scheduler::SequentialScheduler;
/// use u_precursor::signal::DenseSignal;
///
/// let candidates = vec![Candidate::new("A", 445.12).with_charge(2)];
/// let ranges = vec![vec![
///     ScanRegion::new(0, 0, 0),
///     ScanRegion::new(1, 0, 0),
///     ScanRegion::new(2, 0, 0),
/// ]];
/// let signal = DenseSignal::new(vec![vec![1.0], vec![5.0], vec![2.0]]);
/// let params = SchedulingParams::default().with_step_size(1);
///
/// let mut scheduler = SequentialScheduler::new(GoodLpSolver, params);
/// let outcome = scheduler.run(&candidates, &ranges, &signal).unwrap();
///
/// // The first window already commits the single allowed acquisition.
/// assert_eq!(outcome.solution.len(), 1);
/// assert_eq!(outcome.advances, 3);
/// ```
#[derive(Debug)]
pub struct SequentialScheduler<B: SolverBackend = GoodLpSolver> {
    backend: B,
    params: SchedulingParams,
    state: DriverState,
    scan_count: usize,
    window: StepWindow,
    built: Option<BuiltModel>,
    ledger: SelectionLedger,
    history: Vec<WindowOutcome>,
    advances: usize,
    protein_coverage: bool,
}

impl<B: SolverBackend> SequentialScheduler<B> {
    /// Creates an idle scheduler.
    pub fn new(backend: B, params: SchedulingParams) -> Self {
        let window = StepWindow::new(0, params.step_size);
        Self {
            backend,
            params,
            state: DriverState::Idle,
            scan_count: 0,
            window,
            built: None,
            ledger: SelectionLedger::new(),
            history: Vec::new(),
            advances: 0,
            protein_coverage: false,
        }
    }

    /// Solves the combined protein + feature formulation window by window.
    pub fn with_protein_coverage(mut self) -> Self {
        self.protein_coverage = true;
        self
    }

    /// Builds the model for the first window and resets the run.
    ///
    /// With no scans at all the scheduler goes straight to `Done`.
    pub fn start<S: SignalSource + ?Sized>(
        &mut self,
        candidates: &[Candidate],
        mass_ranges: &[Vec<ScanRegion>],
        signal: &S,
    ) -> Result<&LinearModel> {
        transition(&mut self.state, DriverState::BuildingModel, DRIVER);
        self.built = None;
        self.ledger = SelectionLedger::new();
        self.history.clear();
        self.advances = 0;
        self.scan_count = signal.scan_count();
        self.window = StepWindow::new(0, self.params.step_size);

        let mut builder = SelectionIlpBuilder::new(candidates, mass_ranges, signal, &self.params)
            .with_window(self.window);
        if self.protein_coverage {
            builder = builder.with_protein_coverage();
        }
        let result = builder.build();
        let built = match result {
            Ok(built) => built,
            Err(e) => {
                transition(&mut self.state, DriverState::Idle, DRIVER);
                return Err(e);
            }
        };

        let next = if self.window.is_exhausted(self.scan_count) {
            DriverState::Done
        } else {
            DriverState::Built
        };
        transition(&mut self.state, next, DRIVER);
        Ok(&self.built.insert(built).model)
    }

    /// Solves the current window and commits its selections.
    ///
    /// An infeasible window commits nothing.
    pub fn solve(&mut self) -> Result<Solution> {
        if self.state != DriverState::Built {
            return Err(invalid_state(self.state, "solve"));
        }
        let built = self
            .built
            .as_ref()
            .ok_or_else(|| invalid_state(self.state, "solve"))?;

        let solution = solve_model(&self.backend, &built.model, &mut self.state, DRIVER)?;
        let committed = if solution.is_feasible() {
            self.ledger.commit(&solution, &built.triples)
        } else {
            0
        };
        info!(
            "Window {}..{}: {:?}, {} selection(s) committed ({} total)",
            self.window.start,
            self.window.end(),
            solution.status,
            committed,
            self.ledger.total()
        );
        self.history.push(WindowOutcome {
            window: self.window,
            model_version: built.model.version(),
            status: solution.status,
            committed,
        });
        Ok(solution)
    }

    /// Starts the run and solves its first window.
    pub fn build_and_solve<S: SignalSource + ?Sized>(
        &mut self,
        candidates: &[Candidate],
        mass_ranges: &[Vec<ScanRegion>],
        signal: &S,
    ) -> Result<Solution> {
        self.start(candidates, mass_ranges, signal)?;
        if self.state == DriverState::Done {
            return Ok(Solution::optimal(Vec::new(), 0.0));
        }
        self.solve()
    }

    /// Advances the window by `step_size` scans.
    ///
    /// Returns `true` when a patched model for the new window is ready, and
    /// `false` when the window ran past the last scan (state `Done`).
    pub fn update_window(&mut self, step_size: usize) -> Result<bool> {
        if !matches!(self.state, DriverState::Solved | DriverState::Infeasible) {
            return Err(invalid_state(self.state, "advance the window"));
        }
        if step_size == 0 {
            return Err(ScheduleError::Configuration(vec![ValidationError::new(
                ValidationErrorKind::InvalidParameter,
                "step_size must be positive",
            )]));
        }
        let built = self
            .built
            .as_mut()
            .ok_or_else(|| invalid_state(self.state, "advance the window"))?;

        transition(&mut self.state, DriverState::AdvanceWindow, DRIVER);
        self.window = self.window.advanced(step_size);
        self.advances += 1;

        if self.window.is_exhausted(self.scan_count) {
            info!(
                "All {} scans processed after {} advance(s); {} selection(s) committed",
                self.scan_count,
                self.advances,
                self.ledger.total()
            );
            transition(&mut self.state, DriverState::Done, DRIVER);
            return Ok(false);
        }

        let mut next = patch(
            &built.model,
            &built.triples,
            &self.window,
            &self.ledger,
            &self.params,
        );
        let ledger = &self.ledger;
        let withdrawn = withdraw_coverage_bonus(&mut next, &built.protein_indicators, |acc| {
            covers(&built.model, ledger, acc)
        });
        if withdrawn > 0 {
            info!("{} protein(s) covered by committed selections; bonus withdrawn", withdrawn);
        }
        built.model = next;
        transition(&mut self.state, DriverState::Built, DRIVER);
        Ok(true)
    }

    /// Runs every window to completion, honouring the infeasible policy.
    pub fn run<S: SignalSource + ?Sized>(
        &mut self,
        candidates: &[Candidate],
        mass_ranges: &[Vec<ScanRegion>],
        signal: &S,
    ) -> Result<SequentialOutcome> {
        self.start(candidates, mass_ranges, signal)?;

        let mut aborted = false;
        while self.state != DriverState::Done {
            let solution = self.solve()?;
            if !solution.is_feasible() {
                match self.params.infeasible_policy {
                    InfeasiblePolicy::Abort => {
                        warn!(
                            "Window {}..{} infeasible; aborting run",
                            self.window.start,
                            self.window.end()
                        );
                        aborted = true;
                        break;
                    }
                    InfeasiblePolicy::Skip => warn!(
                        "Window {}..{} infeasible; skipping",
                        self.window.start,
                        self.window.end()
                    ),
                }
            }
            self.update_window(self.params.step_size)?;
        }

        Ok(SequentialOutcome {
            solution: self.committed_solution(),
            windows: self.history.clone(),
            advances: self.advances,
            aborted,
        })
    }

    /// Union of every selection committed so far.
    pub fn committed_solution(&self) -> Solution {
        let selected = self.ledger.to_vec();
        let objective = self
            .built
            .as_ref()
            .map_or(0.0, |b| b.model.evaluate(&selected));
        Solution::optimal(selected, objective)
    }

    /// Current driver state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Current step window.
    pub fn window(&self) -> StepWindow {
        self.window
    }

    /// Committed selections.
    pub fn ledger(&self) -> &SelectionLedger {
        &self.ledger
    }

    /// Per-window history.
    pub fn history(&self) -> &[WindowOutcome] {
        &self.history
    }

    /// Window advances so far.
    pub fn advances(&self) -> usize {
        self.advances
    }

    /// Variable index of the run (empty before `start`).
    pub fn variable_indices(&self) -> &[IndexTriple] {
        self.built.as_ref().map_or(&[], |b| b.triples.as_slice())
    }

    /// Protein accession → indicator variable id (empty without coverage).
    pub fn protein_indicators(&self) -> Option<&ProteinIndicators> {
        self.built.as_ref().map(|b| &b.protein_indicators)
    }

    /// Current model version, if started.
    pub fn model(&self) -> Option<&LinearModel> {
        self.built.as_ref().map(|b| &b.model)
    }
}

/// Whether a committed selection appears in the coverage row of `accession`.
fn covers(model: &LinearModel, ledger: &SelectionLedger, accession: &str) -> bool {
    model
        .rows_where(|f| {
            matches!(f, RowFamily::ProteinCoverage { accession: a } if a == accession)
        })
        .flat_map(|row| row.terms.iter())
        .any(|&(v, c)| c < 0.0 && ledger.committed().contains(&v))
}
