//! Single-shot feature-based scheduler.
//!
//! Builds one model over the whole experiment and solves it once. Suitable
//! when the duty cycle is uniform and no rolling horizon is needed.

use super::{invalid_state, solve_model, transition, DriverState};
use crate::error::Result;
use crate::ilp::{BuiltModel, GoodLpSolver, LinearModel, SelectionIlpBuilder, SolverBackend};
use crate::models::{Candidate, IndexTriple, ScanRegion, SchedulingParams, Solution};
use crate::signal::SignalSource;

const DRIVER: &str = "feature scheduler";

/// One build, one solve.
///
/// # Example
///
/// ```
/// use u_precursor::ilp::GoodLpSolver;
/// use u_precursor::models::{Candidate, ScanRegion, SchedulingParams};
/// use u_precursor::scheduler::FeatureScheduler;
/// use u_precursor::signal::DenseSignal;
///
/// let candidates = vec![
///     Candidate::new("A", 445.12).with_charge(2),
///     Candidate::new("B", 512.30).with_charge(2),
/// ];
/// let ranges = vec![vec![ScanRegion::new(0, 0, 0)], vec![ScanRegion::new(0, 1, 1)]];
/// let signal = DenseSignal::new(vec![vec![10.0, 3.0]]);
/// let params = SchedulingParams::default()
///     .with_bin_capacity(1)
///     .with_normalization(false);
///
/// let mut scheduler = FeatureScheduler::new(GoodLpSolver, params);
/// let solution = scheduler.build_and_solve(&candidates, &ranges, &signal).unwrap();
///
/// let list = solution.inclusion_list(scheduler.variable_indices(), &candidates);
/// assert_eq!(list.len(), 1);
/// assert_eq!(list[0].candidate_id, "A");
/// ```
#[derive(Debug)]
pub struct FeatureScheduler<B: SolverBackend = GoodLpSolver> {
    backend: B,
    params: SchedulingParams,
    state: DriverState,
    built: Option<BuiltModel>,
    solution: Option<Solution>,
}

impl<B: SolverBackend> FeatureScheduler<B> {
    /// Creates an idle scheduler.
    pub fn new(backend: B, params: SchedulingParams) -> Self {
        Self {
            backend,
            params,
            state: DriverState::Idle,
            built: None,
            solution: None,
        }
    }

    /// Builds the whole-experiment model.
    ///
    /// Replaces any previous model. On error the scheduler returns to `Idle`.
    pub fn build<S: SignalSource + ?Sized>(
        &mut self,
        candidates: &[Candidate],
        mass_ranges: &[Vec<ScanRegion>],
        signal: &S,
    ) -> Result<&LinearModel> {
        transition(&mut self.state, DriverState::BuildingModel, DRIVER);
        self.built = None;
        self.solution = None;

        match SelectionIlpBuilder::new(candidates, mass_ranges, signal, &self.params).build() {
            Ok(built) => {
                transition(&mut self.state, DriverState::Built, DRIVER);
                Ok(&self.built.insert(built).model)
            }
            Err(e) => {
                transition(&mut self.state, DriverState::Idle, DRIVER);
                Err(e)
            }
        }
    }

    /// Solves the current model.
    pub fn solve(&mut self) -> Result<Solution> {
        let built = self
            .built
            .as_ref()
            .ok_or_else(|| invalid_state(self.state, "solve"))?;
        let solution = solve_model(&self.backend, &built.model, &mut self.state, DRIVER)?;
        self.solution = Some(solution.clone());
        Ok(solution)
    }

    /// Builds and solves in one step.
    pub fn build_and_solve<S: SignalSource + ?Sized>(
        &mut self,
        candidates: &[Candidate],
        mass_ranges: &[Vec<ScanRegion>],
        signal: &S,
    ) -> Result<Solution> {
        self.build(candidates, mass_ranges, signal)?;
        self.solve()
    }

    /// Current driver state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Parameters in use.
    pub fn params(&self) -> &SchedulingParams {
        &self.params
    }

    /// Variable index of the current model (empty before a build).
    pub fn variable_indices(&self) -> &[IndexTriple] {
        self.built.as_ref().map_or(&[], |b| b.triples.as_slice())
    }

    /// Current model, if built.
    pub fn model(&self) -> Option<&LinearModel> {
        self.built.as_ref().map(|b| &b.model)
    }

    /// Last solution, if solved.
    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScheduleError;
    use crate::models::SolveStatus;
    use crate::scheduler::testing::{make_experiment, ScriptedSolver};

    fn scenario_a() -> (Vec<Candidate>, Vec<Vec<ScanRegion>>, crate::signal::DenseSignal) {
        // Weights 5 and 3 compete for scan 0, weight 1 sits alone in scan 1.
        make_experiment(2, &[(2, vec![(0, 5.0)]), (2, vec![(0, 3.0)]), (2, vec![(1, 1.0)])])
    }

    fn params() -> SchedulingParams {
        SchedulingParams::default()
            .with_charges([2])
            .with_bin_capacity(1)
            .with_normalization(false)
    }

    #[test]
    fn test_scenario_capacity_one_per_bin() {
        let (candidates, ranges, signal) = scenario_a();
        let mut scheduler = FeatureScheduler::new(GoodLpSolver, params());
        let solution = scheduler
            .build_and_solve(&candidates, &ranges, &signal)
            .unwrap();

        assert_eq!(scheduler.state(), DriverState::Solved);
        assert_eq!(solution.status, SolveStatus::Optimal);

        let chosen: Vec<(usize, usize)> = solution
            .selected_triples(scheduler.variable_indices())
            .iter()
            .map(|t| (t.candidate, t.scan))
            .collect();
        assert_eq!(chosen, vec![(0, 0), (2, 1)]);
        assert!((solution.objective - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_solution_respects_every_row() {
        let (candidates, ranges, signal) = make_experiment(
            3,
            &[
                (2, vec![(0, 4.0), (1, 6.0), (2, 2.0)]),
                (2, vec![(0, 3.0), (1, 9.0)]),
                (3, vec![(1, 8.0), (2, 7.0)]),
                (2, vec![(2, 1.0)]),
            ],
        );
        let params = SchedulingParams::default()
            .with_charges([2, 3])
            .with_bin_capacity(1)
            .with_msms_per_precursor(2)
            .with_max_list_size(2);
        let mut scheduler = FeatureScheduler::new(GoodLpSolver, params);
        let solution = scheduler
            .build_and_solve(&candidates, &ranges, &signal)
            .unwrap();

        let model = scheduler.model().unwrap();
        assert!(model.is_satisfied_by(&solution.selected));
        assert_eq!(solution.len(), 2);
    }

    #[test]
    fn test_solve_before_build_is_rejected() {
        let mut scheduler = FeatureScheduler::new(GoodLpSolver, params());
        assert!(matches!(
            scheduler.solve(),
            Err(ScheduleError::InvalidState { .. })
        ));
        assert!(scheduler.variable_indices().is_empty());
    }

    #[test]
    fn test_configuration_error_returns_to_idle() {
        let (candidates, mut ranges, signal) = scenario_a();
        ranges.pop();
        let mut scheduler = FeatureScheduler::new(GoodLpSolver, params());
        let err = scheduler
            .build_and_solve(&candidates, &ranges, &signal)
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Configuration(_)));
        assert_eq!(scheduler.state(), DriverState::Idle);
        assert!(scheduler.model().is_none());
    }

    #[test]
    fn test_infeasible_is_not_an_error() {
        let (candidates, ranges, signal) = scenario_a();
        let solver = ScriptedSolver::with_script(vec![Ok(Solution::infeasible())]);
        let mut scheduler = FeatureScheduler::new(&solver, params());
        let solution = scheduler
            .build_and_solve(&candidates, &ranges, &signal)
            .unwrap();
        assert!(!solution.is_feasible());
        assert_eq!(scheduler.state(), DriverState::Infeasible);

        // Caller may retry on the same model.
        let retry = scheduler.solve().unwrap();
        assert!(retry.is_feasible());
        assert_eq!(solver.calls.get(), 2);
    }

    #[test]
    fn test_backend_failure_propagates() {
        let (candidates, ranges, signal) = scenario_a();
        let solver =
            ScriptedSolver::with_script(vec![Err(ScheduleError::Backend("crashed".into()))]);
        let mut scheduler = FeatureScheduler::new(&solver, params());
        let err = scheduler
            .build_and_solve(&candidates, &ranges, &signal)
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Backend(_)));
        assert_eq!(scheduler.state(), DriverState::Built);
        assert!(scheduler.solution().is_none());
    }

    #[test]
    fn test_charge_filter_shrinks_model() {
        let (candidates, ranges, signal) = make_experiment(
            1,
            &[(1, vec![(0, 1.0)]), (2, vec![(0, 1.0)]), (4, vec![(0, 1.0)])],
        );
        let mut scheduler = FeatureScheduler::new(GoodLpSolver, params());
        scheduler.build(&candidates, &ranges, &signal).unwrap();
        assert_eq!(scheduler.variable_indices().len(), 1);
        assert_eq!(scheduler.variable_indices()[0].candidate, 1);
    }
}
