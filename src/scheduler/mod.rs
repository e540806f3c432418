//! Scheduling drivers and selection KPIs.
//!
//! Drivers orchestrate build → solve → commit cycles over a
//! [`SolverBackend`](crate::ilp::SolverBackend):
//!
//! - [`FeatureScheduler`]: one build, one solve over the whole experiment.
//! - [`CombinedScheduler`]: adds protein coverage indicators; can stop after
//!   construction and return a ranked assignment, and revises its objective
//!   from protein inference results.
//! - [`SequentialScheduler`]: rolling horizon; solves one step window at a
//!   time and patches the model between windows.
//!
//! Every driver owns its model exclusively and runs synchronously.
//!
//! # State machine
//!
//! ```text
//! Idle → BuildingModel → Built → Solving → {Solved | Infeasible}
//!                                   (sequential) → AdvanceWindow → Built → … → Done
//! ```

mod combined;
mod feature;
mod kpi;
mod sequential;

pub use combined::{CombinedScheduler, ProteinInference};
pub use feature::FeatureScheduler;
pub use kpi::SelectionKpi;
pub use sequential::{SequentialOutcome, SequentialScheduler, WindowOutcome};

use log::debug;
use std::fmt;

use crate::error::{Result, ScheduleError};
use crate::ilp::{LinearModel, SolverBackend};
use crate::models::{Solution, SolveStatus};

/// Lifecycle state of a scheduling driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverState {
    /// Nothing built yet.
    #[default]
    Idle,
    /// A model is being built.
    BuildingModel,
    /// A model is ready to solve.
    Built,
    /// The backend is running.
    Solving,
    /// The last solve found an optimal assignment.
    Solved,
    /// The last solve found no feasible assignment.
    Infeasible,
    /// The step window is moving.
    AdvanceWindow,
    /// Every window has been processed.
    Done,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::BuildingModel => "building model",
            Self::Built => "built",
            Self::Solving => "solving",
            Self::Solved => "solved",
            Self::Infeasible => "infeasible",
            Self::AdvanceWindow => "advancing window",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

fn transition(state: &mut DriverState, to: DriverState, driver: &str) {
    debug!("{driver}: {state} -> {to}");
    *state = to;
}

fn invalid_state(state: DriverState, action: &'static str) -> ScheduleError {
    ScheduleError::InvalidState {
        state: state.to_string(),
        action,
    }
}

/// Solves `model`, moving `state` through `Solving` to the outcome.
///
/// A backend failure leaves the driver in `Built` so the caller may retry.
fn solve_model<B: SolverBackend>(
    backend: &B,
    model: &LinearModel,
    state: &mut DriverState,
    driver: &str,
) -> Result<Solution> {
    transition(state, DriverState::Solving, driver);
    match backend.solve(model) {
        Ok(solution) => {
            let to = match solution.status {
                SolveStatus::Optimal => DriverState::Solved,
                SolveStatus::Infeasible => DriverState::Infeasible,
            };
            transition(state, to, driver);
            Ok(solution)
        }
        Err(e) => {
            transition(state, DriverState::Built, driver);
            Err(e)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedSolver;
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(DriverState::AdvanceWindow.to_string(), "advancing window");
        assert_eq!(DriverState::default(), DriverState::Idle);
    }

    #[test]
    fn test_solve_model_transitions() {
        let model = LinearModel::new();
        let solver = ScriptedSolver::with_script(vec![
            Ok(Solution::infeasible()),
            Err(ScheduleError::Backend("out of memory".into())),
        ]);
        let mut state = DriverState::Built;

        let sol = solve_model(&solver, &model, &mut state, "test").unwrap();
        assert!(!sol.is_feasible());
        assert_eq!(state, DriverState::Infeasible);

        assert!(solve_model(&solver, &model, &mut state, "test").is_err());
        assert_eq!(state, DriverState::Built);

        solve_model(&solver, &model, &mut state, "test").unwrap();
        assert_eq!(state, DriverState::Solved);
        assert_eq!(solver.calls.get(), 3);
    }
}
