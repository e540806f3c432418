//! Solver adapter.
//!
//! [`SolverBackend`] is the seam between a built [`LinearModel`] and an
//! external ILP solver. The default backend, [`GoodLpSolver`], hands the
//! model to `good_lp` with the pure-Rust `microlp` solver.
//!
//! Backends solve synchronously and do not retry or relax constraints.
//! Infeasibility is reported as [`SolveStatus::Infeasible`](crate::models::SolveStatus);
//! any other backend failure is an error.

use good_lp::Solution as _;
use good_lp::{
    microlp, variable, Expression, ProblemVariables, ResolutionError, SolverModel, Variable,
};
use log::{debug, info};

use super::model::{LinearModel, Sense};
use crate::error::{Result, ScheduleError};
use crate::models::Solution;

/// An ILP backend.
pub trait SolverBackend {
    /// Backend name (for logs).
    fn name(&self) -> &'static str;

    /// Solves `model` to optimality.
    ///
    /// Returns `Ok(Solution::infeasible())` when no assignment satisfies the
    /// model, `Err(ScheduleError::Backend)` on solver failure.
    fn solve(&self, model: &LinearModel) -> Result<Solution>;
}

impl<B: SolverBackend + ?Sized> SolverBackend for &B {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn solve(&self, model: &LinearModel) -> Result<Solution> {
        (**self).solve(model)
    }
}

/// `good_lp` backend using the `microlp` branch-and-bound solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpSolver;

impl GoodLpSolver {
    /// Creates the backend.
    pub fn new() -> Self {
        Self
    }
}

impl SolverBackend for GoodLpSolver {
    fn name(&self) -> &'static str {
        "good_lp/microlp"
    }

    fn solve(&self, model: &LinearModel) -> Result<Solution> {
        if model.variable_count() == 0 {
            return Ok(Solution::optimal(Vec::new(), 0.0));
        }

        let mut vars = ProblemVariables::new();
        let handles: Vec<Variable> = model
            .variables()
            .iter()
            .map(|v| vars.add(variable().binary().name(v.name.clone())))
            .collect();

        let objective: Expression = model
            .objective()
            .iter()
            .zip(&handles)
            .map(|(&c, &h)| c * h)
            .sum();

        let mut problem = vars.maximise(objective).using(microlp);

        for row in model.rows() {
            if row.terms.is_empty() {
                if row.is_satisfied(&[]) {
                    continue;
                }
                info!("Row {:?} has no terms and cannot hold; model infeasible", row.family);
                return Ok(Solution::infeasible());
            }

            let mut lhs = Expression::default();
            for &(v, c) in &row.terms {
                let handle = handles.get(v).ok_or_else(|| {
                    ScheduleError::Backend(format!(
                        "row {:?} references unknown variable {}",
                        row.family, v
                    ))
                })?;
                lhs += c * *handle;
            }

            let constraint = match row.sense {
                Sense::Le => lhs.leq(row.rhs),
                Sense::Ge => lhs.geq(row.rhs),
                Sense::Eq => lhs.eq(row.rhs),
            };
            problem.add_constraint(constraint);
        }

        debug!(
            "Solving model v{} with {}: {} variables, {} rows",
            model.version(),
            self.name(),
            model.variable_count(),
            model.row_count()
        );

        match problem.solve() {
            Ok(assignment) => {
                let selected: Vec<usize> = handles
                    .iter()
                    .enumerate()
                    .filter(|(_, &h)| assignment.value(h) > 0.5)
                    .map(|(i, _)| i)
                    .collect();
                let objective = model.evaluate(&selected);
                info!(
                    "Model v{} solved: {} of {} variables selected, objective {:.4}",
                    model.version(),
                    selected.len(),
                    model.variable_count(),
                    objective
                );
                Ok(Solution::optimal(selected, objective))
            }
            Err(ResolutionError::Infeasible) => {
                info!("Model v{} is infeasible", model.version());
                Ok(Solution::infeasible())
            }
            Err(e) => Err(ScheduleError::Backend(e.to_string())),
        }
    }
}
