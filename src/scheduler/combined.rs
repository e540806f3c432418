//! Combined protein + feature scheduler.
//!
//! Adds one coverage indicator per protein so the objective rewards
//! spreading MS2 events over distinct proteins rather than spending them on
//! the most intense features of a few. As protein inference identifies
//! proteins, their coverage bonus is withdrawn so later solves favour
//! proteins that are still unidentified.
//!
//! # Reference
//! Zerck et al. (2009), "An iterative strategy for precursor ion selection
//! for LC-MS/MS based shotgun proteomics", J. Proteome Res. 8(7)

use log::info;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use super::{invalid_state, solve_model, transition, DriverState};
use crate::error::Result;
use crate::ilp::{
    withdraw_coverage_bonus, BuiltModel, GoodLpSolver, LinearModel, ProteinIndicators,
    SelectionIlpBuilder, SolverBackend,
};
use crate::models::{Candidate, IndexTriple, ScanRegion, SchedulingParams, Solution};
use crate::signal::SignalSource;

const DRIVER: &str = "combined scheduler";

/// Source of protein identification results.
pub trait ProteinInference {
    /// Whether `accession` is already identified.
    fn is_identified(&self, accession: &str) -> bool;
}

impl ProteinInference for HashSet<String> {
    fn is_identified(&self, accession: &str) -> bool {
        self.contains(accession)
    }
}

impl ProteinInference for BTreeSet<String> {
    fn is_identified(&self, accession: &str) -> bool {
        self.contains(accession)
    }
}

impl ProteinInference for [&str] {
    fn is_identified(&self, accession: &str) -> bool {
        self.iter().any(|&a| a == accession)
    }
}

/// Protein-coverage-aware scheduler.
///
/// Selection coefficients are scaled by peptide detectability; each covered
/// protein adds `coverage_bonus` to the objective.
#[derive(Debug)]
pub struct CombinedScheduler<B: SolverBackend = GoodLpSolver> {
    backend: B,
    params: SchedulingParams,
    state: DriverState,
    built: Option<BuiltModel>,
    solution: Option<Solution>,
}

impl<B: SolverBackend> CombinedScheduler<B> {
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

    /// Builds the model with protein coverage rows, without solving.
    pub fn build<S: SignalSource + ?Sized>(
        &mut self,
        candidates: &[Candidate],
        mass_ranges: &[Vec<ScanRegion>],
        signal: &S,
    ) -> Result<&LinearModel> {
        transition(&mut self.state, DriverState::BuildingModel, DRIVER);
        self.built = None;
        self.solution = None;

        let result = SelectionIlpBuilder::new(candidates, mass_ranges, signal, &self.params)
            .with_protein_coverage()
            .build();
        match result {
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

    /// Construction-only mode: builds the model and returns the selection
    /// triples ranked by objective coefficient, without solving.
    pub fn construct_only<S: SignalSource + ?Sized>(
        &mut self,
        candidates: &[Candidate],
        mass_ranges: &[Vec<ScanRegion>],
        signal: &S,
    ) -> Result<Vec<IndexTriple>> {
        self.build(candidates, mass_ranges, signal)?;
        Ok(self.ranked_assignment())
    }

    /// Selection triples by descending objective coefficient, ties by
    /// ascending variable id.
    pub fn ranked_assignment(&self) -> Vec<IndexTriple> {
        let Some(built) = &self.built else {
            return Vec::new();
        };
        let objective = built.model.objective();
        let coefficient = |t: &IndexTriple| objective.get(t.variable).copied().unwrap_or(0.0);

        let mut ranked = built.triples.clone();
        ranked.sort_by(|a, b| {
            coefficient(b)
                .partial_cmp(&coefficient(a))
                .unwrap_or(Ordering::Equal)
                .then(a.variable.cmp(&b.variable))
        });
        ranked
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

    /// Withdraws the coverage bonus of every identified protein.
    ///
    /// Produces a new model version; the driver returns to `Built` so the
    /// revised model can be solved. Returns the number of proteins revised.
    pub fn apply_protein_inference<I: ProteinInference + ?Sized>(
        &mut self,
        inference: &I,
    ) -> Result<usize> {
        let state = self.state;
        let built = self
            .built
            .as_mut()
            .ok_or_else(|| invalid_state(state, "apply protein inference"))?;

        let mut revised = built.model.next_version();
        let withdrawn = withdraw_coverage_bonus(&mut revised, &built.protein_indicators, |acc| {
            inference.is_identified(acc)
        });
        if withdrawn == 0 {
            return Ok(0);
        }

        info!(
            "Withdrew coverage bonus of {} identified protein(s); model now v{}",
            withdrawn,
            revised.version()
        );
        built.model = revised;
        self.solution = None;
        transition(&mut self.state, DriverState::Built, DRIVER);
        Ok(withdrawn)
    }

    /// Current driver state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Variable index of the current model (empty before a build).
    pub fn variable_indices(&self) -> &[IndexTriple] {
        self.built.as_ref().map_or(&[], |b| b.triples.as_slice())
    }

    /// Protein accession → indicator variable id.
    pub fn protein_indicators(&self) -> Option<&ProteinIndicators> {
        self.built.as_ref().map(|b| &b.protein_indicators)
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
