//! Backend-neutral linear model.
//!
//! A [`LinearModel`] holds binary variables, constraint rows tagged with the
//! family that produced them, and a dense objective (always maximised).
//! Rows carry their family so a window patch can replace exactly the rows
//! it owns. Models are values: a patch yields a new model with a higher
//! [`version`](LinearModel::version).

use serde::{Deserialize, Serialize};

const FEASIBILITY_TOLERANCE: f64 = 1e-9;

/// What a model variable represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableKind {
    /// Fragment `candidate` in `scan`.
    Selection { candidate: usize, scan: usize },
    /// Protein `accession` is covered by at least one selection.
    ProteinIndicator { accession: String },
}

/// A binary model variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVariable {
    /// Variable name (for diagnostics and LP dumps).
    pub name: String,
    /// Meaning of the variable.
    pub kind: VariableKind,
}

/// Row comparison sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    /// `lhs <= rhs`
    Le,
    /// `lhs >= rhs`
    Ge,
    /// `lhs == rhs`
    Eq,
}

/// Constraint family a row belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowFamily {
    /// MS2 capacity of one scan.
    RtBinCapacity { scan: usize },
    /// Acquisition cap of one candidate.
    AcquisitionCap { candidate: usize },
    /// Global inclusion-list size.
    ListSize,
    /// Links a protein indicator to its candidates' selections.
    ProteinCoverage { accession: String },
    /// Masks selections outside the current step window.
    StepWindow,
    /// Fixes out selections already committed by earlier windows.
    Committed,
}

/// One linear constraint row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintRow {
    /// Producing family.
    pub family: RowFamily,
    /// Sparse `(variable, coefficient)` terms.
    pub terms: Vec<(usize, f64)>,
    /// Comparison sense.
    pub sense: Sense,
    /// Right-hand side.
    pub rhs: f64,
}

impl ConstraintRow {
    /// Left-hand side value for a 0/1 assignment.
    pub fn activity(&self, selected: &[bool]) -> f64 {
        self.terms
            .iter()
            .filter(|(v, _)| selected.get(*v).copied().unwrap_or(false))
            .map(|(_, c)| c)
            .sum()
    }

    /// Whether the row holds for a 0/1 assignment.
    pub fn is_satisfied(&self, selected: &[bool]) -> bool {
        let lhs = self.activity(selected);
        match self.sense {
            Sense::Le => lhs <= self.rhs + FEASIBILITY_TOLERANCE,
            Sense::Ge => lhs >= self.rhs - FEASIBILITY_TOLERANCE,
            Sense::Eq => (lhs - self.rhs).abs() <= FEASIBILITY_TOLERANCE,
        }
    }
}

/// A maximisation model over binary variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    version: u64,
    variables: Vec<ModelVariable>,
    objective: Vec<f64>,
    rows: Vec<ConstraintRow>,
}

impl LinearModel {
    /// Creates an empty model (version 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Model version; incremented by every patch.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Adds a binary variable with a zero objective coefficient.
    ///
    /// Ids are assigned densely in creation order.
    pub fn add_variable(&mut self, name: impl Into<String>, kind: VariableKind) -> usize {
        self.variables.push(ModelVariable {
            name: name.into(),
            kind,
        });
        self.objective.push(0.0);
        self.variables.len() - 1
    }

    /// Sets the objective coefficient of `variable`. Unknown ids are ignored.
    pub fn set_objective_coefficient(&mut self, variable: usize, coefficient: f64) {
        if let Some(c) = self.objective.get_mut(variable) {
            *c = coefficient;
        }
    }

    /// Appends a row.
    pub fn add_row(&mut self, row: ConstraintRow) {
        self.rows.push(row);
    }

    /// Removes every row for which `remove` returns true.
    pub fn remove_rows(&mut self, mut remove: impl FnMut(&RowFamily) -> bool) {
        self.rows.retain(|r| !remove(&r.family));
    }

    /// All variables, indexed by id.
    pub fn variables(&self) -> &[ModelVariable] {
        &self.variables
    }

    /// Objective coefficients, indexed by variable id.
    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    /// All rows.
    pub fn rows(&self) -> &[ConstraintRow] {
        &self.rows
    }

    /// Rows matching a predicate on their family.
    pub fn rows_where<'a>(
        &'a self,
        mut predicate: impl FnMut(&RowFamily) -> bool + 'a,
    ) -> impl Iterator<Item = &'a ConstraintRow> + 'a {
        self.rows.iter().filter(move |r| predicate(&r.family))
    }

    /// Number of variables.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Objective value of the assignment selecting `selected` ids.
    pub fn evaluate(&self, selected: &[usize]) -> f64 {
        selected
            .iter()
            .filter_map(|&v| self.objective.get(v))
            .sum()
    }

    /// Whether selecting exactly `selected` satisfies every row.
    pub fn is_satisfied_by(&self, selected: &[usize]) -> bool {
        self.violated_rows(selected).is_empty()
    }

    /// Rows violated by selecting exactly `selected`.
    pub fn violated_rows(&self, selected: &[usize]) -> Vec<&ConstraintRow> {
        let mask = self.mask(selected);
        self.rows.iter().filter(|r| !r.is_satisfied(&mask)).collect()
    }

    /// Copy of this model with the version bumped.
    pub(crate) fn next_version(&self) -> Self {
        let mut next = self.clone();
        next.version += 1;
        next
    }

    fn mask(&self, selected: &[usize]) -> Vec<bool> {
        let mut mask = vec![false; self.variables.len()];
        for &v in selected {
            if let Some(m) = mask.get_mut(v) {
                *m = true;
            }
        }
        mask
    }
}
