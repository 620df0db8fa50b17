//! Module for solving flux balance problems on metabolic models
//!
//! The pipeline only reaches the model through the [`MetabolicNetwork`] and [`Optimizer`]
//! traits, [`fba`] provides the implementation for [`Model`](crate::metabolic_model::model::Model)
//! backed by the `microlp` solver.

pub mod fba;

use indexmap::IndexMap;
use thiserror::Error;

use crate::metabolic_model::biomass::BiomassObjective;
use crate::metabolic_model::gene::GprError;
use crate::runner::CancellationToken;

/// Struct representing the solution to an optimization problem
#[derive(Clone, Debug, PartialEq)]
pub struct ProblemSolution {
    /// The status of the optimization problem, representing if the optimization was
    /// completed successfully
    pub status: OptimizationStatus,
    /// Optimized value of the objective
    ///
    /// Some(f64) if the optimization was completed successfully, None otherwise
    pub objective_value: Option<f64>,
}

impl ProblemSolution {
    pub fn optimal(value: f64) -> Self {
        ProblemSolution {
            status: OptimizationStatus::Optimal,
            objective_value: Some(value),
        }
    }

    pub fn failed(status: OptimizationStatus) -> Self {
        ProblemSolution {
            status,
            objective_value: None,
        }
    }

    /// Was an optimum found
    pub fn is_feasible(&self) -> bool {
        self.status == OptimizationStatus::Optimal && self.objective_value.is_some()
    }

    /// Objective value, with problems that could not be solved counting as zero
    pub fn value_or_zero(&self) -> f64 {
        match (self.status, self.objective_value) {
            (OptimizationStatus::Optimal, Some(value)) => value,
            _ => 0.,
        }
    }
}

/// Status of an optimization problem
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum OptimizationStatus {
    /// Problem has been optimized
    Optimal,
    /// Problem can't be optimized because objective value is not bounded
    Unbounded,
    /// Problem can't be solved because it is infeasible (conflicting constraints)
    Infeasible,
    /// A numerical error occurred during solving
    NumericalError,
}

/// Read access to the structure of a metabolic network
pub trait MetabolicNetwork {
    /// Ids of every metabolite, in model order
    fn metabolite_ids(&self) -> Vec<String>;
    /// Number of reactions referencing the metabolite
    fn metabolite_degree(&self, id: &str) -> usize;
    /// Ids of every gene, in model order
    fn gene_ids(&self) -> Vec<String>;
    fn has_metabolite(&self, id: &str) -> bool;
}

/// Capability to optimize a metabolic network for a trial biomass objective
///
/// Installing an objective mutates the implementor, so concurrent evaluations must each work on
/// their own clone.
pub trait Optimizer {
    /// Replace the active objective with `objective`
    fn install_objective(&mut self, objective: &BiomassObjective) -> Result<(), OptimizeError>;

    /// Optimize the active objective
    fn optimize(&self) -> Result<ProblemSolution, OptimizeError>;

    /// Optimum of the active objective after knocking out each gene in turn
    ///
    /// Knockouts which leave the problem without an optimum report zero.
    fn knockout_simulate(
        &self,
        genes: &[String],
        cancel: &CancellationToken,
    ) -> Result<IndexMap<String, f64>, OptimizeError>;

    /// Install `objective` and optimize it
    fn solve(&mut self, objective: &BiomassObjective) -> Result<ProblemSolution, OptimizeError> {
        self.install_objective(objective)?;
        self.optimize()
    }
}

/// Errors raised while building or solving an optimization problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizeError {
    /// The objective references a metabolite which is not in the network
    #[error("Objective references metabolite {0} which is not in the model")]
    UnknownMetabolite(String),
    /// A knockout targeted a gene which is not in the network
    #[error("Gene {0} is not in the model")]
    UnknownGene(String),
    /// A GPR rule could not be evaluated
    #[error("Unable to evaluate GPR rule")]
    Gpr(#[from] GprError),
    /// A reaction has a lower bound above its upper bound
    #[error("Reaction {0} has a lower bound greater than its upper bound")]
    InvalidBounds(String),
    /// The evaluation was abandoned
    #[error("Optimization was cancelled")]
    Cancelled,
    /// The solver failed in an unexpected way
    #[error("Solver failure: {0}")]
    Solver(String),
}
