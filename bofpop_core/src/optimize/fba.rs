//! Flux balance analysis of a [`Model`], solved with `microlp`
//!
//! One variable is created per reaction, bounded by the reaction's flux bounds, and one
//! steady state equality constraint per metabolite participating in any reaction. The objective
//! is maximized.
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};
use microlp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem, Variable};

use crate::configuration::Configuration;
use crate::metabolic_model::biomass::BiomassObjective;
use crate::metabolic_model::model::Model;
use crate::optimize::{
    MetabolicNetwork, OptimizationStatus, OptimizeError, Optimizer, ProblemSolution,
};
use crate::runner::CancellationToken;

impl Model {
    /// Solve the flux balance problem with every reaction in `disabled` fixed at zero flux
    pub fn optimize_with_disabled(
        &self,
        disabled: &IndexSet<String>,
    ) -> Result<ProblemSolution, OptimizeError> {
        let mut problem = Problem::new(OptimizationDirection::Maximize);
        let mut variables: Vec<Variable> = Vec::with_capacity(self.reactions.len());
        for (id, rxn) in &self.reactions {
            let (lb, ub) = if disabled.contains(id) {
                (0., 0.)
            } else {
                rxn.flux_bounds()
            };
            if lb > ub {
                return Err(OptimizeError::InvalidBounds(id.clone()));
            }
            let coef = self.objective.get(id).copied().unwrap_or(0.);
            variables.push(problem.add_var(coef, (lb, ub)));
        }

        // Steady state mass balance for every metabolite
        let mut balances: IndexMap<&str, LinearExpr> = IndexMap::new();
        for (rxn, var) in self.reactions.values().zip(&variables) {
            for (met, coef) in &rxn.metabolites {
                if *coef == 0. {
                    continue;
                }
                balances
                    .entry(met.as_str())
                    .or_insert_with(LinearExpr::empty)
                    .add(*var, *coef);
            }
        }
        for (_, expr) in balances {
            problem.add_constraint(expr, ComparisonOp::Eq, 0.);
        }

        match problem.solve() {
            Ok(solution) => {
                let mut value = solution.objective();
                // Solver noise around zero
                if value.abs() < Configuration::current().tolerance {
                    value = 0.;
                }
                trace!("Optimal objective value {value}");
                Ok(ProblemSolution::optimal(value))
            }
            Err(microlp::Error::Infeasible) => {
                Ok(ProblemSolution::failed(OptimizationStatus::Infeasible))
            }
            Err(microlp::Error::Unbounded) => {
                Ok(ProblemSolution::failed(OptimizationStatus::Unbounded))
            }
            #[allow(unreachable_patterns)]
            Err(err) => {
                debug!("Solver reported a numerical failure: {err}");
                Ok(ProblemSolution::failed(OptimizationStatus::NumericalError))
            }
        }
    }
}

impl MetabolicNetwork for Model {
    fn metabolite_ids(&self) -> Vec<String> {
        self.metabolites.keys().cloned().collect()
    }

    fn metabolite_degree(&self, id: &str) -> usize {
        Model::metabolite_degree(self, id)
    }

    fn gene_ids(&self) -> Vec<String> {
        self.genes.keys().cloned().collect()
    }

    fn has_metabolite(&self, id: &str) -> bool {
        self.metabolites.contains_key(id)
    }
}

impl Optimizer for Model {
    fn install_objective(&mut self, objective: &BiomassObjective) -> Result<(), OptimizeError> {
        if let Some(missing) = objective
            .stoichiometry()
            .keys()
            .find(|id| !self.metabolites.contains_key(*id))
        {
            return Err(OptimizeError::UnknownMetabolite(missing.clone()));
        }
        self.install_biomass_objective(objective);
        Ok(())
    }

    fn optimize(&self) -> Result<ProblemSolution, OptimizeError> {
        self.optimize_with_disabled(&IndexSet::new())
    }

    fn knockout_simulate(
        &self,
        genes: &[String],
        cancel: &CancellationToken,
    ) -> Result<IndexMap<String, f64>, OptimizeError> {
        let mut wild_type: Option<f64> = None;
        let mut results = IndexMap::with_capacity(genes.len());
        for gene in genes {
            if cancel.is_cancelled() {
                return Err(OptimizeError::Cancelled);
            }
            if !self.genes.contains_key(gene) {
                return Err(OptimizeError::UnknownGene(gene.clone()));
            }
            let disabled = self.reactions_disabled_by(&[gene.as_str()])?;
            let value = if disabled.is_empty() {
                // Knockout has no effect on the network
                match wild_type {
                    Some(value) => value,
                    None => {
                        let value = self.optimize()?.value_or_zero();
                        wild_type = Some(value);
                        value
                    }
                }
            } else {
                self.optimize_with_disabled(&disabled)?.value_or_zero()
            };
            results.insert(gene.clone(), value);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::gene::{Gene, Gpr};
    use crate::metabolic_model::reaction::{Reaction, ReactionBuilder};

    fn reaction(
        id: &str,
        stoichiometry: &[(&str, f64)],
        bounds: (f64, f64),
        gpr: Option<Gpr>,
    ) -> Reaction {
        ReactionBuilder::default()
            .id(id.to_string())
            .metabolites(
                stoichiometry
                    .iter()
                    .map(|(m, c)| (m.to_string(), *c))
                    .collect(),
            )
            .lower_bound(bounds.0)
            .upper_bound(bounds.1)
            .gpr(gpr)
            .build()
            .unwrap()
    }

    /// a is taken up (at most 10), converted to b by R1 (g1), b to c by R2 (g2 or g3),
    /// d is only ever consumed
    fn toy_model() -> Model {
        let mut model = Model::new_empty();
        for g in ["g1", "g2", "g3"] {
            model.add_gene(Gene::new(g));
        }
        model.add_reaction(reaction("EX_a", &[("a", 1.)], (0., 10.), None));
        model.add_reaction(reaction(
            "R1",
            &[("a", -1.), ("b", 1.)],
            (0., 1000.),
            Some(Gpr::gene("g1")),
        ));
        model.add_reaction(reaction(
            "R2",
            &[("b", -1.), ("c", 1.)],
            (0., 1000.),
            Some(Gpr::or(Gpr::gene("g2"), Gpr::gene("g3"))),
        ));
        model.add_reaction(reaction("R3", &[("d", -1.), ("e", 1.)], (0., 1000.), None));
        model
    }

    #[test]
    fn producible_metabolite_has_positive_optimum() {
        let mut model = toy_model();
        let solution = model.solve(&BiomassObjective::single("c")).unwrap();
        assert!(solution.is_feasible());
        assert!((solution.value_or_zero() - 10.).abs() < 1e-6);
    }

    #[test]
    fn unproducible_metabolite_has_zero_optimum() {
        let mut model = toy_model();
        let solution = model.solve(&BiomassObjective::single("d")).unwrap();
        assert!(solution.value_or_zero() <= 1e-9);
    }

    #[test]
    fn unknown_metabolite_is_rejected() {
        let mut model = toy_model();
        assert_eq!(
            model.solve(&BiomassObjective::single("zzz")),
            Err(OptimizeError::UnknownMetabolite("zzz".to_string()))
        );
    }

    #[test]
    fn knockouts() {
        let mut model = toy_model();
        model
            .install_objective(&BiomassObjective::single("c"))
            .unwrap();
        let genes = model.gene_ids();
        let results = model
            .knockout_simulate(&genes, &CancellationToken::new())
            .unwrap();
        assert!(results["g1"].abs() < 1e-6);
        assert!((results["g2"] - 10.).abs() < 1e-6);
        assert!((results["g3"] - 10.).abs() < 1e-6);
    }

    #[test]
    fn cancelled_knockouts_stop() {
        let mut model = toy_model();
        model
            .install_objective(&BiomassObjective::single("c"))
            .unwrap();
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(
            model.knockout_simulate(&model.gene_ids(), &token),
            Err(OptimizeError::Cancelled)
        );
    }

    #[test]
    fn network_view() {
        let model = toy_model();
        assert_eq!(MetabolicNetwork::metabolite_degree(&model, "b"), 2);
        assert!(model.has_metabolite("e"));
        assert_eq!(model.gene_ids(), vec!["g1", "g2", "g3"]);
    }
}
