//! This module provides the Model struct for representing an entire metabolic model
use crate::metabolic_model::biomass::BiomassObjective;
use crate::metabolic_model::gene::{Gene, GeneActivity, GprError};
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::reaction::{Reaction, ReactionActivity};

use indexmap::{IndexMap, IndexSet};

/// Represents a Genome Scale Metabolic Model
#[derive(Clone, Debug)]
pub struct Model {
    /// Map of reaction ids to Reactions
    pub reactions: IndexMap<String, Reaction>,
    /// Map of gene ids to Genes
    pub genes: IndexMap<String, Gene>,
    /// Map of metabolite ids to Metabolites
    pub metabolites: IndexMap<String, Metabolite>,
    /// Map of reaction ids to objective function coefficients
    pub objective: IndexMap<String, f64>,
    /// Id associated with the Model
    pub id: Option<String>,
    /// Compartments in the model
    ///
    /// An IndexMap<String, String> of {short name: long name}
    pub compartments: Option<IndexMap<String, String>>,
    /// A version identifier for the Model, stored as a string
    pub version: Option<String>,
}

impl Model {
    pub fn new_empty() -> Self {
        Model {
            reactions: IndexMap::new(),
            genes: IndexMap::new(),
            metabolites: IndexMap::new(),
            objective: IndexMap::new(),
            id: None,
            compartments: None,
            version: None,
        }
    }

    /// Add a reaction to the model
    ///
    /// Metabolites in the reaction's stoichiometry which are not yet part of the model are
    /// added as well.
    ///
    /// # Examples
    /// ```rust
    /// use bofpop_core::metabolic_model::model::Model;
    /// use bofpop_core::metabolic_model::reaction::ReactionBuilder;
    /// let mut model = Model::new_empty();
    /// let new_reaction = ReactionBuilder::default().id("new_reaction".to_string()).build().unwrap();
    /// model.add_reaction(new_reaction);
    /// assert_eq!(model.reactions.len(), 1);
    /// ```
    pub fn add_reaction(&mut self, reaction: Reaction) {
        for met in reaction.metabolites.keys() {
            if !self.metabolites.contains_key(met) {
                self.metabolites
                    .insert(met.clone(), Metabolite::new(met));
            }
        }
        let id = reaction.id.clone();
        self.reactions.insert(id, reaction);
    }

    /// Add a gene to the model
    pub fn add_gene(&mut self, gene: Gene) {
        let id = gene.id.clone();
        self.genes.insert(id, gene);
    }

    /// Add a metabolite to the model
    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        let id = metabolite.id.clone();
        self.metabolites.insert(id, metabolite);
    }

    /// Remove a reaction (and its objective coefficient) from the model
    pub fn remove_reaction(&mut self, id: &str) -> Option<Reaction> {
        self.objective.shift_remove(id);
        self.reactions.shift_remove(id)
    }

    /// Number of reactions in which the metabolite participates
    pub fn metabolite_degree(&self, id: &str) -> usize {
        self.reactions
            .values()
            .filter(|rxn| rxn.references(id))
            .count()
    }

    /// Reactions with a non-zero objective coefficient
    pub fn objective_reactions(&self) -> Vec<&str> {
        self.objective
            .iter()
            .filter(|(_, coef)| **coef != 0.)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Replace the current objective with a trial biomass reaction
    ///
    /// Every reaction currently in the objective is removed from the model, then the trial
    /// reaction is added and made the only objective term.
    pub fn install_biomass_objective(&mut self, objective: &BiomassObjective) {
        let current: Vec<String> = self
            .objective_reactions()
            .into_iter()
            .map(String::from)
            .collect();
        for id in current {
            self.remove_reaction(&id);
        }
        self.objective.clear();
        let reaction = objective.to_reaction();
        let id = reaction.id.clone();
        self.remove_reaction(&id);
        self.add_reaction(reaction);
        self.objective.insert(id, objective.objective_coefficient());
    }

    /// Ids of reactions which are disabled when every gene in `knocked_out` is inactive
    ///
    /// Genes already marked inactive in the model stay inactive.
    pub fn reactions_disabled_by(
        &self,
        knocked_out: &[&str],
    ) -> Result<IndexSet<String>, GprError> {
        let activity = |id: &str| -> Option<GeneActivity> {
            if knocked_out.iter().any(|g| *g == id) {
                return Some(GeneActivity::Inactive);
            }
            self.genes.get(id).map(|g| g.activity)
        };
        let mut disabled = IndexSet::new();
        for (id, rxn) in &self.reactions {
            let Some(gpr) = &rxn.gpr else {
                continue;
            };
            if !knocked_out.iter().any(|g| gpr.references(g)) {
                continue;
            }
            if ReactionActivity::from(gpr.eval(&activity)?) == ReactionActivity::Inactive {
                disabled.insert(id.clone());
            }
        }
        Ok(disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::biomass::BIOMASS_REACTION_ID;
    use crate::metabolic_model::gene::Gpr;
    use crate::metabolic_model::reaction::ReactionBuilder;

    fn setup_model() -> Model {
        let mut model = Model::new_empty();
        model.add_gene(Gene::new("g1"));
        model.add_gene(Gene::new("g2"));
        let mut r1 = IndexMap::new();
        r1.insert("a".to_string(), -1.);
        r1.insert("b".to_string(), 1.);
        model.add_reaction(
            ReactionBuilder::default()
                .id("R1".to_string())
                .metabolites(r1)
                .gpr(Some(Gpr::or(Gpr::gene("g1"), Gpr::gene("g2"))))
                .build()
                .unwrap(),
        );
        let mut r2 = IndexMap::new();
        r2.insert("b".to_string(), -1.);
        r2.insert("c".to_string(), 1.);
        model.add_reaction(
            ReactionBuilder::default()
                .id("R2".to_string())
                .metabolites(r2)
                .gpr(Some(Gpr::gene("g1")))
                .build()
                .unwrap(),
        );
        let mut old_biomass = IndexMap::new();
        old_biomass.insert("c".to_string(), -1.);
        model.add_reaction(
            ReactionBuilder::default()
                .id("old_biomass".to_string())
                .metabolites(old_biomass)
                .build()
                .unwrap(),
        );
        model.objective.insert("old_biomass".to_string(), 1.);
        model
    }

    #[test]
    fn adding_reactions_registers_metabolites() {
        let model = setup_model();
        assert_eq!(model.metabolites.len(), 3);
        assert!(model.metabolites.contains_key("b"));
    }

    #[test]
    fn degree() {
        let model = setup_model();
        assert_eq!(model.metabolite_degree("a"), 1);
        assert_eq!(model.metabolite_degree("b"), 2);
        assert_eq!(model.metabolite_degree("c"), 2);
        assert_eq!(model.metabolite_degree("missing"), 0);
    }

    #[test]
    fn install_objective_replaces_old_biomass() {
        let mut model = setup_model();
        model.install_biomass_objective(&BiomassObjective::single("b"));
        assert!(!model.reactions.contains_key("old_biomass"));
        assert_eq!(model.objective_reactions(), vec![BIOMASS_REACTION_ID]);
        // Installing a second objective replaces the first
        model.install_biomass_objective(&BiomassObjective::single("c"));
        assert_eq!(model.objective.len(), 1);
        let biomass = model.reactions.get(BIOMASS_REACTION_ID).unwrap();
        assert!(biomass.references("c"));
        assert!(!biomass.references("b"));
    }

    #[test]
    fn knockouts_follow_gpr() {
        let model = setup_model();
        let disabled = model.reactions_disabled_by(&["g2"]).unwrap();
        assert!(disabled.is_empty());
        let disabled = model.reactions_disabled_by(&["g1"]).unwrap();
        assert_eq!(disabled.len(), 1);
        assert!(disabled.contains("R2"));
        let disabled = model.reactions_disabled_by(&["g1", "g2"]).unwrap();
        assert_eq!(disabled.len(), 2);
    }
}
