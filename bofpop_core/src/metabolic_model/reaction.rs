//! This module provides a struct for representing reactions
use crate::configuration::Configuration;
use crate::metabolic_model::gene::{GeneActivity, Gpr};
use derive_builder::Builder;
use indexmap::IndexMap;

/// Represents a reaction in the metabolic model
#[derive(Builder, Debug, Clone)]
pub struct Reaction {
    /// Used to identify the reaction
    pub id: String,
    /// Metabolite stoichiometry of the reaction
    #[builder(default = "IndexMap::new()")]
    pub metabolites: IndexMap<String, f64>,
    /// Human-readable reaction name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Gene Protein Reaction rule to determine if reaction is active
    #[builder(default = "None")]
    pub gpr: Option<Gpr>,
    /// Lower flux bound
    #[builder(default = "Configuration::current().lower_bound")]
    pub lower_bound: f64,
    /// Upper flux bound
    #[builder(default = "Configuration::current().upper_bound")]
    pub upper_bound: f64,
    /// Reaction subsystem
    #[builder(default = "None")]
    pub subsystem: Option<String>,
    /// Reaction Activity
    #[builder(default = "ReactionActivity::Active")]
    pub activity: ReactionActivity,
}

impl Reaction {
    /// Does the reaction's stoichiometry include `metabolite`
    pub fn references(&self, metabolite: &str) -> bool {
        self.metabolites.contains_key(metabolite)
    }

    /// Flux bounds used in the optimization problem
    ///
    /// Inactive reactions are fixed at zero flux.
    pub fn flux_bounds(&self) -> (f64, f64) {
        match self.activity {
            ReactionActivity::Active => (self.lower_bound, self.upper_bound),
            ReactionActivity::Inactive => (0f64, 0f64),
        }
    }
}

/// Whether a Reaction is active or inactive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReactionActivity {
    /// The Reaction is active and can carry flux
    Active,
    /// The Reaction is inactive and can't carry flux
    Inactive,
}

impl From<GeneActivity> for ReactionActivity {
    fn from(value: GeneActivity) -> Self {
        match value {
            GeneActivity::Active => ReactionActivity::Active,
            GeneActivity::Inactive => ReactionActivity::Inactive,
        }
    }
}
