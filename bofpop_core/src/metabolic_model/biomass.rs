//! Trial biomass objectives and the fixed base biomass composition
use indexmap::IndexMap;
use thiserror::Error;

use crate::configuration::Configuration;
use crate::metabolic_model::reaction::{Reaction, ReactionActivity};

/// Id of the reaction installed as the model objective by [`BiomassObjective`]
pub const BIOMASS_REACTION_ID: &str = "BIOMASS";

/// Fixed biomass composition, mapping metabolite ids to stoichiometric coefficients
///
/// Never altered by the pipeline, and its metabolites are never part of the search space.
#[derive(Clone, Debug, PartialEq)]
pub struct BaseBiomass {
    coefficients: IndexMap<String, f64>,
}

impl BaseBiomass {
    /// Validate and wrap a base biomass composition
    ///
    /// The composition must be non-empty, and every coefficient finite and non-zero.
    pub fn new(coefficients: IndexMap<String, f64>) -> Result<Self, BiomassError> {
        if coefficients.is_empty() {
            return Err(BiomassError::EmptyComposition);
        }
        for (id, coef) in &coefficients {
            validate_term(id, *coef)?;
        }
        Ok(BaseBiomass { coefficients })
    }

    pub fn contains(&self, metabolite: &str) -> bool {
        self.coefficients.contains_key(metabolite)
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Iterate over (metabolite id, coefficient) pairs in input order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.coefficients.iter().map(|(id, coef)| (id.as_str(), *coef))
    }
}

/// A trial objective reaction, consuming a set of metabolites
///
/// Every stoichiometric coefficient is strictly negative, and the reaction is the sole term of
/// the objective, with a coefficient of 1.
#[derive(Clone, Debug, PartialEq)]
pub struct BiomassObjective {
    stoichiometry: IndexMap<String, f64>,
}

impl BiomassObjective {
    /// Objective consuming a single metabolite with a coefficient of -1
    pub fn single(metabolite: &str) -> Self {
        let mut stoichiometry = IndexMap::new();
        stoichiometry.insert(metabolite.to_string(), -1.);
        BiomassObjective { stoichiometry }
    }

    /// Build an objective from explicit coefficients, forcing every coefficient negative
    pub fn from_coefficients<'a, I>(coefficients: I) -> Result<Self, BiomassError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut stoichiometry = IndexMap::new();
        for (id, coef) in coefficients {
            validate_term(id, coef)?;
            stoichiometry.insert(id.to_string(), -coef.abs());
        }
        if stoichiometry.is_empty() {
            return Err(BiomassError::EmptyComposition);
        }
        Ok(BiomassObjective { stoichiometry })
    }

    /// Merge the base biomass with newly `included` metabolites, each at `coefficient`
    pub fn from_composition<'a, I>(
        base: &BaseBiomass,
        included: I,
        coefficient: f64,
    ) -> Result<Self, BiomassError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::from_coefficients(
            base.iter()
                .chain(included.into_iter().map(|id| (id, coefficient))),
        )
    }

    /// Stoichiometry of the objective reaction
    pub fn stoichiometry(&self) -> &IndexMap<String, f64> {
        &self.stoichiometry
    }

    /// Coefficient of the objective reaction in the objective function
    pub fn objective_coefficient(&self) -> f64 {
        1.
    }

    /// Convert into a reaction that can be added to a model
    ///
    /// The reaction is irreversible, with the default upper bound from the configuration.
    pub fn to_reaction(&self) -> Reaction {
        Reaction {
            id: BIOMASS_REACTION_ID.to_string(),
            metabolites: self.stoichiometry.clone(),
            name: Some("Trial biomass objective".to_string()),
            gpr: None,
            lower_bound: 0.,
            upper_bound: Configuration::current().upper_bound,
            subsystem: None,
            activity: ReactionActivity::Active,
        }
    }
}

fn validate_term(id: &str, coef: f64) -> Result<(), BiomassError> {
    if id.is_empty() {
        return Err(BiomassError::EmptyMetaboliteId);
    }
    if !coef.is_finite() || coef == 0. {
        return Err(BiomassError::InvalidCoefficient {
            metabolite: id.to_string(),
            value: coef,
        });
    }
    Ok(())
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BiomassError {
    #[error("Biomass composition contains no metabolites")]
    EmptyComposition,
    #[error("Biomass composition contains an empty metabolite id")]
    EmptyMetaboliteId,
    #[error("Metabolite {metabolite} has invalid coefficient {value}")]
    InvalidCoefficient { metabolite: String, value: f64 },
}
