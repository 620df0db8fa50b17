//! Module providing JSON input for bofpop Models, in the format written by COBRA tools
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::io::gpr_parse::{parse_gpr, GprParseError};
use crate::metabolic_model::gene::{Gene, GeneActivity};
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::{ReactionBuilder, ReactionBuilderError};

// region JSON Model
/// Represents a JSON serialized model
#[derive(Deserialize)]
struct JsonModel {
    metabolites: Vec<JsonMetabolite>,
    reactions: Vec<JsonReaction>,
    #[serde(default)]
    genes: Vec<JsonGene>,
    id: Option<String>,
    compartments: Option<IndexMap<String, String>>,
    version: Option<Value>,
}

#[derive(Deserialize)]
struct JsonMetabolite {
    id: String,
    name: Option<String>,
    compartment: Option<String>,
    charge: Option<i32>,
    formula: Option<String>,
}

#[derive(Deserialize)]
struct JsonReaction {
    id: String,
    name: Option<String>,
    metabolites: IndexMap<String, f64>,
    lower_bound: f64,
    upper_bound: f64,
    #[serde(default)]
    gene_reaction_rule: String,
    objective_coefficient: Option<f64>,
    subsystem: Option<String>,
}

#[derive(Deserialize)]
struct JsonGene {
    id: String,
    name: Option<String>,
}
// endregion JSON Model

// region Conversions
impl From<JsonGene> for Gene {
    fn from(g: JsonGene) -> Self {
        Self {
            id: g.id,
            name: g.name,
            activity: GeneActivity::Active, // All genes start as active
        }
    }
}

impl From<JsonMetabolite> for Metabolite {
    fn from(m: JsonMetabolite) -> Self {
        Self {
            id: m.id,
            name: m.name,
            compartment: m.compartment,
            charge: m.charge.unwrap_or_default(),
            formula: m.formula,
        }
    }
}

impl Model {
    /// Read a model from a COBRA JSON file
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Model, JsonError> {
        let model_str = fs::read_to_string(path)?;
        Model::from_json_str(&model_str)
    }

    /// Build a model from the contents of a COBRA JSON file
    pub fn from_json_str(model_str: &str) -> Result<Model, JsonError> {
        let json_model: JsonModel = serde_json::from_str(model_str)?;
        Model::from_json(json_model)
    }

    fn from_json(json_model: JsonModel) -> Result<Self, JsonError> {
        let mut model = Model::new_empty();
        json_model.genes.into_iter().for_each(|g| {
            model.add_gene(Gene::from(g));
        });
        json_model.metabolites.into_iter().for_each(|m| {
            model.add_metabolite(Metabolite::from(m));
        });
        /* Now, iterate through the reactions, parsing GPRs, and adding to
        the objective along the way
        */
        for rxn in json_model.reactions {
            let gpr = if !rxn.gene_reaction_rule.trim().is_empty() {
                Some(parse_gpr(&rxn.gene_reaction_rule, &mut model.genes).map_err(|source| {
                    JsonError::GprParserError {
                        reaction: rxn.id.clone(),
                        source,
                    }
                })?)
            } else {
                None
            };
            let new_reaction = ReactionBuilder::default()
                .id(rxn.id.clone())
                .metabolites(rxn.metabolites)
                .name(rxn.name)
                .gpr(gpr)
                .lower_bound(rxn.lower_bound)
                .upper_bound(rxn.upper_bound)
                .subsystem(rxn.subsystem)
                .build()?;
            model.add_reaction(new_reaction);
            // Add the reaction to the objective function if desired
            if let Some(coef) = rxn.objective_coefficient {
                if coef != 0. {
                    model.objective.insert(rxn.id, coef);
                }
            }
        }
        model.id = json_model.id;
        model.compartments = json_model.compartments;
        model.version = json_model.version.map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        });
        Ok(model)
    }
}

#[derive(Error, Debug)]
pub enum JsonError {
    #[error("Unable to parse the GPR rule of reaction {reaction}")]
    GprParserError {
        reaction: String,
        source: GprParseError,
    },
    #[error("Unable to read file")]
    UnableToRead(#[from] std::io::Error),
    #[error("Unable to parse json")]
    UnableToParse(#[from] serde_json::Error),
    #[error("Unable to build reaction")]
    UnableToBuildReaction(#[from] ReactionBuilderError),
}

// endregion Conversions

#[cfg(test)]
mod json_tests {
    use super::*;
    use crate::metabolic_model::gene::Gpr;

    const TOY_MODEL: &str = r#"{
"id": "toy",
"version": "1",
"compartments": {"c": "cytosol", "e": "extracellular"},
"metabolites": [
    {"id": "glc__D_e", "name": "D-Glucose", "compartment": "e", "charge": 0, "formula": "C6H12O6",
     "notes": {"original_bigg_ids": ["glc_D_e"]}},
    {"id": "g6p_c", "compartment": "c"}
],
"reactions": [
    {"id": "EX_glc__D_e", "metabolites": {"glc__D_e": -1.0}, "lower_bound": -10.0,
     "upper_bound": 1000.0, "gene_reaction_rule": ""},
    {"id": "HEX1", "name": "Hexokinase", "metabolites": {"glc__D_e": -1.0, "g6p_c": 1.0},
     "lower_bound": 0.0, "upper_bound": 1000.0, "gene_reaction_rule": "b0001 or (b0002 and b0003)",
     "subsystem": "Glycolysis"},
    {"id": "BIOMASS_toy", "metabolites": {"g6p_c": -1.0}, "lower_bound": 0.0,
     "upper_bound": 1000.0, "gene_reaction_rule": "", "objective_coefficient": 1.0}
],
"genes": [{"id": "b0001", "name": "glk"}]
}"#;

    #[test]
    fn read_model() {
        let model = Model::from_json_str(TOY_MODEL).unwrap();
        assert_eq!(model.id.as_deref(), Some("toy"));
        assert_eq!(model.version.as_deref(), Some("1"));
        assert_eq!(model.metabolites.len(), 2);
        assert_eq!(model.reactions.len(), 3);
        // Genes only referenced in GPRs are added as well
        assert_eq!(model.genes.len(), 3);
        assert_eq!(model.genes["b0001"].name.as_deref(), Some("glk"));
        assert_eq!(model.genes["b0002"].name, None);
        assert_eq!(model.objective_reactions(), vec!["BIOMASS_toy"]);
        let hex1 = model.reactions.get("HEX1").unwrap();
        assert_eq!(
            hex1.gpr,
            Some(Gpr::or(
                Gpr::gene("b0001"),
                Gpr::and(Gpr::gene("b0002"), Gpr::gene("b0003"))
            ))
        );
        assert_eq!(hex1.subsystem.as_deref(), Some("Glycolysis"));
        let glc = model.metabolites.get("glc__D_e").unwrap();
        assert_eq!(glc.formula.as_deref(), Some("C6H12O6"));
    }

    #[test]
    fn unparenthesised_rule_keeps_isozyme() {
        let flat = TOY_MODEL.replace("b0001 or (b0002 and b0003)", "b0001 or b0002 and b0003");
        let model = Model::from_json_str(&flat).unwrap();
        // b0001 alone still catalyses HEX1
        assert!(model.reactions_disabled_by(&["b0003"]).unwrap().is_empty());
        let disabled = model.reactions_disabled_by(&["b0001", "b0003"]).unwrap();
        assert!(disabled.contains("HEX1"));
    }

    #[test]
    fn bad_gpr_names_the_reaction() {
        let bad = TOY_MODEL.replace("b0001 or (b0002 and b0003)", "b0001 or (b0002");
        match Model::from_json_str(&bad) {
            Err(JsonError::GprParserError { reaction, .. }) => assert_eq!(reaction, "HEX1"),
            Err(other) => panic!("Unexpected error {other}"),
            Ok(_) => panic!("Malformed GPR was accepted"),
        }
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            Model::read_json("/definitely/not/a/model.json"),
            Err(JsonError::UnableToRead(_))
        ));
    }
}
