//! Core rust implementation of bofpop, a crate for seeding the search for a metabolic model's
//! biomass objective.
//!
//! Starting from a genome scale model, a fixed base biomass and measured gene essentiality,
//! [`population::make_initial_population`] selects the metabolites worth adding to the biomass
//! and samples populations of random biomass compositions the model can produce.

pub mod configuration;
pub mod io;
pub mod metabolic_model;
pub mod optimize;
pub mod population;
pub mod runner;
