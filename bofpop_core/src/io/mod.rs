//! Module for reading models and the tables exchanged with the population pipeline
pub mod gpr_parse;
pub mod json;
pub mod tables;
