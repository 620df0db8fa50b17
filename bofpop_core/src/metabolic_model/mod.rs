//! Module providing the Model struct for representing a metabolic model, along with the trial
//! biomass objectives installed on it.

pub mod biomass;
pub mod gene;
pub mod metabolite;
pub mod model;
pub mod reaction;
