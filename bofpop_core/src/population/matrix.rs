//! Binary population matrices
//!
//! Rows are the metabolites of the metabolite index, columns are individuals, and each cell
//! records whether the individual includes the metabolite in its biomass composition.
use indexmap::IndexMap;
use thiserror::Error;

/// Binary inclusion vector of a single individual, aligned with a metabolite index
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Composition(Vec<u8>);

impl Composition {
    /// Composition including the metabolites at the given `positions` of an index of `len` entries
    pub fn from_positions(len: usize, positions: &[usize]) -> Self {
        let mut inclusion = vec![0u8; len];
        for &pos in positions {
            if let Some(cell) = inclusion.get_mut(pos) {
                *cell = 1;
            }
        }
        Composition(inclusion)
    }

    /// Wrap an existing inclusion vector, every entry must be 0 or 1
    pub fn from_inclusion(inclusion: Vec<u8>) -> Result<Self, PopulationError> {
        if let Some(value) = inclusion.iter().find(|v| **v > 1) {
            return Err(PopulationError::NonBinaryValue(*value));
        }
        Ok(Composition(inclusion))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of included metabolites
    pub fn count(&self) -> usize {
        self.0.iter().filter(|v| **v == 1).count()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Ids of the included metabolites, in index order
    pub fn included<'a>(&'a self, index: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
        index
            .iter()
            .zip(&self.0)
            .filter(|(_, v)| **v == 1)
            .map(|(id, _)| id.as_str())
    }
}

/// A named set of individuals over a shared metabolite index
#[derive(Clone, Debug, PartialEq)]
pub struct Population {
    index: Vec<String>,
    individuals: IndexMap<String, Composition>,
}

impl Population {
    /// Create an empty population over `index`
    pub fn new(index: Vec<String>) -> Self {
        Population {
            index,
            individuals: IndexMap::new(),
        }
    }

    /// Add an individual, its composition must cover the whole index
    pub fn insert(&mut self, name: String, composition: Composition) -> Result<(), PopulationError> {
        if composition.len() != self.index.len() {
            return Err(PopulationError::LengthMismatch {
                individual: name,
                expected: self.index.len(),
                found: composition.len(),
            });
        }
        if self.individuals.contains_key(&name) {
            return Err(PopulationError::DuplicateIndividual(name));
        }
        self.individuals.insert(name, composition);
        Ok(())
    }

    /// Metabolite ids labelling the rows
    pub fn index(&self) -> &[String] {
        &self.index
    }

    pub fn get(&self, name: &str) -> Option<&Composition> {
        self.individuals.get(name)
    }

    /// Iterate over (individual name, composition) in insertion order
    pub fn individuals(&self) -> impl Iterator<Item = (&str, &Composition)> {
        self.individuals.iter().map(|(name, c)| (name.as_str(), c))
    }

    /// Number of individuals
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PopulationError {
    #[error("Individual {individual} covers {found} metabolites, the index has {expected}")]
    LengthMismatch {
        individual: String,
        expected: usize,
        found: usize,
    },
    #[error("Individual {0} is already part of the population")]
    DuplicateIndividual(String),
    #[error("Population matrices only hold 0 or 1, found {0}")]
    NonBinaryValue(u8),
}
