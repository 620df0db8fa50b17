//! CSV tables consumed and produced by the population pipeline
//!
//! - base biomass: columns `Metabolites` and `Coefficients`
//! - experimental essentiality: columns `Genes` and `Measured_growth`
//! - population matrices: first column `Metabolites`, then one 0/1 column per individual
use std::fs::File;
use std::path::Path;

use indexmap::IndexMap;
use log::debug;
use polars::prelude::*;
use thiserror::Error;

use crate::metabolic_model::biomass::{BaseBiomass, BiomassError};
use crate::population::matrix::{Composition, Population, PopulationError};

pub const METABOLITE_COLUMN: &str = "Metabolites";
pub const COEFFICIENT_COLUMN: &str = "Coefficients";
pub const GENE_COLUMN: &str = "Genes";
pub const GROWTH_COLUMN: &str = "Measured_growth";

/// Read the fixed base biomass composition
pub fn read_base_biomass<P: AsRef<Path>>(path: P) -> Result<BaseBiomass, TableError> {
    let df = load(path.as_ref())?;
    let coefficients = keyed_values(&df, METABOLITE_COLUMN, COEFFICIENT_COLUMN)?;
    Ok(BaseBiomass::new(coefficients)?)
}

/// Read experimental essentiality, mapping gene ids to measured growth
pub fn read_essentiality<P: AsRef<Path>>(path: P) -> Result<IndexMap<String, f64>, TableError> {
    let df = load(path.as_ref())?;
    keyed_values(&df, GENE_COLUMN, GROWTH_COLUMN)
}

/// Write a population matrix
pub fn write_population<P: AsRef<Path>>(path: P, population: &Population) -> Result<(), TableError> {
    let mut columns = Vec::with_capacity(population.len() + 1);
    columns.push(Column::new(
        METABOLITE_COLUMN.into(),
        population.index().to_vec(),
    ));
    for (name, composition) in population.individuals() {
        let values: Vec<i32> = composition.as_slice().iter().map(|v| *v as i32).collect();
        columns.push(Column::new(name.into(), values));
    }
    let mut df = DataFrame::new(columns)?;
    let mut file = File::create(path.as_ref())?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    debug!(
        "Wrote {} individuals over {} metabolites to {}",
        population.len(),
        population.index().len(),
        path.as_ref().display()
    );
    Ok(())
}

/// Read a population matrix written by [`write_population`]
pub fn read_population<P: AsRef<Path>>(path: P) -> Result<Population, TableError> {
    let df = load(path.as_ref())?;
    let index = string_column(&df, METABOLITE_COLUMN)?;
    let mut population = Population::new(index);
    for column in df.get_columns() {
        if column.name().as_str() == METABOLITE_COLUMN {
            continue;
        }
        let name = column.name().to_string();
        let values = column.as_materialized_series().cast(&DataType::Int64)?;
        let inclusion = values
            .i64()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| match v {
                Some(v @ 0..=1) => Ok(v as u8),
                Some(other) => Err(TableError::InvalidValue {
                    column: name.clone(),
                    row,
                    value: other.to_string(),
                }),
                None => Err(TableError::MissingValue {
                    column: name.clone(),
                    row,
                }),
            })
            .collect::<Result<Vec<u8>, TableError>>()?;
        population.insert(name, Composition::from_inclusion(inclusion)?)?;
    }
    Ok(population)
}

fn load(path: &Path) -> Result<DataFrame, TableError> {
    Ok(CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?)
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<String>, TableError> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    series
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| TableError::MissingValue {
                    column: name.to_string(),
                    row,
                })
        })
        .collect()
}

fn keyed_values(
    df: &DataFrame,
    key_column: &str,
    value_column: &str,
) -> Result<IndexMap<String, f64>, TableError> {
    let keys = string_column(df, key_column)?;
    let values = df
        .column(value_column)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let mut table = IndexMap::with_capacity(keys.len());
    for (row, (key, value)) in keys.into_iter().zip(values.f64()?.into_iter()).enumerate() {
        let value = value.ok_or_else(|| TableError::MissingValue {
            column: value_column.to_string(),
            row,
        })?;
        if table.contains_key(&key) {
            return Err(TableError::DuplicateId(key));
        }
        table.insert(key, value);
    }
    Ok(table)
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Unable to read or write table")]
    Polars(#[from] PolarsError),
    #[error("Unable to access file")]
    Io(#[from] std::io::Error),
    #[error("Invalid base biomass")]
    Biomass(#[from] BiomassError),
    #[error("Invalid population matrix")]
    Population(#[from] PopulationError),
    #[error("Column {column} is missing a value in row {row}")]
    MissingValue { column: String, row: usize },
    #[error("Column {column} holds invalid value {value} in row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },
    #[error("Id {0} appears more than once")]
    DuplicateId(String),
}
