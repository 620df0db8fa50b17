//! Scoring metabolites by how well they predict experimental gene essentiality
//!
//! For a candidate metabolite the network is optimized for producing that metabolite alone, and
//! every gene is knocked out in turn. A knockout which leaves growth above the growth threshold
//! predicts a non-essential gene (1), otherwise an essential one (0). The predictions are compared
//! with the measured phenotypes of the genes present in both sources.
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use log::{info, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::metabolic_model::biomass::BiomassObjective;
use crate::optimize::{MetabolicNetwork, OptimizeError, Optimizer};
use crate::population::stats;
use crate::runner::{CancellationToken, TaskRunner};

/// Agreement measure between predicted and measured essentiality
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ScoreMetric {
    /// Fraction of genes with a mismatched phenotype, in [0, 1], lower is better
    HammingDistance,
    /// Matthews correlation coefficient, in [-1, 1], higher is better
    MatthewsCorrelation,
}

impl ScoreMetric {
    pub fn score(self, predicted: &[u8], observed: &[u8]) -> f64 {
        match self {
            ScoreMetric::HammingDistance => hamming_distance(predicted, observed),
            ScoreMetric::MatthewsCorrelation => matthews_correlation(predicted, observed),
        }
    }

    /// Whether lower scores are better
    pub fn lower_is_better(self) -> bool {
        matches!(self, ScoreMetric::HammingDistance)
    }
}

impl FromStr for ScoreMetric {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hd" | "hamming" | "hamming_distance" => Ok(ScoreMetric::HammingDistance),
            "mcc" | "matthews" | "matthews_correlation" => Ok(ScoreMetric::MatthewsCorrelation),
            _ => Err(ScoreError::UnsupportedMetric(s.to_string())),
        }
    }
}

impl TryFrom<String> for ScoreMetric {
    type Error = ScoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Display for ScoreMetric {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoreMetric::HammingDistance => write!(f, "hamming"),
            ScoreMetric::MatthewsCorrelation => write!(f, "mcc"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoreError {
    #[error("Unsupported score metric {0:?}, expected one of hamming or mcc")]
    UnsupportedMetric(String),
}

/// Errors preventing a single metabolite from being scored
#[derive(Debug, Error)]
pub enum EssentialityError {
    #[error("Knockout simulation failed")]
    Optimize(#[from] OptimizeError),
    #[error("No gene of the model has a measured phenotype for metabolite {0}")]
    NoCommonGenes(String),
}

/// Normalized Hamming distance between two binary vectors of equal length
pub fn hamming_distance(predicted: &[u8], observed: &[u8]) -> f64 {
    debug_assert_eq!(predicted.len(), observed.len());
    if predicted.is_empty() {
        return 0.;
    }
    let mismatches = predicted
        .iter()
        .zip(observed)
        .filter(|(p, o)| p != o)
        .count();
    mismatches as f64 / predicted.len() as f64
}

/// Matthews correlation coefficient between two binary vectors of equal length,
/// 0 when it is undefined
///
/// Any non-zero entry counts as 1.
pub fn matthews_correlation(predicted: &[u8], observed: &[u8]) -> f64 {
    debug_assert_eq!(predicted.len(), observed.len());
    debug_assert!(predicted.iter().chain(observed).all(|v| *v <= 1));
    let (mut tp, mut tn, mut fp, mut fn_) = (0f64, 0f64, 0f64, 0f64);
    for (p, o) in predicted.iter().zip(observed) {
        match (*p != 0, *o != 0) {
            (true, true) => tp += 1.,
            (false, false) => tn += 1.,
            (true, false) => fp += 1.,
            (false, true) => fn_ += 1.,
        }
    }
    let denominator = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
    if denominator == 0. {
        return 0.;
    }
    ((tp * tn - fp * fn_) / denominator).clamp(-1., 1.)
}

/// Map growth values to phenotypes, 1 above `threshold`, 0 otherwise
pub fn binarise(values: &IndexMap<String, f64>, threshold: f64) -> IndexMap<String, u8> {
    values
        .iter()
        .map(|(gene, value)| (gene.clone(), u8::from(*value > threshold)))
        .collect()
}

/// Pair up the phenotypes of genes present in both maps, in `predicted` order
pub fn inner_join(
    predicted: &IndexMap<String, u8>,
    observed: &IndexMap<String, u8>,
) -> (Vec<u8>, Vec<u8>) {
    predicted
        .iter()
        .filter_map(|(gene, p)| observed.get(gene).map(|o| (*p, *o)))
        .unzip()
}

/// Predicted phenotype of every gene knockout, with `metabolite` as the sole objective
pub fn predicted_essentiality<M: Optimizer + ?Sized>(
    model: &mut M,
    metabolite: &str,
    genes: &[String],
    growth_threshold: f64,
    cancel: &CancellationToken,
) -> Result<IndexMap<String, u8>, OptimizeError> {
    model.install_objective(&BiomassObjective::single(metabolite))?;
    let growth = model.knockout_simulate(genes, cancel)?;
    Ok(binarise(&growth, growth_threshold))
}

/// Score a single metabolite against the measured phenotypes
pub fn score_metabolite<M: Optimizer + ?Sized>(
    model: &mut M,
    metabolite: &str,
    genes: &[String],
    observed: &IndexMap<String, u8>,
    metric: ScoreMetric,
    growth_threshold: f64,
    cancel: &CancellationToken,
) -> Result<f64, EssentialityError> {
    let predicted = predicted_essentiality(model, metabolite, genes, growth_threshold, cancel)?;
    let (predicted, observed) = inner_join(&predicted, observed);
    if predicted.is_empty() {
        return Err(EssentialityError::NoCommonGenes(metabolite.to_string()));
    }
    Ok(metric.score(&predicted, &observed))
}

/// Score every candidate on its own copy of `model`
///
/// Returns (metabolite, score) for the candidates which could be scored, in input order.
pub fn score_metabolites<M>(
    runner: &TaskRunner,
    model: &M,
    candidates: Vec<String>,
    observed: &IndexMap<String, u8>,
    metric: ScoreMetric,
    growth_threshold: f64,
) -> Vec<(String, f64)>
where
    M: MetabolicNetwork + Optimizer + Clone + Send + 'static,
{
    let genes = model.gene_ids();
    let unmeasured = genes.iter().filter(|g| !observed.contains_key(*g)).count();
    let unmodelled = observed
        .keys()
        .filter(|g| !genes.contains(*g))
        .count();
    if unmeasured > 0 || unmodelled > 0 {
        warn!(
            "Comparing essentiality on common genes only: {unmeasured} model genes have no \
             measurement and {unmodelled} measured genes are not in the model"
        );
    }

    let genes = Arc::new(genes);
    let observed = Arc::new(observed.clone());
    let reports = runner.run(
        model,
        candidates.clone(),
        move |mut model: M, metabolite: String, cancel: &CancellationToken| {
            score_metabolite(
                &mut model,
                &metabolite,
                &genes,
                &observed,
                metric,
                growth_threshold,
                cancel,
            )
        },
    );
    let mut scores: IndexMap<usize, f64> = reports
        .into_iter()
        .filter_map(|r| r.outcome.completed().map(|score| (r.task_id, score)))
        .collect();
    scores.sort_keys();
    scores
        .into_iter()
        .filter_map(|(i, score)| candidates.get(i).map(|id| (id.clone(), score)))
        .collect()
}

/// Keep the metabolites scoring beyond `median + std` in the metric's better direction, best first
///
/// For metrics where lower is better the cut is `median - std`. Fewer than two scores leave the
/// spread undefined, and every scored metabolite is kept.
pub fn select_by_score(scores: Vec<(String, f64)>, metric: ScoreMetric) -> Vec<String> {
    let values: Vec<f64> = scores.iter().map(|(_, s)| *s).collect();
    let total = scores.len();
    let mut selected: Vec<(String, f64)> = if metric.lower_is_better() {
        match stats::lower_spread(&values) {
            Some(cut) => scores.into_iter().filter(|(_, s)| *s < cut).collect(),
            None => scores,
        }
    } else {
        match stats::upper_spread(&values) {
            Some(cut) => scores.into_iter().filter(|(_, s)| *s > cut).collect(),
            None => scores,
        }
    };
    if metric.lower_is_better() {
        selected.sort_by(|a, b| a.1.total_cmp(&b.1));
    } else {
        selected.sort_by(|a, b| b.1.total_cmp(&a.1));
    }
    info!(
        "{} of {total} metabolites score beyond the {metric} cut",
        selected.len()
    );
    selected.into_iter().map(|(id, _)| id).collect()
}
