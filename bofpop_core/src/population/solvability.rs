//! Production tests: can the network produce a metabolite, or a whole trial composition
use indexmap::IndexSet;
use log::info;

use crate::metabolic_model::biomass::BiomassObjective;
use crate::optimize::{OptimizeError, Optimizer};
use crate::runner::{CancellationToken, TaskOutcome, TaskRunner};

/// Install `objective` and check that its optimum is strictly above `threshold`
///
/// Problems without an optimum are simply not feasible.
pub fn objective_is_feasible<M: Optimizer + ?Sized>(
    model: &mut M,
    objective: &BiomassObjective,
    threshold: f64,
) -> Result<bool, OptimizeError> {
    let solution = model.solve(objective)?;
    Ok(solution.is_feasible() && solution.value_or_zero() > threshold)
}

/// Can the network produce `metabolite` on its own
pub fn is_solvable<M: Optimizer + ?Sized>(
    model: &mut M,
    metabolite: &str,
    threshold: f64,
) -> Result<bool, OptimizeError> {
    objective_is_feasible(model, &BiomassObjective::single(metabolite), threshold)
}

/// Keep the producible metabolites of `candidates`, in their input order
///
/// Every test runs on its own copy of `model`. Tests which time out, crash or fail exclude
/// their metabolite.
pub fn filter_solvable<M>(
    runner: &TaskRunner,
    model: &M,
    candidates: Vec<String>,
    threshold: f64,
) -> Vec<String>
where
    M: Optimizer + Clone + Send + 'static,
{
    let reports = runner.run(
        model,
        candidates.clone(),
        move |mut model: M, metabolite: String, _cancel: &CancellationToken| {
            is_solvable(&mut model, &metabolite, threshold)
        },
    );
    let solvable: IndexSet<usize> = reports
        .into_iter()
        .filter(|r| r.outcome == TaskOutcome::Completed(true))
        .map(|r| r.task_id)
        .collect();
    let total = candidates.len();
    let kept: Vec<String> = candidates
        .into_iter()
        .enumerate()
        .filter(|(i, _)| solvable.contains(i))
        .map(|(_, id)| id)
        .collect();
    info!("{} of {total} metabolites can be produced", kept.len());
    kept
}
