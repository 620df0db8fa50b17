//! Removal of highly connected (hub) metabolites
//!
//! Currency metabolites such as water or protons take part in a large share of reactions and
//! would dominate any composition they enter. A metabolite is a hub when its degree is strictly
//! above `median + std` of the degrees of the candidate set.
use indexmap::IndexSet;
use log::{debug, info};

use crate::optimize::MetabolicNetwork;
use crate::population::stats;

/// Degree above which a metabolite of `candidates` counts as a hub
///
/// None when fewer than two candidates are given, in which case nothing is a hub.
pub fn hub_threshold<N: MetabolicNetwork + ?Sized>(network: &N, candidates: &[String]) -> Option<f64> {
    let degrees: Vec<f64> = candidates
        .iter()
        .map(|id| network.metabolite_degree(id) as f64)
        .collect();
    stats::upper_spread(&degrees)
}

/// Hubs among `candidates`, most connected first
pub fn find_hubs<N: MetabolicNetwork + ?Sized>(network: &N, candidates: &[String]) -> Vec<String> {
    let Some(threshold) = hub_threshold(network, candidates) else {
        return Vec::new();
    };
    debug!("Hub degree threshold {threshold:.3}");
    let mut hubs: Vec<(usize, &String)> = candidates
        .iter()
        .map(|id| (network.metabolite_degree(id), id))
        .filter(|(degree, _)| *degree as f64 > threshold)
        .collect();
    hubs.sort_by(|a, b| b.0.cmp(&a.0));
    hubs.into_iter().map(|(_, id)| id.clone()).collect()
}

/// `candidates` without their hubs, order preserved
pub fn remove_hubs<N: MetabolicNetwork + ?Sized>(network: &N, candidates: Vec<String>) -> Vec<String> {
    let hubs: IndexSet<String> = find_hubs(network, &candidates).into_iter().collect();
    info!(
        "Branching filter removed {} of {} metabolites",
        hubs.len(),
        candidates.len()
    );
    candidates
        .into_iter()
        .filter(|id| !hubs.contains(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::model::Model;
    use crate::metabolic_model::reaction::ReactionBuilder;

    /// `h` takes part in every reaction, the others in one or two
    fn hub_model() -> Model {
        let mut model = Model::new_empty();
        let pairs = [("a", "b"), ("b", "c"), ("c", "d"), ("d", "e"), ("e", "f"), ("f", "g")];
        for (i, (s, p)) in pairs.iter().enumerate() {
            let rxn = ReactionBuilder::default()
                .id(format!("R{i}"))
                .metabolites(
                    [(s.to_string(), -1.), (p.to_string(), 1.), ("h".to_string(), 1.)]
                        .into_iter()
                        .collect(),
                )
                .build()
                .unwrap();
            model.add_reaction(rxn);
        }
        model
    }

    #[test]
    fn currency_metabolite_is_a_hub() {
        let model = hub_model();
        let candidates: Vec<String> = model.metabolites.keys().cloned().collect();
        assert_eq!(find_hubs(&model, &candidates), vec!["h".to_string()]);
        let kept = remove_hubs(&model, candidates);
        assert_eq!(kept.len(), 7);
        assert!(!kept.contains(&"h".to_string()));
    }

    #[test]
    fn survivors_stay_under_threshold() {
        let model = hub_model();
        let candidates: Vec<String> = model.metabolites.keys().cloned().collect();
        let threshold = hub_threshold(&model, &candidates).unwrap();
        for id in remove_hubs(&model, candidates) {
            assert!(model.metabolite_degree(&id) as f64 <= threshold);
        }
    }

    #[test]
    fn single_candidate_is_never_a_hub() {
        let model = hub_model();
        let candidates = vec!["h".to_string()];
        assert!(find_hubs(&model, &candidates).is_empty());
    }
}
