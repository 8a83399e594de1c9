//! Identification from the assumption graph.
//!
//! The backdoor adjustment set for treatment `T` and outcome `Y` is
//!
//! ```text
//! ancestors(T) ∩ ancestors(Y) \ descendants(T)
//! ```
//!
//! i.e. the common causes of `T` and `Y` that are not themselves caused by `T`.
//! It is recomputed from the graph on every call.

use std::collections::BTreeSet;

use ks_core::{Error, Result, TabularData};
use ks_graph::AssumptionGraph;

/// Backdoor confounders of `treatment -> outcome`, minus any `excluded` role variables.
pub fn backdoor_set(
    graph: &AssumptionGraph,
    treatment: &str,
    outcome: &str,
    excluded: &[&str],
) -> BTreeSet<String> {
    let common: BTreeSet<String> =
        graph.ancestors(treatment).intersection(&graph.ancestors(outcome)).cloned().collect();
    let downstream = graph.descendants(treatment);
    common
        .into_iter()
        .filter(|v| !downstream.contains(v) && !excluded.contains(&v.as_str()))
        .collect()
}

/// Confounders split by whether the data has a column for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identified {
    /// Confounders present in the data (sorted).
    pub observed: Vec<String>,
    /// Confounders declared in the graph but absent from the data (sorted).
    pub missing: Vec<String>,
}

/// Partition the backdoor set into observed and missing confounders.
pub fn identify(
    graph: &AssumptionGraph,
    treatment: &str,
    outcome: &str,
    excluded: &[&str],
    data: &dyn TabularData,
) -> Identified {
    let (observed, missing): (Vec<String>, Vec<String>) = backdoor_set(graph, treatment, outcome, excluded)
        .into_iter()
        .partition(|c| data.has_column(c));
    tracing::debug!(treatment, outcome, ?observed, ?missing, "backdoor set identified");
    Identified { observed, missing }
}

/// The adjustment set for estimators that adjust directly.
///
/// Fails with [`Error::Identification`] naming every missing confounder before
/// any estimation runs.
pub fn require_observed(
    graph: &AssumptionGraph,
    treatment: &str,
    outcome: &str,
    excluded: &[&str],
    data: &dyn TabularData,
) -> Result<Vec<String>> {
    let id = identify(graph, treatment, outcome, excluded, data);
    if !id.missing.is_empty() {
        return Err(Error::Identification {
            treatment: treatment.to_string(),
            outcome: outcome.to_string(),
            missing: id.missing,
        });
    }
    Ok(id.observed)
}

/// Structural checks on an instrument `z` for `treatment -> outcome`.
///
/// - `z` must not be a descendant of the outcome;
/// - relevance: a directed path `z -> ... -> treatment` must exist;
/// - exclusion: every directed path from `z` to the outcome must pass through the treatment.
///
/// These are properties of the declared graph only; they say nothing about
/// whether the data satisfy them.
pub fn validate_instrument(graph: &AssumptionGraph, z: &str, treatment: &str, outcome: &str) -> Result<()> {
    if graph.descendants(outcome).contains(z) {
        return Err(Error::Validation(format!(
            "instrument '{z}' is a descendant of outcome '{outcome}'"
        )));
    }
    if !graph.has_path(z, treatment) {
        return Err(Error::Validation(format!(
            "instrument '{z}' does not cause treatment '{treatment}' in the graph \
             (no directed path); declare a path to assert relevance"
        )));
    }
    if graph.has_path_avoiding(z, outcome, treatment) {
        return Err(Error::Validation(format!(
            "exclusion restriction violated: '{z}' reaches '{outcome}' without passing through '{treatment}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ks_core::Dataset;

    fn schooling() -> AssumptionGraph {
        AssumptionGraph::from_declarations([
            ("ability", vec!["education", "income"]),
            ("education", vec!["income"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_backdoor_set_schooling() {
        let g = schooling();
        let set = backdoor_set(&g, "education", "income", &[]);
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec!["ability".to_string()]);
    }

    #[test]
    fn test_mediator_is_not_a_confounder() {
        // c -> t -> m -> y, c -> y: m is downstream of t.
        let g = AssumptionGraph::from_declarations([
            ("c", vec!["t", "y"]),
            ("t", vec!["m"]),
            ("m", vec!["y"]),
        ])
        .unwrap();
        let set = backdoor_set(&g, "t", "y", &[]);
        assert!(set.contains("c"));
        assert!(!set.contains("m"));
    }

    #[test]
    fn test_excluded_roles_dropped() {
        let g = AssumptionGraph::from_declarations([("z", vec!["t", "y"]), ("t", vec!["y"])]).unwrap();
        assert!(backdoor_set(&g, "t", "y", &["z"]).is_empty());
    }

    #[test]
    fn test_missing_confounders_all_named() {
        let g = AssumptionGraph::from_declarations([
            ("ability", vec!["education", "income"]),
            ("family", vec!["education", "income"]),
            ("region", vec!["education", "income"]),
            ("education", vec!["income"]),
        ])
        .unwrap();
        let data = Dataset::new([
            ("education", vec![0.0, 1.0, 1.0]),
            ("income", vec![1.0, 2.0, 3.0]),
            ("region", vec![0.0, 1.0, 0.0]),
        ])
        .unwrap();
        match require_observed(&g, "education", "income", &[], &data) {
            Err(Error::Identification { missing, .. }) => {
                assert_eq!(missing, vec!["ability".to_string(), "family".to_string()]);
            }
            other => panic!("expected identification error, got {other:?}"),
        }
        let id = identify(&g, "education", "income", &[], &data);
        assert_eq!(id.observed, vec!["region".to_string()]);
    }

    #[test]
    fn test_instrument_structure() {
        let g = AssumptionGraph::from_declarations([
            ("proximity", vec!["education"]),
            ("ability", vec!["education", "income"]),
            ("education", vec!["income"]),
        ])
        .unwrap();
        validate_instrument(&g, "proximity", "education", "income").unwrap();
        assert!(validate_instrument(&g, "income", "education", "income").is_err());

        let mut leaky = g.clone();
        leaky.declare_edge("proximity", "income").unwrap();
        assert!(validate_instrument(&leaky, "proximity", "education", "income").is_err());

        let mut irrelevant = AssumptionGraph::new();
        irrelevant.declare_edge("education", "income").unwrap();
        irrelevant.declare_edge("z", "income").unwrap();
        assert!(validate_instrument(&irrelevant, "z", "education", "income").is_err());

        let mut downstream = AssumptionGraph::new();
        downstream.declare_edge("education", "income").unwrap();
        downstream.declare_edge("income", "z").unwrap();
        assert!(validate_instrument(&downstream, "z", "education", "income").is_err());
    }
}
