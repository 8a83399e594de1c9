//! Property tests for insertion atomicity and reachability.

use std::collections::BTreeSet;

use ks_graph::AssumptionGraph;
use proptest::prelude::*;

const NAMES: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

/// Transitive closure of an edge list by repeated relaxation.
fn closure(edges: &[(String, String)]) -> [[bool; 6]; 6] {
    let pos = |s: &str| NAMES.iter().position(|n| *n == s).unwrap();
    let mut reach = [[false; 6]; 6];
    for (u, v) in edges {
        reach[pos(u)][pos(v)] = true;
    }
    for k in 0..6 {
        for i in 0..6 {
            for j in 0..6 {
                if reach[i][k] && reach[k][j] {
                    reach[i][j] = true;
                }
            }
        }
    }
    reach
}

fn edge_batches() -> impl Strategy<Value = Vec<(usize, Vec<usize>)>> {
    prop::collection::vec((0usize..6, prop::collection::vec(0usize..6, 1..3)), 1..20)
}

proptest! {
    #[test]
    fn rejected_insertion_leaves_graph_unchanged(batches in edge_batches()) {
        let mut g = AssumptionGraph::new();
        for (src, targets) in batches {
            let before_edges = g.edges().to_vec();
            let before_nodes = g.nodes();
            let targets: Vec<&str> = targets.iter().map(|&t| NAMES[t]).collect();
            if g.declare_edges(NAMES[src], targets).is_err() {
                prop_assert_eq!(g.edges(), before_edges.as_slice());
                prop_assert_eq!(g.nodes(), before_nodes);
            }
        }
        // Whatever got committed is acyclic.
        let reach = closure(g.edges());
        for i in 0..6 {
            prop_assert!(!reach[i][i]);
        }
    }

    #[test]
    fn ancestors_match_path_existence(batches in edge_batches()) {
        let mut g = AssumptionGraph::new();
        for (src, targets) in batches {
            let targets: Vec<&str> = targets.iter().map(|&t| NAMES[t]).collect();
            let _ = g.declare_edges(NAMES[src], targets);
        }
        let reach = closure(g.edges());
        for (j, v) in NAMES.iter().enumerate() {
            let anc = g.ancestors(v);
            let desc = g.descendants(v);
            prop_assert!(!anc.contains(*v));
            prop_assert!(!desc.contains(*v));
            prop_assert!(anc.is_disjoint(&desc));
            let expected_anc: BTreeSet<String> =
                (0..6).filter(|&i| reach[i][j]).map(|i| NAMES[i].to_string()).collect();
            let expected_desc: BTreeSet<String> =
                (0..6).filter(|&k| reach[j][k]).map(|k| NAMES[k].to_string()).collect();
            prop_assert_eq!(anc, expected_anc);
            prop_assert_eq!(desc, expected_desc);
        }
    }
}
