//! Assumption graph storage and queries.
//!
//! Insertion is compute-then-commit: a candidate graph with the new edges is
//! built, checked for cycles with Kahn's algorithm, and only then swapped in.
//! A rejected call never leaves a partially inserted edge behind.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;

use ks_core::{Error, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

/// Directed acyclic graph of causal assumptions between named variables.
#[derive(Debug, Clone, Default)]
pub struct AssumptionGraph {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
    /// `(cause, effect)` in declaration order.
    edges: Vec<(String, String)>,
}

impl AssumptionGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from an ordered sequence of `(source, targets)` declarations.
    pub fn from_declarations<I, S, T>(declarations: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: IntoIterator,
        T::Item: AsRef<str>,
    {
        let mut g = Self::new();
        for (source, targets) in declarations {
            g.declare_edges(source, targets)?;
        }
        Ok(g)
    }

    /// Declare `source -> t` for every `t` in `targets`, atomically.
    ///
    /// Fails with [`Error::Graph`] on a self-loop, a duplicate edge, or an edge
    /// set that would contain a cycle. On failure the graph is unchanged.
    /// With no targets, `source` is registered as an isolated variable.
    pub fn declare_edges<S, T>(&mut self, source: S, targets: T) -> Result<&mut Self>
    where
        S: AsRef<str>,
        T: IntoIterator,
        T::Item: AsRef<str>,
    {
        let source = source.as_ref();
        validate_name(source)?;

        let mut candidate = self.clone();
        let src = candidate.intern(source);
        let mut added = Vec::new();
        for target in targets {
            let target = target.as_ref();
            validate_name(target)?;
            if target == source {
                return Err(Error::Graph(format!("self-loop '{}' -> '{}' is not allowed", source, target)));
            }
            let dst = candidate.intern(target);
            if candidate.graph.find_edge(src, dst).is_some() {
                return Err(Error::Graph(format!("'{}' -> '{}' already declared", source, target)));
            }
            candidate.graph.add_edge(src, dst, ());
            candidate.edges.push((source.to_string(), target.to_string()));
            added.push(target.to_string());
        }

        if !candidate.is_acyclic() {
            return Err(Error::Graph(format!(
                "declaring '{}' -> {:?} would create a cycle; assumption graphs must be acyclic",
                source, added
            )));
        }

        tracing::debug!(source, targets = ?added, "edges declared");
        *self = candidate;
        Ok(self)
    }

    /// Declare a single edge `cause -> effect`. Returns `&mut Self` for chaining.
    pub fn declare_edge(&mut self, cause: &str, effect: &str) -> Result<&mut Self> {
        self.declare_edges(cause, [effect])
    }

    /// Membership test.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All variables, sorted.
    pub fn nodes(&self) -> BTreeSet<String> {
        self.index.keys().cloned().collect()
    }

    /// All edges as `(cause, effect)`, in declaration order.
    pub fn edges(&self) -> &[(String, String)] {
        &self.edges
    }

    /// Number of variables.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the graph has no variables.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Direct causes of `name`.
    pub fn parents(&self, name: &str) -> BTreeSet<String> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Direct effects of `name`.
    pub fn children(&self, name: &str) -> BTreeSet<String> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Every variable with a directed path into `name` (excluding `name`).
    pub fn ancestors(&self, name: &str) -> BTreeSet<String> {
        self.reach(name, Direction::Incoming, None)
    }

    /// Every variable reachable from `name` by a directed path (excluding `name`).
    pub fn descendants(&self, name: &str) -> BTreeSet<String> {
        self.reach(name, Direction::Outgoing, None)
    }

    /// Whether a directed path `from -> ... -> to` of length >= 1 exists.
    pub fn has_path(&self, from: &str, to: &str) -> bool {
        self.descendants(from).contains(to)
    }

    /// Whether a directed path `from -> ... -> to` exists that never visits `avoid`.
    pub fn has_path_avoiding(&self, from: &str, to: &str, avoid: &str) -> bool {
        if from == avoid || to == avoid {
            return false;
        }
        let Some(&blocked) = self.index.get(avoid) else {
            return self.has_path(from, to);
        };
        self.reach(from, Direction::Outgoing, Some(blocked)).contains(to)
    }

    fn intern(&mut self, name: &str) -> NodeIndex {
        if let Some(&ix) = self.index.get(name) {
            return ix;
        }
        let ix = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), ix);
        ix
    }

    fn neighbors(&self, name: &str, dir: Direction) -> BTreeSet<String> {
        match self.index.get(name) {
            Some(&ix) => self.graph.neighbors_directed(ix, dir).map(|n| self.graph[n].clone()).collect(),
            None => BTreeSet::new(),
        }
    }

    /// Breadth-first reachability from `name`, never entering `blocked`.
    fn reach(&self, name: &str, dir: Direction, blocked: Option<NodeIndex>) -> BTreeSet<String> {
        let Some(&start) = self.index.get(name) else {
            return BTreeSet::new();
        };
        let mut seen = vec![false; self.graph.node_count()];
        seen[start.index()] = true;
        if let Some(b) = blocked {
            seen[b.index()] = true;
        }
        let mut queue = VecDeque::from([start]);
        let mut out = BTreeSet::new();
        while let Some(node) = queue.pop_front() {
            for next in self.graph.neighbors_directed(node, dir) {
                if !seen[next.index()] {
                    seen[next.index()] = true;
                    out.insert(self.graph[next].clone());
                    queue.push_back(next);
                }
            }
        }
        out
    }

    /// Kahn's algorithm: repeatedly remove in-degree-zero nodes; leftovers mean a cycle.
    fn is_acyclic(&self) -> bool {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|n| self.graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();
        let mut queue: VecDeque<NodeIndex> =
            self.graph.node_indices().filter(|n| in_degree[n.index()] == 0).collect();

        let mut visited = 0usize;
        while let Some(node) = queue.pop_front() {
            visited += 1;
            for succ in self.graph.neighbors_directed(node, Direction::Outgoing) {
                let deg = &mut in_degree[succ.index()];
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(succ);
                }
            }
        }
        visited == self.graph.node_count()
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Graph("variable names must be non-empty".into()));
    }
    Ok(())
}

impl fmt::Display for AssumptionGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.edges.is_empty() {
            return write!(f, "AssumptionGraph (empty)");
        }
        write!(f, "AssumptionGraph:")?;
        for (cause, effect) in &self.edges {
            write!(f, "\n  {} -> {}", cause, effect)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn schooling() -> AssumptionGraph {
        let mut g = AssumptionGraph::new();
        g.declare_edges("ability", ["education", "income"]).unwrap();
        g.declare_edges("education", ["income"]).unwrap();
        g
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let g = schooling();
        assert_eq!(g.ancestors("income"), set(&["ability", "education"]));
        assert_eq!(g.ancestors("education"), set(&["ability"]));
        assert_eq!(g.descendants("ability"), set(&["education", "income"]));
        assert!(g.descendants("income").is_empty());
        assert!(g.ancestors("nope").is_empty());
    }

    #[test]
    fn test_parents_children() {
        let g = schooling();
        assert_eq!(g.parents("income"), set(&["ability", "education"]));
        assert_eq!(g.children("ability"), set(&["education", "income"]));
        assert!(g.parents("ability").is_empty());
    }

    #[test]
    fn test_cycle_rejected_atomically() {
        let mut g = schooling();
        let before = g.edges().to_vec();
        // income -> z is fine, z -> ability is fine, but together with
        // income -> ability the batch closes a cycle.
        let err = g.declare_edges("income", ["z", "ability"]).unwrap_err();
        assert!(matches!(err, Error::Graph(_)));
        assert_eq!(g.edges(), before.as_slice());
        assert!(!g.contains("z"));
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn test_self_loop_and_duplicate() {
        let mut g = schooling();
        assert!(matches!(g.declare_edge("income", "income"), Err(Error::Graph(_))));
        assert!(matches!(g.declare_edge("ability", "income"), Err(Error::Graph(_))));
        assert!(matches!(g.declare_edges("x", ["y", "y"]), Err(Error::Graph(_))));
        assert!(!g.contains("x"));
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn test_chaining_and_display() {
        let mut g = AssumptionGraph::new();
        assert_eq!(g.to_string(), "AssumptionGraph (empty)");
        g.declare_edge("z", "t").unwrap().declare_edge("t", "y").unwrap();
        assert_eq!(g.to_string(), "AssumptionGraph:\n  z -> t\n  t -> y");
        assert!(g.has_path("z", "y"));
        assert!(!g.has_path("y", "z"));
    }

    #[test]
    fn test_path_avoiding() {
        let mut g = AssumptionGraph::new();
        g.declare_edges("z", ["t"]).unwrap();
        g.declare_edges("t", ["y"]).unwrap();
        assert!(!g.has_path_avoiding("z", "y", "t"));
        g.declare_edge("z", "y").unwrap();
        assert!(g.has_path_avoiding("z", "y", "t"));
    }

    #[test]
    fn test_isolated_variable_and_names() {
        let mut g = AssumptionGraph::new();
        g.declare_edges("lonely", std::iter::empty::<&str>()).unwrap();
        assert!(g.contains("lonely"));
        assert_eq!(g.edge_count(), 0);
        assert!(g.declare_edge("", "a").is_err());
        assert!(!g.is_empty());
    }

    #[test]
    fn test_from_declarations() {
        let g = AssumptionGraph::from_declarations([
            ("ability", vec!["education", "income"]),
            ("education", vec!["income"]),
        ])
        .unwrap();
        assert_eq!(g.edges().len(), 3);
        assert!(AssumptionGraph::from_declarations([("a", vec!["b"]), ("b", vec!["a"])]).is_err());
    }
}
