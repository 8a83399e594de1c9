//! # ks-graph
//!
//! The assumption graph: a directed acyclic graph of named variables where an
//! edge `a -> b` declares "a causes b". Insertions are validated before they
//! are committed, so the graph is acyclic at every observable point.
//!
//! Latent variables are ordinary nodes; they simply have no column in the
//! data. Identification detects them at fit time.

#![warn(missing_docs)]

/// Graph storage, insertion and reachability queries.
pub mod dag;

pub use dag::AssumptionGraph;
