//! Reference graph between blocks.
//!
//! Every time a block is deferred, the run context records an edge from the
//! block to each resource it is waiting for. Once the decode loop stops making
//! progress, a topological sort of this graph (rooted at a synthetic node
//! depending on every unresolved block) tells cycles apart from plain
//! missing names.
//!
//! # Example
//!
//! ```
//! use mod_config::graph::DependencyGraph;
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_edge("m.query.q1", "m.local.sql");
//!
//! let order = graph.topological_order().unwrap();
//! assert_eq!(order, vec!["m.local.sql", "m.query.q1"]);
//! ```

use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Synthetic node every unresolved block hangs off.
pub const ROOT_NODE: &str = "root";

/// Directed graph of references.
///
/// Edges point from the referencing block to the referenced name. Sorting
/// returns names in dependency-first order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    /// Adjacency list: key depends on each value
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node without dependencies. Existing edges are kept.
    pub fn add_node(&mut self, id: &str) {
        self.edges.entry(id.to_string()).or_default();
    }

    /// Declare that `from` depends on `to`, adding either node if needed.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.edges.entry(to.to_string()).or_default();
        self.edges
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
    }

    /// Drop the outgoing edges of `id`, keeping the node.
    pub fn clear_dependencies(&mut self, id: &str) {
        if let Some(deps) = self.edges.get_mut(id) {
            deps.clear();
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Direct dependencies of a node, sorted.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.edges
            .get(id)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Sort with Kahn's algorithm.
    ///
    /// # Errors
    ///
    /// When the graph has a cycle, returns the nodes taking part in it.
    /// Nodes that merely depend on a cycle are pruned from that list.
    pub fn topological_order(&self) -> Result<Vec<String>, Vec<String>> {
        let mut in_degree: BTreeMap<&str, usize> = self
            .edges
            .iter()
            .map(|(id, deps)| (id.as_str(), deps.len()))
            .collect();

        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (id, deps) in &self.edges {
            for dep in deps {
                dependents.entry(dep.as_str()).or_default().push(id.as_str());
            }
        }

        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(&id, _)| id)
            .collect();

        let mut order = Vec::with_capacity(self.edges.len());
        while let Some(id) = queue.pop_front() {
            order.push(id.to_string());
            for &dependent in dependents.get(id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        if order.len() == self.edges.len() {
            return Ok(order);
        }

        let mut remaining: BTreeSet<&str> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree > 0)
            .map(|(&id, _)| id)
            .collect();

        // Nothing in a cycle is without a dependent inside the cycle
        loop {
            let leaves: Vec<&str> = remaining
                .iter()
                .copied()
                .filter(|id| {
                    !dependents
                        .get(id)
                        .is_some_and(|ds| ds.iter().any(|d| remaining.contains(d)))
                })
                .collect();
            if leaves.is_empty() {
                break;
            }
            for leaf in leaves {
                remaining.remove(leaf);
            }
        }

        Err(remaining.into_iter().map(str::to_string).collect())
    }
}
