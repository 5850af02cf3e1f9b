//! Reference DAG building and topological sorting

use crate::error::{CoreError, CoreResult};
use crate::model_name::ModelName;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// DFS coloring for cycle detection.
#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// The directed acyclic graph of model references.
///
/// Edges run from a dependency to its dependent, so a topological sort
/// yields dependencies first.
#[derive(Debug, Default)]
pub struct ModelDag {
    graph: DiGraph<ModelName, ()>,
    node_map: HashMap<ModelName, NodeIndex>,
}

impl ModelDag {
    /// Create a new empty DAG
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a model vertex, returning its index (idempotent).
    pub fn add_node(&mut self, name: &ModelName) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(name.as_str()) {
            idx
        } else {
            let idx = self.graph.add_node(name.clone());
            self.node_map.insert(name.clone(), idx);
            idx
        }
    }

    /// Add a reference edge: `dependent` depends on `dependency`.
    pub fn add_edge(&mut self, dependency: &ModelName, dependent: &ModelName) {
        let dep_idx = self.add_node(dependency);
        let dependent_idx = self.add_node(dependent);
        if !self.graph.contains_edge(dep_idx, dependent_idx) {
            self.graph.add_edge(dep_idx, dependent_idx, ());
        }
    }

    /// Check if a model exists in the DAG
    pub fn contains(&self, name: &str) -> bool {
        self.node_map.contains_key(name)
    }

    /// All model names in the DAG, sorted.
    pub fn names(&self) -> Vec<ModelName> {
        let mut names: Vec<ModelName> = self.node_map.keys().cloned().collect();
        names.sort();
        names
    }

    /// Validate the DAG has no cycles.
    pub fn validate(&self) -> CoreResult<()> {
        match self.find_cycle() {
            None => Ok(()),
            Some(path) => Err(CoreError::CircularDependency {
                cycle: path
                    .iter()
                    .map(ModelName::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> "),
            }),
        }
    }

    /// Deterministic topological order: dependencies first, ties broken by
    /// lexicographic qualified name (Kahn's algorithm over a min-heap).
    pub fn topological_order(&self) -> CoreResult<Vec<ModelName>> {
        let mut indegree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                (
                    idx,
                    self.graph.edges_directed(idx, Direction::Incoming).count(),
                )
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<(ModelName, NodeIndex)>> = indegree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(&idx, _)| Reverse((self.graph[idx].clone(), idx)))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse((name, idx))) = ready.pop() {
            order.push(name);
            for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                let target = edge.target();
                let deg = indegree
                    .get_mut(&target)
                    .unwrap_or_else(|| unreachable!("all nodes have an indegree entry"));
                *deg -= 1;
                if *deg == 0 {
                    ready.push(Reverse((self.graph[target].clone(), target)));
                }
            }
        }

        if order.len() != self.graph.node_count() {
            self.validate()?;
            return Err(CoreError::CircularDependency {
                cycle: "<unreported>".to_string(),
            });
        }
        Ok(order)
    }

    /// Find the first cycle (deterministically, starting from the smallest
    /// name), returning its full path `a -> b -> ... -> a`.
    fn find_cycle(&self) -> Option<Vec<ModelName>> {
        let mut colors: HashMap<NodeIndex, Color> = self
            .graph
            .node_indices()
            .map(|idx| (idx, Color::White))
            .collect();

        let mut roots: Vec<NodeIndex> = self.graph.node_indices().collect();
        roots.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));

        for root in roots {
            if colors[&root] == Color::White {
                let mut path = Vec::new();
                if let Some(cycle) = self.dfs_cycle(root, &mut colors, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn dfs_cycle(
        &self,
        node: NodeIndex,
        colors: &mut HashMap<NodeIndex, Color>,
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<ModelName>> {
        colors.insert(node, Color::Gray);
        path.push(node);

        let mut targets: Vec<NodeIndex> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| e.target())
            .collect();
        targets.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));

        for target in targets {
            match colors[&target] {
                Color::Gray => {
                    // back edge: the cycle is the path suffix from `target`
                    let start = path
                        .iter()
                        .position(|&n| n == target)
                        .unwrap_or_else(|| unreachable!("gray node is on the path"));
                    let mut cycle: Vec<ModelName> =
                        path[start..].iter().map(|&n| self.graph[n].clone()).collect();
                    cycle.push(self.graph[target].clone());
                    return Some(cycle);
                }
                Color::White => {
                    if let Some(cycle) = self.dfs_cycle(target, colors, path) {
                        return Some(cycle);
                    }
                }
                Color::Black => {}
            }
        }

        path.pop();
        colors.insert(node, Color::Black);
        None
    }

    /// Direct dependencies of a model.
    pub fn dependencies(&self, name: &str) -> Vec<ModelName> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Direct dependents of a model.
    pub fn dependents(&self, name: &str) -> Vec<ModelName> {
        self.neighbors(name, Direction::Outgoing)
    }

    fn neighbors(&self, name: &str, dir: Direction) -> Vec<ModelName> {
        let Some(&idx) = self.node_map.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<ModelName> = self
            .graph
            .neighbors_directed(idx, dir)
            .map(|n| self.graph[n].clone())
            .collect();
        out.sort();
        out
    }

    /// All transitive dependencies (upstream closure) of a model.
    pub fn ancestors(&self, name: &str) -> Vec<ModelName> {
        self.walk(name, Direction::Incoming)
    }

    /// All transitive dependents (downstream closure) of a model.
    pub fn descendants(&self, name: &str) -> Vec<ModelName> {
        self.walk(name, Direction::Outgoing)
    }

    fn walk(&self, name: &str, dir: Direction) -> Vec<ModelName> {
        let Some(&start) = self.node_map.get(name) else {
            return Vec::new();
        };
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for next in self.graph.neighbors_directed(node, dir) {
                if visited.insert(next) {
                    stack.push(next);
                }
            }
        }
        let mut out: Vec<ModelName> = visited.iter().map(|&n| self.graph[n].clone()).collect();
        out.sort();
        out
    }
}

#[cfg(test)]
#[path = "dag_test.rs"]
mod tests;
