//! Identity-keyed directed graph used while resolving dependencies.
//!
//! Nodes are keyed by dependency identity and carry a payload; the root node
//! stands for the invoking project and carries none. An edge `A -> B` means
//! "A depends on B". Edges are kept in the order they were added so that
//! traversal follows declaration order, which makes the resulting deployment
//! order reproducible between runs.
//!
//! Built on petgraph's `StableDiGraph` so node indices stay valid while the
//! graph is drained leaf by leaf.

use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

/// A dependency edge would close a cycle.
///
/// `path` runs from the dependent through the existing chain back to itself,
/// e.g. `[a, b, a]` for `a -> b -> a`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Circular dependency detected: {}", .path.join(" -> "))]
pub struct CyclicDependencyError {
    pub path: Vec<String>,
}

impl CyclicDependencyError {
    #[must_use]
    pub const fn new(path: Vec<String>) -> Self {
        Self {
            path,
        }
    }

    /// The cycle rendered as `a -> b -> a`.
    #[must_use]
    pub fn chain(&self) -> String {
        self.path.join(" -> ")
    }
}

/// Structural misuse of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Node '{0}' does not exist in the dependency graph")]
    NodeNotFound(String),

    #[error("Node '{0}' already exists in the dependency graph")]
    NodeExists(String),

    #[error("The root node '{0}' cannot be removed")]
    RemoveRoot(String),

    #[error("Node '{id}' still has dependencies: {}", .children.join(", "))]
    NotALeaf { id: String, children: Vec<String> },

    #[error(transparent)]
    Cycle(#[from] CyclicDependencyError),
}

/// What a node carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodePayload<T> {
    Root,
    Dependency(T),
}

/// A node of the graph.
#[derive(Debug, Clone)]
pub struct Node<T> {
    id: String,
    payload: NodePayload<T>,
}

impl<T> Node<T> {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The dependency payload, `None` for the root.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match &self.payload {
            NodePayload::Root => None,
            NodePayload::Dependency(value) => Some(value),
        }
    }

    #[must_use]
    pub const fn is_root(&self) -> bool {
        matches!(self.payload, NodePayload::Root)
    }
}

/// The dependency graph.
pub struct Graph<T> {
    graph: StableDiGraph<Node<T>, u64>,
    index: HashMap<String, NodeIndex>,
    root: NodeIndex,
    /// Edge weights are insertion sequence numbers
    next_edge: u64,
}

impl<T> Graph<T> {
    /// Creates a graph holding only the root node.
    pub fn new(root_id: impl Into<String>) -> Self {
        let root_id = root_id.into();
        let mut graph = StableDiGraph::new();
        let root = graph.add_node(Node {
            id: root_id.clone(),
            payload: NodePayload::Root,
        });
        let mut index = HashMap::new();
        index.insert(root_id, root);
        Self {
            graph,
            index,
            root,
            next_edge: 0,
        }
    }

    #[must_use]
    pub fn root_id(&self) -> &str {
        &self.graph[self.root].id
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Node<T>> {
        self.index.get(id).map(|idx| &self.graph[*idx])
    }

    /// Number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether only the root is left.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.len() == 1
    }

    /// Direct dependencies of `id`, in the order the edges were added.
    #[must_use]
    pub fn children(&self, id: &str) -> Vec<&str> {
        let Some(idx) = self.index.get(id) else {
            return Vec::new();
        };
        self.ordered_children(*idx).into_iter().map(|c| self.graph[c].id.as_str()).collect()
    }

    /// Nodes that depend directly on `id`.
    #[must_use]
    pub fn parents(&self, id: &str) -> Vec<&str> {
        let Some(idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut parents: Vec<(u64, NodeIndex)> = self
            .graph
            .edges_directed(*idx, Direction::Incoming)
            .map(|e| (*e.weight(), e.source()))
            .collect();
        parents.sort_unstable_by_key(|(seq, _)| *seq);
        parents.into_iter().map(|(_, p)| self.graph[p].id.as_str()).collect()
    }

    /// Adds `id` as a new dependency of `parent_id`.
    pub fn insert_node_at(
        &mut self,
        parent_id: &str,
        id: impl Into<String>,
        value: T,
    ) -> Result<&Node<T>, GraphError> {
        let id = id.into();
        let parent = self.lookup(parent_id)?;
        if self.index.contains_key(&id) {
            return Err(GraphError::NodeExists(id));
        }

        let node = self.graph.add_node(Node {
            id: id.clone(),
            payload: NodePayload::Dependency(value),
        });
        self.index.insert(id, node);
        self.push_edge(parent, node);
        Ok(&self.graph[node])
    }

    /// Records that `from` depends on `to`.
    ///
    /// Adding an existing edge is a no-op. Fails with
    /// [`GraphError::Cycle`] when `to` already (transitively) depends on
    /// `from`, a self-edge included; the graph is unchanged in that case.
    pub fn add_edge(&mut self, from_id: &str, to_id: &str) -> Result<(), GraphError> {
        let from = self.lookup(from_id)?;
        let to = self.lookup(to_id)?;
        if self.graph.contains_edge(from, to) {
            return Ok(());
        }
        if has_path_connecting(&self.graph, to, from, None) {
            let mut path = vec![from_id.to_string()];
            path.extend(self.find_path(to, from).into_iter().map(|n| self.graph[n].id.clone()));
            return Err(CyclicDependencyError::new(path).into());
        }
        self.push_edge(from, to);
        Ok(())
    }

    /// Like [`add_edge`](Self::add_edge) without the cycle check.
    pub fn add_edge_unchecked(&mut self, from_id: &str, to_id: &str) -> Result<(), GraphError> {
        let from = self.lookup(from_id)?;
        let to = self.lookup(to_id)?;
        if !self.graph.contains_edge(from, to) {
            self.push_edge(from, to);
        }
        Ok(())
    }

    /// Removes a node that has no dependencies of its own, returning its
    /// payload. Edges pointing at it are removed with it.
    pub fn remove_node(&mut self, id: &str) -> Result<T, GraphError> {
        let idx = self.lookup(id)?;
        if idx == self.root {
            return Err(GraphError::RemoveRoot(id.to_string()));
        }
        if !self.ordered_children(idx).is_empty() {
            return Err(GraphError::NotALeaf {
                id: id.to_string(),
                children: self.children(id).into_iter().map(String::from).collect(),
            });
        }

        self.index.remove(id);
        match self.graph.remove_node(idx).map(|n| n.payload) {
            Some(NodePayload::Dependency(value)) => Ok(value),
            Some(NodePayload::Root) => Err(GraphError::RemoveRoot(id.to_string())),
            None => Err(GraphError::NodeNotFound(id.to_string())),
        }
    }

    /// Finds the first node without dependencies reachable from `from_id`.
    ///
    /// Depth-first in edge order, so the leftmost leaf of the declaration
    /// tree comes first. Returns the root when no non-root node is left (or
    /// `from_id` is unknown).
    #[must_use]
    pub fn next_leaf(&self, from_id: &str) -> &Node<T> {
        let Some(start) = self.index.get(from_id).copied() else {
            return &self.graph[self.root];
        };

        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let children = self.ordered_children(current);
            if children.is_empty() && current != self.root {
                return &self.graph[current];
            }
            stack.extend(children.into_iter().rev());
        }
        &self.graph[self.root]
    }

    fn lookup(&self, id: &str) -> Result<NodeIndex, GraphError> {
        self.index.get(id).copied().ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }

    fn push_edge(&mut self, from: NodeIndex, to: NodeIndex) {
        self.graph.add_edge(from, to, self.next_edge);
        self.next_edge += 1;
    }

    fn ordered_children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut children: Vec<(u64, NodeIndex)> =
            self.graph.edges(idx).map(|e| (*e.weight(), e.target())).collect();
        children.sort_unstable_by_key(|(seq, _)| *seq);
        children.into_iter().map(|(_, c)| c).collect()
    }

    /// Path `from ..= to` following edges, empty if there is none.
    fn find_path(&self, from: NodeIndex, to: NodeIndex) -> Vec<NodeIndex> {
        let mut visited = HashSet::new();
        let mut path = Vec::new();
        if self.walk_to(from, to, &mut visited, &mut path) {
            path
        } else {
            Vec::new()
        }
    }

    fn walk_to(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        path: &mut Vec<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if visited.insert(current) {
            for child in self.ordered_children(current) {
                if self.walk_to(child, target, visited, path) {
                    return true;
                }
            }
        }
        path.pop();
        false
    }
}

impl<T> fmt::Debug for Graph<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for idx in self.graph.node_indices() {
            let children: Vec<&str> =
                self.ordered_children(idx).into_iter().map(|c| self.graph[c].id.as_str()).collect();
            map.entry(&self.graph[idx].id, &children);
        }
        map.finish()
    }
}
