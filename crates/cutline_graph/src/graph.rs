// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure owning every node.

use crate::node::{GraphNode, NodeId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A node graph
///
/// Nodes are kept in insertion order. Anything outside the graph holds
/// [`NodeId`] handles only, so links between nodes never own each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph<N> {
    /// Graph name
    pub name: String,
    /// Nodes in the graph
    nodes: IndexMap<NodeId, N>,
}

impl<N: GraphNode> Graph<N> {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
        }
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: N) -> NodeId {
        self.add_node_with_dependencies(node, std::iter::empty())
    }

    /// Register a node together with the nodes it depends on.
    ///
    /// Dependencies are registered first. A node whose id is already present
    /// is left as it is, so registering twice is harmless.
    pub fn add_node_with_dependencies(
        &mut self,
        node: N,
        dependencies: impl IntoIterator<Item = N>,
    ) -> NodeId {
        for dependency in dependencies {
            self.insert_if_absent(dependency);
        }
        self.insert_if_absent(node)
    }

    fn insert_if_absent(&mut self, node: N) -> NodeId {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            tracing::trace!(node = %id, "node already registered");
        } else {
            tracing::trace!(node = %id, node_type = node.type_id(), "registering node");
            self.nodes.insert(id, node);
        }
        id
    }

    /// Remove a node from the graph, destroying it.
    ///
    /// Connected nodes are refused; unlink them first.
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<N, GraphError> {
        let node = self.nodes.get(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        if node.is_connected() {
            return Err(GraphError::NodeStillConnected(node_id));
        }
        self.nodes
            .shift_remove(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))
    }

    /// Check whether a node is registered
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&N> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut N> {
        self.nodes.get_mut(&node_id)
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Destroy every disconnected node that `keep` does not claim, returning
    /// how many were removed.
    pub fn prune_disconnected(&mut self, keep: impl Fn(&N) -> bool) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|_, node| node.is_connected() || keep(node));
        before - self.nodes.len()
    }
}

impl<N: GraphNode> Default for Graph<N> {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Error raised by graph ownership operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Node still has connections and cannot be destroyed
    #[error("Node still connected: {0}")]
    NodeStillConnected(NodeId),
}
