// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node identity and the capability nodes expose to the graph.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough to tell nodes apart in logs
        write!(f, "{}", &self.0.simple().to_string()[..8])
    }
}

/// Capability a node type provides so the graph can own it.
pub trait GraphNode {
    /// Identity of this node instance
    fn id(&self) -> NodeId;

    /// Stable type identifier, e.g. `org.cutline.track`
    fn type_id(&self) -> &'static str;

    /// Whether the node still has live connections to other nodes.
    ///
    /// The graph refuses to destroy a connected node.
    fn is_connected(&self) -> bool {
        false
    }
}
