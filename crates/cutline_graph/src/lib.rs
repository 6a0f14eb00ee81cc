// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph collaborator for Cutline.
//!
//! The graph is the sole owner of every node placed on a timeline. Other
//! crates refer to nodes only through [`NodeId`] handles and must register a
//! node here before linking it anywhere.
//!
//! ## Architecture
//!
//! - [`Graph`] stores nodes by id and is the only place nodes are destroyed
//! - [`GraphNode`] is the capability a node type provides to the graph
//! - [`Port`] describes typed connection points between nodes

pub mod node;
pub mod port;
pub mod graph;

pub use node::{GraphNode, NodeId};
pub use port::{Port, PortId, PortType, PortDirection};
pub use graph::{Graph, GraphError};
