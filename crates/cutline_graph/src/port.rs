// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortId(pub Uuid);

impl PortId {
    /// Create a new random port ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PortId {
    fn default() -> Self {
        Self::new()
    }
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

/// Data type that can flow through ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortType {
    /// Reference to a timeline block
    Block,
    /// Reference to a whole track
    Track,
    /// Rendered frame
    Texture,
}

impl PortType {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Block => "Block",
            Self::Track => "Track",
            Self::Texture => "Texture",
        }
    }

    /// Check if this type can connect to another type
    ///
    /// References never convert implicitly, so only identical types connect.
    pub fn can_connect_to(&self, other: &PortType) -> bool {
        self == other
    }
}

/// A port on a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    /// Unique port ID
    pub id: PortId,
    /// Port name
    pub name: String,
    /// Port direction
    pub direction: PortDirection,
    /// Data type
    pub port_type: PortType,
    /// Whether multiple connections are allowed
    pub multi_connect: bool,
}

impl Port {
    /// Create a new input port
    pub fn input(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            id: PortId::new(),
            name: name.into(),
            direction: PortDirection::Input,
            port_type,
            multi_connect: false,
        }
    }

    /// Create a new output port
    pub fn output(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            id: PortId::new(),
            name: name.into(),
            direction: PortDirection::Output,
            port_type,
            multi_connect: true, // Outputs can have multiple connections by default
        }
    }

    /// Check if a connection to another port is valid
    pub fn can_connect(&self, other: &Port) -> bool {
        // Must be opposite directions
        if self.direction == other.direction {
            return false;
        }

        self.port_type.can_connect_to(&other.port_type)
    }
}
