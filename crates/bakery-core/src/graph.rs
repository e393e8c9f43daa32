//! Host node graph introspection.
//!
//! Node and link objects held by the host are invalidated whenever the graph
//! is edited, so nothing here hands out long-lived references. Nodes are
//! found by name at the point of use.

use serde::{Deserialize, Serialize};

use crate::error::HostError;

/// The data type carried by a node socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SocketType {
    /// Color with alpha.
    Rgba,
    /// Single float.
    Value,
    /// Three-component vector.
    Vector,
    /// Shader closure.
    Shader,
}

/// A node in a host graph.
pub trait GraphNode {
    /// Unique name of the node within its graph.
    fn name(&self) -> &str;

    /// Returns true if the node has an input socket with this name.
    fn has_input(&self, socket: &str) -> bool;

    /// Returns true if the node has an output socket with this name.
    fn has_output(&self, socket: &str) -> bool;
}

/// The four names that identify a directed connection between two sockets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkEndpoints {
    /// Node on the output side.
    pub from_node: String,
    /// Output socket on `from_node`.
    pub from_socket: String,
    /// Node on the input side.
    pub to_node: String,
    /// Input socket on `to_node`.
    pub to_socket: String,
}

impl LinkEndpoints {
    /// Creates a new set of endpoints.
    pub fn new(
        from_node: impl Into<String>,
        from_socket: impl Into<String>,
        to_node: impl Into<String>,
        to_socket: impl Into<String>,
    ) -> Self {
        Self {
            from_node: from_node.into(),
            from_socket: from_socket.into(),
            to_node: to_node.into(),
            to_socket: to_socket.into(),
        }
    }
}

impl std::fmt::Display for LinkEndpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.from_node, self.from_socket, self.to_node, self.to_socket
        )
    }
}

/// A graph of named nodes whose named sockets can be wired together.
///
/// Each input socket accepts at most one incoming link.
pub trait NodeGraph {
    /// Node type of this graph.
    type Node: GraphNode;

    /// Human-readable name of the graph, used in error messages.
    fn label(&self) -> &str;

    /// Finds a node by name.
    fn find_node(&self, name: &str) -> Option<&Self::Node>;

    /// Returns the link feeding an input socket, if one exists.
    fn incoming_link(&self, node: &str, input: &str) -> Option<LinkEndpoints>;

    /// Connects an output socket to an input socket, replacing whatever was
    /// connected to the input before.
    fn connect(&mut self, link: &LinkEndpoints) -> Result<(), HostError>;
}
