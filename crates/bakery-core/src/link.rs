//! Name-based caching of node graph links.
//!
//! A [`NodeLinkSnapshot`] remembers a connection by the names of its nodes
//! and sockets, so it survives any edit to the graph (including deletion of
//! the original link or nodes) and can be recreated afterwards.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LinkRestoreError;
use crate::graph::{GraphNode, LinkEndpoints, NodeGraph};

/// A cached node link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLinkSnapshot {
    endpoints: LinkEndpoints,
}

impl NodeLinkSnapshot {
    /// Captures an existing link.
    pub fn capture(link: &LinkEndpoints) -> Self {
        Self {
            endpoints: link.clone(),
        }
    }

    /// Captures the link feeding `input` on `node`.
    ///
    /// Returns `None` when nothing is connected to that socket.
    pub fn capture_input<G: NodeGraph + ?Sized>(
        graph: &G,
        node: &str,
        input: &str,
    ) -> Option<Self> {
        graph.incoming_link(node, input).map(|endpoints| Self { endpoints })
    }

    /// Returns the cached endpoint names.
    pub fn endpoints(&self) -> &LinkEndpoints {
        &self.endpoints
    }

    /// Recreates the link in `graph`.
    ///
    /// All four endpoints are resolved before anything is connected, so a
    /// missing node or socket leaves the graph untouched. Whatever was
    /// connected to the destination socket is replaced. Restoring twice just
    /// makes the same link again.
    pub fn restore<G: NodeGraph + ?Sized>(&self, graph: &mut G) -> Result<(), LinkRestoreError> {
        let link = &self.endpoints;
        let graph_name = graph.label().to_string();

        let from = graph
            .find_node(&link.from_node)
            .ok_or_else(|| LinkRestoreError::MissingNode {
                graph: graph_name.clone(),
                node: link.from_node.clone(),
            })?;
        if !from.has_output(&link.from_socket) {
            return Err(LinkRestoreError::MissingOutput {
                graph: graph_name,
                node: link.from_node.clone(),
                socket: link.from_socket.clone(),
            });
        }

        let to = graph
            .find_node(&link.to_node)
            .ok_or_else(|| LinkRestoreError::MissingNode {
                graph: graph_name.clone(),
                node: link.to_node.clone(),
            })?;
        if !to.has_input(&link.to_socket) {
            return Err(LinkRestoreError::MissingInput {
                graph: graph_name,
                node: link.to_node.clone(),
                socket: link.to_socket.clone(),
            });
        }

        graph
            .connect(link)
            .map_err(|source| LinkRestoreError::Connect {
                graph: graph_name,
                source,
            })?;
        debug!(graph = graph.label(), %link, "restored node link");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SocketType;
    use crate::memory::{MemoryGraph, MemoryNode};

    fn graph() -> MemoryGraph {
        let mut graph = MemoryGraph::new("Material");
        graph.add_node(
            MemoryNode::new("Principled BSDF", "ShaderNodeBsdfPrincipled")
                .input("Roughness", SocketType::Value, 0.5)
                .output("BSDF"),
        );
        graph.add_node(
            MemoryNode::new("Material Output", "ShaderNodeOutputMaterial")
                .input("Surface", SocketType::Shader, crate::value::Value::Null)
                .input("Volume", SocketType::Shader, crate::value::Value::Null),
        );
        graph
            .connect(&LinkEndpoints::new("Principled BSDF", "BSDF", "Material Output", "Surface"))
            .unwrap();
        graph
    }

    #[test]
    fn test_capture_input_without_link() {
        let graph = graph();
        assert!(NodeLinkSnapshot::capture_input(&graph, "Material Output", "Volume").is_none());
    }

    #[test]
    fn test_missing_output_socket() {
        let mut graph = graph();
        let snapshot = NodeLinkSnapshot::capture(&LinkEndpoints::new(
            "Principled BSDF",
            "Emission",
            "Material Output",
            "Surface",
        ));
        let err = snapshot.restore(&mut graph).unwrap_err();
        assert!(matches!(err, LinkRestoreError::MissingOutput { .. }));
        assert!(err.to_string().contains("Emission output socket"));
    }

    #[test]
    fn test_missing_input_socket() {
        let mut graph = graph();
        let snapshot = NodeLinkSnapshot::capture(&LinkEndpoints::new(
            "Principled BSDF",
            "BSDF",
            "Material Output",
            "Displacement",
        ));
        let err = snapshot.restore(&mut graph).unwrap_err();
        assert!(matches!(err, LinkRestoreError::MissingInput { .. }));
    }

    #[test]
    fn test_restore_twice_is_redundant() {
        let mut graph = graph();
        let snapshot =
            NodeLinkSnapshot::capture_input(&graph, "Material Output", "Surface").unwrap();
        snapshot.restore(&mut graph).unwrap();
        snapshot.restore(&mut graph).unwrap();
        assert_eq!(graph.links().len(), 1);
    }
}
