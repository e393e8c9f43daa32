//! Error types for snapshot and link caching.

use thiserror::Error;

/// Result type for snapshot operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors raised by the host introspection layer.
///
/// These come back from [`crate::reflect::Subject`] and
/// [`crate::graph::NodeGraph`] implementations. The snapshot layer collects
/// them per field instead of propagating them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The struct has no field with this name.
    #[error("'{type_name}' has no field '{field}'")]
    NoSuchField { type_name: String, field: String },

    /// The field cannot be written.
    #[error("field '{field}' is read-only")]
    ReadOnly { field: String },

    /// The value does not match the field's type.
    #[error("field '{field}' expects {expected}, got {found}")]
    WrongType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The value is not a legal choice. `message` is the host's own text.
    #[error("{message}")]
    InvalidChoice { field: String, message: String },

    /// Any other refusal from the host.
    #[error("host rejected the operation: {0}")]
    Rejected(String),
}

impl HostError {
    /// Creates a new rejected error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

/// Errors that can occur while working with a property snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CacheError {
    /// `set` was called with a path the snapshot does not track.
    #[error("snapshot was captured from '{subject_type}', which has no \"{path}\" property")]
    UnknownField { subject_type: String, path: String },

    /// `apply` was called on a subject of a different type.
    #[error("snapshot was captured from '{expected}' and can't be applied to '{found}'")]
    TypeMismatch { expected: String, found: String },

    /// The host failed while a subject was being read.
    #[error("failed to read '{path}': {source}")]
    Capture {
        path: String,
        #[source]
        source: HostError,
    },
}

impl CacheError {
    /// Returns a stable error code for reporting.
    pub fn code(&self) -> &'static str {
        match self {
            CacheError::UnknownField { .. } => "CACHE_001",
            CacheError::TypeMismatch { .. } => "CACHE_002",
            CacheError::Capture { .. } => "CACHE_003",
        }
    }
}

/// Errors raised when a cached node link can't be recreated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkRestoreError {
    /// A node named by the link no longer exists.
    #[error("Node link could not be made in {graph} because {node} was not found in the node tree.")]
    MissingNode { graph: String, node: String },

    /// The source node has no output socket with this name.
    #[error("Node link could not be made in {graph} because {node} does not have the required {socket} output socket.")]
    MissingOutput {
        graph: String,
        node: String,
        socket: String,
    },

    /// The destination node has no input socket with this name.
    #[error("Node link could not be made in {graph} because {node} does not have the required {socket} input socket.")]
    MissingInput {
        graph: String,
        node: String,
        socket: String,
    },

    /// The host refused to create the link.
    #[error("Node link could not be made in {graph}: {source}")]
    Connect {
        graph: String,
        #[source]
        source: HostError,
    },
}

impl LinkRestoreError {
    /// Returns a stable error code for reporting.
    pub fn code(&self) -> &'static str {
        match self {
            LinkRestoreError::MissingNode { .. } => "LINK_001",
            LinkRestoreError::MissingOutput { .. } => "LINK_002",
            LinkRestoreError::MissingInput { .. } => "LINK_003",
            LinkRestoreError::Connect { .. } => "LINK_004",
        }
    }

    /// Returns the name of the node the error refers to, if any.
    pub fn node(&self) -> Option<&str> {
        match self {
            LinkRestoreError::MissingNode { node, .. }
            | LinkRestoreError::MissingOutput { node, .. }
            | LinkRestoreError::MissingInput { node, .. } => Some(node),
            LinkRestoreError::Connect { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::UnknownField {
            subject_type: "RenderSettings".to_string(),
            path: "does.not.exist".to_string(),
        };
        assert!(err.to_string().contains("\"does.not.exist\""));
        assert_eq!(err.code(), "CACHE_001");

        let err = LinkRestoreError::MissingNode {
            graph: "Material".to_string(),
            node: "Principled BSDF".to_string(),
        };
        assert!(err.to_string().contains("Principled BSDF was not found"));
        assert_eq!(err.node(), Some("Principled BSDF"));
    }

    #[test]
    fn test_invalid_choice_shows_host_message() {
        let err = HostError::InvalidChoice {
            field: "engine".to_string(),
            message: "enum \"FOO\" not found in ('CYCLES')".to_string(),
        };
        assert_eq!(err.to_string(), "enum \"FOO\" not found in ('CYCLES')");
    }

    #[test]
    fn test_connect_error_carries_host_error() {
        fn connect(message: &str) -> LinkRestoreError {
            LinkRestoreError::Connect {
                graph: "Material".to_string(),
                source: HostError::rejected(message),
            }
        }
        let err = connect("socket types don't match");
        assert_eq!(err, connect("socket types don't match"));
        assert_ne!(err, connect("node is hidden"));
        assert_eq!(err.code(), "LINK_004");
        assert_eq!(err.node(), None);

        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(
            source.to_string(),
            "host rejected the operation: socket types don't match"
        );
    }
}
