//! Error types for bake sessions.

use bakery_core::{CacheError, HostError, LinkRestoreError};
use std::path::PathBuf;
use thiserror::Error;

use crate::format::{ColorDepth, FileFormat};

/// Result type for bake operations.
pub type BakeResult<T> = Result<T, BakeError>;

/// Errors that can occur while preparing or running a bake.
#[derive(Debug, Error)]
pub enum BakeError {
    /// No output directory configured.
    #[error("Choose a texture output path before baking.")]
    MissingExportPath,

    /// The file name delimiter contains a character not allowed in file names.
    #[error("Can't use illegal character \"{character}\" in file name delimiter.")]
    IllegalDelimiter { character: char },

    /// The texture set name is empty.
    #[error("Texture set name must not be empty")]
    EmptyTextureSetName,

    /// Texture size is zero.
    #[error("Texture size must be greater than zero")]
    ZeroTextureSize,

    /// A pass asks for a depth its format can't store.
    #[error("Bake pass '{pass}' uses color depth {depth}, which {format} does not support")]
    UnsupportedColorDepth {
        pass: String,
        format: FileFormat,
        depth: ColorDepth,
    },

    /// Baked textures can't be written in this format.
    #[error("No bake output extension is known for file format {format}")]
    UnsupportedOutputFormat { format: FileFormat },

    /// The pass name doesn't match any known pass kind.
    #[error("Unknown bake pass '{name}'")]
    UnknownPass { name: String },

    /// No enabled passes.
    #[error("No bake passes are enabled")]
    NoEnabledPasses,

    /// A material named by the caller has no shader graph.
    #[error("Material '{material}' has no node tree")]
    MissingMaterial { material: String },

    /// The material's output node has nothing connected to its surface input.
    #[error("Material '{material}' has nothing connected to '{node}:{socket}'")]
    MissingOutputLink {
        material: String,
        node: String,
        socket: String,
    },

    /// A shader node needed for rerouting is missing a socket.
    #[error("Node '{node}' in material '{material}' has no '{socket}' input")]
    MissingShaderInput {
        material: String,
        node: String,
        socket: String,
    },

    /// A snapshot operation failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A cached link could not be recreated.
    #[error(transparent)]
    LinkRestore(#[from] LinkRestoreError),

    /// The host refused an operation.
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    /// The host's bake call failed.
    #[error("Baking pass '{pass}' failed: {message}")]
    BakeFailed { pass: String, message: String },

    /// Failed to read a settings file.
    #[error("Failed to read settings from {path}: {source}")]
    ReadSettings {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a settings or scene file.
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl BakeError {
    /// Creates a new bake failed error.
    pub fn bake_failed(pass: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BakeFailed {
            pass: pass.into(),
            message: message.into(),
        }
    }

    /// Returns a stable error code for reporting.
    pub fn code(&self) -> &'static str {
        match self {
            BakeError::MissingExportPath => "BAKE_001",
            BakeError::IllegalDelimiter { .. } => "BAKE_002",
            BakeError::EmptyTextureSetName => "BAKE_003",
            BakeError::ZeroTextureSize => "BAKE_004",
            BakeError::UnsupportedColorDepth { .. } => "BAKE_005",
            BakeError::UnsupportedOutputFormat { .. } => "BAKE_006",
            BakeError::UnknownPass { .. } => "BAKE_007",
            BakeError::NoEnabledPasses => "BAKE_008",
            BakeError::MissingMaterial { .. } => "BAKE_009",
            BakeError::MissingOutputLink { .. } => "BAKE_010",
            BakeError::MissingShaderInput { .. } => "BAKE_011",
            BakeError::Cache(e) => e.code(),
            BakeError::LinkRestore(e) => e.code(),
            BakeError::Host(_) => "BAKE_012",
            BakeError::BakeFailed { .. } => "BAKE_013",
            BakeError::ReadSettings { .. } => "BAKE_014",
            BakeError::Json(_) => "BAKE_015",
        }
    }

    /// Returns true if the error was found before any scene state changed.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BakeError::MissingExportPath
                | BakeError::IllegalDelimiter { .. }
                | BakeError::EmptyTextureSetName
                | BakeError::ZeroTextureSize
                | BakeError::UnsupportedColorDepth { .. }
                | BakeError::UnsupportedOutputFormat { .. }
                | BakeError::UnknownPass { .. }
                | BakeError::NoEnabledPasses
        )
    }
}
