//! The scene handle a bake session drives.
//!
//! The session never reaches for global host state. Everything it touches
//! (render settings, materials, images, the bake call itself) goes through a
//! [`BakeHost`] passed in by the caller, so sessions can run against
//! [`crate::scene::MemoryScene`] as well as a live host.

use bakery_core::{HostError, NodeGraph, SocketType, Subject, Value};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::pass::BakeType;

/// Name of the material output node.
pub const OUTPUT_NODE: &str = "Material Output";
/// Surface input of the material output node.
pub const SURFACE_INPUT: &str = "Surface";
/// Name given to the image node that receives the bake.
pub const BAKE_IMAGE_NODE: &str = "BakingTexture";
/// The shader node the rerouting understands.
pub const PRINCIPLED_NODE: &str = "Principled BSDF";

/// Host node types created during a bake.
pub mod node_kind {
    pub const EMISSION: &str = "ShaderNodeEmission";
    pub const IMAGE_TEXTURE: &str = "ShaderNodeTexImage";
    pub const PRINCIPLED: &str = "ShaderNodeBsdfPrincipled";
    pub const OUTPUT: &str = "ShaderNodeOutputMaterial";
}

/// A shader graph that can be edited with temporary nodes.
pub trait ShaderGraph: NodeGraph {
    /// Adds a node of a host node type and returns the name it was given,
    /// which may differ from `name` if that is taken.
    fn add_node(&mut self, kind: &str, name: &str) -> Result<String, HostError>;

    /// Removes a node and every link touching it.
    fn remove_node(&mut self, name: &str) -> Result<(), HostError>;

    /// Returns the type and default value of an input socket.
    fn input_socket(&self, node: &str, input: &str) -> Option<(SocketType, Value)>;

    /// Sets the default value of an unlinked input socket.
    fn set_input_default(
        &mut self,
        node: &str,
        input: &str,
        value: &Value,
    ) -> Result<(), HostError>;

    /// Assigns an image to an image texture node.
    fn assign_image(&mut self, node: &str, image: &str) -> Result<(), HostError>;

    /// Makes a node the active node. The bake writes into the active image node.
    fn set_active_node(&mut self, node: &str) -> Result<(), HostError>;
}

/// An image to create (or recreate) before a pass bakes into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub float_buffer: bool,
    pub colorspace: String,
}

/// Arguments of the host's bake call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BakeRequest {
    /// Pass being baked.
    pub pass: String,
    /// Material whose shader graph feeds the bake.
    pub source_material: String,
    /// Material holding the active image node that receives the bake.
    pub target_material: String,
    pub bake_type: BakeType,
    pub margin: u32,
    pub use_selected_to_active: bool,
    pub use_clear: bool,
}

/// The scene a bake session runs against.
pub trait BakeHost {
    /// Shader graph type of the scene's materials.
    type Graph: ShaderGraph;

    /// The scene's render settings.
    fn render_settings(&mut self) -> &mut dyn Subject;

    /// The path tracer's settings.
    fn cycles_settings(&mut self) -> &mut dyn Subject;

    /// Identifiers of registered render engines beyond the built-in ones.
    fn registered_engines(&self) -> Vec<String>;

    /// Current display device.
    fn display_device(&self) -> String;

    /// Switches the display device.
    fn set_display_device(&mut self, device: &str) -> Result<(), HostError>;

    /// Looks up a material's shader graph.
    fn material_graph(&mut self, material: &str) -> Option<&mut Self::Graph>;

    /// Creates an image, replacing any existing image of the same name.
    fn prepare_image(&mut self, request: &ImageRequest) -> Result<(), HostError>;

    /// Runs the bake. Opaque and synchronous from the session's side.
    fn bake(&mut self, request: &BakeRequest) -> Result<(), HostError>;

    /// Saves a baked image to disk.
    fn save_image(&mut self, image: &str, path: &Path) -> Result<(), HostError>;
}
