//! An in-memory scene implementing [`BakeHost`].
//!
//! Scenes load from JSON and record every bake and save call instead of
//! rendering, so a full session can run offline. The builders here produce
//! settings structs shaped like the host's own.

use bakery_core::memory::{MemoryGraph, MemoryNode, MemoryStruct};
use bakery_core::reflect::read_path;
use bakery_core::{HostError, LinkEndpoints, SocketType, Subject, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{BakeError, BakeResult};
use crate::format::{ColorDepth, FileFormat};
use crate::host::{
    node_kind, BakeHost, BakeRequest, ImageRequest, ShaderGraph, OUTPUT_NODE, PRINCIPLED_NODE,
    SURFACE_INPUT,
};

/// Display devices a scene accepts unless told otherwise.
pub const DISPLAY_DEVICES: [&str; 4] = ["sRGB", "XYZ", "Display P3", "None"];

fn default_display_device() -> String {
    "sRGB".to_string()
}

fn default_display_devices() -> Vec<String> {
    DISPLAY_DEVICES.iter().map(|d| d.to_string()).collect()
}

/// A bake call as the scene saw it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BakeRecord {
    pub request: BakeRequest,
    /// Image held by the target material's active node.
    pub image: String,
    /// Display device at bake time.
    pub display_device: String,
    /// `bake.image_settings.file_format` at bake time.
    pub file_format: String,
    /// Render engine at bake time.
    pub engine: String,
}

/// A texture the scene was asked to write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedImage {
    pub image: String,
    pub path: PathBuf,
}

/// A scene held in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryScene {
    /// Render settings.
    pub render: MemoryStruct,
    /// Path tracer settings.
    pub cycles: MemoryStruct,
    #[serde(default = "default_display_device")]
    pub display_device: String,
    #[serde(default = "default_display_devices")]
    pub display_devices: Vec<String>,
    /// Registered render engines.
    #[serde(default)]
    pub engines: Vec<String>,
    #[serde(default)]
    pub materials: BTreeMap<String, MemoryGraph>,
    #[serde(default)]
    pub images: BTreeMap<String, ImageRequest>,
    /// Passes whose bake call fails.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub failing_passes: BTreeSet<String>,
    #[serde(skip)]
    pub bakes: Vec<BakeRecord>,
    #[serde(skip)]
    pub saved: Vec<SavedImage>,
}

impl MemoryScene {
    /// Creates a scene with the given settings and no materials.
    pub fn new(render: MemoryStruct, cycles: MemoryStruct) -> Self {
        Self {
            render,
            cycles,
            display_device: default_display_device(),
            display_devices: default_display_devices(),
            engines: vec!["CYCLES".to_string()],
            materials: BTreeMap::new(),
            images: BTreeMap::new(),
            failing_passes: BTreeSet::new(),
            bakes: Vec::new(),
            saved: Vec::new(),
        }
    }

    /// A scene with host-like settings and one PBR material named `Crate`.
    pub fn demo() -> Self {
        Self::new(render_settings(), cycles_settings())
            .with_material("Crate", pbr_material("Crate"))
    }

    /// Parses a scene from JSON.
    pub fn from_json_str(json: &str) -> BakeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a scene from a JSON file.
    pub fn from_json_file(path: &Path) -> BakeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| BakeError::ReadSettings {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Adds a material.
    pub fn with_material(mut self, name: impl Into<String>, graph: MemoryGraph) -> Self {
        self.materials.insert(name.into(), graph);
        self
    }

    /// Makes the bake call fail for a pass.
    pub fn fail_pass(mut self, pass: impl Into<String>) -> Self {
        self.failing_passes.insert(pass.into());
        self
    }

    /// Returns a material's graph.
    pub fn material(&self, name: &str) -> Option<&MemoryGraph> {
        self.materials.get(name)
    }

    fn active_image(&self, material: &str) -> Result<String, HostError> {
        let graph = self
            .materials
            .get(material)
            .ok_or_else(|| HostError::rejected(format!("material '{}' not found", material)))?;
        graph
            .active()
            .and_then(|name| graph.find(name))
            .and_then(|node| node.image.clone())
            .ok_or_else(|| {
                HostError::rejected(format!(
                    "No active image found in material \"{}\"",
                    material
                ))
            })
    }

    fn read_str(&self, root: &dyn Subject, path: &str) -> String {
        match read_path(root, path) {
            Ok(Some(Value::Str(s))) => s,
            _ => String::new(),
        }
    }
}

impl BakeHost for MemoryScene {
    type Graph = MemoryGraph;

    fn render_settings(&mut self) -> &mut dyn Subject {
        &mut self.render
    }

    fn cycles_settings(&mut self) -> &mut dyn Subject {
        &mut self.cycles
    }

    fn registered_engines(&self) -> Vec<String> {
        self.engines.clone()
    }

    fn display_device(&self) -> String {
        self.display_device.clone()
    }

    fn set_display_device(&mut self, device: &str) -> Result<(), HostError> {
        if !self.display_devices.iter().any(|d| d == device) {
            let quoted: Vec<String> = self
                .display_devices
                .iter()
                .map(|d| format!("'{}'", d))
                .collect();
            return Err(HostError::InvalidChoice {
                field: "display_device".to_string(),
                message: format!(
                    "bpy_struct: item.attr = val: enum \"{}\" not found in ({})",
                    device,
                    quoted.join(", ")
                ),
            });
        }
        self.display_device = device.to_string();
        Ok(())
    }

    fn material_graph(&mut self, material: &str) -> Option<&mut MemoryGraph> {
        self.materials.get_mut(material)
    }

    fn prepare_image(&mut self, request: &ImageRequest) -> Result<(), HostError> {
        if request.width == 0 || request.height == 0 {
            return Err(HostError::rejected("image dimensions must be positive"));
        }
        self.images.insert(request.name.clone(), request.clone());
        Ok(())
    }

    fn bake(&mut self, request: &BakeRequest) -> Result<(), HostError> {
        if self.failing_passes.contains(&request.pass) {
            return Err(HostError::rejected(format!("bake of '{}' was cancelled", request.pass)));
        }
        let image = self.active_image(&request.target_material)?;
        if !self.images.contains_key(&image) {
            return Err(HostError::rejected(format!("image '{}' has no buffer", image)));
        }
        let record = BakeRecord {
            request: request.clone(),
            image,
            display_device: self.display_device.clone(),
            file_format: self.read_str(&self.render, "bake.image_settings.file_format"),
            engine: self.read_str(&self.render, "engine"),
        };
        debug!(pass = %request.pass, image = %record.image, "recorded bake");
        self.bakes.push(record);
        Ok(())
    }

    fn save_image(&mut self, image: &str, path: &Path) -> Result<(), HostError> {
        if !self.images.contains_key(image) {
            return Err(HostError::rejected(format!("image '{}' not found", image)));
        }
        self.saved.push(SavedImage {
            image: image.to_string(),
            path: path.to_path_buf(),
        });
        Ok(())
    }
}

/// Builds a node of a host node type with its standard sockets.
pub fn node_template(kind: &str, name: &str) -> Option<MemoryNode> {
    match kind {
        node_kind::EMISSION => Some(emission_node(name)),
        node_kind::IMAGE_TEXTURE => Some(image_texture_node(name)),
        node_kind::PRINCIPLED => Some(principled_node(name)),
        node_kind::OUTPUT => Some(output_node(name)),
        _ => None,
    }
}

fn emission_node(name: &str) -> MemoryNode {
    MemoryNode::new(name, node_kind::EMISSION)
        .input("Color", SocketType::Rgba, vec![1.0, 1.0, 1.0, 1.0])
        .input("Strength", SocketType::Value, 1.0)
        .output("Emission")
}

fn image_texture_node(name: &str) -> MemoryNode {
    MemoryNode::new(name, node_kind::IMAGE_TEXTURE)
        .input("Vector", SocketType::Vector, Value::Null)
        .output("Color")
        .output("Alpha")
}

fn principled_node(name: &str) -> MemoryNode {
    MemoryNode::new(name, node_kind::PRINCIPLED)
        .input("Base Color", SocketType::Rgba, vec![0.8, 0.8, 0.8, 1.0])
        .input("Metallic", SocketType::Value, 0.0)
        .input("Roughness", SocketType::Value, 0.5)
        .input("Normal", SocketType::Vector, Value::Null)
        .input("Emission", SocketType::Rgba, vec![0.0, 0.0, 0.0, 1.0])
        .output("BSDF")
}

fn output_node(name: &str) -> MemoryNode {
    MemoryNode::new(name, node_kind::OUTPUT)
        .input("Surface", SocketType::Shader, Value::Null)
        .input("Volume", SocketType::Shader, Value::Null)
        .input("Displacement", SocketType::Vector, Value::Null)
}

impl ShaderGraph for MemoryGraph {
    fn add_node(&mut self, kind: &str, name: &str) -> Result<String, HostError> {
        let node = node_template(kind, name)
            .ok_or_else(|| HostError::rejected(format!("unknown node type '{}'", kind)))?;
        Ok(MemoryGraph::add_node(self, node))
    }

    fn remove_node(&mut self, name: &str) -> Result<(), HostError> {
        if MemoryGraph::remove_node(self, name) {
            Ok(())
        } else {
            Err(HostError::rejected(format!("node '{}' not found in {}", name, self.label)))
        }
    }

    fn input_socket(&self, node: &str, input: &str) -> Option<(SocketType, Value)> {
        self.find(node)?
            .input_socket(input)
            .map(|s| (s.socket_type, s.default.clone()))
    }

    fn set_input_default(
        &mut self,
        node: &str,
        input: &str,
        value: &Value,
    ) -> Result<(), HostError> {
        let socket = self
            .find_mut(node)
            .and_then(|n| n.input_socket_mut(input))
            .ok_or_else(|| {
                HostError::rejected(format!("no input '{}' on node '{}'", input, node))
            })?;
        socket.default = value.clone();
        Ok(())
    }

    fn assign_image(&mut self, node: &str, image: &str) -> Result<(), HostError> {
        let target = self
            .find_mut(node)
            .ok_or_else(|| HostError::rejected(format!("node '{}' not found", node)))?;
        if target.kind != node_kind::IMAGE_TEXTURE {
            return Err(HostError::rejected(format!("node '{}' does not hold an image", node)));
        }
        target.image = Some(image.to_string());
        Ok(())
    }

    fn set_active_node(&mut self, node: &str) -> Result<(), HostError> {
        if self.set_active(node) {
            Ok(())
        } else {
            Err(HostError::rejected(format!("node '{}' not found", node)))
        }
    }
}

/// Image format settings shaped like the host's.
pub fn image_format_settings() -> MemoryStruct {
    let formats: Vec<&str> = FileFormat::ALL.iter().map(|f| f.identifier()).collect();
    let depths = [
        ColorDepth::Eight,
        ColorDepth::Ten,
        ColorDepth::Twelve,
        ColorDepth::Sixteen,
        ColorDepth::ThirtyTwo,
    ];
    MemoryStruct::new("ImageFormatSettings")
        .read_only_scalar("rna_type", "ImageFormatSettings")
        .choice("file_format", "PNG", formats)
        // The legal depths follow the file format, so the host can't list them.
        .opaque_choice("color_depth", "8", depths.iter().map(|d| d.identifier()))
        .choice("color_mode", "RGBA", ["BW", "RGB", "RGBA"])
        .choice("color_management", "FOLLOW_SCENE", ["FOLLOW_SCENE", "OVERRIDE"])
        .choice("tiff_codec", "DEFLATE", ["NONE", "DEFLATE", "LZW", "PACKBITS"])
        .scalar("quality", 90)
        .scalar("compression", 15)
        .nested(
            "view_settings",
            MemoryStruct::new("ColorManagedViewSettings")
                .choice("look", "None", ["None", "Medium Contrast", "High Contrast"])
                .choice("view_transform", "Standard", ["Standard", "Filmic", "Raw"])
                .scalar("exposure", 0.0)
                .scalar("gamma", 1.0)
                .scalar("use_curve_mapping", false)
                .unset("curve_mapping"),
        )
        .nested(
            "linear_colorspace_settings",
            MemoryStruct::new("ColorManagedInputColorspaceSettings")
                .scalar("is_data", false)
                .choice(
                    "name",
                    "Linear Rec.709",
                    ["Linear Rec.709", "sRGB", "Raw", "Non-Color"],
                ),
        )
}

/// Render settings shaped like the host's, set up for the rasterizer.
pub fn render_settings() -> MemoryStruct {
    MemoryStruct::new("RenderSettings")
        .read_only_scalar("rna_type", "RenderSettings")
        .choice("engine", "BLENDER_EEVEE", ["BLENDER_EEVEE", "BLENDER_WORKBENCH", "CYCLES"])
        .scalar("resolution_x", 1920)
        .scalar("resolution_y", 1080)
        .scalar("resolution_percentage", 100)
        .scalar("use_file_extension", false)
        .read_only_scalar("is_movie_format", false)
        .nested(
            "bake",
            MemoryStruct::new("BakeSettings")
                .scalar("margin", 16)
                .scalar("cage_extrusion", 0.0)
                .scalar("use_selected_to_active", false)
                .choice("target", "VERTEX_COLORS", ["IMAGE_TEXTURES", "VERTEX_COLORS"])
                .nested("image_settings", image_format_settings()),
        )
        .nested("image_settings", image_format_settings())
        .collection("views", Vec::new())
}

/// Path tracer settings shaped like the host's.
pub fn cycles_settings() -> MemoryStruct {
    MemoryStruct::new("CyclesRenderSettings")
        .read_only_scalar("rna_type", "CyclesRenderSettings")
        .opaque_choice("device", "CPU", ["CPU", "GPU"])
        .scalar("samples", 4096)
        .scalar("preview_samples", 1024)
        .scalar("use_adaptive_sampling", true)
        .scalar("adaptive_threshold", 0.01)
        .scalar("use_denoising", true)
}

/// A material whose principled shader takes its base color from an image.
pub fn pbr_material(name: &str) -> MemoryGraph {
    let mut albedo = image_texture_node("Image Texture");
    albedo.image = Some(format!("{}_albedo", name));
    MemoryGraph::new(name)
        .with_node(output_node(OUTPUT_NODE))
        .with_node(principled_node(PRINCIPLED_NODE))
        .with_node(albedo)
        .with_link(LinkEndpoints::new(
            PRINCIPLED_NODE,
            "BSDF",
            OUTPUT_NODE,
            SURFACE_INPUT,
        ))
        .with_link(LinkEndpoints::new(
            "Image Texture",
            "Color",
            PRINCIPLED_NODE,
            "Base Color",
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bakery_core::NodeGraph;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_demo_material_links() {
        let scene = MemoryScene::demo();
        let graph = scene.material("Crate").unwrap();
        assert_eq!(
            graph.incoming_link(OUTPUT_NODE, SURFACE_INPUT),
            Some(LinkEndpoints::new(PRINCIPLED_NODE, "BSDF", OUTPUT_NODE, SURFACE_INPUT))
        );
        assert_eq!(
            graph.incoming_link(PRINCIPLED_NODE, "Base Color").unwrap().from_node,
            "Image Texture"
        );
    }

    #[test]
    fn test_pbr_material_links_connect() {
        let graph = pbr_material("Crate");
        assert_eq!(graph.links().len(), 2);
        let mut relinked = graph.clone();
        for link in graph.links() {
            relinked.connect(link).unwrap();
        }
        assert_eq!(relinked.links().len(), 2);
        assert_eq!(
            graph.find("Image Texture").unwrap().image.as_deref(),
            Some("Crate_albedo")
        );
    }

    #[test]
    fn test_shader_graph_editing() {
        let mut graph = pbr_material("Crate");
        let name = ShaderGraph::add_node(&mut graph, node_kind::EMISSION, "Emission").unwrap();
        graph
            .set_input_default(&name, "Color", &Value::Array(vec![0.5, 0.5, 0.5, 1.0]))
            .unwrap();
        assert_eq!(
            graph.input_socket(&name, "Color"),
            Some((SocketType::Rgba, Value::Array(vec![0.5, 0.5, 0.5, 1.0])))
        );
        assert!(graph.assign_image(&name, "img").is_err());
        ShaderGraph::remove_node(&mut graph, &name).unwrap();
        assert!(ShaderGraph::remove_node(&mut graph, &name).is_err());
        assert!(ShaderGraph::add_node(&mut graph, "ShaderNodeMystery", "M").is_err());
    }

    #[test]
    fn test_bake_requires_active_image() {
        let mut scene = MemoryScene::demo();
        let request = BakeRequest {
            pass: "Roughness".to_string(),
            source_material: "Crate".to_string(),
            target_material: "Crate".to_string(),
            bake_type: crate::pass::BakeType::Emit,
            margin: 0,
            use_selected_to_active: false,
            use_clear: false,
        };
        let err = scene.bake(&request).unwrap_err();
        assert!(err.to_string().contains("No active image"));
        assert!(scene.bakes.is_empty());
    }

    #[test]
    fn test_display_device_rejects_unknown() {
        let mut scene = MemoryScene::demo();
        scene.set_display_device("XYZ").unwrap();
        assert!(matches!(
            scene.set_display_device("ACES"),
            Err(HostError::InvalidChoice { .. })
        ));
        assert_eq!(scene.display_device(), "XYZ");
    }

    #[test]
    fn test_scene_json_roundtrip_drops_records() {
        let mut scene = MemoryScene::demo();
        scene.saved.push(SavedImage {
            image: "x".to_string(),
            path: PathBuf::from("/tmp/x.png"),
        });
        let json = serde_json::to_string(&scene).unwrap();
        let loaded = MemoryScene::from_json_str(&json).unwrap();
        assert!(loaded.saved.is_empty());
        assert_eq!(loaded.materials, scene.materials);
        assert_eq!(loaded.engines, vec!["CYCLES".to_string()]);
    }
}
