//! The bake session.
//!
//! A session reconfigures the scene for baking, runs every enabled pass
//! against every source material and puts the scene back the way it found
//! it. Render settings, path tracer settings and the display device are
//! restored from snapshots whether the passes succeed or not.

use bakery_core::reflect::{resolve_struct, resolve_struct_mut};
use bakery_core::{
    ApplyReport, ChoiceResolver, HostError, LinkEndpoints, NodeLinkSnapshot, PropertySnapshot,
    ResolverChain, SocketType, Value,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{BakeError, BakeResult};
use crate::host::{
    node_kind, BakeHost, BakeRequest, ImageRequest, ShaderGraph, BAKE_IMAGE_NODE, OUTPUT_NODE,
    PRINCIPLED_NODE, SURFACE_INPUT,
};
use crate::image_settings::image_overlays;
use crate::pass::{BakePassKind, BakePassSpec, BakeType};
use crate::settings::BakeToolSettings;

/// Image settings used by the bake call.
pub const BAKE_IMAGE_SETTINGS: &str = "bake.image_settings";
/// Image settings used when saving textures.
pub const OUTPUT_IMAGE_SETTINGS: &str = "image_settings";

/// The materials a session bakes from and into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BakeMaterials {
    /// Materials whose shader graphs feed the bake.
    pub sources: Vec<String>,
    /// Material that holds the image node receiving the bake.
    pub target: String,
}

impl BakeMaterials {
    /// A material baking onto itself.
    pub fn self_bake(material: impl Into<String>) -> Self {
        let material = material.into();
        Self {
            sources: vec![material.clone()],
            target: material,
        }
    }

    /// Several source materials baking onto one target.
    pub fn selected_to_active(
        sources: impl IntoIterator<Item = impl Into<String>>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            target: target.into(),
        }
    }
}

/// A texture written by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BakedTexture {
    pub pass: String,
    pub source_material: String,
    pub image: String,
    pub path: PathBuf,
}

/// Outcome of [`BakeSession::run`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BakeReport {
    /// Textures written, in bake order.
    pub outputs: Vec<BakedTexture>,
    /// Problems that stopped the pass loop without failing the session.
    pub warnings: Vec<String>,
    /// Applying the bake overlay to render and path tracer settings.
    pub setup: ApplyReport,
    /// Applying per-pass image settings overlays.
    pub image_settings: ApplyReport,
    /// Restoring the captured settings.
    pub restore: ApplyReport,
}

impl BakeReport {
    /// Returns true if no warnings were raised and every write was accepted.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
            && self.setup.is_clean()
            && self.image_settings.is_clean()
            && self.restore.is_clean()
    }
}

/// One planned bake, computed without touching a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedPass {
    pub pass: String,
    pub image: String,
    pub path: PathBuf,
    pub bake_type: BakeType,
    pub display_device: String,
    pub reroute: bool,
    pub float_buffer: bool,
}

/// Scene state captured before a bake.
struct SceneState {
    render: PropertySnapshot,
    cycles: PropertySnapshot,
    display_device: String,
}

impl SceneState {
    fn capture<H: BakeHost>(host: &mut H) -> BakeResult<Self> {
        Ok(Self {
            render: PropertySnapshot::capture(host.render_settings())?,
            cycles: PropertySnapshot::capture(host.cycles_settings())?,
            display_device: host.display_device(),
        })
    }

    fn restore<H: BakeHost>(
        &self,
        host: &mut H,
        resolver: &dyn ChoiceResolver,
    ) -> BakeResult<ApplyReport> {
        let display = host.set_display_device(&self.display_device);
        let mut report = self.render.apply(host.render_settings(), resolver)?;
        report.merge(self.cycles.apply(host.cycles_settings(), resolver)?);
        display?;
        Ok(report)
    }
}

/// Temporary nodes, by material.
type TempNodes = BTreeMap<String, Vec<String>>;

/// A single bake of one pass from one source material.
struct PassStep<'a> {
    pass: &'a BakePassSpec,
    kind: BakePassKind,
    overlay: &'a PropertySnapshot,
    source: &'a str,
    target: &'a str,
}

/// Runs bake passes against a scene.
#[derive(Debug, Clone)]
pub struct BakeSession {
    settings: BakeToolSettings,
    passes: Vec<BakePassSpec>,
}

impl BakeSession {
    /// Creates a session.
    pub fn new(settings: BakeToolSettings, passes: Vec<BakePassSpec>) -> Self {
        Self { settings, passes }
    }

    /// Returns the settings.
    pub fn settings(&self) -> &BakeToolSettings {
        &self.settings
    }

    /// Returns every configured pass, enabled or not.
    pub fn passes(&self) -> &[BakePassSpec] {
        &self.passes
    }

    /// Returns the passes that will run, in order.
    pub fn enabled_passes(&self) -> impl Iterator<Item = &BakePassSpec> {
        self.passes.iter().filter(|p| p.enabled)
    }

    /// Checks settings and enabled passes.
    pub fn validate(&self) -> BakeResult<()> {
        self.settings.validate()?;
        let mut any = false;
        for pass in self.enabled_passes() {
            pass.validate()?;
            any = true;
        }
        if !any {
            return Err(BakeError::NoEnabledPasses);
        }
        Ok(())
    }

    /// Lists what [`run`](Self::run) would bake and write, one entry per
    /// enabled pass.
    pub fn plan(&self) -> BakeResult<Vec<PlannedPass>> {
        self.validate()?;
        self.enabled_passes()
            .map(|pass| {
                let kind = pass.kind()?;
                Ok(PlannedPass {
                    pass: pass.name.clone(),
                    image: self.settings.texture_name(pass),
                    path: self.settings.output_file(pass)?,
                    bake_type: kind.bake_type(),
                    display_device: kind.display_device().to_string(),
                    reroute: kind.reroutes_through_emission(),
                    float_buffer: pass.float_buffer(),
                })
            })
            .collect()
    }

    /// Bakes every enabled pass from each source material into the target.
    ///
    /// Nothing in the scene is touched if validation fails. Once settings
    /// are captured they are restored before returning, on success and on
    /// error alike.
    pub fn run<H: BakeHost>(
        &self,
        host: &mut H,
        materials: &BakeMaterials,
    ) -> BakeResult<BakeReport> {
        self.validate()?;

        let resolver = ResolverChain::standard(host.registered_engines());
        let state = SceneState::capture(host)?;
        info!(
            passes = self.enabled_passes().count(),
            sources = materials.sources.len(),
            target = %materials.target,
            "starting bake"
        );

        let mut report = BakeReport::default();
        let outcome = self.run_passes(host, materials, &resolver, &mut report);
        let restored = state.restore(host, &resolver);

        match (outcome, restored) {
            (Ok(()), Ok(restore)) => {
                if !restore.is_clean() {
                    warn!(
                        rejected = restore.rejected_count(),
                        "some settings could not be restored"
                    );
                }
                report.restore = restore;
                info!(outputs = report.outputs.len(), "bake finished");
                Ok(report)
            }
            (Err(e), restored) => {
                if let Err(restore_err) = restored {
                    warn!(
                        error = %restore_err,
                        "restoring scene settings after a failed bake also failed"
                    );
                }
                Err(e)
            }
            (Ok(()), Err(e)) => Err(e),
        }
    }

    fn run_passes<H: BakeHost>(
        &self,
        host: &mut H,
        materials: &BakeMaterials,
        resolver: &ResolverChain,
        report: &mut BakeReport,
    ) -> BakeResult<()> {
        let (render_overlay, cycles_overlay) = self.bake_overlays(host)?;
        report.setup.merge(render_overlay.apply(host.render_settings(), resolver)?);
        report.setup.merge(cycles_overlay.apply(host.cycles_settings(), resolver)?);

        let passes: Vec<BakePassSpec> = self.enabled_passes().cloned().collect();
        let overlays = {
            let image_settings = resolve_struct(host.render_settings(), BAKE_IMAGE_SETTINGS)?
                .ok_or_else(|| unset_struct(BAKE_IMAGE_SETTINGS))?;
            image_overlays(image_settings, &passes)?
        };

        let mut links = Vec::with_capacity(materials.sources.len());
        for source in &materials.sources {
            let graph = material_graph(host, source)?;
            let link = NodeLinkSnapshot::capture_input(&*graph, OUTPUT_NODE, SURFACE_INPUT)
                .ok_or_else(|| BakeError::MissingOutputLink {
                    material: source.clone(),
                    node: OUTPUT_NODE.to_string(),
                    socket: SURFACE_INPUT.to_string(),
                })?;
            debug!(material = %source, link = %link.endpoints(), "cached output link");
            links.push((source.as_str(), link));
        }
        material_graph(host, &materials.target)?;

        for (pass, overlay) in passes.iter().zip(&overlays) {
            let kind = pass.kind()?;
            for (source, link) in &links {
                let step = PassStep {
                    pass,
                    kind,
                    overlay,
                    source,
                    target: &materials.target,
                };
                let mut temp = TempNodes::new();
                let outcome = self.bake_step(host, &step, resolver, &mut temp, report);
                let cleaned = remove_temporary_nodes(host, temp);
                let restored = material_graph(host, source).map(|graph| link.restore(graph));

                if let Err(e) = outcome {
                    if let Ok(Err(link_err)) = restored {
                        warn!(
                            error = %link_err,
                            "output link could not be restored after a failed bake"
                        );
                    }
                    return Err(e);
                }
                cleaned?;
                if let Err(e) = restored? {
                    warn!(material = %source, error = %e, "stopping bake");
                    report.warnings.push(e.to_string());
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Builds the render and path tracer overlays applied for the whole bake.
    fn bake_overlays<H: BakeHost>(
        &self,
        host: &mut H,
    ) -> BakeResult<(PropertySnapshot, PropertySnapshot)> {
        let mut render = PropertySnapshot::capture_schema(host.render_settings())?;
        render.set("engine", "CYCLES")?;
        render.set("use_file_extension", true)?;
        render.set("bake.target", "IMAGE_TEXTURES")?;

        let mut cycles = PropertySnapshot::capture_schema(host.cycles_settings())?;
        cycles.set("device", self.settings.device.as_str())?;
        cycles.set("use_adaptive_sampling", false)?;
        cycles.set("samples", self.settings.samples)?;
        cycles.set("use_denoising", false)?;
        Ok((render, cycles))
    }

    fn bake_step<H: BakeHost>(
        &self,
        host: &mut H,
        step: &PassStep<'_>,
        resolver: &ResolverChain,
        temp: &mut TempNodes,
        report: &mut BakeReport,
    ) -> BakeResult<()> {
        let image = self.settings.texture_name(step.pass);
        host.prepare_image(&ImageRequest {
            name: image.clone(),
            width: self.settings.texture_size,
            height: self.settings.texture_size,
            float_buffer: step.pass.float_buffer(),
            colorspace: step.pass.node_color_space.clone(),
        })?;

        let target = material_graph(host, step.target)?;
        let node = target.add_node(node_kind::IMAGE_TEXTURE, BAKE_IMAGE_NODE)?;
        temp.entry(step.target.to_string()).or_default().push(node.clone());
        target.assign_image(&node, &image)?;
        target.set_active_node(&node)?;

        if step.kind.reroutes_through_emission() {
            let source = material_graph(host, step.source)?;
            let nodes = temp.entry(step.source.to_string()).or_default();
            reroute_through_emission(source, step.source, step.kind, nodes)?;
        }

        for path in [BAKE_IMAGE_SETTINGS, OUTPUT_IMAGE_SETTINGS] {
            let subject = resolve_struct_mut(host.render_settings(), path)?
                .ok_or_else(|| unset_struct(path))?;
            report.image_settings.merge(step.overlay.apply(subject, resolver)?);
        }

        host.set_display_device(step.kind.display_device())?;
        let request = BakeRequest {
            pass: step.pass.name.clone(),
            source_material: step.source.to_string(),
            target_material: step.target.to_string(),
            bake_type: step.kind.bake_type(),
            margin: self.settings.margin,
            use_selected_to_active: self.settings.bake_source.use_selected_to_active(),
            use_clear: false,
        };
        info!(
            pass = %step.pass.name,
            source = step.source,
            bake_type = step.kind.bake_type().identifier(),
            "baking"
        );
        host.bake(&request)
            .map_err(|e| BakeError::bake_failed(&step.pass.name, e.to_string()))?;

        let path = self.settings.output_file(step.pass)?;
        host.save_image(&image, &path)?;
        debug!(image = %image, path = %path.display(), "saved texture");
        report.outputs.push(BakedTexture {
            pass: step.pass.name.clone(),
            source_material: step.source.to_string(),
            image,
            path,
        });
        Ok(())
    }
}

fn material_graph<'h, H: BakeHost>(
    host: &'h mut H,
    material: &str,
) -> BakeResult<&'h mut H::Graph> {
    host.material_graph(material).ok_or_else(|| BakeError::MissingMaterial {
        material: material.to_string(),
    })
}

fn unset_struct(path: &str) -> BakeError {
    BakeError::Host(HostError::rejected(format!("'{}' is unset on the render settings", path)))
}

/// Routes a shader input through a temporary emission node so the emit bake
/// picks it up unshaded.
///
/// The input's upstream link is carried over when there is one. An unlinked
/// color input copies its default into the emission color, and an unlinked
/// float input becomes a gray color of that value.
fn reroute_through_emission<G: ShaderGraph>(
    graph: &mut G,
    material: &str,
    kind: BakePassKind,
    temp: &mut Vec<String>,
) -> BakeResult<()> {
    let missing_link = || BakeError::MissingOutputLink {
        material: material.to_string(),
        node: OUTPUT_NODE.to_string(),
        socket: SURFACE_INPUT.to_string(),
    };
    let shader = graph
        .incoming_link(OUTPUT_NODE, SURFACE_INPUT)
        .ok_or_else(missing_link)?
        .from_node;
    if shader != PRINCIPLED_NODE {
        debug!(material, node = %shader, "rerouting from a non-principled shader");
    }
    let input = kind.name();
    let (socket_type, default) = graph
        .input_socket(&shader, input)
        .ok_or_else(|| BakeError::MissingShaderInput {
            material: material.to_string(),
            node: shader.clone(),
            socket: input.to_string(),
        })?;

    let emission = graph.add_node(node_kind::EMISSION, "Emission")?;
    temp.push(emission.clone());
    graph.connect(&LinkEndpoints::new(&emission, "Emission", OUTPUT_NODE, SURFACE_INPUT))?;

    match graph.incoming_link(&shader, input) {
        Some(upstream) => {
            graph.connect(&LinkEndpoints::new(
                upstream.from_node,
                upstream.from_socket,
                &emission,
                "Color",
            ))?;
        }
        None => match (socket_type, default) {
            (SocketType::Rgba, value) => graph.set_input_default(&emission, "Color", &value)?,
            (SocketType::Value, Value::Float(v)) => {
                graph.set_input_default(&emission, "Color", &Value::Array(vec![v, v, v, 1.0]))?
            }
            (SocketType::Value, Value::Int(v)) => {
                let v = v as f64;
                graph.set_input_default(&emission, "Color", &Value::Array(vec![v, v, v, 1.0]))?
            }
            (socket_type, _) => {
                warn!(
                    material,
                    input,
                    ?socket_type,
                    "input has no constant color form, baking the emission default"
                );
            }
        },
    }
    Ok(())
}

fn remove_temporary_nodes<H: BakeHost>(host: &mut H, temp: TempNodes) -> BakeResult<()> {
    for (material, nodes) in temp {
        let graph = material_graph(host, &material)?;
        for node in nodes {
            graph.remove_node(&node)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::default_passes;
    use crate::scene::{pbr_material, MemoryScene};
    use bakery_core::NodeGraph;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reroute_carries_upstream_link() {
        let mut graph = pbr_material("Crate");
        let mut temp = Vec::new();
        reroute_through_emission(&mut graph, "Crate", BakePassKind::BaseColor, &mut temp).unwrap();
        assert_eq!(temp, vec!["Emission".to_string()]);
        assert_eq!(
            graph.incoming_link(OUTPUT_NODE, SURFACE_INPUT),
            Some(LinkEndpoints::new("Emission", "Emission", OUTPUT_NODE, SURFACE_INPUT))
        );
        assert_eq!(
            graph.incoming_link("Emission", "Color"),
            Some(LinkEndpoints::new("Image Texture", "Color", "Emission", "Color"))
        );
    }

    #[test]
    fn test_reroute_float_input_becomes_gray() {
        let mut graph = pbr_material("Crate");
        let mut temp = Vec::new();
        reroute_through_emission(&mut graph, "Crate", BakePassKind::Roughness, &mut temp).unwrap();
        assert_eq!(graph.incoming_link("Emission", "Color"), None);
        assert_eq!(
            graph.input_socket("Emission", "Color"),
            Some((SocketType::Rgba, Value::Array(vec![0.5, 0.5, 0.5, 1.0])))
        );
    }

    #[test]
    fn test_plan_lists_enabled_passes() {
        let mut passes = default_passes();
        passes[4] = passes[4].clone().disabled();
        let session = BakeSession::new(BakeToolSettings::default().export_path("/out"), passes);
        let plan = session.plan().unwrap();
        assert_eq!(plan.len(), 4);
        assert_eq!(plan[3].path, PathBuf::from("/out/BakedTexture_Normal.tif"));
        assert_eq!(plan[3].bake_type, BakeType::Normal);
        assert!(!plan[3].reroute);
        assert!(plan[3].float_buffer);
        assert_eq!(plan[0].display_device, "sRGB");
    }

    #[test]
    fn test_no_enabled_passes() {
        let passes = default_passes().into_iter().map(|p| p.disabled()).collect();
        let session = BakeSession::new(BakeToolSettings::default(), passes);
        let mut scene = MemoryScene::demo();
        let err = session.run(&mut scene, &BakeMaterials::self_bake("Crate")).unwrap_err();
        assert!(matches!(err, BakeError::NoEnabledPasses));
        assert!(scene.render.all_writes().is_empty());
    }
}
