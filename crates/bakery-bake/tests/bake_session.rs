//! Bake Session Tests
//!
//! Tests verify:
//! - Every enabled pass is baked and saved with its own settings
//! - Scene settings, display device and material graphs are restored
//! - Failures mid-bake still restore the scene
//! - A lost output link stops the pass loop with a warning
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p bakery-bake --test bake_session
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use bakery_bake::host::{OUTPUT_NODE, PRINCIPLED_NODE, SURFACE_INPUT};
use bakery_bake::scene::pbr_material;
use bakery_bake::{
    default_passes, BakeError, BakeHost, BakeMaterials, BakeRequest, BakeSession, BakeSource,
    BakeToolSettings, BakeType, ImageRequest, MemoryScene,
};
use bakery_core::memory::MemoryGraph;
use bakery_core::{HostError, LinkEndpoints, NodeGraph, PropertySnapshot, Subject};
use pretty_assertions::assert_eq;

fn session() -> BakeSession {
    BakeSession::new(
        BakeToolSettings::default()
            .export_path("/textures")
            .texture_set_name("Crate"),
        default_passes(),
    )
}

fn settings_of(scene: &MemoryScene) -> (PropertySnapshot, PropertySnapshot) {
    (
        PropertySnapshot::capture(&scene.render).unwrap(),
        PropertySnapshot::capture(&scene.cycles).unwrap(),
    )
}

fn link_set(graph: &MemoryGraph) -> HashSet<LinkEndpoints> {
    graph.links().iter().cloned().collect()
}

// ============================================================================
// Successful Bakes
// ============================================================================

/// Test each pass bakes with its own format, display device and bake type.
#[test]
fn test_every_pass_is_baked_and_saved() {
    let mut scene = MemoryScene::demo();
    let report = session().run(&mut scene, &BakeMaterials::self_bake("Crate")).unwrap();

    let paths: Vec<PathBuf> = report.outputs.iter().map(|o| o.path.clone()).collect();
    assert_eq!(
        paths,
        vec![
            PathBuf::from("/textures/Crate_BaseColor.png"),
            PathBuf::from("/textures/Crate_Roughness.png"),
            PathBuf::from("/textures/Crate_Metal.png"),
            PathBuf::from("/textures/Crate_Normal.tif"),
            PathBuf::from("/textures/Crate_Emit.png"),
        ]
    );
    assert!(report.warnings.is_empty());

    let seen: Vec<(&str, &str, &str, BakeType)> = scene
        .bakes
        .iter()
        .map(|b| {
            (
                b.request.pass.as_str(),
                b.file_format.as_str(),
                b.display_device.as_str(),
                b.request.bake_type,
            )
        })
        .collect();
    assert_eq!(
        seen,
        vec![
            ("Base Color", "PNG", "sRGB", BakeType::Emit),
            ("Roughness", "PNG", "XYZ", BakeType::Emit),
            ("Metallic", "PNG", "XYZ", BakeType::Emit),
            ("Normal", "TIFF", "XYZ", BakeType::Normal),
            ("Emission", "PNG", "XYZ", BakeType::Emit),
        ]
    );
    assert!(scene.bakes.iter().all(|b| b.engine == "CYCLES"));
    assert!(scene.bakes.iter().all(|b| !b.request.use_clear));
    assert_eq!(scene.bakes[0].image, "Crate_BaseColor");
    assert_eq!(scene.saved.len(), 5);

    let normal = &scene.images["Crate_Normal"];
    assert!(normal.float_buffer);
    assert_eq!(normal.colorspace, "Non-Color");
    assert_eq!((normal.width, normal.height), (1024, 1024));
}

/// Test render settings, cycles settings and the display device come back.
#[test]
fn test_scene_settings_are_restored() {
    let mut scene = MemoryScene::demo();
    scene.display_device = "Display P3".to_string();
    let before = settings_of(&scene);

    let report = session().run(&mut scene, &BakeMaterials::self_bake("Crate")).unwrap();

    assert_eq!(settings_of(&scene), before);
    assert_eq!(scene.display_device, "Display P3");
    assert!(report.restore.is_clean(), "{}", report.restore);
    assert!(report.restore.skipped_read_only.contains(&"is_movie_format".to_string()));
    assert!(report.is_clean());
}

/// Test temporary nodes are gone and the output link is back after baking.
#[test]
fn test_material_graph_is_restored() {
    let mut scene = MemoryScene::demo();
    let before = scene.material("Crate").unwrap().clone();

    session().run(&mut scene, &BakeMaterials::self_bake("Crate")).unwrap();

    let after = scene.material("Crate").unwrap();
    assert_eq!(after.nodes(), before.nodes());
    assert_eq!(link_set(after), link_set(&before));
    assert_eq!(after.active(), None);
}

/// Test selected-to-active bakes source materials into the target.
#[test]
fn test_selected_to_active() {
    let mut scene = MemoryScene::demo()
        .with_material("HighPoly", pbr_material("HighPoly"))
        .with_material("LowPoly", pbr_material("LowPoly"));
    let settings = BakeToolSettings::default().bake_source(BakeSource::SelectedToActive);
    let session = BakeSession::new(settings, default_passes());

    let report = session
        .run(&mut scene, &BakeMaterials::selected_to_active(["HighPoly"], "LowPoly"))
        .unwrap();

    assert_eq!(report.outputs.len(), 5);
    for bake in &scene.bakes {
        assert_eq!(bake.request.source_material, "HighPoly");
        assert_eq!(bake.request.target_material, "LowPoly");
        assert!(bake.request.use_selected_to_active);
    }
    for name in ["HighPoly", "LowPoly"] {
        let graph = scene.material(name).unwrap();
        let fresh = pbr_material(name);
        assert_eq!(graph.nodes(), fresh.nodes());
        assert_eq!(link_set(graph), link_set(&fresh));
    }
}

/// Test an engine the host doesn't list is reported, not fatal.
#[test]
fn test_unregistered_engine_is_reported() {
    let mut scene = MemoryScene::demo();
    scene.engines.clear();

    let report = session().run(&mut scene, &BakeMaterials::self_bake("Crate")).unwrap();

    let rejected: Vec<&str> = report
        .setup
        .invalid_choices
        .iter()
        .map(|c| c.path.as_str())
        .collect();
    assert_eq!(rejected, vec!["engine"]);
    assert_eq!(report.outputs.len(), 5);
    assert!(scene.bakes.iter().all(|b| b.engine == "BLENDER_EEVEE"));
    assert!(!report.is_clean());
}

// ============================================================================
// Failures
// ============================================================================

/// Test validation errors leave the scene untouched.
#[test]
fn test_validation_error_touches_nothing() {
    let mut scene = MemoryScene::demo();
    let session = BakeSession::new(BakeToolSettings::default().delimiter("."), default_passes());

    let err = session.run(&mut scene, &BakeMaterials::self_bake("Crate")).unwrap_err();

    assert!(err.is_validation());
    assert!(scene.render.all_writes().is_empty());
    assert!(scene.cycles.all_writes().is_empty());
}

/// Test a failing bake call still restores settings and the material.
#[test]
fn test_bake_failure_restores_scene() {
    let mut scene = MemoryScene::demo().fail_pass("Metallic");
    let before = settings_of(&scene);
    let graph_before = scene.material("Crate").unwrap().clone();

    let err = session().run(&mut scene, &BakeMaterials::self_bake("Crate")).unwrap_err();

    assert!(matches!(err, BakeError::BakeFailed { ref pass, .. } if pass == "Metallic"));
    assert_eq!(err.code(), "BAKE_013");
    assert_eq!(settings_of(&scene), before);
    assert_eq!(scene.display_device, "sRGB");
    assert_eq!(scene.saved.len(), 2);

    let graph = scene.material("Crate").unwrap();
    assert_eq!(graph.nodes(), graph_before.nodes());
    assert_eq!(link_set(graph), link_set(&graph_before));
}

/// Test an unknown material fails after setup and is still cleaned up.
#[test]
fn test_missing_material_restores_scene() {
    let mut scene = MemoryScene::demo();
    let before = settings_of(&scene);

    let err = session()
        .run(&mut scene, &BakeMaterials::self_bake("Barrel"))
        .unwrap_err();

    assert!(matches!(err, BakeError::MissingMaterial { ref material } if material == "Barrel"));
    assert_eq!(settings_of(&scene), before);
    assert!(scene.bakes.is_empty());
}

/// Test a material without a surface link is rejected.
#[test]
fn test_missing_output_link() {
    let mut graph = pbr_material("Crate");
    graph.remove_node(PRINCIPLED_NODE);
    let mut scene = MemoryScene::demo().with_material("Crate", graph);

    let err = session().run(&mut scene, &BakeMaterials::self_bake("Crate")).unwrap_err();

    assert_eq!(err.code(), "BAKE_010");
}

/// A scene whose principled shader disappears during the first bake.
struct ShaderLosingScene {
    inner: MemoryScene,
}

impl BakeHost for ShaderLosingScene {
    type Graph = MemoryGraph;

    fn render_settings(&mut self) -> &mut dyn Subject {
        self.inner.render_settings()
    }

    fn cycles_settings(&mut self) -> &mut dyn Subject {
        self.inner.cycles_settings()
    }

    fn registered_engines(&self) -> Vec<String> {
        self.inner.registered_engines()
    }

    fn display_device(&self) -> String {
        self.inner.display_device()
    }

    fn set_display_device(&mut self, device: &str) -> Result<(), HostError> {
        self.inner.set_display_device(device)
    }

    fn material_graph(&mut self, material: &str) -> Option<&mut MemoryGraph> {
        self.inner.material_graph(material)
    }

    fn prepare_image(&mut self, request: &ImageRequest) -> Result<(), HostError> {
        self.inner.prepare_image(request)
    }

    fn bake(&mut self, request: &BakeRequest) -> Result<(), HostError> {
        self.inner.bake(request)?;
        if let Some(graph) = self.inner.material_graph(&request.source_material) {
            graph.remove_node(PRINCIPLED_NODE);
        }
        Ok(())
    }

    fn save_image(&mut self, image: &str, path: &Path) -> Result<(), HostError> {
        self.inner.save_image(image, path)
    }
}

/// Test a lost link source becomes a warning and stops the remaining passes.
#[test]
fn test_link_restore_failure_stops_with_warning() {
    let mut scene = ShaderLosingScene {
        inner: MemoryScene::demo(),
    };
    let before = settings_of(&scene.inner);

    let report = session().run(&mut scene, &BakeMaterials::self_bake("Crate")).unwrap();

    assert_eq!(report.outputs.len(), 1);
    assert_eq!(
        report.warnings,
        vec![
            "Node link could not be made in Crate because Principled BSDF was not found in the node tree.".to_string()
        ]
    );
    assert_eq!(settings_of(&scene.inner), before);

    let graph = scene.inner.material("Crate").unwrap();
    assert!(graph.find("BakingTexture").is_none());
    assert!(graph.find("Emission").is_none());
    assert_eq!(graph.incoming_link(OUTPUT_NODE, SURFACE_INPUT), None);
}
