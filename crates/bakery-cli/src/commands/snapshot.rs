//! Snapshot command implementation
//!
//! Captures a settings struct from a scene and prints it as a table or JSON.

use anyhow::{Context, Result};
use bakery_bake::session::{BAKE_IMAGE_SETTINGS, OUTPUT_IMAGE_SETTINGS};
use bakery_core::reflect::resolve_struct;
use bakery_core::{CaptureOptions, PropertySnapshot, Subject};
use colored::Colorize;
use std::process::ExitCode;

use crate::input::load_scene;

/// Which settings struct to capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SnapshotTarget {
    /// Render settings, including every nested struct
    Render,
    /// Path tracer settings
    Cycles,
    /// Image settings used by the bake call
    BakeImage,
    /// Image settings used when saving
    OutputImage,
}

/// Run the snapshot command
///
/// # Arguments
/// * `scene_path` - Scene JSON file (default: built-in demo scene)
/// * `target` - Settings struct to capture
/// * `schema` - Print paths only, with every value unassigned
/// * `max_depth` - Nesting depth limit
/// * `json` - Print the snapshot as JSON
///
/// # Returns
/// Exit code: 0 success, 1 error
pub fn run(
    scene_path: Option<&str>,
    target: SnapshotTarget,
    schema: bool,
    max_depth: usize,
    json: bool,
) -> Result<ExitCode> {
    let scene = load_scene(scene_path)?;
    let subject: &dyn Subject = match target {
        SnapshotTarget::Render => &scene.render,
        SnapshotTarget::Cycles => &scene.cycles,
        SnapshotTarget::BakeImage => nested(&scene.render, BAKE_IMAGE_SETTINGS)?,
        SnapshotTarget::OutputImage => nested(&scene.render, OUTPUT_IMAGE_SETTINGS)?,
    };

    let options = CaptureOptions::default().max_depth(max_depth);
    let mut snapshot = PropertySnapshot::capture_with(subject, &options)
        .context("Failed to capture settings")?;
    if schema {
        snapshot.void_values();
    }

    if json {
        let output =
            serde_json::to_string_pretty(&snapshot).context("Failed to serialize snapshot")?;
        println!("{}", output);
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{} {} ({} fields)",
        "Snapshot:".cyan().bold(),
        snapshot.subject_type(),
        snapshot.len()
    );
    print!("{}", snapshot);
    Ok(ExitCode::SUCCESS)
}

fn nested<'a>(root: &'a dyn Subject, path: &str) -> Result<&'a dyn Subject> {
    resolve_struct(root, path)
        .with_context(|| format!("Failed to resolve {}", path))?
        .with_context(|| format!("{} is unset in this scene", path))
}
