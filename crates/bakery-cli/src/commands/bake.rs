//! Bake command implementation
//!
//! Runs a full bake session against a scene file. The in-memory scene
//! records bakes instead of rendering, so this checks that every pass can be
//! set up and that the scene comes back unchanged.

use anyhow::{anyhow, Context, Result};
use bakery_bake::{BakeMaterials, BakeSession, BakeSource, MemoryScene};
use bakery_core::ApplyReport;
use colored::Colorize;
use std::fs;
use std::process::ExitCode;

use crate::input::{load_passes, load_scene, load_settings};

/// Arguments of the bake command.
#[derive(Debug, Clone, Default)]
pub struct BakeArgs<'a> {
    pub scene: Option<&'a str>,
    pub settings: Option<&'a str>,
    pub passes: Option<&'a str>,
    /// Material receiving the bake.
    pub material: &'a str,
    /// Materials to bake from. Empty bakes the material onto itself.
    pub sources: &'a [String],
    /// Where to write the scene after the bake.
    pub scene_out: Option<&'a str>,
    pub json: bool,
}

/// Run the bake command
///
/// # Returns
/// Exit code: 0 clean bake, 2 bake finished with warnings or rejected
/// settings, 1 error
pub fn run(args: &BakeArgs<'_>) -> Result<ExitCode> {
    let mut scene = load_scene(args.scene)?;
    let mut settings = load_settings(args.settings)?;
    let materials = if args.sources.is_empty() {
        BakeMaterials::self_bake(args.material)
    } else {
        settings.bake_source = BakeSource::SelectedToActive;
        BakeMaterials::selected_to_active(args.sources.iter().cloned(), args.material)
    };
    let session = BakeSession::new(settings, load_passes(args.passes)?);

    let report = session
        .run(&mut scene, &materials)
        .map_err(|e| anyhow!("[{}] {}", e.code(), e))?;

    if let Some(path) = args.scene_out {
        write_scene(&scene, path)?;
    }

    let code = if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    };

    if args.json {
        let output =
            serde_json::to_string_pretty(&report).context("Failed to serialize bake report")?;
        println!("{}", output);
        return Ok(code);
    }

    for output in &report.outputs {
        println!(
            "{} {:<12} {} <- {}",
            "BAKED".green().bold(),
            output.pass,
            output.path.display(),
            output.source_material
        );
    }
    print_apply("setup", &report.setup);
    print_apply("image settings", &report.image_settings);
    print_apply("restore", &report.restore);
    for warning in &report.warnings {
        println!("{} {}", "WARNING".yellow().bold(), warning);
    }
    Ok(code)
}

fn print_apply(stage: &str, report: &ApplyReport) {
    if report.is_clean() {
        println!("  {} {}", format!("{}:", stage).dimmed(), report);
    } else {
        print!("  {} {}", format!("{}:", stage).yellow(), report);
    }
}

fn write_scene(scene: &MemoryScene, path: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(scene).context("Failed to serialize scene")?;
    fs::write(path, json).with_context(|| format!("Failed to write scene: {}", path))
}
