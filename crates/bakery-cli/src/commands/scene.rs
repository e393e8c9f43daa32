//! Scene command implementation
//!
//! Writes the built-in demo scene as JSON, as a starting point for scene files.

use anyhow::{Context, Result};
use bakery_bake::MemoryScene;
use colored::Colorize;
use std::fs;
use std::process::ExitCode;

/// Run the scene command
///
/// # Arguments
/// * `output` - Output file path (default: stdout)
///
/// # Returns
/// Exit code: 0 success, 1 error
pub fn run(output: Option<&str>) -> Result<ExitCode> {
    let json =
        serde_json::to_string_pretty(&MemoryScene::demo()).context("Failed to serialize scene")?;
    match output {
        Some(path) => {
            fs::write(path, &json).with_context(|| format!("Failed to write to: {}", path))?;
            println!("{} Wrote demo scene to: {}", "SUCCESS".green().bold(), path);
        }
        None => println!("{}", json),
    }
    Ok(ExitCode::SUCCESS)
}
