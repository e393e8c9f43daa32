//! Plan command implementation
//!
//! Validates bake settings and passes, then lists the textures a bake
//! would write without touching a scene.

use anyhow::{anyhow, Context, Result};
use bakery_bake::BakeSession;
use colored::Colorize;
use std::process::ExitCode;

use crate::input::{load_passes, load_settings};

/// Run the plan command
///
/// # Arguments
/// * `settings_path` - Tool settings JSON (default: built-in defaults)
/// * `passes_path` - Pass list JSON (default: the standard passes)
/// * `json` - Print the plan as JSON
///
/// # Returns
/// Exit code: 0 success, 1 invalid settings
pub fn run(settings_path: Option<&str>, passes_path: Option<&str>, json: bool) -> Result<ExitCode> {
    let session = BakeSession::new(load_settings(settings_path)?, load_passes(passes_path)?);

    let plan = match session.plan() {
        Ok(plan) => plan,
        Err(e) if e.is_validation() && !json => {
            println!("{} [{}] {}", "INVALID".red().bold(), e.code(), e);
            return Ok(ExitCode::from(1));
        }
        Err(e) => return Err(anyhow!("[{}] {}", e.code(), e)),
    };

    if json {
        let output = serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?;
        println!("{}", output);
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{} {} pass(es) into {}",
        "Plan:".cyan().bold(),
        plan.len(),
        session.settings().export_path.display()
    );
    for planned in &plan {
        let mut notes = vec![
            planned.bake_type.identifier().to_string(),
            planned.display_device.clone(),
        ];
        if planned.reroute {
            notes.push("via emission".to_string());
        }
        if planned.float_buffer {
            notes.push("float".to_string());
        }
        println!(
            "  {:<12} {} ({})",
            planned.pass.bold(),
            planned.path.display(),
            notes.join(", ").dimmed()
        );
    }
    let skipped = session.passes().iter().filter(|p| !p.enabled).count();
    if skipped > 0 {
        println!("  {} {} disabled pass(es) skipped", "note:".yellow(), skipped);
    }
    Ok(ExitCode::SUCCESS)
}
