//! Bakery CLI - Command-line interface for texture bake sessions
//!
//! This binary inspects scene settings snapshots, lists image formats,
//! plans bakes and runs them against in-memory scenes.

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use bakery_cli::commands;
use bakery_cli::commands::snapshot::SnapshotTarget;
use bakery_cli::logging::{self, LogLevel};
use bakery_core::snapshot::DEFAULT_MAX_DEPTH;

/// Bakery - PBR texture baking with scene snapshot and restore
#[derive(Parser)]
#[command(name = "bakery")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a settings struct from a scene and print it
    Snapshot {
        /// Path to the scene JSON file (default: built-in demo scene)
        #[arg(short, long)]
        scene: Option<String>,

        /// Settings struct to capture
        #[arg(short, long, value_enum, default_value = "render")]
        target: SnapshotTarget,

        /// Print field paths only, with every value unassigned
        #[arg(long)]
        schema: bool,

        /// Maximum nesting depth to expand
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Output the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// List image file formats and their color depths
    Formats {
        /// Only list formats baked textures can be saved in
        #[arg(long)]
        outputs_only: bool,

        /// Output the table as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate bake settings and list the textures a bake would write
    Plan {
        /// Path to the tool settings JSON file
        #[arg(long)]
        settings: Option<String>,

        /// Path to a JSON array of bake passes (default: the standard passes)
        #[arg(long)]
        passes: Option<String>,

        /// Output the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a bake session against a scene file
    Bake {
        /// Path to the scene JSON file (default: built-in demo scene)
        #[arg(short, long)]
        scene: Option<String>,

        /// Path to the tool settings JSON file
        #[arg(long)]
        settings: Option<String>,

        /// Path to a JSON array of bake passes (default: the standard passes)
        #[arg(long)]
        passes: Option<String>,

        /// Material that receives the bake
        #[arg(short, long)]
        material: String,

        /// Materials to bake from onto `--material` (selected to active)
        #[arg(long = "from", num_args = 1..)]
        sources: Vec<String>,

        /// Write the scene to this path after baking
        #[arg(long)]
        scene_out: Option<String>,

        /// Output the bake report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the built-in demo scene as JSON
    Scene {
        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_tracing(cli.log_level) {
        eprintln!("{}: {}", colored::Colorize::yellow("warning"), e);
    }

    let result = match cli.command {
        Commands::Snapshot {
            scene,
            target,
            schema,
            max_depth,
            json,
        } => commands::snapshot::run(scene.as_deref(), target, schema, max_depth, json),
        Commands::Formats { outputs_only, json } => commands::formats::run(outputs_only, json),
        Commands::Plan {
            settings,
            passes,
            json,
        } => commands::plan::run(settings.as_deref(), passes.as_deref(), json),
        Commands::Bake {
            scene,
            settings,
            passes,
            material,
            sources,
            scene_out,
            json,
        } => commands::bake::run(&commands::bake::BakeArgs {
            scene: scene.as_deref(),
            settings: settings.as_deref(),
            passes: passes.as_deref(),
            material: &material,
            sources: &sources,
            scene_out: scene_out.as_deref(),
            json,
        }),
        Commands::Scene { output } => commands::scene::run(output.as_deref()),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_snapshot() {
        let cli = Cli::try_parse_from([
            "bakery",
            "snapshot",
            "--target",
            "bake-image",
            "--schema",
        ])
        .unwrap();
        match cli.command {
            Commands::Snapshot {
                scene,
                target,
                schema,
                max_depth,
                json,
            } => {
                assert_eq!(scene, None);
                assert_eq!(target, SnapshotTarget::BakeImage);
                assert!(schema);
                assert_eq!(max_depth, DEFAULT_MAX_DEPTH);
                assert!(!json);
            }
            _ => panic!("expected snapshot command"),
        }
        assert_eq!(cli.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_cli_parses_bake_sources() {
        let cli = Cli::try_parse_from([
            "bakery",
            "--log-level",
            "debug",
            "bake",
            "--material",
            "LowPoly",
            "--from",
            "HighPoly",
            "Trim",
        ])
        .unwrap();
        assert_eq!(cli.log_level, LogLevel::Debug);
        match cli.command {
            Commands::Bake { material, sources, .. } => {
                assert_eq!(material, "LowPoly");
                assert_eq!(sources, vec!["HighPoly".to_string(), "Trim".to_string()]);
            }
            _ => panic!("expected bake command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_target() {
        assert!(Cli::try_parse_from(["bakery", "snapshot", "--target", "world"]).is_err());
    }

    #[test]
    fn test_cli_requires_bake_material() {
        assert!(Cli::try_parse_from(["bakery", "bake"]).is_err());
    }
}
