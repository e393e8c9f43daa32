//! Formats command implementation
//!
//! Lists the known image file formats, their extensions and legal color depths.

use anyhow::{Context, Result};
use bakery_bake::FileFormat;
use colored::Colorize;
use serde::Serialize;
use std::process::ExitCode;

/// One row of the format table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatInfo {
    pub format: &'static str,
    pub extension: Option<&'static str>,
    pub color_depths: Vec<&'static str>,
    pub default_depth: &'static str,
    pub bake_output: bool,
}

impl From<FileFormat> for FormatInfo {
    fn from(format: FileFormat) -> Self {
        Self {
            format: format.identifier(),
            extension: format.extension(),
            color_depths: format.color_depths().iter().map(|d| d.identifier()).collect(),
            default_depth: format.default_depth().identifier(),
            bake_output: format.extension().is_some(),
        }
    }
}

/// Builds the format table.
pub fn format_table(outputs_only: bool) -> Vec<FormatInfo> {
    FileFormat::ALL
        .into_iter()
        .map(FormatInfo::from)
        .filter(|info| !outputs_only || info.bake_output)
        .collect()
}

/// Run the formats command
///
/// # Arguments
/// * `outputs_only` - Only list formats baked textures can be saved in
/// * `json` - Print the table as JSON
///
/// # Returns
/// Exit code: 0 success
pub fn run(outputs_only: bool, json: bool) -> Result<ExitCode> {
    let table = format_table(outputs_only);

    if json {
        let output =
            serde_json::to_string_pretty(&table).context("Failed to serialize format table")?;
        println!("{}", output);
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{:<20} {:<10} {}",
        "FORMAT".bold(),
        "EXTENSION".bold(),
        "COLOR DEPTHS".bold()
    );
    for info in &table {
        let depths: Vec<String> = info
            .color_depths
            .iter()
            .map(|d| {
                if *d == info.default_depth {
                    format!("{}*", d)
                } else {
                    d.to_string()
                }
            })
            .collect();
        let extension = info.extension.unwrap_or("-");
        let format = if info.bake_output {
            info.format.green()
        } else {
            info.format.dimmed()
        };
        println!("{:<20} {:<10} {}", format, extension, depths.join(", "));
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_output_formats() {
        let formats: Vec<&str> = format_table(true).iter().map(|f| f.format).collect();
        assert_eq!(formats, vec!["PNG", "TARGA", "OPEN_EXR", "HDR", "TIFF"]);
    }

    #[test]
    fn test_jpeg_row() {
        let table = format_table(false);
        let jpeg = table.iter().find(|f| f.format == "JPEG").unwrap();
        assert_eq!(jpeg.extension, None);
        assert_eq!(jpeg.color_depths, vec!["8"]);
        assert!(!jpeg.bake_output);
    }
}
