//! Loading scenes, settings and pass lists for commands.

use anyhow::{Context, Result};
use bakery_bake::{default_passes, BakePassSpec, BakeToolSettings, MemoryScene};
use std::fs;
use std::path::Path;

/// Loads a scene file, or the built-in demo scene when no path is given.
pub fn load_scene(path: Option<&str>) -> Result<MemoryScene> {
    match path {
        Some(path) => MemoryScene::from_json_file(Path::new(path))
            .with_context(|| format!("Failed to load scene: {}", path)),
        None => Ok(MemoryScene::demo()),
    }
}

/// Loads tool settings, falling back to defaults, then applies environment
/// overrides.
pub fn load_settings(path: Option<&str>) -> Result<BakeToolSettings> {
    let settings = match path {
        Some(path) => BakeToolSettings::from_json_file(Path::new(path))
            .with_context(|| format!("Failed to load settings: {}", path))?,
        None => BakeToolSettings::default(),
    };
    Ok(settings.with_env_overrides())
}

/// Loads a JSON array of passes, or the standard pass set.
pub fn load_passes(path: Option<&str>) -> Result<Vec<BakePassSpec>> {
    let Some(path) = path else {
        return Ok(default_passes());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read passes file: {}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse passes file: {}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_paths() {
        assert_eq!(load_passes(None).unwrap().len(), 5);
        assert!(load_scene(None).unwrap().material("Crate").is_some());
    }

    #[test]
    fn test_passes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passes.json");
        fs::write(
            &path,
            r#"[{
                "name": "Roughness",
                "suffix": "R",
                "file_format": "PNG",
                "color_depth": "8",
                "node_color_space": "Non-Color"
            }]"#,
        )
        .unwrap();
        let passes = load_passes(path.to_str()).unwrap();
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].suffix, "R");
    }

    #[test]
    fn test_missing_scene_file_has_context() {
        let err = load_scene(Some("/nonexistent/scene.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to load scene"));
    }
}
