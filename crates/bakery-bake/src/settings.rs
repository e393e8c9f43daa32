//! User-facing bake settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{BakeError, BakeResult};
use crate::pass::BakePassSpec;

/// Environment variable that overrides the export path.
pub const EXPORT_PATH_ENV: &str = "BAKERY_EXPORT_PATH";

/// Characters that can't appear in the file name delimiter.
pub const ILLEGAL_DELIMITER_CHARS: &[char] = &[
    ' ', '!', '@', '#', '$', '%', '^', '&', '*', '(', ')', '{', '}', ':', '"', ';', '\'', '[', ']',
    '<', '>', ',', '.', '\\', '/', '?',
];

/// Where the baked values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BakeSource {
    /// Each material bakes its own sockets.
    #[default]
    #[serde(rename = "SELF")]
    SelfBake,
    /// Selected high-res objects bake onto the active low-res object.
    SelectedToActive,
}

impl BakeSource {
    /// Whether the host bake call runs in selected-to-active mode.
    pub fn use_selected_to_active(&self) -> bool {
        matches!(self, BakeSource::SelectedToActive)
    }
}

/// Settings for a batch of bake passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeToolSettings {
    /// Directory textures are written to.
    pub export_path: PathBuf,
    /// Base name shared by every texture in the set.
    pub texture_set_name: String,
    /// Joins the set name and the pass suffix.
    pub delimiter: String,
    /// Width and height of baked textures.
    pub texture_size: u32,
    /// Where the baked values come from.
    pub bake_source: BakeSource,
    /// Render samples per bake.
    pub samples: u32,
    /// Render device.
    pub device: String,
    /// Bake margin in pixels.
    pub margin: u32,
}

impl Default for BakeToolSettings {
    fn default() -> Self {
        Self {
            export_path: PathBuf::from("/tmp/"),
            texture_set_name: "BakedTexture".to_string(),
            delimiter: "_".to_string(),
            texture_size: 1024,
            bake_source: BakeSource::SelfBake,
            samples: 16,
            device: "GPU".to_string(),
            margin: 0,
        }
    }
}

impl BakeToolSettings {
    /// Loads settings from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> BakeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| BakeError::ReadSettings {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Applies `BAKERY_EXPORT_PATH` if it is set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var(EXPORT_PATH_ENV) {
            if !path.is_empty() {
                self.export_path = PathBuf::from(path);
            }
        }
        self
    }

    /// Sets the export path.
    pub fn export_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.export_path = path.into();
        self
    }

    /// Sets the texture set name.
    pub fn texture_set_name(mut self, name: impl Into<String>) -> Self {
        self.texture_set_name = name.into();
        self
    }

    /// Sets the delimiter.
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Sets the texture size.
    pub fn texture_size(mut self, size: u32) -> Self {
        self.texture_size = size;
        self
    }

    /// Sets the bake source.
    pub fn bake_source(mut self, source: BakeSource) -> Self {
        self.bake_source = source;
        self
    }

    /// Checks the settings before anything in the scene is touched.
    pub fn validate(&self) -> BakeResult<()> {
        if self.export_path.as_os_str().is_empty() {
            return Err(BakeError::MissingExportPath);
        }
        if let Some(character) = self
            .delimiter
            .chars()
            .find(|c| ILLEGAL_DELIMITER_CHARS.contains(c))
        {
            return Err(BakeError::IllegalDelimiter { character });
        }
        if self.texture_set_name.is_empty() {
            return Err(BakeError::EmptyTextureSetName);
        }
        if self.texture_size == 0 {
            return Err(BakeError::ZeroTextureSize);
        }
        Ok(())
    }

    /// Name of the image a pass bakes into (`BakedTexture_Roughness`).
    pub fn texture_name(&self, pass: &BakePassSpec) -> String {
        [self.texture_set_name.as_str(), pass.suffix.as_str()].join(&self.delimiter)
    }

    /// Full output path of a pass, with the format's extension.
    pub fn output_file(&self, pass: &BakePassSpec) -> BakeResult<PathBuf> {
        let extension = pass.file_format.output_extension()?;
        Ok(self
            .export_path
            .join(format!("{}{}", self.texture_name(pass), extension)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::default_passes;

    #[test]
    fn test_defaults_validate() {
        BakeToolSettings::default().validate().unwrap();
    }

    #[test]
    fn test_illegal_delimiter() {
        let settings = BakeToolSettings::default().delimiter("-.");
        match settings.validate() {
            Err(BakeError::IllegalDelimiter { character }) => assert_eq!(character, '.'),
            other => panic!("expected illegal delimiter, got {:?}", other),
        }
        BakeToolSettings::default().delimiter("-").validate().unwrap();
    }

    #[test]
    fn test_empty_export_path() {
        let settings = BakeToolSettings::default().export_path("");
        assert!(matches!(settings.validate(), Err(BakeError::MissingExportPath)));
    }

    #[test]
    fn test_output_file() {
        let settings = BakeToolSettings::default()
            .export_path("/textures")
            .texture_set_name("Crate");
        let passes = default_passes();
        assert_eq!(settings.texture_name(&passes[2]), "Crate_Metal");
        assert_eq!(
            settings.output_file(&passes[3]).unwrap(),
            PathBuf::from("/textures/Crate_Normal.tif")
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings: BakeToolSettings = serde_json::from_str(
            r#"{"texture_set_name": "Barrel", "bake_source": "SELECTED_TO_ACTIVE"}"#,
        )
        .unwrap();
        assert_eq!(settings.texture_set_name, "Barrel");
        assert_eq!(settings.delimiter, "_");
        assert!(settings.bake_source.use_selected_to_active());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"texture_size": 2048, "samples": 1}"#).unwrap();
        let settings = BakeToolSettings::from_json_file(&path).unwrap();
        assert_eq!(settings.texture_size, 2048);
        assert_eq!(settings.samples, 1);

        let err = BakeToolSettings::from_json_file(&dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.code(), "BAKE_014");
    }
}
