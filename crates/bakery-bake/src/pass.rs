//! Bake passes: which material property gets baked, and how it is written.

use serde::{Deserialize, Serialize};

use crate::error::{BakeError, BakeResult};
use crate::format::{ColorDepth, FileFormat};

/// The bake mode passed to the host's bake call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BakeType {
    /// Bake emitted light. Most passes are rerouted through an emission
    /// shader so their values come out as-is.
    Emit,
    /// Bake tangent-space normals.
    Normal,
}

impl BakeType {
    /// Returns the host identifier.
    pub fn identifier(&self) -> &'static str {
        match self {
            BakeType::Emit => "EMIT",
            BakeType::Normal => "NORMAL",
        }
    }
}

/// The material properties a pass can bake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BakePassKind {
    #[serde(rename = "Base Color")]
    BaseColor,
    Roughness,
    Metallic,
    Normal,
    Emission,
}

impl BakePassKind {
    /// Every pass kind, in bake order.
    pub const ALL: [BakePassKind; 5] = [
        BakePassKind::BaseColor,
        BakePassKind::Roughness,
        BakePassKind::Metallic,
        BakePassKind::Normal,
        BakePassKind::Emission,
    ];

    /// The pass name. Also the name of the shader input it reads from.
    pub fn name(&self) -> &'static str {
        match self {
            BakePassKind::BaseColor => "Base Color",
            BakePassKind::Roughness => "Roughness",
            BakePassKind::Metallic => "Metallic",
            BakePassKind::Normal => "Normal",
            BakePassKind::Emission => "Emission",
        }
    }

    /// Looks up a kind by pass name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// The host bake mode for this pass.
    pub fn bake_type(&self) -> BakeType {
        match self {
            BakePassKind::Normal => BakeType::Normal,
            _ => BakeType::Emit,
        }
    }

    /// Display device active while the pass bakes.
    pub fn display_device(&self) -> &'static str {
        match self {
            BakePassKind::BaseColor => "sRGB",
            _ => "XYZ",
        }
    }

    /// Whether the shader input is rerouted through a temporary emission
    /// node. Normal bakes use the normal bake mode and emission already
    /// emits, so both leave the output link alone.
    pub fn reroutes_through_emission(&self) -> bool {
        !matches!(self, BakePassKind::Normal | BakePassKind::Emission)
    }

    /// Whether the baked texture holds non-color data.
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            BakePassKind::Roughness | BakePassKind::Metallic | BakePassKind::Normal
        )
    }

    /// Colorspace the image output is written in.
    pub fn output_colorspace(&self) -> &'static str {
        if self.is_data() {
            "Raw"
        } else {
            "sRGB"
        }
    }
}

/// A configured bake pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BakePassSpec {
    /// Pass name, matching a [`BakePassKind`].
    pub name: String,
    /// Whether the pass runs.
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Suffix appended to the texture set name.
    pub suffix: String,
    /// Output file format.
    pub file_format: FileFormat,
    /// Output bits per channel.
    pub color_depth: ColorDepth,
    /// Colorspace of the image texture node that receives the bake.
    pub node_color_space: String,
}

fn enabled_default() -> bool {
    true
}

impl BakePassSpec {
    /// Creates a pass.
    pub fn new(
        kind: BakePassKind,
        suffix: impl Into<String>,
        file_format: FileFormat,
        color_depth: ColorDepth,
        node_color_space: impl Into<String>,
    ) -> Self {
        Self {
            name: kind.name().to_string(),
            enabled: true,
            suffix: suffix.into(),
            file_format,
            color_depth,
            node_color_space: node_color_space.into(),
        }
    }

    /// Disables the pass.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Returns the pass kind.
    pub fn kind(&self) -> BakeResult<BakePassKind> {
        BakePassKind::from_name(&self.name).ok_or_else(|| BakeError::UnknownPass {
            name: self.name.clone(),
        })
    }

    /// Whether the baked image needs a float buffer.
    pub fn float_buffer(&self) -> bool {
        self.color_depth.needs_float_buffer()
    }

    /// Checks the kind, output format and color depth.
    pub fn validate(&self) -> BakeResult<()> {
        self.kind()?;
        self.file_format.output_extension()?;
        if !self.file_format.supports_depth(self.color_depth) {
            return Err(BakeError::UnsupportedColorDepth {
                pass: self.name.clone(),
                format: self.file_format,
                depth: self.color_depth,
            });
        }
        Ok(())
    }
}

/// The standard PBR pass set.
pub fn default_passes() -> Vec<BakePassSpec> {
    vec![
        BakePassSpec::new(
            BakePassKind::BaseColor,
            "BaseColor",
            FileFormat::Png,
            ColorDepth::Eight,
            "sRGB",
        ),
        BakePassSpec::new(
            BakePassKind::Roughness,
            "Roughness",
            FileFormat::Png,
            ColorDepth::Eight,
            "Non-Color",
        ),
        BakePassSpec::new(
            BakePassKind::Metallic,
            "Metal",
            FileFormat::Png,
            ColorDepth::Eight,
            "Non-Color",
        ),
        BakePassSpec::new(
            BakePassKind::Normal,
            "Normal",
            FileFormat::Tiff,
            ColorDepth::Sixteen,
            "Non-Color",
        ),
        BakePassSpec::new(
            BakePassKind::Emission,
            "Emit",
            FileFormat::Png,
            ColorDepth::Eight,
            "Non-Color",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_passes_are_valid() {
        let passes = default_passes();
        assert_eq!(passes.len(), 5);
        for pass in &passes {
            pass.validate().unwrap();
        }
        assert!(passes[3].float_buffer());
        assert!(!passes[0].float_buffer());
    }

    #[test]
    fn test_pass_kind_behavior() {
        assert_eq!(BakePassKind::Normal.bake_type(), BakeType::Normal);
        assert_eq!(BakePassKind::Roughness.bake_type(), BakeType::Emit);
        assert!(BakePassKind::Metallic.reroutes_through_emission());
        assert!(!BakePassKind::Emission.reroutes_through_emission());
        assert_eq!(BakePassKind::BaseColor.display_device(), "sRGB");
        assert_eq!(BakePassKind::Normal.output_colorspace(), "Raw");
        assert_eq!(BakePassKind::Emission.output_colorspace(), "sRGB");
    }

    #[test]
    fn test_invalid_depth_rejected() {
        let pass = BakePassSpec::new(
            BakePassKind::Roughness,
            "R",
            FileFormat::Targa,
            ColorDepth::Sixteen,
            "Non-Color",
        );
        assert!(matches!(pass.validate(), Err(BakeError::UnsupportedColorDepth { .. })));
    }

    #[test]
    fn test_unknown_pass_name() {
        let mut pass = default_passes().remove(0);
        pass.name = "Ambient Occlusion".to_string();
        assert!(matches!(pass.kind(), Err(BakeError::UnknownPass { .. })));
    }

    #[test]
    fn test_pass_deserializes_with_defaults() {
        let json = r#"{
            "name": "Normal",
            "suffix": "N",
            "file_format": "TIFF",
            "color_depth": "16",
            "node_color_space": "Non-Color"
        }"#;
        let pass: BakePassSpec = serde_json::from_str(json).unwrap();
        assert!(pass.enabled);
        assert_eq!(pass.kind().unwrap(), BakePassKind::Normal);
    }
}
