//! Image file formats and the color depths each one supports.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BakeError, BakeResult};

/// Image file formats known to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileFormat {
    Bmp,
    Png,
    Jpeg,
    Jpeg2000,
    Targa,
    TargaRaw,
    Iris,
    Cineon,
    Dpx,
    OpenExr,
    OpenExrMultilayer,
    Hdr,
    Tiff,
}

impl FileFormat {
    /// Formats a bake pass can write to.
    pub const OUTPUTS: [FileFormat; 5] = [
        FileFormat::Png,
        FileFormat::Targa,
        FileFormat::OpenExr,
        FileFormat::Hdr,
        FileFormat::Tiff,
    ];

    /// Every known format.
    pub const ALL: [FileFormat; 13] = [
        FileFormat::Bmp,
        FileFormat::Png,
        FileFormat::Jpeg,
        FileFormat::Jpeg2000,
        FileFormat::Targa,
        FileFormat::TargaRaw,
        FileFormat::Iris,
        FileFormat::Cineon,
        FileFormat::Dpx,
        FileFormat::OpenExr,
        FileFormat::OpenExrMultilayer,
        FileFormat::Hdr,
        FileFormat::Tiff,
    ];

    /// Returns the host identifier (e.g. `OPEN_EXR`).
    pub fn identifier(&self) -> &'static str {
        match self {
            FileFormat::Bmp => "BMP",
            FileFormat::Png => "PNG",
            FileFormat::Jpeg => "JPEG",
            FileFormat::Jpeg2000 => "JPEG2000",
            FileFormat::Targa => "TARGA",
            FileFormat::TargaRaw => "TARGA_RAW",
            FileFormat::Iris => "IRIS",
            FileFormat::Cineon => "CINEON",
            FileFormat::Dpx => "DPX",
            FileFormat::OpenExr => "OPEN_EXR",
            FileFormat::OpenExrMultilayer => "OPEN_EXR_MULTILAYER",
            FileFormat::Hdr => "HDR",
            FileFormat::Tiff => "TIFF",
        }
    }

    /// Looks up a format by host identifier.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.identifier() == identifier)
    }

    /// Returns the file extension used for bake output, or `None` if baked
    /// textures are never written in this format.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            FileFormat::Png => Some(".png"),
            FileFormat::Targa => Some(".tga"),
            FileFormat::OpenExr => Some(".exr"),
            FileFormat::Hdr => Some(".hdr"),
            FileFormat::Tiff => Some(".tif"),
            _ => None,
        }
    }

    /// Like [`extension`](Self::extension), but an error for non-output formats.
    pub fn output_extension(&self) -> BakeResult<&'static str> {
        self.extension()
            .ok_or(BakeError::UnsupportedOutputFormat { format: *self })
    }

    /// Returns the color depths the format can store.
    pub fn color_depths(&self) -> &'static [ColorDepth] {
        use ColorDepth::*;
        match self {
            FileFormat::Bmp | FileFormat::Jpeg | FileFormat::Targa | FileFormat::TargaRaw => {
                &[Eight]
            }
            FileFormat::Iris | FileFormat::Png | FileFormat::Tiff => &[Eight, Sixteen],
            FileFormat::Jpeg2000 => &[Eight, Twelve, Sixteen],
            FileFormat::Cineon | FileFormat::Dpx => &[Eight, Ten, Twelve, Sixteen],
            FileFormat::OpenExr | FileFormat::OpenExrMultilayer => &[Sixteen, ThirtyTwo],
            FileFormat::Hdr => &[ThirtyTwo],
        }
    }

    /// Returns true if `depth` is legal for this format.
    pub fn supports_depth(&self, depth: ColorDepth) -> bool {
        self.color_depths().contains(&depth)
    }

    /// Returns the depth to fall back on when a requested one isn't legal.
    pub fn default_depth(&self) -> ColorDepth {
        self.color_depths()[0]
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// Bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColorDepth {
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "12")]
    Twelve,
    #[serde(rename = "16")]
    Sixteen,
    #[serde(rename = "32")]
    ThirtyTwo,
}

impl ColorDepth {
    /// Returns the host identifier (`"8"`, `"16"`, ...).
    pub fn identifier(&self) -> &'static str {
        match self {
            ColorDepth::Eight => "8",
            ColorDepth::Ten => "10",
            ColorDepth::Twelve => "12",
            ColorDepth::Sixteen => "16",
            ColorDepth::ThirtyTwo => "32",
        }
    }

    /// Returns true if images of this depth need a float buffer.
    pub fn needs_float_buffer(&self) -> bool {
        *self != ColorDepth::Eight
    }
}

impl fmt::Display for ColorDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}
