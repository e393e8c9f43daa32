//! Image output overlays for each bake pass.
//!
//! Each pass writes its texture with its own format, depth and colorspace.
//! These are built as overlays on a schema-only snapshot of the host's image
//! format settings, so only the fields named here are ever written.

use bakery_core::{PropertySnapshot, Subject};

use crate::error::BakeResult;
use crate::pass::BakePassSpec;

/// Fields set identically for every pass.
pub const COMMON_IMAGE_SETTINGS: [(&str, CommonValue); 6] = [
    ("color_management", CommonValue::Str("OVERRIDE")),
    ("color_mode", CommonValue::Str("RGB")),
    ("tiff_codec", CommonValue::Str("DEFLATE")),
    ("view_settings.look", CommonValue::Str("None")),
    ("view_settings.use_curve_mapping", CommonValue::Bool(false)),
    ("view_settings.view_transform", CommonValue::Str("Raw")),
];

/// A constant overlay value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommonValue {
    Str(&'static str),
    Bool(bool),
}

impl From<CommonValue> for bakery_core::Value {
    fn from(value: CommonValue) -> Self {
        match value {
            CommonValue::Str(s) => s.into(),
            CommonValue::Bool(b) => b.into(),
        }
    }
}

/// Builds the overlay shared by all passes from a live image format struct.
pub fn common_overlay(image_settings: &dyn Subject) -> BakeResult<PropertySnapshot> {
    let mut overlay = PropertySnapshot::capture_schema(image_settings)?;
    overlay.set_many(COMMON_IMAGE_SETTINGS)?;
    Ok(overlay)
}

/// Builds one pass's overlay on top of the common overlay.
pub fn pass_overlay(
    common: &PropertySnapshot,
    pass: &BakePassSpec,
) -> BakeResult<PropertySnapshot> {
    let kind = pass.kind()?;
    let mut overlay = common.copy(false);
    overlay.set("file_format", pass.file_format.identifier())?;
    overlay.set("color_depth", pass.color_depth.identifier())?;
    overlay.set("linear_colorspace_settings.is_data", kind.is_data())?;
    overlay.set("linear_colorspace_settings.name", kind.output_colorspace())?;
    Ok(overlay)
}

/// Builds the overlay for every pass, in pass order.
pub fn image_overlays(
    image_settings: &dyn Subject,
    passes: &[BakePassSpec],
) -> BakeResult<Vec<PropertySnapshot>> {
    let common = common_overlay(image_settings)?;
    passes.iter().map(|pass| pass_overlay(&common, pass)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::default_passes;
    use crate::scene::image_format_settings;
    use bakery_core::{Slot, Value};

    #[test]
    fn test_overlay_only_assigns_named_fields() {
        let overlays = image_overlays(&image_format_settings(), &default_passes()).unwrap();
        assert_eq!(overlays.len(), 5);

        let normal = &overlays[3];
        let assigned: Vec<&str> = normal.assigned().map(|(k, _)| k).collect();
        assert_eq!(assigned.len(), COMMON_IMAGE_SETTINGS.len() + 4);
        assert_eq!(normal.get("file_format"), Some(&Slot::Assigned(Value::from("TIFF"))));
        assert_eq!(normal.get("color_depth"), Some(&Slot::Assigned(Value::from("16"))));
        assert_eq!(
            normal.get("linear_colorspace_settings.name"),
            Some(&Slot::Assigned(Value::from("Raw")))
        );
        assert_eq!(normal.get("quality"), Some(&Slot::Unassigned));
    }

    #[test]
    fn test_base_color_is_srgb() {
        let overlays = image_overlays(&image_format_settings(), &default_passes()[..1]).unwrap();
        assert_eq!(
            overlays[0].get("linear_colorspace_settings.is_data"),
            Some(&Slot::Assigned(Value::Bool(false)))
        );
    }
}
