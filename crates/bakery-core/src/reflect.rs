//! Host struct introspection.
//!
//! Host settings objects (render settings, color management, bake settings)
//! can't be copied or constructed outside the host. [`Subject`] is the seam
//! through which the snapshot layer reads and writes them field by field.

use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::value::Value;

/// The kind of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Numeric, boolean, string or float-array field.
    Scalar,
    /// Single-choice (enum) field with a runtime-determined set of legal values.
    Choice,
    /// Pointer to another struct, possibly unset.
    Nested,
    /// A list of structs. Never captured.
    Collection,
}

/// A declared field of a host struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field identifier.
    pub name: String,
    /// Field kind.
    pub kind: FieldKind,
    /// Whether the host refuses writes to this field.
    pub read_only: bool,
}

impl FieldDescriptor {
    /// Creates a writable field descriptor.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            read_only: false,
        }
    }

    /// Marks the descriptor read-only.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// A live host struct that can be inspected and written field by field.
pub trait Subject {
    /// Identifier of the struct type. Snapshots only apply to subjects with
    /// an identical type name.
    fn type_name(&self) -> &str;

    /// Lists the declared fields of this instance.
    fn fields(&self) -> Vec<FieldDescriptor>;

    /// Reads a scalar or choice field.
    fn get(&self, name: &str) -> Result<Value, HostError>;

    /// Resolves a nested struct field. `Ok(None)` is an unset pointer.
    fn nested(&self, name: &str) -> Result<Option<&dyn Subject>, HostError>;

    /// Resolves a nested struct field for writing.
    fn nested_mut(&mut self, name: &str) -> Result<Option<&mut dyn Subject>, HostError>;

    /// Writes a scalar or choice field.
    ///
    /// Implementations raise on read-only fields, mismatched value types and
    /// illegal choices.
    fn set(&mut self, name: &str, value: &Value) -> Result<(), HostError>;

    /// Returns the currently legal options of a choice field.
    ///
    /// `None` means the host can't answer reliably for this field, which is
    /// common for choice sets that only fill in once an instance reaches a
    /// given state.
    fn choice_options(&self, name: &str) -> Option<Vec<String>> {
        let _ = name;
        None
    }

    /// Looks up a single field descriptor by name.
    fn descriptor(&self, name: &str) -> Option<FieldDescriptor> {
        self.fields().into_iter().find(|f| f.name == name)
    }
}

/// Splits a dotted path into its owner segments and leaf field name.
///
/// `"bake.image_settings.file_format"` yields
/// `(["bake", "image_settings"], "file_format")`.
pub fn split_path(path: &str) -> (Vec<&str>, &str) {
    match path.rsplit_once('.') {
        Some((owner, leaf)) => (owner.split('.').collect(), leaf),
        None => (Vec::new(), path),
    }
}

/// Follows every segment of a dotted struct path (`bake.image_settings`).
///
/// Returns `Ok(None)` if one of the pointers along the way is unset.
pub fn resolve_struct_mut<'a>(
    root: &'a mut dyn Subject,
    path: &str,
) -> Result<Option<&'a mut dyn Subject>, HostError> {
    let mut current = root;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        match current.nested_mut(segment)? {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Read-only counterpart of [`resolve_struct_mut`].
pub fn resolve_struct<'a>(
    root: &'a dyn Subject,
    path: &str,
) -> Result<Option<&'a dyn Subject>, HostError> {
    let mut current = root;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        match current.nested(segment)? {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Walks the owner segments of `path` from `root` and returns the struct
/// that owns the leaf field, together with the leaf name.
///
/// Returns `Ok(None)` if one of the pointers along the way is unset.
pub fn resolve_owner_mut<'a, 'p>(
    root: &'a mut dyn Subject,
    path: &'p str,
) -> Result<Option<(&'a mut dyn Subject, &'p str)>, HostError> {
    let (segments, leaf) = split_path(path);
    let mut owner = root;
    for segment in segments {
        match owner.nested_mut(segment)? {
            Some(next) => owner = next,
            None => return Ok(None),
        }
    }
    Ok(Some((owner, leaf)))
}

/// Read-only counterpart of [`resolve_owner_mut`].
pub fn resolve_owner<'a, 'p>(
    root: &'a dyn Subject,
    path: &'p str,
) -> Result<Option<(&'a dyn Subject, &'p str)>, HostError> {
    let (segments, leaf) = split_path(path);
    let mut owner = root;
    for segment in segments {
        match owner.nested(segment)? {
            Some(next) => owner = next,
            None => return Ok(None),
        }
    }
    Ok(Some((owner, leaf)))
}

/// Reads the value at a dotted path.
pub fn read_path(root: &dyn Subject, path: &str) -> Result<Option<Value>, HostError> {
    match resolve_owner(root, path)? {
        Some((owner, leaf)) => owner.get(leaf).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("engine"), (vec![], "engine"));
        assert_eq!(
            split_path("bake.image_settings.file_format"),
            (vec!["bake", "image_settings"], "file_format")
        );
    }

    #[test]
    fn test_descriptor_builder() {
        let desc = FieldDescriptor::new("is_data", FieldKind::Scalar).read_only();
        assert!(desc.read_only);
        assert_eq!(desc.kind, FieldKind::Scalar);
    }
}
