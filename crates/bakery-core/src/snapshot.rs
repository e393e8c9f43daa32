//! Property snapshots of host settings structs.
//!
//! Host settings structs can't be copied, compared or instantiated on their
//! own, and only one instance of most of them exists per scene. A
//! [`PropertySnapshot`] flattens every scalar and choice field reachable
//! from a subject into a map keyed by dotted path (`bake.image_settings.file_format`).
//! The map can be copied and edited freely and later pushed back onto a live
//! subject of the same type with [`PropertySnapshot::apply`].
//!
//! # Example
//!
//! ```
//! use bakery_core::memory::MemoryStruct;
//! use bakery_core::snapshot::PropertySnapshot;
//! use bakery_core::choice::ResolverChain;
//! use bakery_core::Subject;
//!
//! let mut render = MemoryStruct::new("RenderSettings")
//!     .choice("engine", "BLENDER_EEVEE", ["BLENDER_EEVEE", "CYCLES"])
//!     .scalar("samples", 64);
//!
//! let original = PropertySnapshot::capture(&render).unwrap();
//! let mut overlay = original.copy(true);
//! overlay.set("engine", "CYCLES").unwrap();
//!
//! let resolver = ResolverChain::standard(vec!["CYCLES".to_string()]);
//! overlay.apply(&mut render, &resolver).unwrap();
//! assert_eq!(render.get("engine").unwrap().as_str(), Some("CYCLES"));
//!
//! original.apply(&mut render, &resolver).unwrap();
//! assert_eq!(render.get("engine").unwrap().as_str(), Some("BLENDER_EEVEE"));
//! ```

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::choice::ChoiceResolver;
use crate::error::{CacheError, CacheResult, HostError};
use crate::reflect::{resolve_owner_mut, FieldKind, Subject};
use crate::value::{Slot, Value};

/// Default nesting limit for [`CaptureOptions`].
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Options controlling how a subject is walked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Pointers nested deeper than this are recorded as `None` instead of
    /// being expanded. Host struct graphs can be cyclic.
    pub max_depth: usize,
    /// Field names skipped at every level.
    pub excluded_fields: BTreeSet<String>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            excluded_fields: ["rna_type".to_string()].into_iter().collect(),
        }
    }
}

impl CaptureOptions {
    /// Sets the nesting limit.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Skips an additional field name.
    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.excluded_fields.insert(field.into());
        self
    }
}

/// A flat, copyable stand-in for a host settings struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySnapshot {
    subject_type: String,
    fields: BTreeMap<String, Slot>,
    /// Paths in the order they were captured. The host's declaration order
    /// matters on apply: the legal values of one choice can depend on another.
    #[serde(default)]
    field_order: Vec<String>,
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

impl PropertySnapshot {
    /// Captures every scalar and choice field reachable from `subject`.
    pub fn capture(subject: &dyn Subject) -> CacheResult<Self> {
        Self::capture_with(subject, &CaptureOptions::default())
    }

    /// Captures the field names reachable from `subject` with every value
    /// set to the unassigned marker.
    pub fn capture_schema(subject: &dyn Subject) -> CacheResult<Self> {
        Ok(Self::capture(subject)?.copy(true))
    }

    /// Captures `subject` with explicit options.
    ///
    /// Nested pointers are recorded as placeholders first and then expanded
    /// one level at a time until none are left. Each expansion adds the
    /// pointee's fields under `pointer.field` keys and drops the placeholder.
    /// Unset pointers stay in the map as `None`. Collections are skipped.
    pub fn capture_with(subject: &dyn Subject, options: &CaptureOptions) -> CacheResult<Self> {
        let mut fields = BTreeMap::new();
        let mut field_order = Vec::new();
        let mut pending: VecDeque<(String, &dyn Subject, usize)> = VecDeque::new();
        pending.push_back((String::new(), subject, 0));

        while let Some((prefix, current, depth)) = pending.pop_front() {
            for desc in current.fields() {
                if options.excluded_fields.contains(&desc.name) {
                    continue;
                }
                let key = join(&prefix, &desc.name);
                let value = match desc.kind {
                    FieldKind::Collection => continue,
                    FieldKind::Scalar | FieldKind::Choice => {
                        current
                            .get(&desc.name)
                            .map_err(|source| CacheError::Capture {
                                path: key.clone(),
                                source,
                            })?
                    }
                    FieldKind::Nested => {
                        let nested = current
                            .nested(&desc.name)
                            .map_err(|source| CacheError::Capture {
                                path: key.clone(),
                                source,
                            })?;
                        match nested {
                            Some(inner) if depth < options.max_depth => {
                                pending.push_back((key, inner, depth + 1));
                                continue;
                            }
                            Some(_) => {
                                warn!(
                                    path = %key,
                                    depth,
                                    "nesting limit reached, recording pointer as None"
                                );
                                Value::Null
                            }
                            None => Value::Null,
                        }
                    }
                };
                if fields.contains_key(&key) {
                    warn!(path = %key, "duplicate property path, keeping first value");
                    continue;
                }
                field_order.push(key.clone());
                fields.insert(key, Slot::Assigned(value));
            }
        }

        debug!(
            subject_type = subject.type_name(),
            fields = fields.len(),
            "captured property snapshot"
        );
        Ok(Self {
            subject_type: subject.type_name().to_string(),
            fields,
            field_order,
        })
    }

    /// Returns an independent copy with the same keys and subject type.
    ///
    /// With `void_values` every value is replaced by the unassigned marker,
    /// which gives an overlay of only the fields that are later `set`.
    pub fn copy(&self, void_values: bool) -> Self {
        let mut copy = self.clone();
        if void_values {
            copy.void_values();
        }
        copy
    }

    /// Replaces every value with the unassigned marker.
    pub fn void_values(&mut self) {
        for slot in self.fields.values_mut() {
            *slot = Slot::Unassigned;
        }
    }

    /// Sets the value at `path`.
    ///
    /// The value is not validated until [`apply`](Self::apply).
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> CacheResult<()> {
        match self.fields.get_mut(path) {
            Some(slot) => {
                *slot = Slot::Assigned(value.into());
                Ok(())
            }
            None => Err(self.unknown_field(path)),
        }
    }

    /// Sets several values. Nothing is written unless every path is known.
    pub fn set_many<I, K, V>(&mut self, values: I) -> CacheResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let values: Vec<(K, V)> = values.into_iter().collect();
        if let Some((path, _)) = values
            .iter()
            .find(|(path, _)| !self.fields.contains_key(path.as_ref()))
        {
            return Err(self.unknown_field(path.as_ref()));
        }
        for (path, value) in values {
            self.set(path.as_ref(), value)?;
        }
        Ok(())
    }

    /// Marks the value at `path` as unassigned again.
    pub fn unset(&mut self, path: &str) -> CacheResult<()> {
        match self.fields.get_mut(path) {
            Some(slot) => {
                *slot = Slot::Unassigned;
                Ok(())
            }
            None => Err(self.unknown_field(path)),
        }
    }

    fn unknown_field(&self, path: &str) -> CacheError {
        CacheError::UnknownField {
            subject_type: self.subject_type.clone(),
            path: path.to_string(),
        }
    }

    /// Returns the type name this snapshot was captured from.
    pub fn subject_type(&self) -> &str {
        &self.subject_type
    }

    /// Returns the entry at `path`.
    pub fn get(&self, path: &str) -> Option<&Slot> {
        self.fields.get(path)
    }

    /// Returns true if `path` is tracked.
    pub fn contains(&self, path: &str) -> bool {
        self.fields.contains_key(path)
    }

    /// Iterates the tracked paths in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Iterates the entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Slot)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates the entries that hold a value.
    pub fn assigned(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields
            .iter()
            .filter_map(|(k, slot)| slot.value().map(|v| (k.as_str(), v)))
    }

    /// Returns the number of tracked paths.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no paths are tracked.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Writes every assigned value onto `target`.
    ///
    /// Values are written in capture order, so a choice is validated after
    /// the fields declared before it have their new values. Fails before
    /// writing anything if `target` is not of the captured type. Past that
    /// point no field stops the others from being written: read-only fields
    /// are skipped, illegal choices and host refusals are collected into the
    /// returned [`ApplyReport`].
    pub fn apply(
        &self,
        target: &mut dyn Subject,
        resolver: &dyn ChoiceResolver,
    ) -> CacheResult<ApplyReport> {
        if target.type_name() != self.subject_type {
            return Err(CacheError::TypeMismatch {
                expected: self.subject_type.clone(),
                found: target.type_name().to_string(),
            });
        }

        let mut report = ApplyReport::default();
        for path in self.apply_order() {
            let Some(value) = self.fields.get(path).and_then(Slot::value) else {
                continue;
            };
            let (owner, leaf) = match resolve_owner_mut(target, path) {
                Ok(Some(found)) => found,
                Ok(None) => {
                    report.fail(path, "a struct pointer on the path is unset");
                    continue;
                }
                Err(e) => {
                    report.fail(path, e.to_string());
                    continue;
                }
            };

            let Some(desc) = owner.descriptor(leaf) else {
                report.fail(path, format!("'{}' has no field '{}'", owner.type_name(), leaf));
                continue;
            };
            if desc.read_only {
                report.skipped_read_only.push(path.to_string());
                continue;
            }
            match desc.kind {
                FieldKind::Nested | FieldKind::Collection => {
                    report.skipped_pointers.push(path.to_string());
                    continue;
                }
                FieldKind::Choice => {
                    if let Some(legal) = resolver.valid_choices(owner, leaf) {
                        let accepted = value.as_str().is_some_and(|v| legal.iter().any(|o| o == v));
                        if !accepted {
                            warn!(path, %value, ?legal, "skipping illegal choice");
                            report.invalid_choices.push(InvalidChoice {
                                path: path.to_string(),
                                value: value.clone(),
                                legal,
                            });
                            continue;
                        }
                    }
                }
                FieldKind::Scalar => {}
            }

            match owner.set(leaf, value) {
                Ok(()) => report.written.push(path.to_string()),
                Err(HostError::InvalidChoice { message, .. }) => {
                    warn!(path, %message, "host rejected choice");
                    report.fail(path, message);
                }
                Err(e) => {
                    warn!(path, error = %e, "host rejected write");
                    report.fail(path, e.to_string());
                }
            }
        }

        debug!(
            subject_type = %self.subject_type,
            written = report.written.len(),
            rejected = report.rejected_count(),
            "applied property snapshot"
        );
        Ok(report)
    }

    /// Capture order, or sorted order for snapshots deserialized without one.
    fn apply_order(&self) -> Vec<&str> {
        if self.field_order.len() == self.fields.len() {
            self.field_order.iter().map(String::as_str).collect()
        } else {
            self.keys().collect()
        }
    }
}

impl fmt::Display for PropertySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.fields.keys().map(|k| k.len()).max().unwrap_or(0);
        for (key, slot) in &self.fields {
            writeln!(f, "{:<width$} | {}", key, slot, width = width)?;
        }
        Ok(())
    }
}

/// A choice value that was not legal on the live subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidChoice {
    /// Dotted path of the field.
    pub path: String,
    /// The rejected value.
    pub value: Value,
    /// The options that were legal at apply time.
    pub legal: Vec<String>,
}

/// A field the host refused to write, or whose owner could not be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFailure {
    /// Dotted path of the field.
    pub path: String,
    /// Why the write failed.
    pub reason: String,
}

/// Outcome of [`PropertySnapshot::apply`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyReport {
    /// Paths written to the subject.
    pub written: Vec<String>,
    /// Paths skipped because the live field is read-only.
    pub skipped_read_only: Vec<String>,
    /// Paths skipped because they hold struct pointers.
    pub skipped_pointers: Vec<String>,
    /// Choice values that were not legal.
    pub invalid_choices: Vec<InvalidChoice>,
    /// Writes the host refused.
    pub failures: Vec<FieldFailure>,
}

impl ApplyReport {
    fn fail(&mut self, path: &str, reason: impl Into<String>) {
        self.failures.push(FieldFailure {
            path: path.to_string(),
            reason: reason.into(),
        });
    }

    /// Returns true if nothing was rejected.
    pub fn is_clean(&self) -> bool {
        self.invalid_choices.is_empty() && self.failures.is_empty()
    }

    /// Number of rejected fields.
    pub fn rejected_count(&self) -> usize {
        self.invalid_choices.len() + self.failures.len()
    }

    /// Folds another report into this one.
    pub fn merge(&mut self, other: ApplyReport) {
        self.written.extend(other.written);
        self.skipped_read_only.extend(other.skipped_read_only);
        self.skipped_pointers.extend(other.skipped_pointers);
        self.invalid_choices.extend(other.invalid_choices);
        self.failures.extend(other.failures);
    }
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return write!(f, "{} field(s) applied", self.written.len());
        }
        writeln!(
            f,
            "{} field(s) applied, {} rejected:",
            self.written.len(),
            self.rejected_count()
        )?;
        for invalid in &self.invalid_choices {
            writeln!(
                f,
                "  {} = {} is not one of: {}",
                invalid.path,
                invalid.value,
                invalid.legal.join(", ")
            )?;
        }
        for failure in &self.failures {
            writeln!(f, "  {}: {}", failure.path, failure.reason)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choice::{IntrospectionResolver, ResolverChain};
    use crate::memory::MemoryStruct;
    use pretty_assertions::assert_eq;

    fn image_settings() -> MemoryStruct {
        MemoryStruct::new("ImageFormatSettings")
            .choice("file_format", "PNG", ["PNG", "TIFF", "OPEN_EXR"])
            .choice("color_depth", "8", ["8", "16"])
            .nested(
                "view_settings",
                MemoryStruct::new("ColorManagedViewSettings")
                    .scalar("use_curve_mapping", false)
                    .unset("curve_mapping"),
            )
    }

    fn render() -> MemoryStruct {
        MemoryStruct::new("RenderSettings")
            .choice("engine", "BLENDER_EEVEE", ["BLENDER_EEVEE"])
            .scalar("use_file_extension", true)
            .read_only_scalar("has_multiple_engines", true)
            .scalar("filepath", "")
            .collection("views", vec![MemoryStruct::new("SceneRenderView")])
            .nested(
                "bake",
                MemoryStruct::new("BakeSettings")
                    .choice("target", "IMAGE_TEXTURES", ["IMAGE_TEXTURES", "VERTEX_COLORS"])
                    .unset("cage_object")
                    .nested("image_settings", image_settings()),
            )
            .nested("image_settings", image_settings())
    }

    #[test]
    fn test_capture_flattens_nested_structs() {
        let snapshot = PropertySnapshot::capture(&render()).unwrap();
        let keys: Vec<&str> = snapshot.keys().collect();
        assert_eq!(
            keys,
            vec![
                "bake.cage_object",
                "bake.image_settings.color_depth",
                "bake.image_settings.file_format",
                "bake.image_settings.view_settings.curve_mapping",
                "bake.image_settings.view_settings.use_curve_mapping",
                "bake.target",
                "engine",
                "filepath",
                "has_multiple_engines",
                "image_settings.color_depth",
                "image_settings.file_format",
                "image_settings.view_settings.curve_mapping",
                "image_settings.view_settings.use_curve_mapping",
                "use_file_extension",
            ]
        );
        assert_eq!(
            snapshot.get("bake.cage_object"),
            Some(&Slot::Assigned(Value::Null))
        );
        assert_eq!(
            snapshot.get("filepath"),
            Some(&Slot::Assigned(Value::from("")))
        );
    }

    #[test]
    fn test_capture_keeps_first_of_duplicate_paths() {
        let subject = MemoryStruct::new("RenderSettings")
            .scalar("bake.margin", 1)
            .nested("bake", MemoryStruct::new("BakeSettings").scalar("margin", 16));
        let snapshot = PropertySnapshot::capture(&subject).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot.get("bake.margin"),
            Some(&Slot::Assigned(Value::Int(1)))
        );
    }

    #[test]
    fn test_capture_respects_max_depth() {
        let options = CaptureOptions::default().max_depth(1);
        let snapshot = PropertySnapshot::capture_with(&render(), &options).unwrap();
        assert_eq!(
            snapshot.get("bake.image_settings"),
            Some(&Slot::Assigned(Value::Null))
        );
        assert!(!snapshot.contains("bake.image_settings.file_format"));
    }

    #[test]
    fn test_capture_schema_is_all_unassigned() {
        let schema = PropertySnapshot::capture_schema(&render()).unwrap();
        assert!(!schema.is_empty());
        assert!(schema.iter().all(|(_, slot)| slot.is_unassigned()));
        assert_eq!(schema.assigned().count(), 0);
    }

    #[test]
    fn test_set_many_is_all_or_nothing() {
        let mut snapshot = PropertySnapshot::capture(&render()).unwrap().copy(true);
        let err = snapshot
            .set_many([("engine", Value::from("CYCLES")), ("nope", Value::Int(1))])
            .unwrap_err();
        assert!(matches!(err, CacheError::UnknownField { .. }));
        assert_eq!(snapshot.get("engine"), Some(&Slot::Unassigned));
    }

    #[test]
    fn test_unset_pointer_entries_are_never_written() {
        let mut target = render();
        let snapshot = PropertySnapshot::capture(&target).unwrap();
        let report = snapshot.apply(&mut target, &IntrospectionResolver).unwrap();
        assert!(report.skipped_pointers.contains(&"bake.cage_object".to_string()));
        assert!(!target.all_writes().contains(&"bake.cage_object".to_string()));
    }

    #[test]
    fn test_apply_onto_target_with_unset_owner() {
        let mut source = MemoryStruct::new("BakeSettings").nested(
            "image_settings",
            MemoryStruct::new("ImageFormatSettings").scalar("quality", 90),
        );
        let snapshot = PropertySnapshot::capture(&source).unwrap();
        source = MemoryStruct::new("BakeSettings").unset("image_settings");
        let report = snapshot.apply(&mut source, &ResolverChain::new()).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "image_settings.quality");
    }

    #[test]
    fn test_host_type_refusal_is_collected() {
        let mut target = render();
        let mut snapshot = PropertySnapshot::capture(&target).unwrap().copy(true);
        snapshot.set("use_file_extension", "yes").unwrap();
        snapshot.set("filepath", "//out/").unwrap();
        let report = snapshot.apply(&mut target, &IntrospectionResolver).unwrap();
        assert_eq!(report.written, vec!["filepath"]);
        assert_eq!(report.failures.len(), 1);
        assert!(report.to_string().contains("use_file_extension"));
    }

    #[test]
    fn test_display_aligns_keys() {
        let snapshot = PropertySnapshot::capture(
            &MemoryStruct::new("CyclesRenderSettings")
                .scalar("samples", 64)
                .choice("device", "CPU", ["CPU", "GPU"]),
        )
        .unwrap();
        assert_eq!(snapshot.to_string(), "device  | 'CPU'\nsamples | 64\n");
    }
}
