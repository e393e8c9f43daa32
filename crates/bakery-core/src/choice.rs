//! Resolution of the legal options of choice (enum) fields.
//!
//! The host's own metadata for choice fields is not always complete. Some
//! option sets only fill in once an instance is in a given state, and some
//! depend on which extensions are registered (render engines, for example).
//! Every strategy for finding the true option set lives behind
//! [`ChoiceResolver`], and callers only ever talk to that trait.

use std::collections::HashMap;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::HostError;
use crate::reflect::Subject;
use crate::value::Value;

/// A strategy for finding the currently legal options of a choice field.
pub trait ChoiceResolver {
    /// Returns the legal options of `field` on `owner`, or `None` if this
    /// strategy can't tell.
    ///
    /// `owner` is mutable because some strategies have to provoke the host
    /// into listing its options. Implementations must leave the field's
    /// value as they found it.
    fn valid_choices(&self, owner: &mut dyn Subject, field: &str) -> Option<Vec<String>>;
}

/// A hard-coded table of options keyed by struct type and field name.
#[derive(Debug, Clone, Default)]
pub struct StaticChoiceTable {
    entries: HashMap<(String, String), Vec<String>>,
}

impl StaticChoiceTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing any previous one for the same field.
    pub fn with(
        mut self,
        type_name: impl Into<String>,
        field: impl Into<String>,
        options: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.entries.insert(
            (type_name.into(), field.into()),
            options.into_iter().map(Into::into).collect(),
        );
        self
    }
}

impl ChoiceResolver for StaticChoiceTable {
    fn valid_choices(&self, owner: &mut dyn Subject, field: &str) -> Option<Vec<String>> {
        self.entries
            .get(&(owner.type_name().to_string(), field.to_string()))
            .cloned()
    }
}

/// Source of the render engines currently registered with the host.
pub trait EngineRegistry {
    /// Returns the identifiers of registered, non-built-in render engines.
    fn registered_engines(&self) -> Vec<String>;
}

impl EngineRegistry for Vec<String> {
    fn registered_engines(&self) -> Vec<String> {
        self.clone()
    }
}

/// Render engines that ship with the host and are always available.
pub const BUILTIN_RENDER_ENGINES: [&str; 2] = ["BLENDER_EEVEE", "BLENDER_WORKBENCH"];

/// Resolves `RenderSettings.engine`.
///
/// The host's metadata for this field only lists the default engine, so the
/// legal set is the built-in engines plus every registered engine
/// implementation.
pub struct RenderEngineResolver<R> {
    registry: R,
}

impl<R: EngineRegistry> RenderEngineResolver<R> {
    /// Struct type that owns the engine field.
    pub const TYPE_NAME: &'static str = "RenderSettings";
    /// Field name of the engine choice.
    pub const FIELD: &'static str = "engine";

    /// Creates a resolver backed by the given registry.
    pub fn new(registry: R) -> Self {
        Self { registry }
    }
}

impl<R: EngineRegistry> ChoiceResolver for RenderEngineResolver<R> {
    fn valid_choices(&self, owner: &mut dyn Subject, field: &str) -> Option<Vec<String>> {
        if owner.type_name() != Self::TYPE_NAME || field != Self::FIELD {
            return None;
        }
        let mut engines: Vec<String> = BUILTIN_RENDER_ENGINES
            .iter()
            .map(|s| s.to_string())
            .collect();
        for engine in self.registry.registered_engines() {
            if !engines.contains(&engine) {
                engines.push(engine);
            }
        }
        Some(engines)
    }
}

/// Asks the host through [`Subject::choice_options`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IntrospectionResolver;

impl ChoiceResolver for IntrospectionResolver {
    fn valid_choices(&self, owner: &mut dyn Subject, field: &str) -> Option<Vec<String>> {
        owner.choice_options(field)
    }
}

/// Value written by [`ErrorProbeResolver`]. No host field accepts it.
pub const PROBE_SENTINEL: &str = "__BAKERY_INVALID_CHOICE__";

/// Finds the legal options by writing an illegal value and reading the
/// option list out of the host's error message.
///
/// This depends on the wording of host messages (`enum "X" not found in
/// ('A', 'B')`), so it sits last in [`ResolverChain::standard`] and is only
/// consulted when nothing structured answers.
#[derive(Debug, Clone)]
pub struct ErrorProbeResolver {
    list: Regex,
    item: Regex,
}

impl ErrorProbeResolver {
    /// Creates a resolver that understands the host's default message format.
    pub fn new() -> Self {
        Self {
            list: Regex::new(r"not found in \(([^)]*)\)").expect("valid regex"),
            item: Regex::new(r"'([^']*)'").expect("valid regex"),
        }
    }

    /// Extracts the quoted option list from a host error message.
    pub fn parse_options(&self, message: &str) -> Option<Vec<String>> {
        let list = self.list.captures(message)?.get(1)?.as_str();
        Some(
            self.item
                .captures_iter(list)
                .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
                .collect(),
        )
    }
}

impl Default for ErrorProbeResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ChoiceResolver for ErrorProbeResolver {
    fn valid_choices(&self, owner: &mut dyn Subject, field: &str) -> Option<Vec<String>> {
        let previous = owner.get(field).ok();
        match owner.set(field, &Value::Str(PROBE_SENTINEL.to_string())) {
            Err(HostError::InvalidChoice { message, .. }) => {
                let parsed = self.parse_options(&message);
                if parsed.is_none() {
                    debug!(field, %message, "could not parse option list from host message");
                }
                parsed
            }
            Err(_) => None,
            Ok(()) => {
                // The host took the sentinel, so put the old value back.
                warn!(field, "host accepted probe sentinel, restoring previous value");
                if let Some(previous) = previous {
                    if let Err(e) = owner.set(field, &previous) {
                        warn!(field, error = %e, "failed to restore value after probe");
                    }
                }
                None
            }
        }
    }
}

/// An ordered list of strategies. The first one that answers wins.
#[derive(Default)]
pub struct ResolverChain {
    resolvers: Vec<Box<dyn ChoiceResolver>>,
}

impl ResolverChain {
    /// Creates an empty chain, which never answers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a strategy.
    pub fn push(mut self, resolver: impl ChoiceResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// The standard chain: render engines, then host introspection, then
    /// the error probe.
    pub fn standard(registry: impl EngineRegistry + 'static) -> Self {
        Self::new()
            .push(RenderEngineResolver::new(registry))
            .push(IntrospectionResolver)
            .push(ErrorProbeResolver::new())
    }

    /// Returns the number of strategies in the chain.
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Returns true if the chain has no strategies.
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl ChoiceResolver for ResolverChain {
    fn valid_choices(&self, owner: &mut dyn Subject, field: &str) -> Option<Vec<String>> {
        self.resolvers
            .iter()
            .find_map(|r| r.valid_choices(owner, field))
    }
}
