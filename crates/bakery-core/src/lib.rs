//! Bakery Core
//!
//! Snapshot and restore of host-owned scene data for texture baking.
//!
//! # Overview
//!
//! A bake temporarily reconfigures the host: the render engine switches to a
//! path tracer, image output settings change per pass, and each material's
//! shader graph is rewired through temporary nodes. Afterwards everything has
//! to go back exactly as it was. The host offers no copy constructor,
//! equality or serialization for any of these objects, so this crate provides:
//!
//! - **[`PropertySnapshot`]** - flattens a settings struct and every nested
//!   struct under it into a dotted-path map, supports schema-only copies
//!   used as overlays, and applies a map back onto a live struct, skipping
//!   read-only fields and collecting illegal choice values instead of failing.
//! - **[`NodeLinkSnapshot`]** - remembers one shader graph link by node and
//!   socket names and recreates it after the graph has been edited.
//! - **[`ChoiceResolver`]** - the strategies used to find the legal options
//!   of a choice field when the host's own metadata is incomplete.
//!
//! The host is reached only through the [`Subject`] and [`NodeGraph`]
//! traits. The [`memory`] module implements both in memory.
//!
//! # Crate Structure
//!
//! - [`value`] - Field values and the unassigned marker
//! - [`reflect`] - Settings struct introspection
//! - [`snapshot`] - Property snapshots
//! - [`choice`] - Choice field resolution
//! - [`graph`] - Node graph introspection
//! - [`link`] - Node link snapshots
//! - [`memory`] - In-memory host model
//! - [`error`] - Error types

pub mod choice;
pub mod error;
pub mod graph;
pub mod link;
pub mod memory;
pub mod reflect;
pub mod snapshot;
pub mod value;

// Re-export main types at crate root
pub use choice::{
    ChoiceResolver, EngineRegistry, ErrorProbeResolver, IntrospectionResolver, RenderEngineResolver,
    ResolverChain, StaticChoiceTable,
};
pub use error::{CacheError, CacheResult, HostError, LinkRestoreError};
pub use graph::{GraphNode, LinkEndpoints, NodeGraph, SocketType};
pub use link::NodeLinkSnapshot;
pub use reflect::{FieldDescriptor, FieldKind, Subject};
pub use snapshot::{ApplyReport, CaptureOptions, FieldFailure, InvalidChoice, PropertySnapshot};
pub use value::{Slot, Value};
