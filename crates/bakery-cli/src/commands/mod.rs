//! CLI command implementations

pub mod bake;
pub mod formats;
pub mod plan;
pub mod scene;
pub mod snapshot;
