//! Bakery Bake
//!
//! Texture bake sessions built on [`bakery_core`] snapshots.
//!
//! # Overview
//!
//! A [`BakeSession`] takes [`BakeToolSettings`] and a list of
//! [`BakePassSpec`]s and drives a [`BakeHost`]:
//!
//! 1. Render and path tracer settings are captured, then overlaid with what
//!    a bake needs (path tracer engine, image texture target, no denoising).
//! 2. For every enabled pass and source material, an image node is added to
//!    the target material, the pass's shader input is rerouted through a
//!    temporary emission node where needed, the pass's image settings
//!    overlay is applied, and the host bakes and saves the texture.
//! 3. Temporary nodes are removed and the material output link is restored.
//! 4. The captured settings and display device are restored, whether or not
//!    the passes succeeded.
//!
//! # Example
//!
//! ```
//! use bakery_bake::{default_passes, BakeMaterials, BakeSession, BakeToolSettings, MemoryScene};
//!
//! let mut scene = MemoryScene::demo();
//! let settings = BakeToolSettings::default().export_path("/textures");
//! let session = BakeSession::new(settings, default_passes());
//! let report = session.run(&mut scene, &BakeMaterials::self_bake("Crate")).unwrap();
//! assert_eq!(report.outputs.len(), 5);
//! ```
//!
//! # Crate Structure
//!
//! - [`format`] - File formats and color depths
//! - [`pass`] - Bake pass definitions
//! - [`settings`] - Tool settings
//! - [`image_settings`] - Per-pass image output overlays
//! - [`host`] - The scene handle a session drives
//! - [`session`] - Bake orchestration
//! - [`scene`] - In-memory scene
//! - [`error`] - Error types

pub mod error;
pub mod format;
pub mod host;
pub mod image_settings;
pub mod pass;
pub mod scene;
pub mod session;
pub mod settings;

// Re-export main types at crate root
pub use error::{BakeError, BakeResult};
pub use format::{ColorDepth, FileFormat};
pub use host::{BakeHost, BakeRequest, ImageRequest, ShaderGraph};
pub use pass::{default_passes, BakePassKind, BakePassSpec, BakeType};
pub use scene::MemoryScene;
pub use session::{BakeMaterials, BakeReport, BakeSession, BakedTexture, PlannedPass};
pub use settings::{BakeSource, BakeToolSettings};
