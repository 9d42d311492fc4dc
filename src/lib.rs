//! Iconforge is a layered icon-asset compositing engine.
//!
//! It renders a declarative [`Layer`] tree (masked background shapes,
//! foreground imagery, shadow/fill effects) into premultiplied-RGBA8
//! [`Surface`]s at a set of density multipliers, and emits archive-ready
//! PNG/XML entries plus live-preview surfaces:
//!
//! - Build a [`LauncherIconSpec`] from form values and a [`SourceStore`] of
//!   decoded imagery
//! - Call [`generate`] for the full multi-density output pass
//! - Or drive the pieces directly: [`draw_layers`], [`apply_effects`],
//!   [`draw_scaled`], [`compute_trim_rect`]
#![forbid(unsafe_code)]

pub mod archive;
pub mod blit;
pub mod blur;
pub mod color;
pub mod compositor;
pub mod debounce;
pub mod density;
pub mod effect;
pub mod error;
pub mod generator;
pub mod geom;
pub mod layer;
pub mod pixel;
pub mod renderer;
pub mod source;
pub mod surface;
pub mod trim;

pub use archive::{ArchiveEntry, EntryData, mipmap_path, sanitize_resource_name};
pub use blit::{draw_center_crop, draw_center_inside, draw_scaled};
pub use color::Color;
pub use compositor::apply_effects;
pub use debounce::{Debouncer, REGENERATE_DEBOUNCE};
pub use density::Density;
pub use effect::{ColorStop, Effect, EffectClass};
pub use error::{IconforgeError, IconforgeResult};
pub use generator::{
    BackgroundShape, GeneratedAssets, IconEffect, LauncherIconSpec, generate,
};
pub use geom::{Rect, Size};
pub use layer::{Draw, Fit, Layer, Shape, SourceStore};
pub use pixel::CompositeMode;
pub use renderer::draw_layers;
pub use source::{SourceCache, decode_source, normalize_source};
pub use surface::Surface;
pub use trim::{ScanStrategy, TrimScanner, TrimTicket, compute_trim_rect};
