//! docicon: macOS document icon generator
//!
//! A document icon is a page background with an application glyph drawn
//! on it and a short caption ("PDF", "PYTHON") stamped near the bottom.
//! This crate renders those icons at the standard sizes (16, 32, 128, 256
//! and 512 px) and packages them into an `.icns` container.
//!
//! # Example
//!
//! ```no_run
//! use docicon::{AssetCache, BackgroundChoice, GeneratorProfile, IcnsPackager};
//!
//! let profile = GeneratorProfile::new()
//!     .with_background(BackgroundChoice::DefaultSplit)
//!     .with_app_icon("vim-512.png")
//!     .with_text("PYTHON,PY")
//!     .with_sizes([512, 128, 32, 16]);
//!
//! let cache = AssetCache::new();
//! let written = docicon::make_document_icons(&profile, &cache, &IcnsPackager)?;
//! println!("{}", written[0].display());
//! # Ok::<(), docicon::Error>(())
//! ```
//!
//! # Pipeline
//!
//! - [`BackgroundSet`] splits the stock background into a page ground and
//!   its baked shadow, once per size.
//! - [`DocumentBackgroundRenderer`] stacks ground, app icon and shadow and
//!   caches the result.
//! - A [`TextRenderer`] draws the caption for each size.
//! - A [`Packager`] writes the sizes into an `.icns` file.
//!
//! [`run_batch`] drives the whole thing from a [`BatchManifest`].

mod batch;
mod canvas;
mod caption;
mod error;
mod generator;
mod icon;
mod layer;
mod package;
mod profile;
mod surface;
mod svg;
mod text;

pub use batch::{run_batch, BatchEntry, BatchManifest, BatchSummary, IconClass};
pub use canvas::{DrawingContext, GraphicsState};
pub use caption::{default_output_name, CaptionTable, GENERIC_CAPTION};
pub use error::{Error, Result};
pub use generator::{debug_path, make_document_icon, make_document_icons, AssetCache, IconGenerator};
pub use icon::{IconSize, Image, RectF, SizePx};
pub use layer::{
    fold_highlight, split_document_icon, BackgroundRenderer, BackgroundSet, DocumentBackgroundRenderer,
    PlacementTable, PlacementTransform, SplitLayers,
};
pub use package::{ExternalPackager, IcnsPackager, Packager};
pub use profile::{BackgroundChoice, GeneratorProfile, DEFAULT_BACKGROUND};
pub use surface::{AlphaMode, ChannelIndices, ChannelOrder, PixelFormat, Surface};
pub use text::{
    FontBook, OfficeTextRenderer, ResolvedFace, StandardTextRenderer, TextLayout, TextRenderer,
    TextRendererKind, TextStyle, DEFAULT_FONT_FAMILIES,
};
