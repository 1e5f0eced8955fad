//! Background layers for document icons.
//!
//! A document icon is drawn bottom-up from three layers:
//!
//! 1. the page ground (the background with its baked shadow removed),
//! 2. the app icon, placed per size by a [`PlacementTransform`],
//! 3. the shadow extracted from the background.
//!
//! [`BackgroundSet`] owns the background image and memoizes the split per
//! size. [`background::DocumentBackgroundRenderer`] stacks the layers and
//! memoizes the composited result.
//!
//! All caches here are single-threaded (`Rc`/`RefCell`). Building icons for
//! different requests concurrently means giving each worker its own sets.

pub mod background;
pub mod placement;
pub mod split;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use crate::error::Result;
use crate::icon::{IconSize, Image};
use crate::surface::Surface;

pub use background::{BackgroundRenderer, DocumentBackgroundRenderer};
pub use placement::{PlacementTable, PlacementTransform};
pub use split::{fold_highlight, split_document_icon};

// ============================================================================
// Split Layers
// ============================================================================

/// The ground and optional shadow for one icon size.
///
/// `shadow` is `None` when the background is used as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitLayers {
    pub ground: Surface,
    pub shadow: Option<Surface>,
}

// ============================================================================
// Background Set
// ============================================================================

/// A background image together with its per-size split.
///
/// Splits are computed on first request and reused for the lifetime of the
/// set. A failed split is not cached, so the next request retries.
pub struct BackgroundSet {
    source: Rc<Image>,
    split_shadow: bool,
    cache: RefCell<HashMap<IconSize, Rc<SplitLayers>>>,
    splits: Cell<usize>,
}

impl BackgroundSet {
    /// Wraps `source`. When `split_shadow` is false the layers are the raw
    /// representations with no shadow.
    pub fn new(source: Rc<Image>, split_shadow: bool) -> Self {
        Self {
            source,
            split_shadow,
            cache: RefCell::new(HashMap::new()),
            splits: Cell::new(0),
        }
    }

    pub fn source(&self) -> &Image {
        &self.source
    }

    pub fn split_shadow(&self) -> bool {
        self.split_shadow
    }

    /// The unsplit background representation at `size`.
    pub fn raw_ground_at(&self, size: IconSize) -> Result<&Surface> {
        self.source.representation(size)
    }

    /// Returns the layers for `size`, splitting on first use.
    pub fn layers_at(&self, size: IconSize) -> Result<Rc<SplitLayers>> {
        if let Some(layers) = self.cache.borrow().get(&size) {
            trace!(%size, "background layers cache hit");
            return Ok(Rc::clone(layers));
        }

        let layers = if self.split_shadow {
            let (ground, shadow) = split::split_document_icon(&self.source, size)?;
            self.splits.set(self.splits.get() + 1);
            SplitLayers {
                ground,
                shadow: Some(shadow),
            }
        } else {
            SplitLayers {
                ground: self.raw_ground_at(size)?.clone(),
                shadow: None,
            }
        };

        let layers = Rc::new(layers);
        self.cache.borrow_mut().insert(size, Rc::clone(&layers));
        Ok(layers)
    }

    /// Number of splits actually computed so far.
    pub fn split_count(&self) -> usize {
        self.splits.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn gray_background(sides: &[u32], v: u8) -> Rc<Image> {
        let surfaces = sides.iter().map(|&side| {
            let mut surface = Surface::new_straight(side, side).unwrap();
            for y in 0..side {
                for x in 0..side {
                    surface.set_pixel(x, y, [v, v, v, 255]);
                }
            }
            surface
        });
        Rc::new(Image::from_surfaces(surfaces).unwrap())
    }

    #[test]
    fn split_is_memoized_per_size() {
        let set = BackgroundSet::new(gray_background(&[16, 32], 200), true);

        let first = set.layers_at(IconSize::Px16).unwrap();
        let again = set.layers_at(IconSize::Px16).unwrap();
        assert!(Rc::ptr_eq(&first, &again));
        assert_eq!(set.split_count(), 1);

        set.layers_at(IconSize::Px32).unwrap();
        assert_eq!(set.split_count(), 2);
        assert_eq!(first.shadow.as_ref().unwrap().pixel(0, 0), [0, 0, 0, 55]);
    }

    #[test]
    fn unsplit_set_returns_raw_ground() {
        let set = BackgroundSet::new(gray_background(&[16], 200), false);
        let layers = set.layers_at(IconSize::Px16).unwrap();
        assert!(layers.shadow.is_none());
        assert_eq!(layers.ground.pixel(3, 3), [200, 200, 200, 255]);
        assert_eq!(set.split_count(), 0);
    }

    #[test]
    fn failed_split_is_not_cached() {
        let set = BackgroundSet::new(gray_background(&[16], 200), true);
        assert!(matches!(
            set.layers_at(IconSize::Px512),
            Err(Error::SizeNotAvailable { .. })
        ));
        assert!(set.layers_at(IconSize::Px512).is_err());
        assert_eq!(set.split_count(), 0);
    }
}
