//! Composited document backgrounds.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::rc::Rc;

use resvg::tiny_skia::BlendMode;
use tracing::debug;

use super::placement::PlacementTable;
use super::BackgroundSet;
use crate::error::Result;
use crate::icon::{IconSize, Image};
use crate::surface::Surface;

/// Produces the finished background for one icon size.
///
/// Implementations memoize: the returned surface is owned by the renderer
/// and stays valid until the next mutable call.
pub trait BackgroundRenderer {
    fn background_at(&mut self, size: IconSize) -> Result<&Surface>;
}

/// Stacks ground, app icon and shadow into one surface per size.
pub struct DocumentBackgroundRenderer {
    backgrounds: Rc<BackgroundSet>,
    icon: Option<Rc<Image>>,
    placements: PlacementTable,
    cache: HashMap<IconSize, Surface>,
    builds: usize,
}

impl DocumentBackgroundRenderer {
    pub fn new(backgrounds: Rc<BackgroundSet>, icon: Option<Rc<Image>>) -> Self {
        Self::with_placements(backgrounds, icon, PlacementTable::default())
    }

    pub fn with_placements(
        backgrounds: Rc<BackgroundSet>,
        icon: Option<Rc<Image>>,
        placements: PlacementTable,
    ) -> Self {
        Self {
            backgrounds,
            icon,
            placements,
            cache: HashMap::new(),
            builds: 0,
        }
    }

    pub fn backgrounds(&self) -> &BackgroundSet {
        &self.backgrounds
    }

    pub fn icon(&self) -> Option<&Image> {
        self.icon.as_deref()
    }

    pub fn placements(&self) -> &PlacementTable {
        &self.placements
    }

    /// Replaces the placement table and drops every cached background.
    pub fn set_placements(&mut self, placements: PlacementTable) {
        if self.placements != placements {
            self.placements = placements;
            self.cache.clear();
        }
    }

    /// Number of backgrounds composited so far.
    pub fn build_count(&self) -> usize {
        self.builds
    }

    fn build(
        backgrounds: &BackgroundSet,
        icon: Option<&Image>,
        placements: &PlacementTable,
        size: IconSize,
    ) -> Result<Surface> {
        let side = size.pixels();
        let mut surface = Surface::new_premultiplied(side, side)?;
        let mut ctx = surface.context()?;

        match icon {
            // Nothing goes between ground and shadow, so the artwork is used as-is.
            None => backgrounds.raw_ground_at(size)?.draw(&mut ctx)?,
            Some(icon) => {
                let layers = backgrounds.layers_at(size)?;
                layers.ground.draw(&mut ctx)?;
                icon.composite_into(
                    &mut ctx,
                    placements.rect_at(size),
                    BlendMode::SourceOver,
                    1.0,
                )?;
                if let Some(shadow) = &layers.shadow {
                    shadow.draw(&mut ctx)?;
                }
            }
        }

        drop(ctx);
        Ok(surface)
    }
}

impl BackgroundRenderer for DocumentBackgroundRenderer {
    fn background_at(&mut self, size: IconSize) -> Result<&Surface> {
        match self.cache.entry(size) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                debug!(%size, with_icon = self.icon.is_some(), "compositing background");
                let surface = Self::build(
                    &self.backgrounds,
                    self.icon.as_deref(),
                    &self.placements,
                    size,
                )?;
                self.builds += 1;
                Ok(entry.insert(surface))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(side: u32, rgba: [u8; 4]) -> Surface {
        let mut surface = Surface::new_straight(side, side).unwrap();
        for y in 0..side {
            for x in 0..side {
                surface.set_pixel(x, y, rgba);
            }
        }
        surface
    }

    fn gray_set(v: u8, split: bool) -> Rc<BackgroundSet> {
        let image = Image::from_surfaces([solid(16, [v, v, v, 255]), solid(128, [v, v, v, 255])]).unwrap();
        Rc::new(BackgroundSet::new(Rc::new(image), split))
    }

    fn red_icon() -> Rc<Image> {
        Rc::new(Image::from_surface(solid(128, [255, 0, 0, 255])))
    }

    fn near(actual: [u8; 4], expected: [u8; 4]) -> bool {
        actual
            .iter()
            .zip(expected)
            .all(|(&a, e)| a.abs_diff(e) <= 1)
    }

    #[test]
    fn background_is_built_once_per_size() {
        let mut renderer = DocumentBackgroundRenderer::new(gray_set(200, true), Some(red_icon()));

        let first: *const Surface = renderer.background_at(IconSize::Px128).unwrap();
        let second: *const Surface = renderer.background_at(IconSize::Px128).unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(renderer.build_count(), 1);
        assert_eq!(renderer.backgrounds().split_count(), 1);

        renderer.background_at(IconSize::Px16).unwrap();
        assert_eq!(renderer.build_count(), 2);
    }

    #[test]
    fn without_icon_the_splitter_is_bypassed() {
        let mut renderer = DocumentBackgroundRenderer::new(gray_set(155, true), None);
        let surface = renderer.background_at(IconSize::Px128).unwrap();
        assert!(near(surface.pixel(64, 64), [155, 155, 155, 255]));
        assert_eq!(renderer.backgrounds().split_count(), 0);
    }

    #[test]
    fn icon_sits_between_ground_and_shadow() {
        let mut renderer = DocumentBackgroundRenderer::new(gray_set(155, true), Some(red_icon()));
        let surface = renderer.background_at(IconSize::Px128).unwrap();

        // Shadow alpha 100 darkens both the page and the icon.
        assert!(near(surface.pixel(2, 2), [155, 155, 155, 255]), "{:?}", surface.pixel(2, 2));
        assert!(near(surface.pixel(64, 64), [155, 0, 0, 255]), "{:?}", surface.pixel(64, 64));
    }

    #[test]
    fn unsplit_background_keeps_icon_on_top() {
        let mut renderer = DocumentBackgroundRenderer::new(gray_set(155, false), Some(red_icon()));
        let surface = renderer.background_at(IconSize::Px128).unwrap();
        assert!(near(surface.pixel(64, 64), [255, 0, 0, 255]));
        assert!(near(surface.pixel(2, 2), [155, 155, 155, 255]));
    }

    #[test]
    fn missing_size_is_reported_and_not_cached() {
        let mut renderer = DocumentBackgroundRenderer::new(gray_set(200, true), Some(red_icon()));
        assert!(renderer.background_at(IconSize::Px512).is_err());
        assert_eq!(renderer.build_count(), 0);
    }

    #[test]
    fn new_placements_invalidate_cache() {
        let mut renderer = DocumentBackgroundRenderer::new(gray_set(200, false), Some(red_icon()));
        renderer.background_at(IconSize::Px128).unwrap();

        let mut table = PlacementTable::default();
        table.set(
            IconSize::Px128,
            crate::layer::PlacementTransform::new(0.0, 0.25, 0.0, 0.25),
        );
        renderer.set_placements(table);
        let surface = renderer.background_at(IconSize::Px128).unwrap();
        assert!(near(surface.pixel(20, 20), [200, 200, 200, 255]));
        assert_eq!(renderer.build_count(), 2);
    }
}
