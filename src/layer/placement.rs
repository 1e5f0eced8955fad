//! Where the app icon sits on the document page.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::icon::{IconSize, RectF};

/// Per-size placement of the app icon on the page.
///
/// Scales are fractions of the canvas side. Offsets are in pixels, relative
/// to the centered position; `offset_y` is expressed in raster coordinates
/// (positive moves the icon down).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct PlacementTransform {
    pub offset_x: f32,
    pub scale_w: f32,
    pub offset_y: f32,
    pub scale_h: f32,
}

impl PlacementTransform {
    pub const fn new(offset_x: f32, scale_w: f32, offset_y: f32, scale_h: f32) -> Self {
        Self {
            offset_x,
            scale_w,
            offset_y,
            scale_h,
        }
    }

    /// Destination rectangle for the app icon on a `size` canvas, raster
    /// coordinates.
    ///
    /// The layout is computed with a bottom-left origin, where the vertical
    /// offset is mirrored, and then flipped into the raster.
    pub fn rect_at(&self, size: IconSize) -> RectF {
        let s = size.pixels() as f32;
        let width = s * self.scale_w;
        let height = s * self.scale_h;
        let x = (s - width) / 2.0 + self.offset_x;

        let mirrored = -self.offset_y;
        let bottom = (s - height) / 2.0 + mirrored;
        RectF::from_bottom_left(x, bottom, width, height, s)
    }
}

const DEFAULT_PLACEMENTS: [PlacementTransform; 5] = [
    PlacementTransform::new(0.0, 0.5, -1.0, 0.5),
    PlacementTransform::new(-0.2781, 0.5893, -2.2293, 0.5714),
    PlacementTransform::new(1.1774, 0.5682, -0.8246, 0.5680),
    PlacementTransform::new(0.5917, 0.5649, -1.8994, 0.5650),
    PlacementTransform::new(0.6870, 0.5653, -4.2814, 0.5654),
];

/// One placement per icon size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementTable([PlacementTransform; 5]);

impl Default for PlacementTable {
    fn default() -> Self {
        Self(DEFAULT_PLACEMENTS)
    }
}

impl PlacementTable {
    pub fn get(&self, size: IconSize) -> PlacementTransform {
        self.0[size.index()]
    }

    pub fn set(&mut self, size: IconSize, placement: PlacementTransform) {
        self.0[size.index()] = placement;
    }

    /// Returns the defaults with entries replaced from a pixel-keyed map.
    ///
    /// Keys outside the size set are rejected.
    pub fn with_overrides(overrides: &BTreeMap<u32, PlacementTransform>) -> Result<Self> {
        let mut table = Self::default();
        for (&pixels, &placement) in overrides {
            table.set(IconSize::from_pixels(pixels)?, placement);
        }
        Ok(table)
    }

    pub fn rect_at(&self, size: IconSize) -> RectF {
        self.get(size).rect_at(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn identity_like_placement_centers() {
        let rect = PlacementTransform::new(0.0, 0.5, 0.0, 0.5).rect_at(IconSize::Px128);
        assert_eq!(rect, RectF::new(32.0, 32.0, 64.0, 64.0));
    }

    #[test]
    fn positive_offset_y_moves_down_in_raster() {
        let rect = PlacementTransform::new(0.0, 0.5, 4.0, 0.5).rect_at(IconSize::Px16);
        assert!(close(rect.y, 8.0));
        assert!(close(rect.x, 4.0));
    }

    #[test]
    fn default_512_matches_hand_placement() {
        let rect = PlacementTable::default().rect_at(IconSize::Px512);
        assert!((rect.y - 107.0).abs() < 0.5, "top {}", rect.y);
        assert!((rect.x - 112.0).abs() < 0.5, "left {}", rect.x);
        assert!(close(rect.width, 512.0 * 0.5653));
        assert!(close(rect.height, 512.0 * 0.5654));
    }

    #[test]
    fn default_16_is_quarter_inset() {
        let rect = PlacementTable::default().rect_at(IconSize::Px16);
        assert!(close(rect.x, 4.0));
        assert!(close(rect.y, 3.0));
        assert!(close(rect.width, 8.0));
    }

    #[test]
    fn overrides_replace_single_entries() {
        let custom = PlacementTransform::new(1.0, 0.25, 2.0, 0.25);
        let table = PlacementTable::with_overrides(&BTreeMap::from([(32, custom)])).unwrap();
        assert_eq!(table.get(IconSize::Px32), custom);
        assert_eq!(table.get(IconSize::Px16), DEFAULT_PLACEMENTS[0]);

        assert!(matches!(
            PlacementTable::with_overrides(&BTreeMap::from([(48, custom)])),
            Err(Error::UnsupportedSize(48))
        ));
    }

    #[test]
    fn serializes_in_camel_case() {
        let json = serde_json::to_string(&PlacementTransform::new(1.0, 0.5, -1.0, 0.5)).unwrap();
        assert!(json.contains("\"offsetX\""));
        assert!(json.contains("\"scaleH\""));
    }
}
