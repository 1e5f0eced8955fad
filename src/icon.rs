//! Icon geometry and multi-resolution images.
//!
//! An [`Image`] groups several exact-size raster representations of the
//! same artwork, the way an `.icns` container does. Size-dependent code
//! asks for an exact representation and never resamples implicitly:
//! a silently resampled document icon looks blurry.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::RgbaImage;
use resvg::tiny_skia::BlendMode;
use tracing::{debug, warn};

use crate::canvas::DrawingContext;
use crate::error::{Error, Result};
use crate::surface::Surface;
use crate::svg;

/// A rectangle in floating-point pixel coordinates, origin top-left, y down.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RectF {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Converts a rectangle given with a bottom-left origin and y pointing up
    /// into raster coordinates on a canvas `canvas_height` pixels tall.
    pub fn from_bottom_left(x: f32, y: f32, width: f32, height: f32, canvas_height: f32) -> Self {
        Self::new(x, canvas_height - (y + height), width, height)
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }
}

/// A 2D size in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SizePx {
    pub width: u32,
    pub height: u32,
}

impl SizePx {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    /// Returns true if width equals height.
    pub fn is_square(&self) -> bool {
        self.width == self.height
    }
}

impl fmt::Display for SizePx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The closed set of document icon sizes.
///
/// Every size-indexed table in the crate is keyed by this type, so a size
/// outside the set is rejected at the boundary instead of falling back to
/// a guessed default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IconSize {
    Px16,
    Px32,
    Px128,
    Px256,
    Px512,
}

impl IconSize {
    /// All sizes, smallest first.
    pub const ALL: [IconSize; 5] = [
        IconSize::Px16,
        IconSize::Px32,
        IconSize::Px128,
        IconSize::Px256,
        IconSize::Px512,
    ];

    pub fn pixels(self) -> u32 {
        match self {
            IconSize::Px16 => 16,
            IconSize::Px32 => 32,
            IconSize::Px128 => 128,
            IconSize::Px256 => 256,
            IconSize::Px512 => 512,
        }
    }

    pub fn from_pixels(pixels: u32) -> Result<Self> {
        match pixels {
            16 => Ok(IconSize::Px16),
            32 => Ok(IconSize::Px32),
            128 => Ok(IconSize::Px128),
            256 => Ok(IconSize::Px256),
            512 => Ok(IconSize::Px512),
            other => Err(Error::UnsupportedSize(other)),
        }
    }

    /// Position in [`IconSize::ALL`], for array-backed tables.
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub fn size_px(self) -> SizePx {
        SizePx::square(self.pixels())
    }
}

impl TryFrom<u32> for IconSize {
    type Error = Error;

    fn try_from(pixels: u32) -> Result<Self> {
        Self::from_pixels(pixels)
    }
}

impl From<IconSize> for u32 {
    fn from(size: IconSize) -> Self {
        size.pixels()
    }
}

impl fmt::Display for IconSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pixels())
    }
}

/// A logical image holding at most one [`Surface`] per pixel size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    representations: BTreeMap<SizePx, Surface>,
}

impl Image {
    /// Creates an image with no representations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a multi-resolution image.
    ///
    /// `.icns` files contribute every icon they contain, `.svg` files are
    /// rasterized at each document icon size, and anything else is decoded
    /// as a single-representation bitmap.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let image = match extension.as_deref() {
            Some("icns") => Self::load_icns(path)?,
            Some("svg") => Self::load_svg(path)?,
            _ => {
                let decoded = image::open(path)?.to_rgba8();
                Self::from_surface(Surface::from_rgba_image(decoded))
            }
        };
        debug!(
            path = %path.display(),
            sizes = ?image.available_sizes(),
            "loaded image"
        );
        Ok(image)
    }

    /// Elements the `icns` crate cannot decode (JPEG 2000 in older system
    /// icons) are skipped; lookups for their size fail later.
    fn load_icns(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let family = icns::IconFamily::read(BufReader::new(file)).map_err(|e| Error::io(path, e))?;

        let mut image = Self::new();
        for icon_type in family.available_icons() {
            let size = SizePx::new(icon_type.pixel_width(), icon_type.pixel_height());
            if image.representations.contains_key(&size) {
                continue;
            }
            let icon = match family.get_icon_with_type(icon_type) {
                Ok(icon) => icon,
                Err(err) => {
                    warn!(path = %path.display(), ?icon_type, %err, "skipping undecodable icon element");
                    continue;
                }
            };
            let rgba = icon.convert_to(icns::PixelFormat::RGBA);
            let (width, height) = (rgba.width(), rgba.height());
            let raw = RgbaImage::from_raw(width, height, rgba.into_data().into_vec()).ok_or_else(|| {
                Error::unsupported_format(format!("{width}x{height} icns element has a short buffer"))
            })?;
            image.representations.insert(size, Surface::from_rgba_image(raw));
        }
        Ok(image)
    }

    fn load_svg(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let tree = svg::parse_tree(&data, None)?;
        let surfaces = IconSize::ALL
            .iter()
            .map(|size| svg::rasterize_square(&tree, size.pixels()))
            .collect::<Result<Vec<_>>>()?;
        Self::from_surfaces(surfaces)
    }

    /// Wraps a single surface as a one-representation image.
    pub fn from_surface(surface: Surface) -> Self {
        let mut representations = BTreeMap::new();
        representations.insert(surface.size(), surface);
        Self { representations }
    }

    /// Builds an image from several surfaces of distinct sizes.
    pub fn from_surfaces(surfaces: impl IntoIterator<Item = Surface>) -> Result<Self> {
        let mut image = Self::new();
        for surface in surfaces {
            image.add_representation(surface)?;
        }
        Ok(image)
    }

    /// Adds a representation; a second one of the same size is rejected.
    pub fn add_representation(&mut self, surface: Surface) -> Result<()> {
        let size = surface.size();
        if self.representations.contains_key(&size) {
            return Err(Error::DuplicateRepresentation {
                width: size.width,
                height: size.height,
            });
        }
        self.representations.insert(size, surface);
        Ok(())
    }

    /// Returns the representation whose native size is exactly `width x height`.
    pub fn representation_at(&self, width: u32, height: u32) -> Result<&Surface> {
        self.representations
            .get(&SizePx::new(width, height))
            .ok_or(Error::SizeNotAvailable { width, height })
    }

    /// Returns the square representation for a document icon size.
    pub fn representation(&self, size: IconSize) -> Result<&Surface> {
        let px = size.pixels();
        self.representation_at(px, px)
    }

    /// The native sizes present, smallest first.
    pub fn available_sizes(&self) -> BTreeSet<SizePx> {
        self.representations.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.representations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.representations.is_empty()
    }

    /// Returns an iterator over the representations, smallest first.
    pub fn iter(&self) -> impl Iterator<Item = &Surface> {
        self.representations.values()
    }

    /// Picks the representation to draw into a `width x height` destination:
    /// the smallest one at least that large, else the largest available.
    pub fn best_representation_for(&self, width: f32, height: f32) -> Option<&Surface> {
        self.representations
            .values()
            .find(|s| s.width() as f32 >= width && s.height() as f32 >= height)
            .or_else(|| self.representations.values().next_back())
    }

    /// Draws the image scaled into `rect` with the given blend mode.
    pub fn composite_into(
        &self,
        ctx: &mut DrawingContext<'_>,
        rect: RectF,
        mode: BlendMode,
        opacity: f32,
    ) -> Result<()> {
        let Some(surface) = self.best_representation_for(rect.width, rect.height) else {
            return Ok(());
        };
        let pixmap = surface.to_pixmap()?;
        ctx.draw_pixmap_in_rect(&pixmap, rect, mode, opacity);
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Image {
    type Item = &'a Surface;
    type IntoIter = std::collections::btree_map::Values<'a, SizePx, Surface>;

    fn into_iter(self) -> Self::IntoIter {
        self.representations.values()
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

    #[test]
    fn rect_from_bottom_left_flips_y() {
        let rect = RectF::from_bottom_left(0.0, 7.0, 512.0, 119.0, 512.0);
        assert_eq!(rect.y, 386.0);
        assert_eq!(rect.bottom(), 505.0);
        assert_eq!(rect.center_x(), 256.0);
    }

    #[test]
    fn size_px_is_square() {
        assert!(SizePx::new(100, 100).is_square());
        assert!(!SizePx::new(100, 200).is_square());
    }

    #[test]
    fn icon_size_closed_set() {
        for size in IconSize::ALL {
            assert_eq!(IconSize::from_pixels(size.pixels()).unwrap(), size);
            assert_eq!(IconSize::ALL[size.index()], size);
        }
        assert!(matches!(
            IconSize::try_from(64),
            Err(Error::UnsupportedSize(64))
        ));
    }

    #[test]
    fn exact_representation_lookup() {
        let image = Image::from_surfaces([solid(16, [1, 1, 1, 255]), solid(32, [2, 2, 2, 255])]).unwrap();

        assert_eq!(image.representation_at(32, 32).unwrap().pixel(0, 0), [2, 2, 2, 255]);
        assert_eq!(image.representation(IconSize::Px16).unwrap().width(), 16);
        assert!(matches!(
            image.representation_at(24, 24),
            Err(Error::SizeNotAvailable { width: 24, height: 24 })
        ));
        assert_eq!(
            image.available_sizes().into_iter().collect::<Vec<_>>(),
            vec![SizePx::square(16), SizePx::square(32)]
        );
    }

    #[test]
    fn duplicate_representation_is_rejected() {
        let err = Image::from_surfaces([solid(16, [0; 4]), solid(16, [1; 4])]).unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateRepresentation { width: 16, height: 16 }
        ));
    }

    #[test]
    fn best_representation_prefers_smallest_sufficient() {
        let image = Image::from_surfaces([solid(16, [0; 4]), solid(128, [0; 4]), solid(512, [0; 4])]).unwrap();
        assert_eq!(image.best_representation_for(100.0, 100.0).unwrap().width(), 128);
        assert_eq!(image.best_representation_for(8.0, 8.0).unwrap().width(), 16);
        assert_eq!(image.best_representation_for(900.0, 900.0).unwrap().width(), 512);
        assert!(Image::new().best_representation_for(1.0, 1.0).is_none());
    }

    #[test]
    fn composite_into_covers_target_rect() {
        let image = Image::from_surface(solid(4, [0, 255, 0, 255]));
        let mut target = Surface::new_premultiplied(8, 8).unwrap();
        {
            let mut ctx = target.context().unwrap();
            image
                .composite_into(&mut ctx, RectF::new(4.0, 4.0, 4.0, 4.0), BlendMode::SourceOver, 1.0)
                .unwrap();
        }
        assert_eq!(target.pixel(5, 5), [0, 255, 0, 255]);
        assert_eq!(target.pixel(1, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn load_png_gives_single_representation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glyph.png");
        solid(32, [10, 20, 30, 255]).save(&path).unwrap();

        let image = Image::load(&path).unwrap();
        assert_eq!(image.len(), 1);
        assert_eq!(image.representation_at(32, 32).unwrap().pixel(3, 3), [10, 20, 30, 255]);
    }

    #[test]
    fn load_icns_skips_undecodable_elements() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.icns");

        let mut family = icns::IconFamily::new();
        let mut small = icns::Image::new(icns::PixelFormat::RGBA, 32, 32);
        for px in small.data_mut().chunks_exact_mut(4) {
            px.copy_from_slice(&[40, 80, 120, 255]);
        }
        family.add_icon(&small).unwrap();
        // JPEG 2000 signature box followed by junk.
        let mut jp2 = vec![0, 0, 0, 0x0C, 0x6A, 0x50, 0x20, 0x20, 0x0D, 0x0A, 0x87, 0x0A];
        jp2.extend_from_slice(&[0; 64]);
        family
            .elements
            .push(icns::IconElement::new(icns::OSType(*b"ic08"), jp2));
        family.write(File::create(&path).unwrap()).unwrap();

        let image = Image::load(&path).unwrap();
        assert_eq!(image.len(), 1);
        assert_eq!(image.representation_at(32, 32).unwrap().pixel(5, 5), [40, 80, 120, 255]);
        assert!(matches!(
            image.representation_at(256, 256),
            Err(Error::SizeNotAvailable { width: 256, height: 256 })
        ));
    }

    #[test]
    fn load_missing_file_fails() {
        assert!(Image::load("/definitely/not/here.png").is_err());
        assert!(Image::load("/definitely/not/here.icns").is_err());
    }
}
