//! In-memory RGBA rasters.
//!
//! A [`Surface`] is the unit of pixel-level manipulation. Its channel order
//! and premultiplication state are fixed when it is created, and every read
//! or write path goes through [`Surface::channel_indices`] so that the two
//! conventions are never mixed up.

use std::path::Path;

use image::{ImageFormat, RgbaImage};
use resvg::tiny_skia::{IntSize, Pixmap};

use crate::canvas::DrawingContext;
use crate::error::{Error, Result};
use crate::icon::SizePx;

/// Byte order of the four samples of one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelOrder {
    /// Red, green, blue, alpha.
    Rgba,
    /// Alpha, red, green, blue.
    Argb,
}

/// Whether color samples are pre-scaled by alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlphaMode {
    Premultiplied,
    Straight,
}

/// Memory layout of a [`Surface`]: always 8 bits per sample, 4 samples per
/// pixel, interleaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat {
    pub order: ChannelOrder,
    pub alpha: AlphaMode,
}

impl PixelFormat {
    /// The layout drawing targets use.
    pub const PREMULTIPLIED_RGBA: Self = Self {
        order: ChannelOrder::Rgba,
        alpha: AlphaMode::Premultiplied,
    };

    /// The layout decoded images and split layers use.
    pub const STRAIGHT_RGBA: Self = Self {
        order: ChannelOrder::Rgba,
        alpha: AlphaMode::Straight,
    };

    pub const STRAIGHT_ARGB: Self = Self {
        order: ChannelOrder::Argb,
        alpha: AlphaMode::Straight,
    };

    pub fn is_premultiplied(&self) -> bool {
        self.alpha == AlphaMode::Premultiplied
    }

    /// Byte offsets of red, green, blue and alpha inside one pixel.
    pub fn channel_indices(&self) -> ChannelIndices {
        match self.order {
            ChannelOrder::Rgba => ChannelIndices { r: 0, g: 1, b: 2, a: 3 },
            ChannelOrder::Argb => ChannelIndices { r: 1, g: 2, b: 3, a: 0 },
        }
    }
}

/// Byte offsets of each channel inside a 4-byte pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelIndices {
    pub r: usize,
    pub g: usize,
    pub b: usize,
    pub a: usize,
}

impl ChannelIndices {
    /// Reads a pixel as `[r, g, b, a]`.
    #[inline]
    pub fn read(&self, px: &[u8]) -> [u8; 4] {
        [px[self.r], px[self.g], px[self.b], px[self.a]]
    }

    /// Writes `[r, g, b, a]` into a pixel.
    #[inline]
    pub fn write(&self, px: &mut [u8], rgba: [u8; 4]) {
        px[self.r] = rgba[0];
        px[self.g] = rgba[1];
        px[self.b] = rgba[2];
        px[self.a] = rgba[3];
    }
}

/// A bitmapped image with a declared pixel convention.
///
/// `Clone` produces an independent deep copy; surfaces never share buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Surface {
    /// Allocates a zeroed (fully transparent) surface.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        let len = buffer_len(width, height)?;
        Ok(Self {
            width,
            height,
            format,
            data: vec![0; len],
        })
    }

    /// Allocates a zeroed premultiplied RGBA surface, suitable as a drawing target.
    pub fn new_premultiplied(width: u32, height: u32) -> Result<Self> {
        Self::new(width, height, PixelFormat::PREMULTIPLIED_RGBA)
    }

    /// Allocates a zeroed straight-alpha RGBA surface, suitable for per-pixel arithmetic.
    pub fn new_straight(width: u32, height: u32) -> Result<Self> {
        Self::new(width, height, PixelFormat::STRAIGHT_RGBA)
    }

    /// Wraps an existing raster buffer.
    ///
    /// Fails with [`Error::UnsupportedPixelFormat`] if the buffer is not
    /// exactly `4 * width * height` bytes long.
    pub fn from_raw(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let len = buffer_len(width, height)?;
        if data.len() != len {
            return Err(Error::unsupported_format(format!(
                "expected {len} bytes for a {width}x{height} 32-bit raster, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Wraps an already-decoded image as a straight RGBA surface.
    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            format: PixelFormat::STRAIGHT_RGBA,
            data: image.into_raw(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> SizePx {
        SizePx::new(self.width, self.height)
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Byte offsets of red, green, blue and alpha inside one pixel.
    pub fn channel_indices(&self) -> ChannelIndices {
        self.format.channel_indices()
    }

    /// The raw samples. Callers must honor [`Self::format`].
    pub fn pixel_buffer(&self) -> &[u8] {
        &self.data
    }

    /// The raw samples, mutably. Callers must honor [`Self::format`].
    pub fn pixel_buffer_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Reads one pixel as `[r, g, b, a]`, in the surface's own alpha mode.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = self.offset(x, y);
        self.channel_indices().read(&self.data[offset..offset + 4])
    }

    /// Writes one pixel given as `[r, g, b, a]`, in the surface's own alpha mode.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the surface.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let offset = self.offset(x, y);
        let indices = self.channel_indices();
        indices.write(&mut self.data[offset..offset + 4], rgba);
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} surface",
            self.width,
            self.height
        );
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Fails unless the samples can be used for straight-alpha arithmetic.
    pub fn require_straight(&self) -> Result<()> {
        if self.format.is_premultiplied() {
            return Err(Error::unsupported_format(format!(
                "{}x{} surface is premultiplied, straight alpha required",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Acquires this surface as the current drawing target.
    ///
    /// Everything drawn through the returned context lands in this surface
    /// when the context is dropped, whichever way the caller exits.
    pub fn context(&mut self) -> Result<DrawingContext<'_>> {
        DrawingContext::new(self)
    }

    /// Draws the surface at its natural size at the origin of `ctx`, source-over.
    pub fn draw(&self, ctx: &mut DrawingContext<'_>) -> Result<()> {
        let pixmap = self.to_pixmap()?;
        ctx.draw_pixmap_at_origin(&pixmap);
        Ok(())
    }

    /// Converts to a straight-alpha RGBA image.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let indices = self.channel_indices();
        let premultiplied = self.format.is_premultiplied();
        let mut out = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(4) {
            let rgba = indices.read(px);
            let rgba = if premultiplied { unpremultiply(rgba) } else { rgba };
            out.extend_from_slice(&rgba);
        }
        // Length is 4 * w * h by construction.
        RgbaImage::from_raw(self.width, self.height, out).unwrap_or_default()
    }

    /// Writes the surface as a lossless PNG.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.to_rgba_image()
            .save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }

    /// Copies the samples into a premultiplied RGBA pixmap.
    pub(crate) fn to_pixmap(&self) -> Result<Pixmap> {
        let indices = self.channel_indices();
        let premultiplied = self.format.is_premultiplied();
        let mut out = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(4) {
            let rgba = indices.read(px);
            let rgba = if premultiplied { rgba } else { premultiply(rgba) };
            out.extend_from_slice(&rgba);
        }
        let size = IntSize::from_wh(self.width, self.height).ok_or(Error::SurfaceAllocation {
            width: self.width,
            height: self.height,
        })?;
        Pixmap::from_vec(out, size).ok_or(Error::SurfaceAllocation {
            width: self.width,
            height: self.height,
        })
    }

    /// Replaces the samples with the contents of a premultiplied RGBA
    /// pixmap of the same dimensions, converting to this surface's format.
    pub(crate) fn store_pixmap(&mut self, pixmap: &Pixmap) {
        debug_assert_eq!((pixmap.width(), pixmap.height()), (self.width, self.height));
        let indices = self.channel_indices();
        let premultiplied = self.format.is_premultiplied();
        for (dst, src) in self.data.chunks_exact_mut(4).zip(pixmap.data().chunks_exact(4)) {
            let rgba = [src[0], src[1], src[2], src[3]];
            let rgba = if premultiplied { rgba } else { unpremultiply(rgba) };
            indices.write(dst, rgba);
        }
    }
}

fn buffer_len(width: u32, height: u32) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(Error::SurfaceAllocation { width, height });
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or(Error::SurfaceAllocation { width, height })
}

/// Scales color samples by alpha.
pub(crate) fn premultiply([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    let scale = |c: u8| ((c as u16 * a as u16 + 127) / 255) as u8;
    [scale(r), scale(g), scale(b), a]
}

/// Undoes [`premultiply`]; fully transparent pixels become transparent black.
pub(crate) fn unpremultiply([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let a_f = a as f32 / 255.0;
    let scale = |c: u8| (c as f32 / a_f).round().min(255.0) as u8;
    [scale(r), scale(g), scale(b), a]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_surface_is_zeroed_and_sized() {
        let surface = Surface::new_straight(16, 16).unwrap();
        assert_eq!(surface.pixel_buffer().len(), 4 * 16 * 16);
        assert!(surface.pixel_buffer().iter().all(|&b| b == 0));
        assert_eq!(surface.size(), SizePx::new(16, 16));
    }

    #[test]
    fn zero_sized_surface_is_rejected() {
        assert!(matches!(
            Surface::new_straight(0, 16),
            Err(Error::SurfaceAllocation { width: 0, height: 16 })
        ));
    }

    #[test]
    fn from_raw_checks_buffer_length() {
        let err = Surface::from_raw(2, 2, PixelFormat::STRAIGHT_RGBA, vec![0; 15]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedPixelFormat(_)));
    }

    #[test]
    fn channel_indices_follow_order() {
        assert_eq!(
            PixelFormat::STRAIGHT_ARGB.channel_indices(),
            ChannelIndices { r: 1, g: 2, b: 3, a: 0 }
        );
        assert_eq!(
            PixelFormat::STRAIGHT_RGBA.channel_indices(),
            ChannelIndices { r: 0, g: 1, b: 2, a: 3 }
        );
    }

    #[test]
    fn argb_pixels_are_stored_alpha_first() {
        let mut surface = Surface::new(1, 1, PixelFormat::STRAIGHT_ARGB).unwrap();
        surface.set_pixel(0, 0, [10, 20, 30, 40]);
        assert_eq!(surface.pixel_buffer(), &[40, 10, 20, 30]);
        assert_eq!(surface.pixel(0, 0), [10, 20, 30, 40]);
        assert_eq!(surface.to_rgba_image().get_pixel(0, 0).0, [10, 20, 30, 40]);
    }

    #[test]
    fn clone_is_deep() {
        let mut original = Surface::new_straight(2, 2).unwrap();
        let copy = original.clone();
        original.set_pixel(0, 0, [1, 2, 3, 4]);
        assert_eq!(copy.pixel(0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn premultiplied_surface_is_not_straight() {
        let surface = Surface::new_premultiplied(4, 4).unwrap();
        assert!(matches!(
            surface.require_straight(),
            Err(Error::UnsupportedPixelFormat(_))
        ));
        assert!(Surface::new_straight(4, 4).unwrap().require_straight().is_ok());
    }

    #[test]
    fn premultiply_roundtrip_keeps_opaque_and_transparent() {
        assert_eq!(premultiply([200, 100, 50, 255]), [200, 100, 50, 255]);
        assert_eq!(unpremultiply([200, 100, 50, 255]), [200, 100, 50, 255]);
        assert_eq!(unpremultiply([9, 9, 9, 0]), [0, 0, 0, 0]);
        assert_eq!(premultiply([255, 255, 255, 128]), [128, 128, 128, 128]);
    }

    #[test]
    fn pixmap_conversion_preserves_straight_opaque_pixels() {
        let mut surface = Surface::new_straight(2, 1).unwrap();
        surface.set_pixel(0, 0, [12, 34, 56, 255]);
        let pixmap = surface.to_pixmap().unwrap();
        let mut back = Surface::new_straight(2, 1).unwrap();
        back.store_pixmap(&pixmap);
        assert_eq!(back, surface);
    }

    #[test]
    fn save_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let mut surface = Surface::new_straight(3, 3).unwrap();
        surface.set_pixel(1, 1, [255, 0, 0, 255]);
        surface.save(&path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(1, 1).0, [255, 0, 0, 255]);
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }
}
