//! Splits the generic document icon into a ground and a shadow layer.
//!
//! The stock artwork bakes its drop shadow into fully opaque gray pixels.
//! Compositing an app glyph over it would bury the glyph under the page
//! instead of under the shadow, so the artwork is decomposed per pixel:
//!
//! - translucent pixels are the page edge and stay in the ground verbatim;
//! - opaque gray pixels become plain white in the ground, and their
//!   darkness moves into the alpha channel of a black shadow layer.
//!
//! Drawing ground, then the glyph, then the shadow reproduces the original
//! artwork with the glyph tucked in between.

use tracing::debug;

use crate::error::{Error, Result};
use crate::icon::{IconSize, Image};
use crate::surface::Surface;

const OPAQUE_WHITE: [u8; 4] = [255, 255, 255, 255];
const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// Pixels on the page fold that the automatic split renders too dark at
/// the two smallest sizes. They are forced to opaque white in the shadow.
const FOLD_HIGHLIGHT_16: [(u32, u32); 6] = [(10, 2), (10, 3), (11, 3), (10, 4), (11, 4), (12, 4)];
const FOLD_HIGHLIGHT_32: [(u32, u32); 6] = [(21, 4), (21, 5), (22, 5), (21, 6), (22, 6), (23, 6)];

/// Raster coordinates `(x, y)` of the fold highlight for `size`, if any.
pub fn fold_highlight(size: IconSize) -> &'static [(u32, u32)] {
    match size {
        IconSize::Px16 => &FOLD_HIGHLIGHT_16,
        IconSize::Px32 => &FOLD_HIGHLIGHT_32,
        IconSize::Px128 | IconSize::Px256 | IconSize::Px512 => &[],
    }
}

/// Splits the `size` representation of `image` into `(ground, shadow)`.
///
/// Both outputs are straight-alpha surfaces of the same size. Fails
/// without producing anything if the representation is missing, is not a
/// straight 32-bit raster, or has an opaque pixel that is not gray.
pub fn split_document_icon(image: &Image, size: IconSize) -> Result<(Surface, Surface)> {
    let side = size.pixels();
    let source = image.representation(size)?;
    source.require_straight()?;

    let mut ground = Surface::new_straight(side, side)?;
    let mut shadow = Surface::new_straight(side, side)?;
    let src = source.channel_indices();
    let dst = ground.channel_indices();
    debug_assert_eq!(dst, shadow.channel_indices());

    let ground_px = ground.pixel_buffer_mut().chunks_exact_mut(4);
    let shadow_px = shadow.pixel_buffer_mut().chunks_exact_mut(4);
    let source_px = source.pixel_buffer().chunks_exact(4);

    for (i, ((input, g), s)) in source_px.zip(ground_px).zip(shadow_px).enumerate() {
        let [r, gr, b, a] = src.read(input);
        if a != 255 {
            dst.write(g, [r, gr, b, a]);
            dst.write(s, TRANSPARENT);
            continue;
        }

        if r != gr || r != b {
            let i = i as u32;
            return Err(Error::NonGrayscalePixel {
                size: side,
                x: i % side,
                y: i / side,
            });
        }
        dst.write(g, OPAQUE_WHITE);
        dst.write(s, [0, 0, 0, 255 - r]);
    }

    for &(x, y) in fold_highlight(size) {
        shadow.set_pixel(x, y, OPAQUE_WHITE);
    }

    debug!(size = side, "split document background");
    Ok((ground, shadow))
}
