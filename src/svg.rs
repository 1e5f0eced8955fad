//! SVG parsing and rasterization using resvg/usvg.
//!
//! Used to rasterize vector app icons at the document icon sizes and to
//! turn captions into glyph outlines.

use std::sync::Arc;

use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{fontdb, Options, Tree};

use crate::error::{Error, Result};
use crate::surface::{PixelFormat, Surface};

/// Parses SVG markup, resolving text against `fonts` when given.
pub fn parse_tree(svg_data: &str, fonts: Option<Arc<fontdb::Database>>) -> Result<Tree> {
    let mut opts = Options::default();
    if let Some(fonts) = fonts {
        opts.fontdb = fonts;
    }
    Tree::from_str(svg_data, &opts).map_err(|e| Error::svg(e.to_string()))
}

/// Rasterizes a tree into a `side x side` surface.
///
/// The drawing is scaled to fit while preserving its aspect ratio and
/// centered on the shorter axis.
pub fn rasterize_square(tree: &Tree, side: u32) -> Result<Surface> {
    let mut pixmap = Pixmap::new(side, side).ok_or(Error::SurfaceAllocation {
        width: side,
        height: side,
    })?;

    let svg_size = tree.size();
    let scale = side as f32 / svg_size.width().max(svg_size.height());
    let dx = (side as f32 - svg_size.width() * scale) / 2.0;
    let dy = (side as f32 - svg_size.height() * scale) / 2.0;
    let transform = Transform::from_row(scale, 0.0, 0.0, scale, dx, dy);
    resvg::render(tree, transform, &mut pixmap.as_mut());

    let mut surface = Surface::new(side, side, PixelFormat::STRAIGHT_RGBA)?;
    surface.store_pixmap(&pixmap);
    Ok(surface)
}

/// Absolute bounding box width of everything drawn by `tree`.
pub fn drawn_width(tree: &Tree) -> f32 {
    tree.root().abs_bounding_box().width()
}

/// Escapes text for use inside SVG character data or attribute values.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Maps a CSS-style family name to a font database family.
pub fn font_family(name: &str) -> fontdb::Family<'_> {
    match name {
        "serif" => fontdb::Family::Serif,
        "sans-serif" => fontdb::Family::SansSerif,
        "cursive" => fontdb::Family::Cursive,
        "fantasy" => fontdb::Family::Fantasy,
        "monospace" => fontdb::Family::Monospace,
        named => fontdb::Family::Name(named),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="50"><rect x="0" y="0" width="100" height="50" fill="#ff0000"/></svg>"##;

    #[test]
    fn rasterize_fits_and_centers() {
        let tree = parse_tree(SIMPLE_SVG, None).unwrap();
        let surface = rasterize_square(&tree, 32).unwrap();

        assert_eq!(surface.size().width, 32);
        // 100x50 fits as 32x16, centered vertically: rows 8..24 are covered.
        assert_eq!(surface.pixel(16, 16), [255, 0, 0, 255]);
        assert_eq!(surface.pixel(16, 2)[3], 0);
        assert_eq!(surface.pixel(16, 29)[3], 0);
    }

    #[test]
    fn invalid_svg_is_an_error() {
        assert!(matches!(parse_tree("not svg", None), Err(Error::Svg(_))));
    }

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(escape_text("C<&>\"'"), "C&lt;&amp;&gt;&quot;&apos;");
        assert_eq!(escape_text("C\u{ff0b}\u{ff0b}"), "C\u{ff0b}\u{ff0b}");
    }

    #[test]
    fn generic_families_map_to_fontdb() {
        assert!(matches!(font_family("sans-serif"), fontdb::Family::SansSerif));
        assert!(matches!(font_family("Lucida Grande"), fontdb::Family::Name("Lucida Grande")));
    }
}
