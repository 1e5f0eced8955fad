//! Caption rendering.
//!
//! Glyph shaping and rasterization are handled by `resvg`: a caption is
//! turned into a one-element SVG document and drawn into the current
//! [`DrawingContext`]. This module only owns the per-size style policy and
//! font resolution.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use palette::Srgb;
use resvg::tiny_skia::Transform;
use resvg::usvg::fontdb;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::canvas::DrawingContext;
use crate::error::{Error, Result};
use crate::icon::{IconSize, RectF};
use crate::svg;

/// Families tried in order when none are configured.
pub const DEFAULT_FONT_FAMILIES: &[&str] = &[
    "Lucida Grande",
    "Lucida Sans",
    "DejaVu Sans",
    "Helvetica",
    "Arial",
    "sans-serif",
];

const BOLD: u16 = 700;
const DEMI_BOLD: u16 = 600;
const OFFICE_FAMILY: &str = "Lucida Sans";

/// Caption gray, as a device white level.
const CAPTION_WHITE: f32 = 0.34;

/// Line box metrics of the caption face, in ems. A caption drawn into a
/// rectangle has its line box top at the rectangle top.
const LINE_ASCENT_EM: f32 = 0.967;
const LINE_DESCENT_EM: f32 = 0.211;

/// Draws captions into a prepared drawing context.
pub trait TextRenderer {
    /// Draws `text` centered for an icon of `size`. Empty text draws nothing.
    fn draw_caption(&mut self, ctx: &mut DrawingContext<'_>, text: &str, size: IconSize) -> Result<()>;
}

/// Selects a [`TextRenderer`] implementation from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum TextRendererKind {
    #[default]
    Standard,
    /// Uses the demi-bold office face at 32 px when it is installed.
    Office,
}

impl TextRendererKind {
    pub fn build(self, fonts: FontBook, families: Vec<String>) -> Box<dyn TextRenderer> {
        let standard = StandardTextRenderer::new(fonts, families);
        match self {
            TextRendererKind::Standard => Box::new(standard),
            TextRendererKind::Office => Box::new(OfficeTextRenderer::new(standard)),
        }
    }
}

/// `families`, or [`DEFAULT_FONT_FAMILIES`] when it is empty.
pub fn families_or_default(families: Vec<String>) -> Vec<String> {
    if families.is_empty() {
        DEFAULT_FONT_FAMILIES.iter().map(|f| f.to_string()).collect()
    } else {
        families
    }
}

// ============================================================================
// Font Book
// ============================================================================

/// A resolved face: the family name as installed and its weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFace {
    pub family: String,
    pub weight: u16,
}

/// The font database captions are resolved against.
///
/// Cloning is cheap; registering a font on a shared book copies the
/// database first.
#[derive(Clone, Debug)]
pub struct FontBook {
    db: Arc<fontdb::Database>,
}

impl Default for FontBook {
    fn default() -> Self {
        Self::system()
    }
}

impl FontBook {
    /// A database holding the fonts installed on the system.
    pub fn system() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        debug!(faces = db.len(), "loaded system fonts");
        Self { db: Arc::new(db) }
    }

    /// A database with no fonts at all.
    pub fn empty() -> Self {
        Self {
            db: Arc::new(fontdb::Database::new()),
        }
    }

    /// Makes the font file at `path` available to captions.
    pub fn register_font_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let before = self.db.len();
        Arc::make_mut(&mut self.db)
            .load_font_file(path)
            .map_err(|e| Error::io(path, e))?;
        debug!(path = %path.display(), faces = self.db.len() - before, "registered font");
        Ok(())
    }

    /// Registers every `.ttf`, `.otf` and `.ttc` file directly inside `dir`.
    /// Unreadable entries are skipped.
    pub fn register_font_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
        let mut loaded = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
                continue;
            };
            if !matches!(ext.to_ascii_lowercase().as_str(), "ttf" | "otf" | "ttc") {
                continue;
            }
            if self.register_font_file(&path).is_ok() {
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    /// Finds the first family in `families` with an installed face, using
    /// CSS weight matching.
    pub fn resolve<S: AsRef<str>>(&self, families: &[S], weight: u16) -> Option<ResolvedFace> {
        families.iter().find_map(|name| {
            let family = svg::font_family(name.as_ref());
            let query = fontdb::Query {
                families: &[family],
                weight: fontdb::Weight(weight),
                stretch: fontdb::Stretch::Normal,
                style: fontdb::Style::Normal,
            };
            let face = self.db.face(self.db.query(&query)?)?;
            let (installed, _) = face.families.first()?;
            Some(ResolvedFace {
                family: installed.clone(),
                weight: face.weight.0,
            })
        })
    }

    pub fn database(&self) -> Arc<fontdb::Database> {
        Arc::clone(&self.db)
    }

    pub fn face_count(&self) -> usize {
        self.db.len()
    }
}

// ============================================================================
// Styles
// ============================================================================

/// Font attributes for one icon size.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub face: ResolvedFace,
    pub font_size: f32,
    pub letter_spacing: f32,
    pub color: Srgb<u8>,
}

impl TextStyle {
    fn fill(&self) -> String {
        format!(
            "#{:02x}{:02x}{:02x}",
            self.color.red, self.color.green, self.color.blue
        )
    }
}

/// Where a caption goes on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextLayout {
    /// Centered in a box given with a bottom-left origin, y up.
    Boxed { x: f32, y: f32, width: f32, height: f32 },
    /// Horizontally centered on whole pixels, with the line box bottom at
    /// `origin_y` (y up).
    PixelAligned { origin_y: f32 },
}

/// Point size and letter spacing of the standard caption.
pub fn standard_metrics(size: IconSize) -> (f32, f32) {
    match size {
        IconSize::Px16 => (3.0, 0.0),
        IconSize::Px32 => (7.0, -0.25),
        IconSize::Px128 => (18.0, 0.0),
        IconSize::Px256 => (36.0, -1.0),
        IconSize::Px512 => (72.0, -1.0),
    }
}

/// Placement of the standard caption.
pub fn standard_layout(size: IconSize) -> TextLayout {
    match size {
        IconSize::Px16 => TextLayout::Boxed { x: 1.0, y: 1.0, width: 15.0, height: 5.0 },
        IconSize::Px32 => TextLayout::PixelAligned { origin_y: 1.5 },
        IconSize::Px128 => TextLayout::Boxed { x: 0.0, y: 6.0, width: 128.0, height: 26.5 },
        IconSize::Px256 => TextLayout::Boxed { x: 0.0, y: 7.0, width: 256.0, height: 57.0 },
        IconSize::Px512 => TextLayout::Boxed { x: 0.0, y: 7.0, width: 512.0, height: 119.0 },
    }
}

fn caption_color() -> Srgb<u8> {
    Srgb::new(CAPTION_WHITE, CAPTION_WHITE, CAPTION_WHITE).into_format()
}

enum Anchor {
    Start,
    Middle,
}

fn caption_svg(canvas: u32, style: &TextStyle, text: &str, x: f32, baseline: f32, anchor: Anchor) -> String {
    let anchor = match anchor {
        Anchor::Start => "start",
        Anchor::Middle => "middle",
    };
    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{s}" height="{s}" viewBox="0 0 {s} {s}">"#,
            r#"<text x="{x}" y="{y}" font-family="'{family}'" font-weight="{weight}" font-size="{size}" "#,
            r#"letter-spacing="{spacing}" text-anchor="{anchor}" fill="{fill}">{text}</text></svg>"#
        ),
        s = canvas,
        x = x,
        y = baseline,
        family = svg::escape_text(&style.face.family),
        weight = style.face.weight,
        size = style.font_size,
        spacing = style.letter_spacing,
        anchor = anchor,
        fill = style.fill(),
        text = svg::escape_text(text),
    )
}

/// Draws `text` into `ctx` following `layout`.
fn draw_text(
    ctx: &mut DrawingContext<'_>,
    fonts: &FontBook,
    style: &TextStyle,
    layout: TextLayout,
    text: &str,
) -> Result<()> {
    let canvas = ctx.height();
    let canvas_h = canvas as f32;
    let (x, baseline, anchor) = match layout {
        TextLayout::Boxed { x, y, width, height } => {
            let rect = RectF::from_bottom_left(x, y, width, height, canvas_h);
            (rect.center_x(), rect.y + LINE_ASCENT_EM * style.font_size, Anchor::Middle)
        }
        TextLayout::PixelAligned { origin_y } => {
            let width = measure(canvas, fonts, style, text)?;
            let x = ((canvas_h - width) / 2.0).floor() + 0.5;
            let baseline = canvas_h - (origin_y + LINE_DESCENT_EM * style.font_size);
            (x, baseline, Anchor::Start)
        }
    };

    trace!(text, x, baseline, "drawing caption");
    let tree = svg::parse_tree(
        &caption_svg(canvas, style, text, x, baseline, anchor),
        Some(fonts.database()),
    )?;
    ctx.draw_svg(&tree, Transform::identity());
    Ok(())
}

/// Advance width of `text`, side bearings and spaces included.
///
/// Bounding boxes only cover ink, so `text` is measured between two bars
/// and the width of the bars alone is subtracted.
fn measure(canvas: u32, fonts: &FontBook, style: &TextStyle, text: &str) -> Result<f32> {
    let bracketed = ink_width(canvas, fonts, style, &format!("|{text}|"))?;
    let bars = ink_width(canvas, fonts, style, "||")?;
    Ok((bracketed - bars).max(0.0))
}

fn ink_width(canvas: u32, fonts: &FontBook, style: &TextStyle, text: &str) -> Result<f32> {
    let markup = caption_svg(canvas, style, text, 0.0, canvas as f32 / 2.0, Anchor::Start);
    let tree = svg::parse_tree(&markup, Some(fonts.database()))?;
    Ok(svg::drawn_width(&tree))
}

// ============================================================================
// Renderers
// ============================================================================

/// Bold gray captions with per-size point sizes and spacing.
pub struct StandardTextRenderer {
    fonts: FontBook,
    families: Vec<String>,
    styles: HashMap<IconSize, TextStyle>,
}

impl StandardTextRenderer {
    /// `families` are tried in order; an empty list means
    /// [`DEFAULT_FONT_FAMILIES`].
    pub fn new(fonts: FontBook, families: Vec<String>) -> Self {
        let families = families_or_default(families);
        Self {
            fonts,
            families,
            styles: HashMap::new(),
        }
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// The style for `size`, resolved once and then reused.
    pub fn style_at(&mut self, size: IconSize) -> Result<&TextStyle> {
        if !self.styles.contains_key(&size) {
            let face = self
                .fonts
                .resolve(self.families.as_slice(), BOLD)
                .ok_or_else(|| Error::FontUnavailable(self.families.join(", ")))?;
            let (font_size, letter_spacing) = standard_metrics(size);
            debug!(%size, family = %face.family, "resolved caption font");
            self.styles.insert(
                size,
                TextStyle {
                    face,
                    font_size,
                    letter_spacing,
                    color: caption_color(),
                },
            );
        }
        self.styles
            .get(&size)
            .ok_or_else(|| Error::FontUnavailable(self.families.join(", ")))
    }
}

impl TextRenderer for StandardTextRenderer {
    fn draw_caption(&mut self, ctx: &mut DrawingContext<'_>, text: &str, size: IconSize) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let style = self.style_at(size)?.clone();
        draw_text(ctx, &self.fonts, &style, standard_layout(size), text)
    }
}

/// Like [`StandardTextRenderer`], but draws the 32 px caption with the
/// demi-bold "Lucida Sans" face when it is installed.
pub struct OfficeTextRenderer {
    standard: StandardTextRenderer,
    office_style: Option<Option<TextStyle>>,
}

impl OfficeTextRenderer {
    pub fn new(standard: StandardTextRenderer) -> Self {
        Self {
            standard,
            office_style: None,
        }
    }

    fn office_style(&mut self) -> Option<&TextStyle> {
        let fonts = &self.standard.fonts;
        self.office_style
            .get_or_insert_with(|| {
                let face = fonts
                    .resolve(&[OFFICE_FAMILY], DEMI_BOLD)
                    .filter(|face| face.family == OFFICE_FAMILY && face.weight >= DEMI_BOLD)?;
                Some(TextStyle {
                    face,
                    font_size: 7.0,
                    letter_spacing: 0.0,
                    color: caption_color(),
                })
            })
            .as_ref()
    }
}

impl TextRenderer for OfficeTextRenderer {
    fn draw_caption(&mut self, ctx: &mut DrawingContext<'_>, text: &str, size: IconSize) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        if size == IconSize::Px32 {
            if let Some(style) = self.office_style().cloned() {
                let layout = TextLayout::Boxed { x: 0.0, y: 1.0, width: 31.0, height: 11.0 };
                return draw_text(ctx, &self.standard.fonts, &style, layout, text);
            }
        }
        self.standard.draw_caption(ctx, text, size)
    }
}
