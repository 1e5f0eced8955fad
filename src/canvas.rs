//! The scoped drawing target.
//!
//! A [`DrawingContext`] binds one [`Surface`] as the "current" target for
//! image compositing and text rendering. It borrows the surface mutably for
//! its whole lifetime, so nothing else can observe a half-drawn surface, and
//! it writes its pixels back on drop. Early returns through `?` therefore
//! never leave a context dangling across successive icon builds.

use resvg::tiny_skia::{BlendMode, FilterQuality, Pixmap, PixmapPaint, Transform};
use resvg::usvg;

use crate::error::Result;
use crate::icon::RectF;
use crate::surface::Surface;

/// Drawing state applied to every image draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphicsState {
    /// Interpolation used when an image is scaled or placed off the pixel grid.
    pub interpolation: FilterQuality,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            interpolation: FilterQuality::Bicubic,
        }
    }
}

/// A guard that makes a [`Surface`] the current drawing target.
pub struct DrawingContext<'a> {
    target: &'a mut Surface,
    pixmap: Pixmap,
    state: GraphicsState,
}

impl<'a> DrawingContext<'a> {
    pub(crate) fn new(target: &'a mut Surface) -> Result<Self> {
        let pixmap = target.to_pixmap()?;
        Ok(Self {
            target,
            pixmap,
            state: GraphicsState::default(),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn state(&self) -> GraphicsState {
        self.state
    }

    pub fn set_interpolation(&mut self, quality: FilterQuality) {
        self.state.interpolation = quality;
    }

    /// Draws a premultiplied pixmap unscaled at the origin, source-over.
    pub(crate) fn draw_pixmap_at_origin(&mut self, src: &Pixmap) {
        let paint = PixmapPaint {
            opacity: 1.0,
            blend_mode: BlendMode::SourceOver,
            quality: FilterQuality::Nearest,
        };
        self.pixmap
            .draw_pixmap(0, 0, src.as_ref(), &paint, Transform::identity(), None);
    }

    /// Draws a premultiplied pixmap scaled into `rect`.
    ///
    /// Pixel-aligned unscaled draws bypass interpolation so that they copy
    /// samples exactly.
    pub(crate) fn draw_pixmap_in_rect(
        &mut self,
        src: &Pixmap,
        rect: RectF,
        blend_mode: BlendMode,
        opacity: f32,
    ) {
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        let sx = rect.width / src.width() as f32;
        let sy = rect.height / src.height() as f32;
        let aligned = sx == 1.0 && sy == 1.0 && rect.x.fract() == 0.0 && rect.y.fract() == 0.0;
        let paint = PixmapPaint {
            opacity: opacity.clamp(0.0, 1.0),
            blend_mode,
            quality: if aligned {
                FilterQuality::Nearest
            } else {
                self.state.interpolation
            },
        };
        let transform = Transform::from_row(sx, 0.0, 0.0, sy, rect.x, rect.y);
        self.pixmap
            .draw_pixmap(0, 0, src.as_ref(), &paint, transform, None);
    }

    /// Renders a parsed SVG tree on top of the current contents.
    pub fn draw_svg(&mut self, tree: &usvg::Tree, transform: Transform) {
        resvg::render(tree, transform, &mut self.pixmap.as_mut());
    }
}

impl Drop for DrawingContext<'_> {
    fn drop(&mut self) {
        self.target.store_pixmap(&self.pixmap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawing_lands_in_surface_on_drop() {
        let mut target = Surface::new_premultiplied(4, 4).unwrap();
        let mut red = Surface::new_straight(2, 2).unwrap();
        for y in 0..2 {
            for x in 0..2 {
                red.set_pixel(x, y, [255, 0, 0, 255]);
            }
        }

        {
            let mut ctx = target.context().unwrap();
            red.draw(&mut ctx).unwrap();
        }

        assert_eq!(target.pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(target.pixel(1, 1), [255, 0, 0, 255]);
        assert_eq!(target.pixel(3, 3), [0, 0, 0, 0]);
    }

    #[test]
    fn context_is_released_on_error_path() {
        fn failing_draw(target: &mut Surface, src: &Surface) -> Result<()> {
            let mut ctx = target.context()?;
            src.draw(&mut ctx)?;
            Err(crate::Error::UnsupportedSize(3))
        }

        let mut target = Surface::new_premultiplied(2, 2).unwrap();
        let mut white = Surface::new_straight(2, 2).unwrap();
        white.set_pixel(0, 0, [255, 255, 255, 255]);

        assert!(failing_draw(&mut target, &white).is_err());
        // The surface is usable again and received what was drawn before the error.
        assert_eq!(target.pixel(0, 0), [255, 255, 255, 255]);
        assert!(target.context().is_ok());
    }

    #[test]
    fn scaled_draw_fills_destination_rect() {
        let mut target = Surface::new_premultiplied(8, 8).unwrap();
        let mut blue = Surface::new_straight(2, 2).unwrap();
        for y in 0..2 {
            for x in 0..2 {
                blue.set_pixel(x, y, [0, 0, 255, 255]);
            }
        }
        let src = blue.to_pixmap().unwrap();

        {
            let mut ctx = target.context().unwrap();
            ctx.set_interpolation(FilterQuality::Nearest);
            ctx.draw_pixmap_in_rect(
                &src,
                RectF::new(2.0, 2.0, 4.0, 4.0),
                BlendMode::SourceOver,
                1.0,
            );
        }

        assert_eq!(target.pixel(4, 4), [0, 0, 255, 255]);
        assert_eq!(target.pixel(0, 0), [0, 0, 0, 0]);
        assert_eq!(target.pixel(7, 7), [0, 0, 0, 0]);
    }

    #[test]
    fn default_state_uses_high_quality_interpolation() {
        let mut target = Surface::new_premultiplied(1, 1).unwrap();
        let mut ctx = target.context().unwrap();
        assert_eq!(ctx.state().interpolation, FilterQuality::Bicubic);
        ctx.set_interpolation(FilterQuality::Bilinear);
        assert_eq!(ctx.state().interpolation, FilterQuality::Bilinear);
    }
}
