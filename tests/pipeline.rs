use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use docicon::{
    AssetCache, BackgroundSet, BatchManifest, CaptionTable, DocumentBackgroundRenderer,
    DrawingContext, FontBook, GeneratorProfile, IcnsPackager, IconGenerator, IconSize, Image,
    Surface, TextRenderer, DEFAULT_BACKGROUND,
};

fn solid(side: u32, rgba: [u8; 4]) -> Surface {
    let mut surface = Surface::new_straight(side, side).unwrap();
    for y in 0..side {
        for x in 0..side {
            surface.set_pixel(x, y, rgba);
        }
    }
    surface
}

fn gray_page(v: u8, sides: &[u32]) -> Image {
    Image::from_surfaces(sides.iter().map(|&side| solid(side, [v, v, v, 255]))).unwrap()
}

fn close(a: [u8; 4], b: [u8; 4]) -> bool {
    a.iter().zip(b).all(|(&x, y)| x.abs_diff(y) <= 2)
}

/// Records captions and paints a blue strip along the bottom row.
struct StripText {
    seen: Rc<RefCell<Vec<(u32, String)>>>,
}

impl TextRenderer for StripText {
    fn draw_caption(&mut self, ctx: &mut DrawingContext<'_>, text: &str, size: IconSize) -> docicon::Result<()> {
        self.seen.borrow_mut().push((size.pixels(), text.to_owned()));
        let strip = Surface::from_raw(
            size.pixels(),
            1,
            docicon::PixelFormat::STRAIGHT_RGBA,
            [0, 0, 255, 255].repeat(size.pixels() as usize),
        )?;
        strip.draw(ctx)
    }
}

#[test]
fn split_background_round_trips_through_icns() {
    let dir = tempfile::tempdir().unwrap();
    let cache = AssetCache::with_fonts(FontBook::empty());
    cache
        .insert_image(Path::new(DEFAULT_BACKGROUND), gray_page(128, &[16, 32, 128]))
        .unwrap();
    let app = dir.path().join("app.png");
    cache
        .insert_image(&app, Image::from_surface(solid(128, [255, 0, 0, 255])))
        .unwrap();

    let out = dir.path().join("doc.icns");
    let profile = GeneratorProfile::new()
        .with_app_icon(&app)
        .with_sizes([128, 32, 16])
        .with_output(&out);
    let written = docicon::make_document_icon(&profile, "", &cache, &IcnsPackager).unwrap();
    assert_eq!(written, out);

    let icon = Image::load(&out).unwrap();
    assert_eq!(icon.len(), 3);
    let large = icon.representation(IconSize::Px128).unwrap();
    // Glyph under a shadow of alpha 127.
    assert!(close(large.pixel(64, 64), [128, 0, 0, 255]), "{:?}", large.pixel(64, 64));
    // Bare page keeps its original gray.
    assert!(close(large.pixel(2, 2), [128, 128, 128, 255]), "{:?}", large.pixel(2, 2));
}

#[test]
fn generator_stamps_each_size_over_a_shared_background() {
    let background = Rc::new(gray_page(200, &[16, 32, 128]));
    let set = Rc::new(BackgroundSet::new(Rc::clone(&background), false));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut generator = IconGenerator::from_parts(
        background,
        None,
        Box::new(DocumentBackgroundRenderer::new(set, None)),
        Box::new(StripText {
            seen: Rc::clone(&seen),
        }),
        CaptionTable::parse("JAVASCRIPT,JS,J").unwrap(),
    );

    let sizes = generator.default_sizes();
    assert_eq!(sizes, vec![IconSize::Px16, IconSize::Px32, IconSize::Px128]);
    let icons = generator.render(&sizes).unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![
            (16, "J".to_owned()),
            (32, "JS".to_owned()),
            (128, "JAVASCRIPT".to_owned()),
        ]
    );
    let small = &icons[&IconSize::Px16];
    assert_eq!(small.pixel(3, 0), [0, 0, 255, 255]);
    assert_eq!(small.pixel(3, 8), [200, 200, 200, 255]);
}

#[test]
fn batch_manifest_from_json_generates_and_links() {
    let dir = tempfile::tempdir().unwrap();
    let bg = dir.path().join("page.icns");
    let cache = AssetCache::with_fonts(FontBook::empty());
    cache.insert_image(&bg, gray_page(240, &[16, 32, 128])).unwrap();

    let json = format!(
        r#"{{
            "genericName": "Doc-generic",
            "outputDir": {out:?},
            "profile": {{ "background": {bg:?} }},
            "icons": {{
                "Doc-generic": {{ "class": "small" }},
                "Doc-txt": {{ "text": "TXT", "class": "link" }}
            }}
        }}"#,
        out = dir.path().join("icons").display().to_string(),
        bg = bg.display().to_string(),
    );
    let manifest = BatchManifest::from_json(&json).unwrap();
    let summary = docicon::run_batch(&manifest, &cache, &IcnsPackager).unwrap();

    assert!(summary.failed.is_empty(), "{:?}", summary.failed);
    assert_eq!(summary.generated, vec![dir.path().join("icons/Doc-generic.icns")]);
    assert_eq!(summary.linked, vec![dir.path().join("icons/Doc-txt.icns")]);
    assert_eq!(Image::load(dir.path().join("icons/Doc-txt.icns")).unwrap().len(), 3);
}
