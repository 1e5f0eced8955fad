//! Document icon generation.
//!
//! [`IconGenerator`] combines a background renderer, a text renderer and a
//! caption table into finished icons. [`AssetCache`] holds everything that
//! is worth sharing between icons of one run: decoded images, split
//! backgrounds and the font database.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info};

use crate::caption::{default_output_name, CaptionTable};
use crate::error::{Error, Result};
use crate::icon::{IconSize, Image};
use crate::layer::{BackgroundRenderer, BackgroundSet, DocumentBackgroundRenderer};
use crate::package::Packager;
use crate::profile::GeneratorProfile;
use crate::surface::Surface;
use crate::text::{FontBook, TextRenderer};

// ============================================================================
// AssetCache
// ============================================================================

/// Inputs shared by every icon generated in one run.
///
/// Images are keyed by absolute path and background sets by absolute path
/// plus the split flag, so icons that share artwork decode and split it
/// once. Single-threaded; give each worker its own cache.
pub struct AssetCache {
    images: RefCell<HashMap<PathBuf, Rc<Image>>>,
    backgrounds: RefCell<HashMap<(PathBuf, bool), Rc<BackgroundSet>>>,
    fonts: RefCell<FontBook>,
    font_files: RefCell<HashSet<PathBuf>>,
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::with_fonts(FontBook::system())
    }
}

fn cache_key(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| Error::io(path, e))
}

impl AssetCache {
    /// A cache resolving captions against the system fonts.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fonts(fonts: FontBook) -> Self {
        Self {
            images: RefCell::new(HashMap::new()),
            backgrounds: RefCell::new(HashMap::new()),
            fonts: RefCell::new(fonts),
            font_files: RefCell::new(HashSet::new()),
        }
    }

    /// Loads `path`, or returns the copy loaded earlier.
    pub fn cached_image(&self, path: &Path) -> Result<Rc<Image>> {
        let key = cache_key(path)?;
        if let Some(image) = self.images.borrow().get(&key) {
            return Ok(Rc::clone(image));
        }
        let image = Rc::new(Image::load(&key)?);
        self.images.borrow_mut().insert(key, Rc::clone(&image));
        Ok(image)
    }

    /// Makes `image` the cached contents of `path` without reading it.
    pub fn insert_image(&self, path: &Path, image: Image) -> Result<Rc<Image>> {
        let key = cache_key(path)?;
        let image = Rc::new(image);
        self.images.borrow_mut().insert(key, Rc::clone(&image));
        Ok(image)
    }

    /// The background set for `path`, shared by every caller asking for the
    /// same split mode.
    pub fn cached_background(&self, path: &Path, split_shadow: bool) -> Result<Rc<BackgroundSet>> {
        let key = (cache_key(path)?, split_shadow);
        if let Some(set) = self.backgrounds.borrow().get(&key) {
            return Ok(Rc::clone(set));
        }
        let image = self.cached_image(path)?;
        let set = Rc::new(BackgroundSet::new(image, split_shadow));
        self.backgrounds.borrow_mut().insert(key, Rc::clone(&set));
        Ok(set)
    }

    /// Registers a font file once per cache.
    pub fn register_font_file(&self, path: &Path) -> Result<()> {
        let key = cache_key(path)?;
        if self.font_files.borrow().contains(&key) {
            return Ok(());
        }
        self.fonts.borrow_mut().register_font_file(&key)?;
        self.font_files.borrow_mut().insert(key);
        Ok(())
    }

    /// Registers every font file in `dir` once per cache. Returns the
    /// number of files newly registered.
    pub fn register_font_dir(&self, dir: &Path) -> Result<usize> {
        let key = cache_key(dir)?;
        if self.font_files.borrow().contains(&key) {
            return Ok(0);
        }
        let loaded = self.fonts.borrow_mut().register_font_dir(&key)?;
        debug!(dir = %key.display(), loaded, faces = self.fonts.borrow().face_count(), "registered font directory");
        self.font_files.borrow_mut().insert(key);
        Ok(loaded)
    }

    /// Registers the font files and directories named by `profile`.
    pub fn register_profile_fonts(&self, profile: &GeneratorProfile) -> Result<()> {
        for font in &profile.font_files {
            self.register_font_file(font)?;
        }
        for dir in &profile.font_dirs {
            self.register_font_dir(dir)?;
        }
        Ok(())
    }

    pub fn fonts(&self) -> FontBook {
        self.fonts.borrow().clone()
    }

    pub fn image_count(&self) -> usize {
        self.images.borrow().len()
    }

    pub fn background_count(&self) -> usize {
        self.backgrounds.borrow().len()
    }
}

// ============================================================================
// IconGenerator
// ============================================================================

/// Produces finished icons for one background, app icon and caption list.
pub struct IconGenerator {
    background: Rc<Image>,
    app_icon: Option<Rc<Image>>,
    renderer: Box<dyn BackgroundRenderer>,
    text_renderer: Box<dyn TextRenderer>,
    captions: CaptionTable,
}

impl IconGenerator {
    /// Sets up a generator for `profile` with the caption list `text`
    /// (comma separated, see [`CaptionTable::parse`]).
    pub fn new(profile: &GeneratorProfile, text: &str, cache: &AssetCache) -> Result<Self> {
        let background_path = profile.background.path();
        let background = cache.cached_image(background_path)?;
        let app_icon = profile
            .app_icon
            .as_deref()
            .map(|path| cache.cached_image(path))
            .transpose()?;
        let set = cache.cached_background(background_path, profile.background.split_shadow())?;
        let renderer = DocumentBackgroundRenderer::with_placements(
            set,
            app_icon.clone(),
            profile.placement_table()?,
        );

        cache.register_profile_fonts(profile)?;
        let text_renderer = profile
            .text_renderer
            .build(cache.fonts(), profile.font_families.clone());

        Ok(Self::from_parts(
            background,
            app_icon,
            Box::new(renderer),
            text_renderer,
            CaptionTable::parse(text)?,
        ))
    }

    /// Assembles a generator from explicit collaborators.
    pub fn from_parts(
        background: Rc<Image>,
        app_icon: Option<Rc<Image>>,
        renderer: Box<dyn BackgroundRenderer>,
        text_renderer: Box<dyn TextRenderer>,
        captions: CaptionTable,
    ) -> Self {
        Self {
            background,
            app_icon,
            renderer,
            text_renderer,
            captions,
        }
    }

    pub fn captions(&self) -> &CaptionTable {
        &self.captions
    }

    /// Sizes present in the background and, if there is one, the app icon.
    pub fn default_sizes(&self) -> Vec<IconSize> {
        let mut sizes = self.background.available_sizes();
        if let Some(icon) = &self.app_icon {
            let icon_sizes = icon.available_sizes();
            sizes.retain(|size| icon_sizes.contains(size));
        }
        sizes
            .into_iter()
            .filter(|size| size.is_square())
            .filter_map(|size| IconSize::from_pixels(size.width).ok())
            .collect()
    }

    /// Builds the finished icon for `size`.
    ///
    /// The caption is stamped on a copy; the cached background is never
    /// touched.
    pub fn create_icon_at(&mut self, size: IconSize) -> Result<Surface> {
        let mut icon = self.renderer.background_at(size)?.clone();
        let text = self.captions.caption_at(size);
        if !text.is_empty() {
            let mut ctx = icon.context()?;
            self.text_renderer.draw_caption(&mut ctx, text, size)?;
        }
        Ok(icon)
    }

    /// Builds every size in `sizes`; the first failure aborts.
    pub fn render(&mut self, sizes: &[IconSize]) -> Result<BTreeMap<IconSize, Surface>> {
        sizes
            .iter()
            .map(|&size| self.create_icon_at(size).map(|icon| (size, icon)))
            .collect()
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Expands a debug pattern such as `debug%d.png` for `size`.
pub fn debug_path(pattern: &str, size: IconSize) -> PathBuf {
    PathBuf::from(pattern.replace("%d", &size.to_string()))
}

/// Generates and packages one icon with the caption list `text`.
///
/// Returns the path written.
pub fn make_document_icon(
    profile: &GeneratorProfile,
    text: &str,
    cache: &AssetCache,
    packager: &dyn Packager,
) -> Result<PathBuf> {
    let mut generator = IconGenerator::new(profile, text, cache)?;
    let sizes = match profile.icon_sizes()? {
        Some(sizes) => sizes,
        None => generator.default_sizes(),
    };
    debug!(?sizes, text, "rendering document icon");
    let icons = generator.render(&sizes)?;

    if let Some(pattern) = &profile.debug_pattern {
        for (&size, icon) in &icons {
            icon.save(debug_path(pattern, size))?;
        }
    }

    let out = match &profile.output {
        Some(out) => out.clone(),
        None => {
            let name = default_output_name(
                profile.app_icon.as_deref(),
                profile.background.path(),
                Some(text),
            );
            match &profile.output_dir {
                Some(dir) => dir.join(name),
                None => PathBuf::from(name),
            }
        }
    };
    packager.package(&icons, &out)?;
    info!(path = %out.display(), "generated document icon");
    Ok(out)
}

/// Generates one icon per text entry of `profile`, or a single uncaptioned
/// icon when there is none.
pub fn make_document_icons(
    profile: &GeneratorProfile,
    cache: &AssetCache,
    packager: &dyn Packager,
) -> Result<Vec<PathBuf>> {
    let texts: Vec<&str> = if profile.text.is_empty() {
        vec![""]
    } else {
        profile.text.iter().map(String::as_str).collect()
    };

    let mut single = profile.clone();
    if texts.len() > 1 {
        single.output = None;
    }
    texts
        .into_iter()
        .map(|text| make_document_icon(&single, text, cache, packager))
        .collect()
}
