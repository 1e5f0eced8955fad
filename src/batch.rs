//! Generating a whole set of document icons from a manifest.
//!
//! Icons that are not worth their disk space are created as links to the
//! generic (uncaptioned) icon. Links are made after every real icon has been
//! written so that their target exists.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::generator::{make_document_icon, AssetCache};
use crate::icon::IconSize;
use crate::package::Packager;
use crate::profile::GeneratorProfile;
use crate::text::families_or_default;

/// How much of an icon gets generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum IconClass {
    /// 512, 128, 32 and 16 pixels.
    Large,
    /// 128, 32 and 16 pixels.
    Small,
    /// A link to the generic icon.
    Link,
}

impl IconClass {
    pub fn sizes(self) -> &'static [IconSize] {
        match self {
            IconClass::Large => &[IconSize::Px512, IconSize::Px128, IconSize::Px32, IconSize::Px16],
            IconClass::Small => &[IconSize::Px128, IconSize::Px32, IconSize::Px16],
            IconClass::Link => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct BatchEntry {
    /// Caption list for this icon; may be empty.
    #[serde(default)]
    pub text: String,
    pub class: IconClass,
}

impl BatchEntry {
    pub fn new(text: impl Into<String>, class: IconClass) -> Self {
        Self {
            text: text.into(),
            class,
        }
    }
}

fn default_generic_name() -> String {
    "generic".to_owned()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// A set of icons sharing one background and app icon.
///
/// # JSON Format
///
/// ```json
/// {
///   "genericName": "MacVim-generic",
///   "outputDir": "icons",
///   "profile": { "appIcon": "vim-noshadow-512.png" },
///   "icons": {
///     "MacVim-generic": { "text": "", "class": "large" },
///     "MacVim-py": { "text": "PYTHON", "class": "small" },
///     "MacVim-csv": { "text": "CSV", "class": "link" }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct BatchManifest {
    /// Name (without extension) of the icon links point to.
    #[serde(default = "default_generic_name")]
    pub generic_name: String,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Shared settings. Its text, sizes and output fields are ignored.
    #[serde(default)]
    pub profile: GeneratorProfile,

    pub icons: BTreeMap<String, BatchEntry>,
}

impl BatchManifest {
    pub fn new(generic_name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            generic_name: generic_name.into(),
            output_dir: output_dir.into(),
            profile: GeneratorProfile::default(),
            icons: BTreeMap::new(),
        }
    }

    pub fn with_profile(mut self, profile: GeneratorProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_icon(mut self, name: impl Into<String>, entry: BatchEntry) -> Self {
        self.icons.insert(name.into(), entry);
        self
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::from_json(&json)?)
    }

    fn icns_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{name}.icns"))
    }
}

/// What a batch run did.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchSummary {
    pub generated: Vec<PathBuf>,
    pub linked: Vec<PathBuf>,
    /// Icon names that failed, with the error message.
    pub failed: Vec<(String, String)>,
    /// True if no caption font was available and stock icons were used.
    pub degraded: bool,
}

/// Creates `link` pointing at the file `target` in the same directory,
/// replacing whatever was there.
fn link_to(target: &str, link: &Path) -> Result<()> {
    if link.symlink_metadata().is_ok() {
        std::fs::remove_file(link).map_err(|e| Error::io(link, e))?;
    }
    #[cfg(unix)]
    std::os::unix::fs::symlink(target, link).map_err(|e| Error::io(link, e))?;
    #[cfg(not(unix))]
    {
        let source = link.with_file_name(target);
        std::fs::copy(&source, link).map_err(|e| Error::io(link, e))?;
    }
    Ok(())
}

fn needs_fonts(manifest: &BatchManifest) -> bool {
    manifest
        .icons
        .values()
        .any(|entry| entry.class != IconClass::Link && !entry.text.is_empty())
}

fn fonts_available(manifest: &BatchManifest, cache: &AssetCache) -> bool {
    if let Err(err) = cache.register_profile_fonts(&manifest.profile) {
        warn!(%err, "could not register fonts");
    }
    let families = families_or_default(manifest.profile.font_families.clone());
    cache.fonts().resolve(families.as_slice(), 700).is_some()
}

/// Generates every icon in `manifest`.
///
/// Failures of single icons are logged and reported in the summary; only
/// problems with the output directory or the degraded-mode copy abort the
/// run.
pub fn run_batch(manifest: &BatchManifest, cache: &AssetCache, packager: &dyn Packager) -> Result<BatchSummary> {
    let dir = &manifest.output_dir;
    std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let generic_file = format!("{}.icns", manifest.generic_name);
    let mut summary = BatchSummary::default();

    if needs_fonts(manifest) && !fonts_available(manifest, cache) {
        warn!("no caption font available, using the stock document icon for every name");
        summary.degraded = true;
        let source = manifest.profile.background.path();
        let generic = manifest.icns_path(&manifest.generic_name);
        std::fs::copy(source, &generic).map_err(|e| Error::io(source, e))?;
        summary.generated.push(generic);

        for name in manifest.icons.keys().filter(|&name| *name != manifest.generic_name) {
            let link = manifest.icns_path(name);
            link_to(&generic_file, &link)?;
            summary.linked.push(link);
        }
        return Ok(summary);
    }

    for (name, entry) in manifest.icons.iter().filter(|(_, e)| e.class != IconClass::Link) {
        let mut profile = manifest.profile.clone();
        profile.text = vec![entry.text.clone()];
        profile.sizes = Some(entry.class.sizes().iter().map(|s| s.pixels()).collect());
        profile.output = Some(manifest.icns_path(name));

        match make_document_icon(&profile, &entry.text, cache, packager) {
            Ok(path) => {
                info!(name = name.as_str(), "generated");
                summary.generated.push(path);
            }
            Err(err) => {
                warn!(name = name.as_str(), %err, "failed to generate icon");
                summary.failed.push((name.clone(), err.to_string()));
            }
        }
    }

    for name in manifest
        .icons
        .iter()
        .filter(|(_, e)| e.class == IconClass::Link)
        .map(|(name, _)| name)
    {
        let link = manifest.icns_path(name);
        match link_to(&generic_file, &link) {
            Ok(()) => summary.linked.push(link),
            Err(err) => {
                warn!(name = name.as_str(), %err, "failed to link icon");
                summary.failed.push((name.clone(), err.to_string()));
            }
        }
    }

    Ok(summary)
}
