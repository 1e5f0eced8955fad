//! Serializable generator options.
//!
//! A [`GeneratorProfile`] captures everything needed to build one family of
//! document icons. It is what the CLI flags fill in, and it can be stored as
//! JSON so that a build script can keep its icon settings next to its
//! assets.
//!
//! # Example
//!
//! ```
//! use docicon::{BackgroundChoice, GeneratorProfile};
//!
//! let profile = GeneratorProfile::new()
//!     .with_app_icon("MacVim.icns")
//!     .with_text("PYTHON,PY")
//!     .with_sizes([512, 128, 32, 16]);
//!
//! let json = profile.to_json().unwrap();
//! let restored = GeneratorProfile::from_json(&json).unwrap();
//! assert_eq!(restored.background, BackgroundChoice::DefaultSplit);
//! ```

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::icon::IconSize;
use crate::layer::{PlacementTable, PlacementTransform};
use crate::text::TextRendererKind;

/// The stock document icon shipped with macOS.
pub const DEFAULT_BACKGROUND: &str =
    "/System/Library/CoreServices/CoreTypes.bundle/Contents/Resources/GenericDocumentIcon.icns";

// ============================================================================
// Background Choice
// ============================================================================

/// Which artwork the page is drawn from.
///
/// Serializes as a plain string: `"default-split"`, `"default-unsplit"` or a
/// path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BackgroundChoice {
    /// The stock document icon, with its shadow split off so that the app
    /// icon is drawn beneath it.
    #[default]
    DefaultSplit,
    /// The stock document icon used as-is.
    DefaultUnsplit,
    /// Any other artwork, used as-is.
    Custom(PathBuf),
}

impl BackgroundChoice {
    pub fn path(&self) -> &Path {
        match self {
            BackgroundChoice::DefaultSplit | BackgroundChoice::DefaultUnsplit => {
                Path::new(DEFAULT_BACKGROUND)
            }
            BackgroundChoice::Custom(path) => path,
        }
    }

    /// Only the stock artwork has a shadow the splitter understands.
    pub fn split_shadow(&self) -> bool {
        matches!(self, BackgroundChoice::DefaultSplit)
    }
}

impl From<String> for BackgroundChoice {
    fn from(value: String) -> Self {
        match value.as_str() {
            "default-split" => BackgroundChoice::DefaultSplit,
            "default-unsplit" => BackgroundChoice::DefaultUnsplit,
            _ => BackgroundChoice::Custom(PathBuf::from(value)),
        }
    }
}

impl From<BackgroundChoice> for String {
    fn from(choice: BackgroundChoice) -> Self {
        choice.to_string()
    }
}

impl FromStr for BackgroundChoice {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s.to_owned()))
    }
}

impl fmt::Display for BackgroundChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackgroundChoice::DefaultSplit => f.write_str("default-split"),
            BackgroundChoice::DefaultUnsplit => f.write_str("default-unsplit"),
            BackgroundChoice::Custom(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(feature = "jsonschema")]
impl schemars::JsonSchema for BackgroundChoice {
    fn schema_name() -> String {
        "BackgroundChoice".to_owned()
    }

    fn json_schema(generator: &mut schemars::r#gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(generator)
    }
}

// ============================================================================
// GeneratorProfile
// ============================================================================

/// Options for one family of document icons.
///
/// # JSON Format
///
/// ```json
/// {
///   "background": "default-split",
///   "appIcon": "MacVim.icns",
///   "text": ["PYTHON,PY"],
///   "sizes": [512, 128, 32, 16],
///   "placements": { "32": { "offsetX": 0.0, "scaleW": 0.6, "offsetY": -2.0, "scaleH": 0.6 } },
///   "textRenderer": "standard"
/// }
/// ```
///
/// Every field is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorProfile {
    pub background: BackgroundChoice,

    /// Glyph drawn on the page. `None` gives a plain captioned document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_icon: Option<PathBuf>,

    /// One entry per icon to generate. Each entry is a comma separated list
    /// of one to three captions, largest sizes first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub text: Vec<String>,

    /// Pixel sizes to render. `None` means every size both inputs provide.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Vec<u32>>,

    /// Placement overrides keyed by pixel size.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub placements: BTreeMap<u32, PlacementTransform>,

    pub text_renderer: TextRendererKind,

    /// Caption font families in order of preference.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub font_families: Vec<String>,

    /// Extra font files to register before resolving the caption font.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub font_files: Vec<PathBuf>,

    /// Directories whose `.ttf`, `.otf` and `.ttc` files are registered
    /// like `font_files`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub font_dirs: Vec<PathBuf>,

    /// If set, every rendered size is also written as a PNG to this
    /// pattern with `%d` replaced by the pixel size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_pattern: Option<String>,

    /// Output file. Only used with at most one text entry; otherwise names
    /// are derived from the inputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Directory for derived output names. Defaults to the working
    /// directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl GeneratorProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_background(mut self, background: BackgroundChoice) -> Self {
        self.background = background;
        self
    }

    pub fn with_app_icon(mut self, path: impl Into<PathBuf>) -> Self {
        self.app_icon = Some(path.into());
        self
    }

    /// Adds one icon's caption list.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text.push(text.into());
        self
    }

    pub fn with_sizes(mut self, sizes: impl IntoIterator<Item = u32>) -> Self {
        self.sizes = Some(sizes.into_iter().collect());
        self
    }

    pub fn with_placement(mut self, size: IconSize, placement: PlacementTransform) -> Self {
        self.placements.insert(size.pixels(), placement);
        self
    }

    pub fn with_text_renderer(mut self, kind: TextRendererKind) -> Self {
        self.text_renderer = kind;
        self
    }

    pub fn with_font_families<S: Into<String>>(mut self, families: impl IntoIterator<Item = S>) -> Self {
        self.font_families = families.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_font_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.font_dirs.push(dir.into());
        self
    }

    pub fn with_debug_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.debug_pattern = Some(pattern.into());
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// The requested sizes, validated against the closed size set.
    pub fn icon_sizes(&self) -> Result<Option<Vec<IconSize>>> {
        self.sizes
            .as_ref()
            .map(|sizes| sizes.iter().map(|&px| IconSize::from_pixels(px)).collect())
            .transpose()
    }

    /// The default placements with this profile's overrides applied.
    pub fn placement_table(&self) -> Result<PlacementTable> {
        PlacementTable::with_overrides(&self.placements)
    }

    /// Serializes the profile to a JSON string.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes the profile to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes a profile from a JSON string.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads a profile from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::from_json(&json)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
