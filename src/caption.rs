//! Per-size captions and default output names.

use std::path::Path;

use crate::error::{Error, Result};
use crate::icon::IconSize;

/// Caption used in output names when no text is given.
pub const GENERIC_CAPTION: &str = "Generic";

/// The caption to stamp at each icon size.
///
/// Derived from one to three strings; later strings are progressively
/// shorter variants for the 32 and 16 pixel renderings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTable([String; 5]);

impl CaptionTable {
    /// A table with the same caption at every size.
    pub fn uniform(text: impl Into<String>) -> Self {
        let text = text.into();
        Self(std::array::from_fn(|_| text.clone()))
    }

    /// Builds the table from a list of one to three captions.
    ///
    /// | items | 128/256/512 | 32 | 16 |
    /// |-------|-------------|----|----|
    /// | `[a]` | a | a | a |
    /// | `[a, b]` | a | b | b |
    /// | `[a, b, c]` | a | b | c |
    pub fn from_list<S: AsRef<str>>(items: &[S]) -> Result<Self> {
        let (large, medium, small) = match items {
            [a] => (a, a, a),
            [a, b] => (a, b, b),
            [a, b, c] => (a, b, c),
            _ => return Err(Error::InvalidCaptionList(items.len())),
        };
        let mut table = Self::uniform(large.as_ref());
        table.0[IconSize::Px32.index()] = medium.as_ref().to_owned();
        table.0[IconSize::Px16.index()] = small.as_ref().to_owned();
        Ok(table)
    }

    /// Parses a comma separated list such as `"PYTHON,PY"`.
    pub fn parse(list: &str) -> Result<Self> {
        let items: Vec<&str> = list.split(',').collect();
        Self::from_list(items.as_slice())
    }

    pub fn caption_at(&self, size: IconSize) -> &str {
        &self.0[size.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (IconSize, &str)> {
        IconSize::ALL.into_iter().map(|size| (size, self.caption_at(size)))
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The default output file name: `<stem>-<caption>.icns`.
///
/// The stem comes from the app icon if there is one, else from the
/// background. The caption part is the first comma separated item of
/// `text`, or [`GENERIC_CAPTION`] when there is no text.
pub fn default_output_name(app_icon: Option<&Path>, background: &Path, text: Option<&str>) -> String {
    let caption = match text {
        Some(text) if !text.is_empty() => text.split(',').next().unwrap_or(text),
        _ => GENERIC_CAPTION,
    };
    let stem = file_stem(app_icon.unwrap_or(background));
    format!("{stem}-{caption}.icns")
}
