//! Bundling rendered sizes into one `.icns` file.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::icon::IconSize;
use crate::surface::Surface;

/// Writes a set of finished icons to an `.icns` container at `out`.
pub trait Packager {
    fn package(&self, icons: &BTreeMap<IconSize, Surface>, out: &Path) -> Result<()>;
}

/// Every surface must be exactly as large as the size it is filed under.
fn validate(icons: &BTreeMap<IconSize, Surface>) -> Result<()> {
    for (size, surface) in icons {
        if surface.size() != size.size_px() {
            return Err(Error::SizeNotAvailable {
                width: size.pixels(),
                height: size.pixels(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// External packer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Invocation {
    /// `makeicns -512 a.png -16 b.png -out x.icns`
    Makeicns,
    /// `iconutil -c icns dir.iconset -o x.icns`
    Iconutil,
}

/// Runs an external icon packer on PNG files in a temporary directory.
///
/// The directory is removed when packaging finishes, whether it succeeded
/// or not.
#[derive(Debug, Clone)]
pub struct ExternalPackager {
    program: PathBuf,
    invocation: Invocation,
}

impl ExternalPackager {
    /// The `makeicns` tool at `program`.
    pub fn makeicns(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            invocation: Invocation::Makeicns,
        }
    }

    /// The system `iconutil` tool.
    pub fn iconutil() -> Self {
        Self {
            program: PathBuf::from("iconutil"),
            invocation: Invocation::Iconutil,
        }
    }

    fn command(&self, icons: &BTreeMap<IconSize, Surface>, dir: &Path, out: &Path) -> Result<Command> {
        let mut command = Command::new(&self.program);
        match self.invocation {
            Invocation::Makeicns => {
                for (size, surface) in icons {
                    let png = dir.join(format!("icon_{size}.png"));
                    surface.save(&png)?;
                    command.arg(format!("-{size}")).arg(png);
                }
                command.arg("-out").arg(out);
            }
            Invocation::Iconutil => {
                let iconset = dir.join("icon.iconset");
                std::fs::create_dir(&iconset).map_err(|e| Error::io(&iconset, e))?;
                for (size, surface) in icons {
                    surface.save(iconset.join(format!("icon_{size}x{size}.png")))?;
                }
                command.arg("-c").arg("icns").arg(&iconset).arg("-o").arg(out);
            }
        }
        Ok(command)
    }
}

impl ExternalPackager {
    /// Runs the packer with its scratch directory created under `scratch_root`.
    pub(crate) fn package_in(
        &self,
        icons: &BTreeMap<IconSize, Surface>,
        out: &Path,
        scratch_root: &Path,
    ) -> Result<()> {
        validate(icons)?;
        let dir = tempfile::Builder::new()
            .prefix("docicon-")
            .tempdir_in(scratch_root)
            .map_err(|e| Error::io(scratch_root, e))?;
        let mut command = self.command(icons, dir.path(), out)?;

        debug!(?command, "running icon packer");
        let output = command.output().map_err(|e| Error::io(&self.program, e))?;
        if !output.status.success() {
            return Err(Error::ExternalPackagerFailure {
                program: self.program.display().to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        info!(path = %out.display(), sizes = icons.len(), "wrote icon");
        Ok(())
    }
}

impl Packager for ExternalPackager {
    fn package(&self, icons: &BTreeMap<IconSize, Surface>, out: &Path) -> Result<()> {
        self.package_in(icons, out, &std::env::temp_dir())
    }
}

// ============================================================================
// In-process writer
// ============================================================================

/// Writes the container directly with the `icns` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct IcnsPackager;

impl Packager for IcnsPackager {
    fn package(&self, icons: &BTreeMap<IconSize, Surface>, out: &Path) -> Result<()> {
        validate(icons)?;
        let mut family = icns::IconFamily::new();
        for (size, surface) in icons {
            let side = size.pixels();
            let mut image = icns::Image::new(icns::PixelFormat::RGBA, side, side);
            image
                .data_mut()
                .copy_from_slice(surface.to_rgba_image().as_raw());
            family.add_icon(&image).map_err(|e| Error::io(out, e))?;
        }

        let file = File::create(out).map_err(|e| Error::io(out, e))?;
        family
            .write(BufWriter::new(file))
            .map_err(|e| Error::io(out, e))?;
        info!(path = %out.display(), sizes = icons.len(), "wrote icon");
        Ok(())
    }
}
