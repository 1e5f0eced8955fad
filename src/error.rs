//! Error type shared by the whole pipeline.

use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can abort an icon build.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unsupported pixel format: {0}")]
    UnsupportedPixelFormat(String),

    #[error("no {width}x{height} representation available")]
    SizeNotAvailable { width: u32, height: u32 },

    #[error("unsupported icon size {0} (expected one of 16, 32, 128, 256, 512)")]
    UnsupportedSize(u32),

    #[error("opaque pixel ({x}, {y}) of the {size}px background is not grayscale")]
    NonGrayscalePixel { size: u32, x: u32, y: u32 },

    #[error("image already has a {width}x{height} representation")]
    DuplicateRepresentation { width: u32, height: u32 },

    #[error("cannot allocate a {width}x{height} surface")]
    SurfaceAllocation { width: u32, height: u32 },

    #[error("no usable font among: {0}")]
    FontUnavailable(String),

    #[error("caption list must hold 1 to 3 entries, got {0}")]
    InvalidCaptionList(usize),

    #[error("svg error: {0}")]
    Svg(String),

    #[error("{program} exited with {status}: {stderr}")]
    ExternalPackagerFailure {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Decode(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedPixelFormat(msg.into())
    }

    pub fn svg(msg: impl Into<String>) -> Self {
        Self::Svg(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_errors_name_the_dimensions() {
        let err = Error::SizeNotAvailable {
            width: 48,
            height: 48,
        };
        assert_eq!(err.to_string(), "no 48x48 representation available");
        assert!(Error::UnsupportedSize(64).to_string().contains("64"));
    }

    #[test]
    fn io_error_keeps_path_and_source() {
        let err = Error::io("/tmp/missing.icns", std::io::Error::other("boom"));
        let text = err.to_string();
        assert!(text.contains("/tmp/missing.icns"));
        assert!(text.contains("boom"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
