use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while opening, decoding or rendering a video.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The video source could not be opened. Playback never starts.
    #[error("could not open video file '{}': {reason}", path.display())]
    SourceOpen { path: PathBuf, reason: String },

    /// ffprobe ran but its report could not be understood.
    #[error("could not read stream info: {0}")]
    Probe(String),

    /// The decoder stopped in the middle of a frame.
    #[error("truncated frame: expected {expected} bytes, got {got}")]
    TruncatedFrame { expected: usize, got: usize },

    /// A frame with zero width or height reached the resizer.
    #[error("frame has no pixels")]
    EmptyFrame,

    #[error("decoder failed: {0}")]
    Decoder(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors raised while validating configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("character ramp must not be empty")]
    EmptyRamp,

    #[error("character ramp contains non-ASCII characters; glyphs must be one column wide")]
    NonAsciiRamp,

    #[error("output width must be at least one column")]
    ZeroColumns,

    #[error("fps must be between 0.1 and 1000, got {0}")]
    InvalidFps(String),

    #[error("preset '{0}' not found")]
    MissingPreset(String),
}
