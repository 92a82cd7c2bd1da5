//! Error types for color configuration and color conversion.
//!
//! Two layers of errors exist:
//! - [`EngineError`] is what a color engine implementation reports when it
//!   cannot load a config or compile a transform.
//! - [`ColorError`] describes failures of the image-level operations.
//!
//! Engine errors never cross the [`ColorConfig`](crate::ColorConfig) surface:
//! they are absorbed into the config's error slot and surfaced through
//! `has_error()` / `geterror()`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for color engine calls.
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type for image-level color operations.
pub type ColorResult<T> = Result<T, ColorError>;

/// Errors reported by a color engine implementation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Generic engine failure with a message.
    #[error("{0}")]
    Message(String),

    /// Color space (or role/alias) unknown to the document.
    #[error("color space not found: {name}")]
    ColorSpaceNotFound {
        /// Requested name.
        name: String,
    },

    /// Config file could not be found.
    #[error("config file not found: {path}")]
    ConfigNotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// The engine does not implement the requested capability.
    #[error("unsupported engine capability: {0}")]
    Unsupported(String),

    /// I/O error while reading a document or transform file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Convenience constructor for [`EngineError::Message`].
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// Errors from image-level color operations.
#[derive(Debug, Error)]
pub enum ColorError {
    /// No processor was handed to a pixel operation.
    #[error("Passed NULL ColorProcessor to colorconvert() [probable application bug]")]
    NullProcessor,

    /// Empty or unknown color space name.
    #[error("Unknown color space name")]
    UnknownColorSpace,

    /// The config could not produce a processor.
    #[error("Could not construct the color transform {0}")]
    TransformUnavailable(String),

    /// Engine failure message taken from the config's error slot.
    #[error("{0}")]
    Engine(String),

    /// Region of interest does not fit the image.
    #[error("invalid region of interest: {0}")]
    BadRoi(String),

    /// Source image has no pixels.
    #[error("source image is uninitialized")]
    Uninitialized,

    /// Source and destination channel layouts are incompatible.
    #[error("channel mismatch: source has {src}, destination has {dst}")]
    ChannelMismatch {
        /// Source channel count.
        src: usize,
        /// Destination channel count.
        dst: usize,
    },
}
