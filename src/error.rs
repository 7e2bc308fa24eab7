//! Error types for the OCC decoder.
//!
//! Per-frame decode conditions (empty blob set, header mismatch, degenerate
//! region) are not errors; they are reported through
//! [`FrameStatus`](crate::core_modules::frame_decoder::FrameStatus). This enum only
//! covers construction, I/O and pipeline plumbing.

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// OCC decoder error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A pixel buffer is shorter than its declared geometry
    #[error("Buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall {
        /// Bytes required by width, height, stride and channel count
        needed: usize,
        /// Bytes actually supplied
        actual: usize,
    },

    /// Image decoding or encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A pipeline stage hung up before the stream ended
    #[error("Pipeline closed: {0}")]
    PipelineClosed(&'static str),
}
