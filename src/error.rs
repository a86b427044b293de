// Error types for the thumbnail helpers

use image::ImageError;
use thiserror::Error;

/// Why a thumbnail could not be produced
///
/// The `Display` output is the message shown to the user.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// Requested dimensions are unusable
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Reading or writing a file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source could not be decoded
    #[error("failed to decode image: {0}")]
    Decode(#[source] ImageError),

    /// The canvas could not be encoded to the destination
    #[error("failed to encode image: {0}")]
    Encode(#[source] ImageError),
}

pub type Result<T> = std::result::Result<T, ThumbnailError>;
