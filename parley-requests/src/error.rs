use thiserror::Error;

use crate::ImageFormat;

/// The error returned when an image descriptor is constructed with a size or format the content
/// delivery network does not serve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// The requested size is out of range, or not a power of two.
    #[error("size must be a power of two between 16 and 2048, got {size}")]
    InvalidSize {
        /// The size that was asked for.
        size: u32,
    },
    /// The requested format is not available for this kind of image.
    #[error("{format} is not available for this image; expected one of {allowed:?}")]
    UnsupportedFormat {
        /// The format that was asked for.
        format: ImageFormat,
        /// The formats this kind of image is served in.
        allowed: &'static [ImageFormat],
    },
}

/// The error returned when a message is constructed with content the service would reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MessageError {
    /// The content was empty.
    #[error("message content must not be empty")]
    Empty,
    /// The content was longer than the service allows.
    #[error("message content must be at most 2000 characters, got {length}")]
    TooLong {
        /// The length of the rejected content, in characters.
        length: usize,
    },
}

/// The error returned when parsing a token which names no known OAuth2 scope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown OAuth2 scope: {0:?}")]
pub struct UnknownScope(pub String);
