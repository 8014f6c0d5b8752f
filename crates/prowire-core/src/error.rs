//! Error types for the prowire-core library.
//!
//! Two tiers on purpose. [`DecodeError`] is the wire parser's entire error
//! surface: a parse either consumed exactly the stated range or it did not,
//! and no caller recovers differently per cause, so no cause is carried.
//! [`Error`] wraps the operations around the codec (file access for the
//! convenience helpers and the over-size refusal on the encode path) using
//! `thiserror` with detailed variants.

use std::path::PathBuf;
use thiserror::Error;

use crate::codec::limits::MAX_SERIALIZED_SIZE;

/// Result type alias for prowire operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure signal from the wire parser
///
/// Carries no detail: the possible causes (premature end of buffer, legacy
/// or reserved wire type, length past the payload ceiling or remaining
/// range, nesting past the depth limit) all mean the same thing to a
/// caller, namely that the bytes are not trustworthy wire data.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("wire bytes did not parse as a well-formed message")]
pub struct DecodeError;

/// Error type for the operations surrounding the codec
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A message would serialize past the 64 MiB ceiling
    #[error("message exceeds the maximum serialized size of {MAX_SERIALIZED_SIZE} bytes")]
    MessageTooLarge,

    /// Wire data failed to parse
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }
}
