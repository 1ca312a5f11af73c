//! Error types for the MPQ library

use std::io;
use thiserror::Error;

/// Result type alias for MPQ operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for MPQ operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid MPQ format, malformed header or truncated table
    #[error("Invalid MPQ format: {0}")]
    InvalidFormat(String),

    /// A table or archive signature did not match
    #[error("Bad {table} signature: found {found:02X?}")]
    BadMagic {
        /// Which structure was being read
        table: &'static str,
        /// The four bytes actually present
        found: [u8; 4],
    },

    /// A bit cursor ran out of input in the middle of a field
    #[error("Out of bits: requested {requested}, {available} remaining")]
    OutOfBits {
        /// Number of bits asked for
        requested: u32,
        /// Number of bits left in the buffer
        available: u64,
    },

    /// The compression tag is recognized (or unknown) but has no decoder
    #[error("Unsupported compression method: 0x{0:02X}")]
    UnsupportedCompression(u8),

    /// A supported decoder failed on its input
    #[error("Compression error: {0}")]
    Compression(String),

    /// File not found in archive
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// File record exists but lacks the exists flag
    #[error("File has been deleted: {0}")]
    FileDeleted(String),

    /// The archive carries neither a HET/BET pair nor a hash/block pair
    #[error("Archive has no usable file tables")]
    NoTablesAvailable,

    /// File record has a zero position or size
    #[error("File is empty: {0}")]
    FileEmpty(String),

    /// File uses a storage layout that cannot be read
    #[error("Unsupported file layout: {0}")]
    UnsupportedFile(String),
}

impl Error {
    /// Create a new InvalidFormat error
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Error::InvalidFormat(msg.into())
    }

    /// Create a new Compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Error::Compression(msg.into())
    }

    /// Check if this error is an ordinary lookup miss rather than a failure
    pub fn is_lookup_miss(&self) -> bool {
        matches!(self, Error::FileNotFound(_) | Error::FileDeleted(_))
    }

    /// Check if this error indicates the archive is corrupted
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::InvalidFormat(_)
                | Error::BadMagic { .. }
                | Error::OutOfBits { .. }
                | Error::Compression(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnsupportedCompression(0x12);
        assert_eq!(err.to_string(), "Unsupported compression method: 0x12");

        let err = Error::BadMagic {
            table: "HET",
            found: *b"XYZ\x1A",
        };
        assert_eq!(err.to_string(), "Bad HET signature: found [58, 59, 5A, 1A]");

        let err = Error::OutOfBits {
            requested: 7,
            available: 3,
        };
        assert_eq!(err.to_string(), "Out of bits: requested 7, 3 remaining");
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::FileNotFound("a".into()).is_lookup_miss());
        assert!(Error::FileDeleted("a".into()).is_lookup_miss());
        assert!(!Error::NoTablesAvailable.is_lookup_miss());
        assert!(Error::invalid_format("x").is_corruption());
        assert!(!Error::UnsupportedCompression(1).is_corruption());
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
