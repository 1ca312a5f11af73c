//! Decompression dispatch for MPQ table and file bodies
//!
//! A compressed body starts with a one-byte method tag followed by the
//! codec payload. Only bzip2 is decoded here; every other tag is
//! recognized and reported as [`Error::UnsupportedCompression`] so that
//! callers can skip the body rather than treat it as corruption.

mod bzip2;

pub use self::bzip2::Bzip2Decompressor;

use crate::{Error, Result};

/// Compression method tag values
pub mod flags {
    /// Huffman (WAVE files only)
    pub const HUFFMAN: u8 = 0x01;
    /// zlib deflate
    pub const ZLIB: u8 = 0x02;
    /// PKWARE Data Compression Library
    pub const PKWARE: u8 = 0x08;
    /// bzip2
    pub const BZIP2: u8 = 0x10;
    /// LZMA (not a combination of flags)
    pub const LZMA: u8 = 0x12;
    /// Sparse / RLE
    pub const SPARSE: u8 = 0x20;
    /// IMA ADPCM mono
    pub const ADPCM_MONO: u8 = 0x40;
    /// IMA ADPCM stereo
    pub const ADPCM_STEREO: u8 = 0x80;
}

/// A decoded compression method tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Huffman
    Huffman,
    /// zlib
    Zlib,
    /// PKWARE DCL
    PKWare,
    /// bzip2
    BZip2,
    /// LZMA
    Lzma,
    /// Sparse
    Sparse,
    /// Sparse followed by zlib
    SparseZlib,
    /// Sparse followed by bzip2
    SparseBZip2,
    /// ADPCM mono
    AdpcmMono,
    /// ADPCM stereo
    AdpcmStereo,
    /// ADPCM mono followed by Huffman
    AdpcmMonoHuffman,
    /// ADPCM stereo followed by Huffman
    AdpcmStereoHuffman,
    /// Any other tag value
    Unknown(u8),
}

impl CompressionMethod {
    /// Decode a method tag byte
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            flags::HUFFMAN => Self::Huffman,
            flags::ZLIB => Self::Zlib,
            flags::PKWARE => Self::PKWare,
            flags::BZIP2 => Self::BZip2,
            flags::LZMA => Self::Lzma,
            flags::SPARSE => Self::Sparse,
            0x22 => Self::SparseZlib,
            0x30 => Self::SparseBZip2,
            flags::ADPCM_MONO => Self::AdpcmMono,
            flags::ADPCM_STEREO => Self::AdpcmStereo,
            0x41 => Self::AdpcmMonoHuffman,
            0x81 => Self::AdpcmStereoHuffman,
            other => Self::Unknown(other),
        }
    }

    /// The tag byte for this method
    pub fn tag(self) -> u8 {
        match self {
            Self::Huffman => flags::HUFFMAN,
            Self::Zlib => flags::ZLIB,
            Self::PKWare => flags::PKWARE,
            Self::BZip2 => flags::BZIP2,
            Self::Lzma => flags::LZMA,
            Self::Sparse => flags::SPARSE,
            Self::SparseZlib => 0x22,
            Self::SparseBZip2 => 0x30,
            Self::AdpcmMono => flags::ADPCM_MONO,
            Self::AdpcmStereo => flags::ADPCM_STEREO,
            Self::AdpcmMonoHuffman => 0x41,
            Self::AdpcmStereoHuffman => 0x81,
            Self::Unknown(tag) => tag,
        }
    }

    /// Human-readable method name
    pub fn name(self) -> &'static str {
        match self {
            Self::Huffman => "Huffman",
            Self::Zlib => "zlib",
            Self::PKWare => "PKWare",
            Self::BZip2 => "bzip2",
            Self::Lzma => "LZMA",
            Self::Sparse => "Sparse",
            Self::SparseZlib => "Sparse+zlib",
            Self::SparseBZip2 => "Sparse+bzip2",
            Self::AdpcmMono => "ADPCM mono",
            Self::AdpcmStereo => "ADPCM stereo",
            Self::AdpcmMonoHuffman => "ADPCM mono+Huffman",
            Self::AdpcmStereoHuffman => "ADPCM stereo+Huffman",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// A codec able to expand one compressed payload
pub trait Decompressor {
    /// Decompress `data` (without its tag byte) into `expected_size` bytes
    fn decompress(&self, data: &[u8], expected_size: usize) -> Result<Vec<u8>>;

    /// The method this decompressor handles
    fn method(&self) -> CompressionMethod;
}

/// Look up the decompressor for a method, if one is available
pub fn decompressor_for(method: CompressionMethod) -> Option<&'static dyn Decompressor> {
    match method {
        CompressionMethod::BZip2 => Some(&Bzip2Decompressor),
        _ => None,
    }
}

/// Decompress a tagged buffer into `expected_size` bytes
///
/// A buffer that is already `expected_size` long is stored, not
/// compressed, and is returned as-is.
pub fn decompress(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    if data.len() == expected_size {
        return Ok(data.to_vec());
    }
    if data.is_empty() {
        return Err(Error::compression("Empty compressed data"));
    }

    let method = CompressionMethod::from_tag(data[0]);
    log::debug!(
        "Decompressing {} bytes to {} bytes with {} (0x{:02X})",
        data.len(),
        expected_size,
        method.name(),
        method.tag()
    );

    match decompressor_for(method) {
        Some(decompressor) => decompressor.decompress(&data[1..], expected_size),
        None => {
            log::warn!(
                "{} decompression requested but not supported",
                method.name()
            );
            Err(Error::UnsupportedCompression(method.tag()))
        }
    }
}
