//! Shared decrypt-then-decompress path for all four table kinds

use crate::compression::decompress;
use crate::crypto::decrypt_block;
use crate::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Size of the header that precedes HET and BET tables
pub const EXT_HEADER_SIZE: usize = 12;

/// Bytes a short HET or BET region may be padded by before the table is
/// considered malformed
pub(crate) const MAX_REGION_PADDING: u64 = 0x1000;

/// Extended header that precedes HET/BET tables
///
/// This header is stored in the clear; only the bytes after it are
/// encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExtHeader {
    /// Signature, `HET\x1A` or `BET\x1A`
    pub signature: [u8; 4],
    /// Table version (always 1 in practice)
    pub version: u32,
    /// Size of the table data following this header, once decompressed
    pub data_size: u32,
}

impl ExtHeader {
    /// Parse and validate an extended header against its expected signature
    pub fn parse(data: &[u8], expected: &[u8; 4], table: &'static str) -> Result<Self> {
        if data.len() < EXT_HEADER_SIZE {
            return Err(Error::invalid_format(format!(
                "{} table too small for extended header",
                table
            )));
        }

        let mut signature = [0u8; 4];
        signature.copy_from_slice(&data[0..4]);
        if &signature != expected {
            return Err(Error::BadMagic {
                table,
                found: signature,
            });
        }

        Ok(Self {
            signature,
            version: LittleEndian::read_u32(&data[4..8]),
            data_size: LittleEndian::read_u32(&data[8..12]),
        })
    }
}

/// Decrypt and, if needed, decompress a hash or block table
///
/// The table is stored raw when it is at least `declared_plain_size`
/// bytes long; otherwise its first byte is a compression method tag.
pub fn decode_table(encrypted: &[u8], declared_plain_size: u64, key: u32) -> Result<Vec<u8>> {
    decrypt_and_expand(encrypted.to_vec(), declared_plain_size, 0, key)
}

/// Validate, decrypt and, if needed, decompress a HET or BET table
///
/// `raw` is the table exactly as stored, extended header included.
/// Returns the parsed extended header and the plaintext table body.
pub fn decode_ext_table(
    raw: &[u8],
    expected: &[u8; 4],
    table: &'static str,
    key: u32,
) -> Result<(ExtHeader, Vec<u8>)> {
    let header = ExtHeader::parse(raw, expected, table)?;

    log::debug!(
        "{} extended header: version={}, data_size={}, stored_size={}",
        table,
        header.version,
        header.data_size,
        raw.len()
    );

    let body = decrypt_and_expand(
        raw[EXT_HEADER_SIZE..].to_vec(),
        header.data_size as u64,
        EXT_HEADER_SIZE as u64,
        key,
    )?;

    Ok((header, body))
}

fn decrypt_and_expand(
    mut data: Vec<u8>,
    declared_plain_size: u64,
    header_size: u64,
    key: u32,
) -> Result<Vec<u8>> {
    decrypt_block(&mut data, key);

    let stored_size = data.len() as u64 + header_size;
    if declared_plain_size + header_size <= stored_size {
        return Ok(data);
    }

    log::debug!(
        "Table is compressed: {} stored bytes expand to {}",
        data.len(),
        declared_plain_size
    );

    let expected = usize::try_from(declared_plain_size)
        .map_err(|_| Error::invalid_format("declared table size does not fit in memory"))?;
    decompress(&data, expected)
}
