//! HET (Hash Extended Table) implementation for MPQ v3+ archives

use super::common::{decode_ext_table, ExtHeader, MAX_REGION_PADDING};
use crate::bits::BitCursor;
use crate::crypto::keys;
use crate::hash::jenkins_hash;
use crate::io::MpqRead;
use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use once_cell::sync::OnceCell;
use std::io::Cursor;

/// HET table signature
pub const HET_SIGNATURE: &[u8; 4] = b"HET\x1A";

/// HET header structure, following the extended header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HetHeader {
    /// Size of the entire hash table including header
    pub table_size: u32,
    /// Number of used entries
    pub entry_count: u32,
    /// Number of slots in the hash array
    pub hash_table_size: u32,
    /// Effective size of the name hash in bits
    pub hash_entry_size: u32,
    /// Total size of file index in bits
    pub index_size_total: u32,
    /// Extra bits in the file index
    pub index_size_extra: u32,
    /// Effective size of the file index in bits
    pub index_size: u32,
    /// Size of the BET index subtable in bytes
    pub block_table_size: u32,
}

impl HetHeader {
    /// Size of the numeric header in bytes
    pub const SIZE: usize = 32;

    fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::invalid_format("HET header too small"));
        }

        let mut cursor = Cursor::new(data);
        Ok(Self {
            table_size: cursor.read_u32::<LittleEndian>()?,
            entry_count: cursor.read_u32::<LittleEndian>()?,
            hash_table_size: cursor.read_u32::<LittleEndian>()?,
            hash_entry_size: cursor.read_u32::<LittleEndian>()?,
            index_size_total: cursor.read_u32::<LittleEndian>()?,
            index_size_extra: cursor.read_u32::<LittleEndian>()?,
            index_size: cursor.read_u32::<LittleEndian>()?,
            block_table_size: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// The parts of a name hash used to probe a HET table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HetHash {
    /// Masked Jenkins hash with the top bit forced on
    pub full: u64,
    /// The byte stored in the slot array
    pub top_byte: u8,
    /// The part stored in the BET hash array
    pub bet_hash: u64,
}

/// HET (Hash Entry Table) for v3+ archives
#[derive(Debug)]
pub struct HetTable {
    /// Extended header
    pub ext: ExtHeader,
    /// Table header data
    pub header: HetHeader,
    and_mask: u64,
    or_mask: u64,
    slot_count: usize,
    index_bits: u32,
    hashes: Vec<u8>,
    index_data: Vec<u8>,
    indexes: OnceCell<Vec<u64>>,
}

impl HetTable {
    /// Decode a HET table from its stored bytes, extended header included
    pub fn from_stored(stored: &[u8]) -> Result<Self> {
        let (ext, data) = decode_ext_table(stored, HET_SIGNATURE, "HET", keys::HASH_TABLE)?;
        let header = HetHeader::parse(&data)?;

        if !(8..=64).contains(&header.hash_entry_size) {
            return Err(Error::invalid_format(format!(
                "HET hash entry size {} out of range",
                header.hash_entry_size
            )));
        }

        let and_mask = if header.hash_entry_size == 64 {
            u64::MAX
        } else {
            (1u64 << header.hash_entry_size) - 1
        };
        let or_mask = 1u64 << (header.hash_entry_size - 1);

        let slot_count = match header.hash_table_size {
            0 => header.entry_count as u64 * 4 / 3,
            n => n as u64,
        };
        let index_bits = u32::BITS - header.entry_count.leading_zeros();
        let index_len = (slot_count * index_bits as u64).div_ceil(8);

        let body = &data[HetHeader::SIZE..];
        if slot_count + index_len > body.len() as u64 + MAX_REGION_PADDING {
            return Err(Error::invalid_format(format!(
                "HET table declares {} slots but holds only {} bytes",
                slot_count,
                body.len()
            )));
        }
        let (slot_count, index_len) = (slot_count as usize, index_len as usize);

        // Missing index bytes stay all-ones, which reads back as "no entry"
        let hashes = copy_padded(body, 0, slot_count, 0x00);
        let index_data = copy_padded(body, slot_count, index_len, 0xFF);

        log::debug!(
            "HET table: entries={}, slots={}, hash_entry_size={}, index_bits={}",
            header.entry_count,
            slot_count,
            header.hash_entry_size,
            index_bits
        );

        Ok(Self {
            ext,
            header,
            and_mask,
            or_mask,
            slot_count,
            index_bits,
            hashes,
            index_data,
            indexes: OnceCell::new(),
        })
    }

    /// Read and decode a HET table from the archive
    pub fn read<R: MpqRead>(reader: &mut R, offset: u64, stored_size: u64) -> Result<Self> {
        let stored_size = usize::try_from(stored_size)
            .map_err(|_| Error::invalid_format("HET table size does not fit in memory"))?;
        let stored = reader.read_vec_at(offset, stored_size)?;
        Self::from_stored(&stored)
    }

    /// Mask applied to the Jenkins hash
    pub fn and_mask(&self) -> u64 {
        self.and_mask
    }

    /// Bit forced on in every stored hash
    pub fn or_mask(&self) -> u64 {
        self.or_mask
    }

    /// Number of slots in the hash array
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Width of one packed BET index in bits
    pub fn index_bits(&self) -> u32 {
        self.index_bits
    }

    /// One top-hash byte per slot; zero marks a free slot
    pub fn hashes(&self) -> &[u8] {
        &self.hashes
    }

    /// Raw packed index bytes
    pub fn index_data(&self) -> &[u8] {
        &self.index_data
    }

    /// The BET index stored in each slot, unpacked on first call
    pub fn indexes(&self) -> Result<&[u64]> {
        self.indexes
            .get_or_try_init(|| {
                let mut cursor = BitCursor::new(&self.index_data);
                (0..self.slot_count)
                    .map(|_| cursor.next(self.index_bits))
                    .collect()
            })
            .map(Vec::as_slice)
    }

    /// Split the name hash of `filename` into its probe parts
    pub fn hash_parts(&self, filename: &str) -> HetHash {
        let full = (jenkins_hash(filename) & self.and_mask) | self.or_mask;
        HetHash {
            full,
            top_byte: (full >> (self.header.hash_entry_size - 8)) as u8,
            bet_hash: full & (self.and_mask >> 8),
        }
    }
}

/// Copy `len` bytes starting at `start`, padding whatever is missing
fn copy_padded(data: &[u8], start: usize, len: usize, fill: u8) -> Vec<u8> {
    let mut out = vec![fill; len];
    if start < data.len() {
        let available = (data.len() - start).min(len);
        out[..available].copy_from_slice(&data[start..start + available]);
    }
    out
}
