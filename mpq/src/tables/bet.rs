//! BET (Block Extended Table) implementation for MPQ v3+ archives

use super::common::{decode_ext_table, ExtHeader, MAX_REGION_PADDING};
use crate::bits::BitCursor;
use crate::crypto::keys;
use crate::io::MpqRead;
use crate::{Error, Result};
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use once_cell::sync::OnceCell;
use std::io::Cursor;

/// BET table signature
pub const BET_SIGNATURE: &[u8; 4] = b"BET\x1A";

/// BET header structure, following the extended header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BetHeader {
    /// Size of the entire block table including header
    pub table_size: u32,
    /// Number of entries in the BET table
    pub entry_count: u32,
    /// Unknown, observed as 0x10
    pub unknown_08: u32,
    /// Size of one table entry in bits
    pub table_entry_size: u32,
    /// Bit index of the file position
    pub bit_index_file_pos: u32,
    /// Bit index of the file size
    pub bit_index_file_size: u32,
    /// Bit index of the compressed size
    pub bit_index_cmp_size: u32,
    /// Bit index of the flag index
    pub bit_index_flag_index: u32,
    /// Bit index of the unknown field
    pub bit_index_unknown: u32,
    /// Bit size of file position
    pub bit_count_file_pos: u32,
    /// Bit size of file size
    pub bit_count_file_size: u32,
    /// Bit size of compressed file size
    pub bit_count_cmp_size: u32,
    /// Bit size of flags index
    pub bit_count_flag_index: u32,
    /// Bit size of unknown field
    pub bit_count_unknown: u32,
    /// Total size of the BET hash in bits
    pub hash_size_total: u32,
    /// Extra bits in the BET hash
    pub hash_size_extra: u32,
    /// Effective size of BET hash in bits
    pub hash_size: u32,
    /// Size of BET hashes array in bytes
    pub hash_array_size: u32,
    /// Number of flags in the following array
    pub flag_count: u32,
}

impl BetHeader {
    /// Size of the numeric header in bytes
    pub const SIZE: usize = 76;

    fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::invalid_format("BET header too small"));
        }

        let mut cursor = Cursor::new(data);
        let mut next = || cursor.read_u32::<LittleEndian>();
        Ok(Self {
            table_size: next()?,
            entry_count: next()?,
            unknown_08: next()?,
            table_entry_size: next()?,
            bit_index_file_pos: next()?,
            bit_index_file_size: next()?,
            bit_index_cmp_size: next()?,
            bit_index_flag_index: next()?,
            bit_index_unknown: next()?,
            bit_count_file_pos: next()?,
            bit_count_file_size: next()?,
            bit_count_cmp_size: next()?,
            bit_count_flag_index: next()?,
            bit_count_unknown: next()?,
            hash_size_total: next()?,
            hash_size_extra: next()?,
            hash_size: next()?,
            hash_array_size: next()?,
            flag_count: next()?,
        })
    }

    fn field_indexes(&self) -> [u32; 5] {
        [
            self.bit_index_file_pos,
            self.bit_index_file_size,
            self.bit_index_cmp_size,
            self.bit_index_flag_index,
            self.bit_index_unknown,
        ]
    }

    /// Check that the fields are packed back to back in the order they
    /// are read, and fit inside one table entry
    fn check_layout(&self) -> Result<()> {
        let mut offset = 0u64;
        for (index, width) in self.field_indexes().into_iter().zip(self.field_widths()) {
            if width != 0 && index as u64 != offset {
                return Err(Error::invalid_format(format!(
                    "BET field at bit {} expected at bit {}",
                    index, offset
                )));
            }
            offset += width as u64;
        }

        if offset > self.table_entry_size as u64 {
            return Err(Error::invalid_format(format!(
                "BET fields use {} bits but entries are {} bits",
                offset, self.table_entry_size
            )));
        }
        Ok(())
    }

    fn field_widths(&self) -> [u32; 5] {
        [
            self.bit_count_file_pos,
            self.bit_count_file_size,
            self.bit_count_cmp_size,
            self.bit_count_flag_index,
            self.bit_count_unknown,
        ]
    }
}

/// One decoded BET record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BetEntry {
    /// Lower part of the name hash, matched against the HET probe
    pub name_hash2: u64,
    /// File position relative to the archive start
    pub file_pos: u64,
    /// Uncompressed size
    pub file_size: u64,
    /// Stored size
    pub compressed_size: u64,
    /// Index into the flag array
    pub flag_index: u32,
    /// Flags resolved through `flag_index`
    pub flags: u32,
}

/// BET (Block Entry Table) for v3+ archives
#[derive(Debug)]
pub struct BetTable {
    /// Extended header
    pub ext: ExtHeader,
    /// Table header data
    pub header: BetHeader,
    /// Flag values referenced by entries
    pub flags: Vec<u32>,
    table_entries: Vec<u8>,
    hashes: Vec<u8>,
    entries: OnceCell<Vec<BetEntry>>,
}

impl BetTable {
    /// Decode a BET table from its stored bytes, extended header included
    pub fn from_stored(stored: &[u8]) -> Result<Self> {
        let (ext, data) = decode_ext_table(stored, BET_SIGNATURE, "BET", keys::BLOCK_TABLE)?;
        let header = BetHeader::parse(&data)?;

        if let Some(width) = header
            .field_widths()
            .into_iter()
            .chain([header.hash_size_total])
            .find(|&w| w > 64)
        {
            return Err(Error::invalid_format(format!(
                "BET field width {} exceeds 64 bits",
                width
            )));
        }
        header.check_layout()?;

        let flags_end = (header.flag_count as usize)
            .checked_mul(4)
            .and_then(|n| n.checked_add(BetHeader::SIZE))
            .filter(|&end| end <= data.len())
            .ok_or_else(|| Error::invalid_format("BET flag array truncated"))?;
        let flags: Vec<u32> = data[BetHeader::SIZE..flags_end]
            .chunks_exact(4)
            .map(LittleEndian::read_u32)
            .collect();

        let entry_count = header.entry_count as u64;
        let entries_len = packed_len(header.table_entry_size, entry_count)?;
        let hashes_len = packed_len(header.hash_size_total, entry_count)?;

        let rest = &data[flags_end..];
        let available = rest.len() as u64 + MAX_REGION_PADDING;
        if entries_len as u64 + hashes_len as u64 > available || entry_count > available * 8 {
            return Err(Error::invalid_format(format!(
                "BET table declares {} entries but holds only {} bytes",
                entry_count,
                rest.len()
            )));
        }

        let table_entries = copy_zero_padded(rest, 0, entries_len);
        let hashes = copy_zero_padded(rest, entries_len, hashes_len);

        log::debug!(
            "BET table: entries={}, entry_bits={}, hash_bits={}, flags={}",
            header.entry_count,
            header.table_entry_size,
            header.hash_size_total,
            header.flag_count
        );

        Ok(Self {
            ext,
            header,
            flags,
            table_entries,
            hashes,
            entries: OnceCell::new(),
        })
    }

    /// Read and decode a BET table from the archive
    pub fn read<R: MpqRead>(reader: &mut R, offset: u64, stored_size: u64) -> Result<Self> {
        let stored_size = usize::try_from(stored_size)
            .map_err(|_| Error::invalid_format("BET table size does not fit in memory"))?;
        let stored = reader.read_vec_at(offset, stored_size)?;
        Self::from_stored(&stored)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.header.entry_count as usize
    }

    /// Check if the table holds no entries
    pub fn is_empty(&self) -> bool {
        self.header.entry_count == 0
    }

    /// All entries, unpacked on first call
    pub fn entries(&self) -> Result<&[BetEntry]> {
        self.entries
            .get_or_try_init(|| self.unpack())
            .map(Vec::as_slice)
    }

    /// Get a specific entry
    pub fn get(&self, index: usize) -> Result<Option<&BetEntry>> {
        Ok(self.entries()?.get(index))
    }

    fn unpack(&self) -> Result<Vec<BetEntry>> {
        let header = &self.header;
        let used: u64 = header.field_widths().iter().map(|&w| w as u64).sum();
        let padding = (header.table_entry_size as u64).saturating_sub(used);

        let mut records = BitCursor::new(&self.table_entries);
        let mut hashes = BitCursor::new(&self.hashes);
        let mut entries = Vec::with_capacity(self.len());

        for index in 0..self.len() {
            let file_pos = records.next(header.bit_count_file_pos)?;
            let file_size = records.next(header.bit_count_file_size)?;
            let compressed_size = records.next(header.bit_count_cmp_size)?;
            let flag_index = records.next(header.bit_count_flag_index)? as u32;
            records.next(header.bit_count_unknown)?;
            records.skip(padding)?;

            let name_hash2 = hashes.next(header.hash_size_total)?;

            let flags = match self.flags.get(flag_index as usize) {
                Some(&flags) => flags,
                None if self.flags.is_empty() => 0,
                None => {
                    return Err(Error::invalid_format(format!(
                        "BET entry {} has flag index {} but only {} flags",
                        index,
                        flag_index,
                        self.flags.len()
                    )))
                }
            };

            entries.push(BetEntry {
                name_hash2,
                file_pos,
                file_size,
                compressed_size,
                flag_index,
                flags,
            });
        }

        Ok(entries)
    }
}

fn packed_len(bits_per_entry: u32, entry_count: u64) -> Result<usize> {
    let bytes = (bits_per_entry as u64 * entry_count).div_ceil(8);
    usize::try_from(bytes).map_err(|_| Error::invalid_format("BET region does not fit in memory"))
}

fn copy_zero_padded(data: &[u8], start: usize, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    if start < data.len() {
        let available = (data.len() - start).min(len);
        out[..available].copy_from_slice(&data[start..start + available]);
    }
    out
}
