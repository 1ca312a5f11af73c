//! Legacy hash table

use super::common::decode_table;
use crate::crypto::keys;
use crate::hash::{hash_string, hash_type};
use crate::io::MpqRead;
use crate::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use once_cell::sync::OnceCell;

/// Hash table entry (16 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HashEntry {
    /// The hash of the full file name (part A)
    pub name_1: u32,
    /// The hash of the full file name (part B)
    pub name_2: u32,
    /// The language of the file (Windows LANGID)
    pub locale: u16,
    /// The platform the file is used for
    pub platform: u16,
    /// Block table index or special value
    pub block_index: u32,
}

impl HashEntry {
    /// Size of one entry on disk
    pub const SIZE: usize = 16;
    /// Value indicating the hash entry has never been used
    pub const EMPTY_NEVER_USED: u32 = 0xFFFFFFFF;
    /// Value indicating the hash entry was deleted
    pub const EMPTY_DELETED: u32 = 0xFFFFFFFE;

    /// Check if this entry has never been used
    pub fn is_empty(&self) -> bool {
        self.block_index == Self::EMPTY_NEVER_USED
    }

    /// Check if this entry was deleted
    pub fn is_deleted(&self) -> bool {
        self.block_index == Self::EMPTY_DELETED
    }

    /// Check if this entry points into the block table
    pub fn is_valid(&self) -> bool {
        self.block_index < Self::EMPTY_DELETED
    }

    /// Read a hash entry from raw bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::invalid_format("Hash entry too small"));
        }
        Ok(Self::parse(data))
    }

    fn parse(data: &[u8]) -> Self {
        Self {
            name_1: LittleEndian::read_u32(&data[0..4]),
            name_2: LittleEndian::read_u32(&data[4..8]),
            locale: LittleEndian::read_u16(&data[8..10]),
            platform: LittleEndian::read_u16(&data[10..12]),
            block_index: LittleEndian::read_u32(&data[12..16]),
        }
    }
}

/// Hash table
#[derive(Debug)]
pub struct HashTable {
    raw: Vec<u8>,
    entry_count: usize,
    entries: OnceCell<Vec<HashEntry>>,
}

impl HashTable {
    /// Decode a hash table from its stored (encrypted) bytes
    pub fn from_stored(stored: &[u8], entry_count: u32) -> Result<Self> {
        let entry_count = entry_count as usize;
        let plain_size = entry_count * HashEntry::SIZE;
        let raw = decode_table(stored, plain_size as u64, keys::HASH_TABLE)?;

        log::debug!("Hash table decoded: {} entries", entry_count);

        Ok(Self {
            raw,
            entry_count,
            entries: OnceCell::new(),
        })
    }

    /// Read and decode a hash table from the archive
    pub fn read<R: MpqRead>(
        reader: &mut R,
        offset: u64,
        entry_count: u32,
        stored_size: u64,
    ) -> Result<Self> {
        let stored_size = usize::try_from(stored_size)
            .map_err(|_| Error::invalid_format("hash table size does not fit in memory"))?;
        let stored = reader.read_vec_at(offset, stored_size)?;
        Self::from_stored(&stored, entry_count)
    }

    /// All entries, parsed on first call
    pub fn entries(&self) -> &[HashEntry] {
        self.entries.get_or_init(|| {
            self.raw
                .chunks_exact(HashEntry::SIZE)
                .take(self.entry_count)
                .map(HashEntry::parse)
                .collect()
        })
    }

    /// Get a specific entry
    pub fn get(&self, index: usize) -> Option<&HashEntry> {
        self.entries().get(index)
    }

    /// Number of slots in the table
    pub fn size(&self) -> usize {
        self.entry_count
    }

    /// Find the entry for `filename` by linear probing
    ///
    /// Probing starts at the slot picked by the table-offset hash and stops
    /// at a never-used slot or at the end of the table; with `wrap` it
    /// continues from slot 0 up to the starting slot. Every slot in the
    /// chain is examined and the last one whose name hashes match and
    /// whose block index is below `block_count` is returned.
    pub fn find(&self, filename: &str, block_count: usize, wrap: bool) -> Option<&HashEntry> {
        let entries = self.entries();
        if entries.is_empty() {
            return None;
        }

        let start = hash_string(filename, hash_type::TABLE_OFFSET) as usize % entries.len();
        let name_a = hash_string(filename, hash_type::NAME_A);
        let name_b = hash_string(filename, hash_type::NAME_B);

        log::trace!(
            "Hash lookup '{}': start={}, name_a=0x{:08X}, name_b=0x{:08X}",
            filename,
            start,
            name_a,
            name_b
        );

        let mut found = None;
        for index in probe_order(start, entries.len(), wrap) {
            let entry = &entries[index];
            if entry.is_empty() {
                break;
            }

            if entry.name_1 == name_a && entry.name_2 == name_b {
                if (entry.block_index as usize) < block_count {
                    found = Some(entry);
                } else {
                    log::trace!(
                        "Skipping hash slot {} with block index 0x{:08X}",
                        index,
                        entry.block_index
                    );
                }
            }
        }

        found
    }
}

/// Slot indices visited by a forward probe from `start`
///
/// Without `wrap` the probe ends at the last slot; with it the probe
/// continues from slot 0 and visits every slot exactly once.
pub(crate) fn probe_order(start: usize, len: usize, wrap: bool) -> impl Iterator<Item = usize> {
    let wrapped = if wrap { 0..start } else { 0..0 };
    (start..len).chain(wrapped)
}
