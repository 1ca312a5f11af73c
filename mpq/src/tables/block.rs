//! Legacy block table

use super::common::decode_table;
use crate::crypto::keys;
use crate::io::MpqRead;
use crate::{Error, Result};
use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};
use once_cell::sync::OnceCell;

bitflags! {
    /// Per-file flags shared by block and BET entries
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize))]
    pub struct FileFlags: u32 {
        /// File is compressed using PKWARE Data compression library
        const IMPLODE = 0x0000_0100;
        /// File is compressed using one or more compression methods
        const COMPRESS = 0x0000_0200;
        /// File is encrypted
        const ENCRYPTED = 0x0001_0000;
        /// The decryption key for the file is adjusted by the block position
        const FIX_KEY = 0x0002_0000;
        /// The file is a patch file
        const PATCH_FILE = 0x0010_0000;
        /// File is stored as a single unit, not split into sectors
        const SINGLE_UNIT = 0x0100_0000;
        /// File is a deletion marker
        const DELETE_MARKER = 0x0200_0000;
        /// File has checksums for each sector
        const SECTOR_CRC = 0x0400_0000;
        /// File exists in the archive
        const EXISTS = 0x8000_0000;

        const _ = !0;
    }
}

impl FileFlags {
    /// Bits that mark a file as compressed in any way
    pub const COMPRESSED_MASK: u32 = 0x0000_FF00;

    /// Check if the file is compressed
    pub fn is_compressed(self) -> bool {
        self.bits() & Self::COMPRESSED_MASK != 0
    }

    /// Check if the file is encrypted
    pub fn is_encrypted(self) -> bool {
        self.contains(Self::ENCRYPTED)
    }

    /// Check if the file is stored as a single unit
    pub fn is_single_unit(self) -> bool {
        self.contains(Self::SINGLE_UNIT)
    }

    /// Check if the file exists
    pub fn exists(self) -> bool {
        self.contains(Self::EXISTS)
    }
}

/// Block table entry (16 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BlockEntry {
    /// Offset of the beginning of the file data, relative to the beginning of the archive
    pub file_pos: u32,
    /// Compressed file size
    pub compressed_size: u32,
    /// Size of uncompressed file
    pub file_size: u32,
    /// Flags for the file
    pub flags: u32,
}

impl BlockEntry {
    /// Size of one entry on disk
    pub const SIZE: usize = 16;

    /// Typed view of the flags
    pub fn file_flags(&self) -> FileFlags {
        FileFlags::from_bits_retain(self.flags)
    }

    /// Read a block entry from raw bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::invalid_format("Block entry too small"));
        }
        Ok(Self::parse(data))
    }

    fn parse(data: &[u8]) -> Self {
        Self {
            file_pos: LittleEndian::read_u32(&data[0..4]),
            compressed_size: LittleEndian::read_u32(&data[4..8]),
            file_size: LittleEndian::read_u32(&data[8..12]),
            flags: LittleEndian::read_u32(&data[12..16]),
        }
    }
}

/// Block table
///
/// Holds the decoded table bytes; typed entries are parsed on first access.
#[derive(Debug)]
pub struct BlockTable {
    raw: Vec<u8>,
    entry_count: usize,
    entries: OnceCell<Vec<BlockEntry>>,
}

impl BlockTable {
    /// Decode a block table from its stored (encrypted) bytes
    pub fn from_stored(stored: &[u8], entry_count: u32) -> Result<Self> {
        let entry_count = entry_count as usize;
        let plain_size = entry_count * BlockEntry::SIZE;
        let raw = decode_table(stored, plain_size as u64, keys::BLOCK_TABLE)?;

        log::debug!("Block table decoded: {} entries", entry_count);

        Ok(Self {
            raw,
            entry_count,
            entries: OnceCell::new(),
        })
    }

    /// Read and decode a block table from the archive
    pub fn read<R: MpqRead>(
        reader: &mut R,
        offset: u64,
        entry_count: u32,
        stored_size: u64,
    ) -> Result<Self> {
        let stored_size = usize::try_from(stored_size)
            .map_err(|_| Error::invalid_format("block table size does not fit in memory"))?;
        let stored = reader.read_vec_at(offset, stored_size)?;
        Self::from_stored(&stored, entry_count)
    }

    /// All entries, parsed on first call
    pub fn entries(&self) -> &[BlockEntry] {
        self.entries.get_or_init(|| {
            self.raw
                .chunks_exact(BlockEntry::SIZE)
                .take(self.entry_count)
                .map(BlockEntry::parse)
                .collect()
        })
    }

    /// Get a specific entry
    pub fn get(&self, index: usize) -> Option<&BlockEntry> {
        self.entries().get(index)
    }

    /// Number of entries in the table
    pub fn size(&self) -> usize {
        self.entry_count
    }
}
