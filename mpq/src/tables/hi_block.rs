//! Hi-block table for archives larger than 4 GiB (v2+)

use crate::io::MpqRead;
use crate::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Upper 16 bits of each block's file position, stored unencrypted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiBlockTable {
    entries: Vec<u16>,
}

impl HiBlockTable {
    /// Parse the table from raw bytes
    pub fn from_bytes(data: &[u8], entry_count: u32) -> Result<Self> {
        let needed = entry_count as usize * 2;
        if data.len() < needed {
            return Err(Error::invalid_format(format!(
                "hi-block table needs {} bytes, got {}",
                needed,
                data.len()
            )));
        }

        let entries = data[..needed]
            .chunks_exact(2)
            .map(LittleEndian::read_u16)
            .collect();
        Ok(Self { entries })
    }

    /// Read the hi-block table
    pub fn read<R: MpqRead>(reader: &mut R, offset: u64, entry_count: u32) -> Result<Self> {
        let data = reader.read_vec_at(offset, entry_count as usize * 2)?;
        Self::from_bytes(&data, entry_count)
    }

    /// Get a hi-block entry
    pub fn get(&self, index: usize) -> Option<u16> {
        self.entries.get(index).copied()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Combine a block's low position with its hi-block word
    pub fn file_pos(&self, index: usize, low: u32) -> u64 {
        ((self.get(index).unwrap_or(0) as u64) << 32) | low as u64
    }
}
