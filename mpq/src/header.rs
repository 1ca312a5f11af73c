//! MPQ header and user data parsing

use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

/// MPQ header signature: 'MPQ\x1A'
pub const MPQ_HEADER_SIGNATURE: u32 = 0x1A51504D;

/// MPQ user data signature: 'MPQ\x1B'
pub const MPQ_USERDATA_SIGNATURE: u32 = 0x1B51504D;

/// Headers are only searched for at multiples of this offset
pub const HEADER_ALIGNMENT: u64 = 0x200;

/// Default upper bound for the header search
pub const DEFAULT_SEARCH_LIMIT: u64 = 64 * 1024 * 1024;

/// MPQ format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FormatVersion {
    /// Original MPQ format (32-byte header)
    V1 = 0,
    /// The Burning Crusade format (44-byte header)
    V2 = 1,
    /// Cataclysm Beta format (68-byte header)
    V3 = 2,
    /// Cataclysm+ format (208-byte header)
    V4 = 3,
}

impl FormatVersion {
    /// Size of the header for this version
    pub fn header_size(self) -> u32 {
        match self {
            FormatVersion::V1 => 0x20,
            FormatVersion::V2 => 0x2C,
            FormatVersion::V3 => 0x44,
            FormatVersion::V4 => 0xD0,
        }
    }

    /// Map the raw header field; versions past v4 read as v4
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => FormatVersion::V1,
            1 => FormatVersion::V2,
            2 => FormatVersion::V3,
            _ => FormatVersion::V4,
        }
    }
}

/// User data block that may precede the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserData {
    /// Maximum size of the user data
    pub max_size: u32,
    /// Offset of the MPQ header, relative to this block
    pub header_offset: u32,
    /// Size of the user data header
    pub user_data_header_size: u32,
    /// Payload bytes (empty when not loaded)
    pub data: Vec<u8>,
}

/// Fields added by the v2 header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HeaderV2 {
    /// Position of the hi-block table
    pub hi_block_table_pos: u64,
    /// High 16 bits of the hash table position
    pub hash_table_pos_hi: u16,
    /// High 16 bits of the block table position
    pub block_table_pos_hi: u16,
}

/// Fields added by the v3 header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HeaderV3 {
    /// 64-bit archive size
    pub archive_size_64: u64,
    /// Position of the BET table
    pub bet_table_pos: u64,
    /// Position of the HET table
    pub het_table_pos: u64,
}

/// Fields added by the v4 header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HeaderV4 {
    /// Stored size of the hash table
    pub hash_table_size_64: u64,
    /// Stored size of the block table
    pub block_table_size_64: u64,
    /// Stored size of the hi-block table
    pub hi_block_table_size_64: u64,
    /// Stored size of the HET table
    pub het_table_size_64: u64,
    /// Stored size of the BET table
    pub bet_table_size_64: u64,
    /// Size of raw data chunk to calculate MD5
    pub raw_chunk_size: u32,
    /// MD5 of the block table
    pub md5_block_table: [u8; 16],
    /// MD5 of the hash table
    pub md5_hash_table: [u8; 16],
    /// MD5 of the hi-block table
    pub md5_hi_block_table: [u8; 16],
    /// MD5 of the BET table
    pub md5_bet_table: [u8; 16],
    /// MD5 of the HET table
    pub md5_het_table: [u8; 16],
    /// MD5 of the header
    pub md5_mpq_header: [u8; 16],
}

/// MPQ archive header
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MpqHeader {
    /// Size of the header in bytes
    pub header_size: u32,
    /// Size of the archive in bytes (32-bit)
    pub archive_size: u32,
    /// Raw format version field
    pub format_version: u16,
    /// Sector size as a power of two shift on 512
    pub block_size: u16,
    /// Low 32 bits of the hash table position
    pub hash_table_pos: u32,
    /// Low 32 bits of the block table position
    pub block_table_pos: u32,
    /// Number of hash table entries
    pub hash_table_size: u32,
    /// Number of block table entries
    pub block_table_size: u32,
    /// v2 fields
    pub v2: Option<HeaderV2>,
    /// v3 fields
    pub v3: Option<HeaderV3>,
    /// v4 fields
    pub v4: Option<HeaderV4>,
}

impl MpqHeader {
    /// Read a header starting at its signature
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let signature = reader.read_u32::<LittleEndian>()?;
        if signature != MPQ_HEADER_SIGNATURE {
            return Err(Error::BadMagic {
                table: "MPQ",
                found: signature.to_le_bytes(),
            });
        }
        Self::read_fields(reader)
    }

    fn read_fields<R: Read>(reader: &mut R) -> Result<Self> {
        let mut header = Self {
            header_size: reader.read_u32::<LittleEndian>()?,
            archive_size: reader.read_u32::<LittleEndian>()?,
            format_version: reader.read_u16::<LittleEndian>()?,
            block_size: reader.read_u16::<LittleEndian>()?,
            hash_table_pos: reader.read_u32::<LittleEndian>()?,
            block_table_pos: reader.read_u32::<LittleEndian>()?,
            hash_table_size: reader.read_u32::<LittleEndian>()?,
            block_table_size: reader.read_u32::<LittleEndian>()?,
            v2: None,
            v3: None,
            v4: None,
        };

        let version = header.version();

        if version >= FormatVersion::V2 {
            header.v2 = Some(HeaderV2 {
                hi_block_table_pos: reader.read_u64::<LittleEndian>()?,
                hash_table_pos_hi: reader.read_u16::<LittleEndian>()?,
                block_table_pos_hi: reader.read_u16::<LittleEndian>()?,
            });
        }

        if version >= FormatVersion::V3 {
            header.v3 = Some(HeaderV3 {
                archive_size_64: reader.read_u64::<LittleEndian>()?,
                bet_table_pos: reader.read_u64::<LittleEndian>()?,
                het_table_pos: reader.read_u64::<LittleEndian>()?,
            });
        }

        if version >= FormatVersion::V4 {
            let mut v4 = HeaderV4 {
                hash_table_size_64: reader.read_u64::<LittleEndian>()?,
                block_table_size_64: reader.read_u64::<LittleEndian>()?,
                hi_block_table_size_64: reader.read_u64::<LittleEndian>()?,
                het_table_size_64: reader.read_u64::<LittleEndian>()?,
                bet_table_size_64: reader.read_u64::<LittleEndian>()?,
                raw_chunk_size: reader.read_u32::<LittleEndian>()?,
                md5_block_table: [0; 16],
                md5_hash_table: [0; 16],
                md5_hi_block_table: [0; 16],
                md5_bet_table: [0; 16],
                md5_het_table: [0; 16],
                md5_mpq_header: [0; 16],
            };
            reader.read_exact(&mut v4.md5_block_table)?;
            reader.read_exact(&mut v4.md5_hash_table)?;
            reader.read_exact(&mut v4.md5_hi_block_table)?;
            reader.read_exact(&mut v4.md5_bet_table)?;
            reader.read_exact(&mut v4.md5_het_table)?;
            reader.read_exact(&mut v4.md5_mpq_header)?;
            header.v4 = Some(v4);
        }

        Ok(header)
    }

    /// Format version, saturating at v4
    pub fn version(&self) -> FormatVersion {
        FormatVersion::from_raw(self.format_version)
    }

    /// Archive size, preferring the 64-bit field
    pub fn archive_size(&self) -> u64 {
        self.v3
            .map_or(self.archive_size as u64, |v3| v3.archive_size_64)
    }

    /// Full hash table position relative to the archive start
    pub fn hash_table_pos(&self) -> u64 {
        let hi = self.v2.map_or(0, |v2| v2.hash_table_pos_hi as u64);
        (hi << 32) | self.hash_table_pos as u64
    }

    /// Full block table position relative to the archive start
    pub fn block_table_pos(&self) -> u64 {
        let hi = self.v2.map_or(0, |v2| v2.block_table_pos_hi as u64);
        (hi << 32) | self.block_table_pos as u64
    }

    /// Hi-block table position, zero when absent
    pub fn hi_block_table_pos(&self) -> u64 {
        self.v2.map_or(0, |v2| v2.hi_block_table_pos)
    }

    /// HET table position, zero when absent
    pub fn het_table_pos(&self) -> u64 {
        self.v3.map_or(0, |v3| v3.het_table_pos)
    }

    /// BET table position, zero when absent
    pub fn bet_table_pos(&self) -> u64 {
        self.v3.map_or(0, |v3| v3.bet_table_pos)
    }

    /// Sector size in bytes
    pub fn sector_size(&self) -> u64 {
        512u64 << self.block_size.min(31)
    }
}

/// Locate the MPQ header
///
/// Every 512-byte aligned offset below `limit` is checked for a signature.
/// User data blocks are parsed and scanning continues past them; the
/// payload is kept only when `load_user_data` is set.
/// Returns the archive offset, the last user data seen and the header.
pub fn find_header<R: Read + Seek>(
    reader: &mut R,
    limit: u64,
    load_user_data: bool,
) -> Result<(u64, Option<UserData>, MpqHeader)> {
    let stream_len = reader.seek(SeekFrom::End(0))?;
    let end = stream_len.min(limit);
    let mut user_data = None;
    let mut offset = 0u64;

    while offset + 4 <= end {
        reader.seek(SeekFrom::Start(offset))?;
        let signature = reader.read_u32::<LittleEndian>()?;

        match signature {
            MPQ_HEADER_SIGNATURE => {
                log::debug!("MPQ header found at offset 0x{:X}", offset);
                let header = MpqHeader::read_fields(reader)?;
                return Ok((offset, user_data, header));
            }
            MPQ_USERDATA_SIGNATURE => {
                let max_size = reader.read_u32::<LittleEndian>()?;
                let header_offset = reader.read_u32::<LittleEndian>()?;
                let user_data_header_size = reader.read_u32::<LittleEndian>()?;

                let mut data = Vec::new();
                if load_user_data {
                    let data_start = offset + 16;
                    if max_size as u64 > stream_len.saturating_sub(data_start) {
                        return Err(Error::invalid_format(format!(
                            "User data size {} exceeds the stream at offset 0x{:X}",
                            max_size, offset
                        )));
                    }
                    data = vec![0u8; max_size as usize];
                    reader.read_exact(&mut data)?;
                }

                log::debug!(
                    "User data at offset 0x{:X}: size={}, header_offset=0x{:X}",
                    offset,
                    max_size,
                    header_offset
                );

                user_data = Some(UserData {
                    max_size,
                    header_offset,
                    user_data_header_size,
                    data,
                });
            }
            _ => {}
        }

        offset += HEADER_ALIGNMENT;
    }

    Err(Error::invalid_format("No MPQ header found"))
}
