//! Filename resolution over whichever table pair an archive carries

use super::bet::{BetEntry, BetTable};
use super::block::{BlockEntry, BlockTable, FileFlags};
use super::hash::{probe_order, HashEntry, HashTable};
use super::het::HetTable;
use super::hi_block::HiBlockTable;
use crate::{Error, Result};

/// A resolved file
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FileRecord {
    /// The name that was looked up
    pub name: String,
    /// Locale code (always neutral for HET/BET lookups)
    pub locale: u16,
    /// Platform code
    pub platform: u16,
    /// Uncompressed size
    pub file_size: u64,
    /// Stored size
    pub compressed_size: u64,
    /// Byte position relative to the archive start
    pub position: u64,
    /// File flags
    pub flags: FileFlags,
    /// Index into the block or BET table
    pub block_index: usize,
}

impl FileRecord {
    fn from_bet(name: &str, index: usize, entry: &BetEntry) -> Self {
        Self {
            name: name.to_string(),
            locale: 0,
            platform: 0,
            file_size: entry.file_size,
            compressed_size: entry.compressed_size,
            position: entry.file_pos,
            flags: FileFlags::from_bits_retain(entry.flags),
            block_index: index,
        }
    }

    fn from_block(
        name: &str,
        hash: &HashEntry,
        block: &BlockEntry,
        hi_block: Option<&HiBlockTable>,
    ) -> Self {
        let index = hash.block_index as usize;
        let position = match hi_block {
            Some(hi) => hi.file_pos(index, block.file_pos),
            None => block.file_pos as u64,
        };
        Self {
            name: name.to_string(),
            locale: hash.locale,
            platform: hash.platform,
            file_size: block.file_size as u64,
            compressed_size: block.compressed_size as u64,
            position,
            flags: block.file_flags(),
            block_index: index,
        }
    }
}

/// Which table pair resolves names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum LookupStrategy {
    /// HET + BET (v3+)
    Modern,
    /// Hash + block tables
    Legacy,
}

impl LookupStrategy {
    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            LookupStrategy::Modern => "HET/BET",
            LookupStrategy::Legacy => "hash/block",
        }
    }
}

/// The decoded tables of one archive
///
/// The strategy is fixed when the tables are assembled: HET and BET win
/// when both are present, otherwise the hash and block tables are used.
#[derive(Debug, Default)]
pub struct ArchiveTables {
    het: Option<HetTable>,
    bet: Option<BetTable>,
    hash: Option<HashTable>,
    block: Option<BlockTable>,
    hi_block: Option<HiBlockTable>,
    strategy: Option<LookupStrategy>,
    wrap_probes: bool,
}

impl ArchiveTables {
    /// Assemble tables and pick the lookup strategy
    pub fn new(
        het: Option<HetTable>,
        bet: Option<BetTable>,
        hash: Option<HashTable>,
        block: Option<BlockTable>,
        hi_block: Option<HiBlockTable>,
    ) -> Self {
        let strategy = if het.is_some() && bet.is_some() {
            Some(LookupStrategy::Modern)
        } else if hash.is_some() && block.is_some() {
            Some(LookupStrategy::Legacy)
        } else {
            None
        };

        log::debug!(
            "Lookup strategy: {}",
            strategy.map_or("none", LookupStrategy::name)
        );

        Self {
            het,
            bet,
            hash,
            block,
            hi_block,
            strategy,
            wrap_probes: false,
        }
    }

    /// Continue probing from slot 0 when a chain reaches the end of the table
    pub fn with_wrap_probes(mut self, wrap: bool) -> Self {
        self.wrap_probes = wrap;
        self
    }

    /// The strategy in use, if any table pair is present
    pub fn strategy(&self) -> Option<LookupStrategy> {
        self.strategy
    }

    /// HET table, if present
    pub fn het(&self) -> Option<&HetTable> {
        self.het.as_ref()
    }

    /// BET table, if present
    pub fn bet(&self) -> Option<&BetTable> {
        self.bet.as_ref()
    }

    /// Hash table, if present
    pub fn hash_table(&self) -> Option<&HashTable> {
        self.hash.as_ref()
    }

    /// Block table, if present
    pub fn block_table(&self) -> Option<&BlockTable> {
        self.block.as_ref()
    }

    /// Hi-block table, if present
    pub fn hi_block_table(&self) -> Option<&HiBlockTable> {
        self.hi_block.as_ref()
    }

    /// Decoded hash table entries
    pub fn hash_entries(&self) -> Result<&[HashEntry]> {
        Ok(self.hash.as_ref().ok_or(Error::NoTablesAvailable)?.entries())
    }

    /// Decoded block table entries
    pub fn block_entries(&self) -> Result<&[BlockEntry]> {
        Ok(self.block.as_ref().ok_or(Error::NoTablesAvailable)?.entries())
    }

    /// Decoded HET slot indexes
    pub fn het_indexes(&self) -> Result<&[u64]> {
        self.het.as_ref().ok_or(Error::NoTablesAvailable)?.indexes()
    }

    /// Decoded BET entries
    pub fn bet_entries(&self) -> Result<&[BetEntry]> {
        self.bet.as_ref().ok_or(Error::NoTablesAvailable)?.entries()
    }

    /// Resolve `name` to whatever record the tables hold for it
    ///
    /// Records without the exists flag are returned as-is; use
    /// [`lookup`](Self::lookup) to have them reported as deleted.
    pub fn find_file(&self, name: &str) -> Result<FileRecord> {
        match (self.strategy, &self.het, &self.bet, &self.hash, &self.block) {
            (Some(LookupStrategy::Modern), Some(het), Some(bet), _, _) => {
                self.find_modern(het, bet, name)
            }
            (Some(LookupStrategy::Legacy), _, _, Some(hash), Some(block)) => {
                self.find_legacy(hash, block, name)
            }
            _ => Err(Error::NoTablesAvailable),
        }
    }

    /// Resolve `name`, rejecting records that no longer exist
    pub fn lookup(&self, name: &str) -> Result<FileRecord> {
        let record = self.find_file(name)?;
        if !record.flags.exists() {
            return Err(Error::FileDeleted(name.to_string()));
        }
        Ok(record)
    }

    fn find_modern(&self, het: &HetTable, bet: &BetTable, name: &str) -> Result<FileRecord> {
        let hashes = het.hashes();
        if hashes.is_empty() {
            return Err(Error::FileNotFound(name.to_string()));
        }

        let indexes = het.indexes()?;
        let entries = bet.entries()?;
        let parts = het.hash_parts(name);
        let start = (parts.full % hashes.len() as u64) as usize;

        log::trace!(
            "HET lookup '{}': start={}, top=0x{:02X}, bet_hash=0x{:016X}",
            name,
            start,
            parts.top_byte,
            parts.bet_hash
        );

        for slot in probe_order(start, hashes.len(), self.wrap_probes) {
            match hashes[slot] {
                0 => break,
                byte if byte != parts.top_byte => continue,
                _ => {}
            }

            let index = indexes[slot];
            let Some(entry) = usize::try_from(index).ok().and_then(|i| entries.get(i)) else {
                log::warn!(
                    "HET slot {} points at BET entry {} of {}",
                    slot,
                    index,
                    entries.len()
                );
                continue;
            };

            if entry.name_hash2 == parts.bet_hash {
                return Ok(FileRecord::from_bet(name, index as usize, entry));
            }
        }

        Err(Error::FileNotFound(name.to_string()))
    }

    fn find_legacy(&self, hash: &HashTable, block: &BlockTable, name: &str) -> Result<FileRecord> {
        let entry = hash
            .find(name, block.size(), self.wrap_probes)
            .ok_or_else(|| Error::FileNotFound(name.to_string()))?;
        let block_entry = block
            .get(entry.block_index as usize)
            .ok_or_else(|| Error::FileNotFound(name.to_string()))?;

        Ok(FileRecord::from_block(
            name,
            entry,
            block_entry,
            self.hi_block.as_ref(),
        ))
    }
}
