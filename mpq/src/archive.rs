//! MPQ archive handling

use crate::{
    compression,
    crypto::DecryptReader,
    hash::{hash_string, hash_type},
    header::{self, MpqHeader, UserData},
    special_files,
    tables::{
        ArchiveTables, BetTable, BlockEntry, BlockTable, FileFlags, FileRecord, HashEntry,
        HashTable, HetTable, HiBlockTable,
    },
    Error, Result,
};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Options for opening MPQ archives
#[derive(Debug, Clone)]
pub struct OpenOptions {
    wrap_probes: bool,
    header_search_limit: u64,
    load_user_data: bool,
}

impl OpenOptions {
    /// Create new default options
    pub fn new() -> Self {
        Self {
            wrap_probes: false,
            header_search_limit: header::DEFAULT_SEARCH_LIMIT,
            load_user_data: true,
        }
    }

    /// Let lookups wrap around to slot 0 when a probe chain reaches the end
    /// of the table
    pub fn wrap_probes(mut self, wrap: bool) -> Self {
        self.wrap_probes = wrap;
        self
    }

    /// Stop looking for the MPQ header past this offset
    pub fn header_search_limit(mut self, limit: u64) -> Self {
        self.header_search_limit = limit;
        self
    }

    /// Keep the user data payload in memory
    pub fn load_user_data(mut self, load: bool) -> Self {
        self.load_user_data = load;
        self
    }

    /// Open an archive from a file path
    pub fn open<P: AsRef<Path>>(self, path: P) -> Result<Archive> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mut archive = self.open_reader(BufReader::new(file))?;
        archive.path = Some(path);
        Ok(archive)
    }

    /// Open an archive from any seekable stream
    pub fn open_reader<R: Read + Seek>(self, mut reader: R) -> Result<Archive<R>> {
        let (archive_offset, user_data, header) =
            header::find_header(&mut reader, self.header_search_limit, self.load_user_data)?;

        log::debug!(
            "Opening {:?} archive at offset 0x{:X}",
            header.version(),
            archive_offset
        );

        let stream_len = reader.seek(SeekFrom::End(0))?;
        let tables = load_tables(&mut reader, archive_offset, stream_len, &header)?
            .with_wrap_probes(self.wrap_probes);

        Ok(Archive {
            path: None,
            reader,
            archive_offset,
            user_data,
            header,
            tables,
        })
    }
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// An MPQ archive
#[derive(Debug)]
pub struct Archive<R = BufReader<File>> {
    /// Path to the archive file, when opened from disk
    path: Option<PathBuf>,
    /// Archive stream
    reader: R,
    /// Offset where the MPQ data starts in the stream
    archive_offset: u64,
    /// Optional user data block
    user_data: Option<UserData>,
    /// MPQ header
    header: MpqHeader,
    /// Decoded file tables
    tables: ArchiveTables,
}

impl Archive {
    /// Open an existing MPQ archive with default options
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        OpenOptions::new().open(path)
    }
}

impl<R: Read + Seek> Archive<R> {
    /// Open an archive from a stream with default options
    pub fn open_reader(reader: R) -> Result<Self> {
        OpenOptions::new().open_reader(reader)
    }

    /// Get the archive header
    pub fn header(&self) -> &MpqHeader {
        &self.header
    }

    /// Get the user data block if present
    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }

    /// Get the archive offset in the stream
    pub fn archive_offset(&self) -> u64 {
        self.archive_offset
    }

    /// Get the path to the archive, if it was opened from disk
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Decoded file tables
    pub fn tables(&self) -> &ArchiveTables {
        &self.tables
    }

    /// Look up a file, rejecting deleted records
    pub fn file_info(&self, name: &str) -> Result<FileRecord> {
        self.tables.lookup(name)
    }

    /// Open a file for reading
    pub fn open_file(&mut self, name: &str) -> Result<Box<dyn Read + '_>> {
        let record = self.tables.find_file(name)?;
        self.open_record(&record)
    }

    /// Read a whole file into memory
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let record = self.tables.find_file(name)?;
        self.read_record(&record)
    }

    /// Read the file described by `record`
    pub fn read_record(&mut self, record: &FileRecord) -> Result<Vec<u8>> {
        let mut reader = self.open_record(record)?;
        let mut data = Vec::with_capacity(record.file_size.min(1 << 24) as usize);
        reader.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Open the file described by `record`
    ///
    /// Only single-unit files can be read. Encrypted bodies are decrypted
    /// while streaming; compressed bodies are read fully and expanded.
    pub fn open_record(&mut self, record: &FileRecord) -> Result<Box<dyn Read + '_>> {
        let name = &record.name;
        if record.position == 0 || record.file_size == 0 || record.compressed_size == 0 {
            return Err(Error::FileEmpty(name.clone()));
        }

        let flags = record.flags;
        if !flags.exists() {
            return Err(Error::FileDeleted(name.clone()));
        }
        if !flags.is_single_unit() {
            return Err(Error::UnsupportedFile(format!(
                "{} is stored in sectors",
                name
            )));
        }

        let offset = self.archive_offset + record.position;
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut reader: Box<dyn Read + '_> =
            Box::new((&mut self.reader).take(record.compressed_size));

        if flags.is_encrypted() {
            let key = file_key(record);
            log::debug!("Decrypting {} with key 0x{:08X}", name, key);
            reader = Box::new(DecryptReader::new(reader, key));
        }

        if flags.is_compressed() && record.file_size != record.compressed_size {
            if !flags.contains(FileFlags::COMPRESS) {
                return Err(Error::UnsupportedCompression(compression::flags::PKWARE));
            }

            let expected = usize::try_from(record.file_size)
                .map_err(|_| Error::invalid_format("file size does not fit in memory"))?;
            let mut stored = Vec::new();
            reader.read_to_end(&mut stored)?;
            let data = compression::decompress(&stored, expected)?;
            reader = Box::new(Cursor::new(data));
        }

        Ok(reader)
    }

    /// Names of the files this archive lists, sorted
    ///
    /// Names come from `(listfile)` plus the implicit special files; names
    /// that do not resolve are dropped.
    pub fn files(&mut self) -> Result<Vec<String>> {
        let listfile = self.tables.find_file(special_files::LISTFILE)?;
        let data = self.read_record(&listfile)?;

        let mut names = special_files::parse_listfile(&data)?;
        names.extend(special_files::IMPLICIT_FILES.iter().map(|s| s.to_string()));

        let listed = names.len();
        names.retain(|name| {
            name != special_files::LISTFILE && self.tables.find_file(name).is_ok()
        });
        if names.len() + 1 < listed {
            log::debug!(
                "{} listed names do not resolve",
                listed - names.len() - 1
            );
        }

        names.push(special_files::LISTFILE.to_string());
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Unwrap the underlying stream
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Decryption key for a file body
///
/// The key hashes the file's plain name (the part after the last path
/// separator). With `FIX_KEY` it is also mixed with the file position
/// and size.
fn file_key(record: &FileRecord) -> u32 {
    let plain = record
        .name
        .rsplit(['\\', '/'])
        .next()
        .unwrap_or(&record.name);
    let key = hash_string(plain, hash_type::FILE_KEY);

    if record.flags.contains(FileFlags::FIX_KEY) {
        key.wrapping_add(record.position as u32) ^ record.file_size as u32
    } else {
        key
    }
}

fn load_tables<R: Read + Seek>(
    reader: &mut R,
    archive_offset: u64,
    stream_len: u64,
    header: &MpqHeader,
) -> Result<ArchiveTables> {
    let available = stream_len.saturating_sub(archive_offset);
    let archive_end = match header.archive_size() {
        0 => available,
        size => size.min(available),
    };
    let positions = [
        header.het_table_pos(),
        header.bet_table_pos(),
        header.hash_table_pos(),
        header.block_table_pos(),
        header.hi_block_table_pos(),
    ];
    let v4 = header.v4.as_ref();

    let het = match header.het_table_pos() {
        0 => None,
        pos => {
            let size = ext_table_size(pos, v4.map(|v| v.het_table_size_64), &positions, archive_end);
            check_table_bounds("HET", pos, size, available)?;
            Some(HetTable::read(reader, archive_offset + pos, size)?)
        }
    };

    let bet = match header.bet_table_pos() {
        0 => None,
        pos => {
            let size = ext_table_size(pos, v4.map(|v| v.bet_table_size_64), &positions, archive_end);
            check_table_bounds("BET", pos, size, available)?;
            Some(BetTable::read(reader, archive_offset + pos, size)?)
        }
    };

    let hash = match header.hash_table_pos() {
        0 => None,
        pos => {
            let size = legacy_table_size(
                header.hash_table_size,
                HashEntry::SIZE,
                v4.map(|v| v.hash_table_size_64),
            );
            check_table_bounds("hash", pos, size, available)?;
            Some(HashTable::read(
                reader,
                archive_offset + pos,
                header.hash_table_size,
                size,
            )?)
        }
    };

    let block = match header.block_table_pos() {
        0 => None,
        pos => {
            let size = legacy_table_size(
                header.block_table_size,
                BlockEntry::SIZE,
                v4.map(|v| v.block_table_size_64),
            );
            check_table_bounds("block", pos, size, available)?;
            Some(BlockTable::read(
                reader,
                archive_offset + pos,
                header.block_table_size,
                size,
            )?)
        }
    };

    let hi_block = match header.hi_block_table_pos() {
        0 => None,
        pos => {
            check_table_bounds("hi-block", pos, header.block_table_size as u64 * 2, available)?;
            Some(HiBlockTable::read(
                reader,
                archive_offset + pos,
                header.block_table_size,
            )?)
        }
    };

    Ok(ArchiveTables::new(het, bet, hash, block, hi_block))
}

/// Reject a table whose declared extent runs past the end of the stream
fn check_table_bounds(table: &str, pos: u64, size: u64, available: u64) -> Result<()> {
    match pos.checked_add(size) {
        Some(end) if end <= available => Ok(()),
        _ => Err(Error::invalid_format(format!(
            "{} table at 0x{:X} with size {} exceeds the archive ({} bytes)",
            table, pos, size, available
        ))),
    }
}

fn legacy_table_size(entries: u32, entry_size: usize, stored: Option<u64>) -> u64 {
    match stored {
        Some(size) if size != 0 => size,
        _ => entries as u64 * entry_size as u64,
    }
}

/// Stored size of a HET or BET table
///
/// Uses the size from a v4 header when present; otherwise the table is
/// assumed to run up to the next table or the end of the archive.
fn ext_table_size(pos: u64, stored: Option<u64>, positions: &[u64], archive_end: u64) -> u64 {
    if let Some(size) = stored.filter(|&size| size != 0) {
        return size;
    }

    let next = positions
        .iter()
        .copied()
        .chain([archive_end])
        .filter(|&p| p > pos)
        .min()
        .unwrap_or(pos);
    next - pos
}
