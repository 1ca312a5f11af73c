//! Test-only MPQ writer
//!
//! Lays out single-unit files followed by HET, BET, hash and block tables,
//! encrypting every table the way real archives do.

#![allow(dead_code)]

use bzip2::write::BzEncoder;
use bzip2::Compression;
use mpq::compression::flags as compression_flags;
use mpq::crypto::{encrypt_block, keys};
use mpq::hash::{hash_string, hash_type, jenkins_hash};
use mpq::FileFlags;
use std::io::Write;
use tempfile::NamedTempFile;

/// Install a test logger once per binary
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// LSB-first bit packer matching the HET/BET layout
#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bits: u64,
}

impl BitWriter {
    pub fn push(&mut self, value: u64, width: u32) {
        for bit in 0..width {
            if self.bits % 8 == 0 {
                self.bytes.push(0);
            }
            if (value >> bit) & 1 == 1 {
                let last = self.bytes.len() - 1;
                self.bytes[last] |= 1 << (self.bits % 8);
            }
            self.bits += 1;
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// Bits needed to store `value`
pub fn bits_needed(value: u64) -> u32 {
    u64::BITS - value.leading_zeros()
}

/// bzip2-compress `data` behind a method tag
pub fn bzip2_tagged(data: &[u8]) -> Vec<u8> {
    let mut encoder = BzEncoder::new(vec![compression_flags::BZIP2], Compression::best());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// A file to place in the archive
#[derive(Debug, Clone)]
pub struct TestFile {
    pub name: String,
    pub data: Vec<u8>,
    encrypt: bool,
    fix_key: bool,
    compress: bool,
    flags: Option<u32>,
}

impl TestFile {
    pub fn new(name: &str, data: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            data: data.to_vec(),
            encrypt: false,
            fix_key: false,
            compress: false,
            flags: None,
        }
    }

    pub fn encrypted(mut self) -> Self {
        self.encrypt = true;
        self
    }

    pub fn fix_key(mut self) -> Self {
        self.encrypt = true;
        self.fix_key = true;
        self
    }

    pub fn compressed(mut self) -> Self {
        self.compress = true;
        self
    }

    /// Store the body as-is but record these flags
    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = Some(flags);
        self
    }

    fn encode(&self, position: u64) -> (Vec<u8>, u32) {
        let mut flags = FileFlags::EXISTS | FileFlags::SINGLE_UNIT;
        let mut stored = self.data.clone();

        if self.compress {
            let compressed = bzip2_tagged(&self.data);
            assert!(
                compressed.len() < self.data.len(),
                "{} does not compress",
                self.name
            );
            stored = compressed;
            flags |= FileFlags::COMPRESS;
        }

        if self.encrypt {
            flags |= FileFlags::ENCRYPTED;
            let plain = self.name.rsplit(['\\', '/']).next().unwrap();
            let mut key = hash_string(plain, hash_type::FILE_KEY);
            if self.fix_key {
                flags |= FileFlags::FIX_KEY;
                key = key.wrapping_add(position as u32) ^ self.data.len() as u32;
            }
            encrypt_block(&mut stored, key);
        }

        (stored, self.flags.unwrap_or(flags.bits()))
    }
}

#[derive(Debug, Clone, Copy)]
struct Block {
    position: u64,
    compressed_size: u64,
    file_size: u64,
    flags: u32,
}

/// Builds archive images in memory
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    files: Vec<TestFile>,
    format_version: u16,
    legacy_tables: bool,
    modern_tables: bool,
    compress_tables: bool,
    listfile: bool,
    user_data: Option<Vec<u8>>,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder {
    /// A v1 archive with hash/block tables and a generated listfile
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            format_version: 0,
            legacy_tables: true,
            modern_tables: false,
            compress_tables: false,
            listfile: true,
            user_data: None,
        }
    }

    /// Raw header format version (0 = v1 ... 3 = v4)
    pub fn format_version(mut self, version: u16) -> Self {
        self.format_version = version;
        self
    }

    /// Write HET/BET tables (bumps the header to at least v3)
    pub fn modern_tables(mut self, enabled: bool) -> Self {
        self.modern_tables = enabled;
        if enabled {
            self.format_version = self.format_version.max(2);
        }
        self
    }

    pub fn legacy_tables(mut self, enabled: bool) -> Self {
        self.legacy_tables = enabled;
        self
    }

    /// bzip2-compress the tables (bumps the header to v4 so sizes are recorded)
    pub fn compress_tables(mut self, enabled: bool) -> Self {
        self.compress_tables = enabled;
        if enabled {
            self.format_version = 3;
        }
        self
    }

    pub fn without_listfile(mut self) -> Self {
        self.listfile = false;
        self
    }

    pub fn user_data(mut self, data: &[u8]) -> Self {
        self.user_data = Some(data.to_vec());
        self
    }

    pub fn file(mut self, file: TestFile) -> Self {
        self.files.push(file);
        self
    }

    fn all_files(&self) -> Vec<TestFile> {
        let mut files = self.files.clone();
        if self.listfile {
            let names: Vec<&str> = self.files.iter().map(|f| f.name.as_str()).collect();
            let mut listing = names.join("\r\n").into_bytes();
            listing.extend_from_slice(b"\r\n");
            files.push(TestFile::new("(listfile)", &listing));
        }
        files
    }

    fn header_size(&self) -> u64 {
        match self.format_version {
            0 => 0x20,
            1 => 0x2C,
            2 => 0x44,
            _ => 0xD0,
        }
    }

    /// Build the archive image
    pub fn build(&self) -> Vec<u8> {
        let files = self.all_files();
        let header_size = self.header_size();

        let mut body = Vec::new();
        let mut blocks = Vec::new();
        for file in &files {
            let position = header_size + body.len() as u64;
            let (stored, flags) = file.encode(position);
            blocks.push(Block {
                position,
                compressed_size: stored.len() as u64,
                file_size: file.data.len() as u64,
                flags,
            });
            body.extend_from_slice(&stored);
        }

        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        let mut layout = TableLayout::default();

        if self.modern_tables {
            let het = het_table(&names);
            layout.het = (header_size + body.len() as u64, het.len() as u64);
            body.extend_from_slice(&het);

            let bet = bet_table(&names, &blocks);
            layout.bet = (header_size + body.len() as u64, bet.len() as u64);
            body.extend_from_slice(&bet);
        }

        if self.legacy_tables {
            let (hash, slots) = hash_table(&names, self.compress_tables);
            layout.hash = (header_size + body.len() as u64, hash.len() as u64);
            layout.hash_slots = slots;
            body.extend_from_slice(&hash);

            let block = block_table(&blocks, self.compress_tables);
            layout.block = (header_size + body.len() as u64, block.len() as u64);
            layout.block_count = blocks.len() as u32;
            body.extend_from_slice(&block);
        }

        let archive_size = header_size + body.len() as u64;
        let mut archive = self.header(&layout, archive_size);
        assert_eq!(archive.len() as u64, header_size);
        archive.extend_from_slice(&body);

        match &self.user_data {
            Some(data) => {
                let mut out = Vec::new();
                let header_offset = (16 + data.len() as u32).next_multiple_of(0x200);
                out.extend_from_slice(b"MPQ\x1B");
                out.extend_from_slice(&(data.len() as u32).to_le_bytes());
                out.extend_from_slice(&header_offset.to_le_bytes());
                out.extend_from_slice(&16u32.to_le_bytes());
                out.extend_from_slice(data);
                out.resize(header_offset as usize, 0);
                out.extend_from_slice(&archive);
                out
            }
            None => archive,
        }
    }

    /// Build the archive into a temporary file
    pub fn write_temp(&self) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&self.build()).unwrap();
        file.flush().unwrap();
        file
    }

    fn header(&self, layout: &TableLayout, archive_size: u64) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"MPQ\x1A");
        out.extend_from_slice(&(self.header_size() as u32).to_le_bytes());
        out.extend_from_slice(&(archive_size as u32).to_le_bytes());
        out.extend_from_slice(&self.format_version.to_le_bytes());
        out.extend_from_slice(&3u16.to_le_bytes());
        out.extend_from_slice(&(layout.hash.0 as u32).to_le_bytes());
        out.extend_from_slice(&(layout.block.0 as u32).to_le_bytes());
        out.extend_from_slice(&layout.hash_slots.to_le_bytes());
        out.extend_from_slice(&layout.block_count.to_le_bytes());

        if self.format_version >= 1 {
            out.extend_from_slice(&0u64.to_le_bytes());
            out.extend_from_slice(&((layout.hash.0 >> 32) as u16).to_le_bytes());
            out.extend_from_slice(&((layout.block.0 >> 32) as u16).to_le_bytes());
        }

        if self.format_version >= 2 {
            out.extend_from_slice(&archive_size.to_le_bytes());
            out.extend_from_slice(&layout.bet.0.to_le_bytes());
            out.extend_from_slice(&layout.het.0.to_le_bytes());
        }

        if self.format_version >= 3 {
            out.extend_from_slice(&layout.hash.1.to_le_bytes());
            out.extend_from_slice(&layout.block.1.to_le_bytes());
            out.extend_from_slice(&0u64.to_le_bytes());
            out.extend_from_slice(&layout.het.1.to_le_bytes());
            out.extend_from_slice(&layout.bet.1.to_le_bytes());
            out.extend_from_slice(&0x4000u32.to_le_bytes());
            out.extend_from_slice(&[0u8; 16 * 6]);
        }

        out
    }
}

#[derive(Debug, Default)]
struct TableLayout {
    het: (u64, u64),
    bet: (u64, u64),
    hash: (u64, u64),
    block: (u64, u64),
    hash_slots: u32,
    block_count: u32,
}

/// Place each item at or after its home slot without wrapping
///
/// Returns `None` when a chain would run off the end of the table.
fn place(homes: &[usize], slots: usize) -> Option<Vec<Option<usize>>> {
    let mut table = vec![None; slots];
    for (item, &home) in homes.iter().enumerate() {
        let slot = (home..slots).find(|&s| table[s].is_none())?;
        table[slot] = Some(item);
    }
    Some(table)
}

fn place_growing(names: &[&str], home: impl Fn(&str, usize) -> usize) -> Vec<Option<usize>> {
    let mut slots = (names.len() * 2).next_power_of_two().max(4);
    loop {
        let homes: Vec<usize> = names.iter().map(|n| home(n, slots)).collect();
        if let Some(table) = place(&homes, slots) {
            return table;
        }
        slots *= 2;
    }
}

fn maybe_compress(plain: Vec<u8>, compress: bool) -> Vec<u8> {
    if compress {
        let compressed = bzip2_tagged(&plain);
        if compressed.len() < plain.len() {
            return compressed;
        }
    }
    plain
}

/// Full HET hash of a name for a 64-bit hash entry size
pub fn het_hash(name: &str) -> u64 {
    jenkins_hash(name) | 0x8000_0000_0000_0000
}

fn het_table(names: &[&str]) -> Vec<u8> {
    let table = place_growing(names, |name, slots| (het_hash(name) % slots as u64) as usize);
    let slots = table.len();
    let index_bits = bits_needed(names.len() as u64);
    let empty_index = (1u64 << index_bits) - 1;

    let mut hashes = vec![0u8; slots];
    let mut indexes = BitWriter::default();
    for (slot, entry) in table.iter().enumerate() {
        match entry {
            Some(item) => {
                hashes[slot] = (het_hash(names[*item]) >> 56) as u8;
                indexes.push(*item as u64, index_bits);
            }
            None => indexes.push(empty_index, index_bits),
        }
    }
    let indexes = indexes.finish();

    let mut body = Vec::new();
    let header = [
        (12 + 32 + slots + indexes.len()) as u32,
        names.len() as u32,
        slots as u32,
        64,
        index_bits,
        0,
        index_bits,
        indexes.len() as u32,
    ];
    for value in header {
        body.extend_from_slice(&value.to_le_bytes());
    }
    body.extend_from_slice(&hashes);
    body.extend_from_slice(&indexes);

    ext_table(b"HET\x1A", body, keys::HASH_TABLE)
}

fn bet_table(names: &[&str], blocks: &[Block]) -> Vec<u8> {
    let mut flags: Vec<u32> = Vec::new();
    for block in blocks {
        if !flags.contains(&block.flags) {
            flags.push(block.flags);
        }
    }

    let widths = [
        bits_needed(blocks.iter().map(|b| b.position).max().unwrap_or(0)),
        bits_needed(blocks.iter().map(|b| b.file_size).max().unwrap_or(0)),
        bits_needed(blocks.iter().map(|b| b.compressed_size).max().unwrap_or(0)),
        bits_needed(flags.len().saturating_sub(1) as u64),
        0,
    ];
    let entry_bits: u32 = widths.iter().sum();

    let mut records = BitWriter::default();
    let mut hashes = BitWriter::default();
    for (name, block) in names.iter().zip(blocks) {
        let flag_index = flags.iter().position(|&f| f == block.flags).unwrap();
        records.push(block.position, widths[0]);
        records.push(block.file_size, widths[1]);
        records.push(block.compressed_size, widths[2]);
        records.push(flag_index as u64, widths[3]);
        hashes.push(het_hash(name) & 0x00FF_FFFF_FFFF_FFFF, 56);
    }
    let records = records.finish();
    let hashes = hashes.finish();

    let mut bit_index = [0u32; 5];
    let mut next = 0;
    for (index, width) in bit_index.iter_mut().zip(widths) {
        *index = next;
        next += width;
    }

    let header = [
        (12 + 76 + flags.len() * 4 + records.len() + hashes.len()) as u32,
        blocks.len() as u32,
        0x10,
        entry_bits,
        bit_index[0],
        bit_index[1],
        bit_index[2],
        bit_index[3],
        bit_index[4],
        widths[0],
        widths[1],
        widths[2],
        widths[3],
        widths[4],
        56,
        0,
        56,
        hashes.len() as u32,
        flags.len() as u32,
    ];

    let mut body = Vec::new();
    for value in header {
        body.extend_from_slice(&value.to_le_bytes());
    }
    for flag in &flags {
        body.extend_from_slice(&flag.to_le_bytes());
    }
    body.extend_from_slice(&records);
    body.extend_from_slice(&hashes);

    ext_table(b"BET\x1A", body, keys::BLOCK_TABLE)
}

fn ext_table(signature: &[u8; 4], mut body: Vec<u8>, key: u32) -> Vec<u8> {
    let mut out = signature.to_vec();
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    encrypt_block(&mut body, key);
    out.extend_from_slice(&body);
    out
}

fn hash_table(names: &[&str], compress: bool) -> (Vec<u8>, u32) {
    let table = place_growing(names, |name, slots| {
        hash_string(name, hash_type::TABLE_OFFSET) as usize % slots
    });

    let mut data = Vec::with_capacity(table.len() * 16);
    for entry in &table {
        match entry {
            Some(item) => {
                let name = names[*item];
                data.extend_from_slice(&hash_string(name, hash_type::NAME_A).to_le_bytes());
                data.extend_from_slice(&hash_string(name, hash_type::NAME_B).to_le_bytes());
                data.extend_from_slice(&0u16.to_le_bytes());
                data.extend_from_slice(&0u16.to_le_bytes());
                data.extend_from_slice(&(*item as u32).to_le_bytes());
            }
            None => data.extend_from_slice(&[0xFF; 16]),
        }
    }

    let mut stored = maybe_compress(data, compress);
    encrypt_block(&mut stored, keys::HASH_TABLE);
    (stored, table.len() as u32)
}

fn block_table(blocks: &[Block], compress: bool) -> Vec<u8> {
    let mut data = Vec::with_capacity(blocks.len() * 16);
    for block in blocks {
        data.extend_from_slice(&(block.position as u32).to_le_bytes());
        data.extend_from_slice(&(block.compressed_size as u32).to_le_bytes());
        data.extend_from_slice(&(block.file_size as u32).to_le_bytes());
        data.extend_from_slice(&block.flags.to_le_bytes());
    }

    let mut stored = maybe_compress(data, compress);
    encrypt_block(&mut stored, keys::BLOCK_TABLE);
    stored
}
