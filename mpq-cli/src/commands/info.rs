//! Archive information display

use super::open_archive;
use crate::global_opts;
use crate::output::{self, format_size};
use anyhow::Result;
use colored::*;
use mpq::{LookupStrategy, MpqHeader};
use serde::Serialize;

#[derive(Serialize)]
struct UserDataInfo {
    size: u32,
    header_offset: u32,
}

#[derive(Serialize)]
struct TableInfo {
    name: &'static str,
    position: u64,
    entries: usize,
}

#[derive(Serialize)]
struct ArchiveInfo<'a> {
    archive: String,
    archive_offset: u64,
    format_version: u16,
    archive_size: u64,
    sector_size: u64,
    lookup: Option<LookupStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_data: Option<UserDataInfo>,
    tables: Vec<TableInfo>,
    header: &'a MpqHeader,
}

/// Show header fields and the tables an archive carries
pub fn info(archive_path: &str) -> Result<()> {
    let opts = global_opts();
    let archive = open_archive(archive_path)?;
    let header = archive.header();
    let tables = archive.tables();

    let mut table_info = Vec::new();
    if let Some(het) = tables.het() {
        table_info.push(TableInfo {
            name: "HET",
            position: header.het_table_pos(),
            entries: het.slot_count(),
        });
    }
    if let Some(bet) = tables.bet() {
        table_info.push(TableInfo {
            name: "BET",
            position: header.bet_table_pos(),
            entries: bet.len(),
        });
    }
    if let Some(hash) = tables.hash_table() {
        table_info.push(TableInfo {
            name: "hash",
            position: header.hash_table_pos(),
            entries: hash.size(),
        });
    }
    if let Some(block) = tables.block_table() {
        table_info.push(TableInfo {
            name: "block",
            position: header.block_table_pos(),
            entries: block.size(),
        });
    }
    if let Some(hi_block) = tables.hi_block_table() {
        table_info.push(TableInfo {
            name: "hi-block",
            position: header.hi_block_table_pos(),
            entries: hi_block.len(),
        });
    }

    let info = ArchiveInfo {
        archive: archive_path.to_string(),
        archive_offset: archive.archive_offset(),
        format_version: header.version() as u16 + 1,
        archive_size: header.archive_size(),
        sector_size: header.sector_size(),
        lookup: tables.strategy(),
        user_data: archive.user_data().map(|u| UserDataInfo {
            size: u.max_size,
            header_offset: u.header_offset,
        }),
        tables: table_info,
        header,
    };

    if output::print_structured(&info)? || opts.quiet {
        return Ok(());
    }

    println!("{}", "MPQ Archive Information".bold());
    println!("{}", "=".repeat(50));
    println!("  {}: {}", "Archive".bold(), archive_path.cyan());
    println!("  {}: 0x{:X}", "Archive offset".bold(), info.archive_offset);
    println!(
        "  {}: v{} (header {} bytes)",
        "Format".bold(),
        info.format_version,
        header.header_size
    );
    println!(
        "  {}: {} ({})",
        "Archive size".bold(),
        info.archive_size,
        format_size(info.archive_size).dimmed()
    );
    println!("  {}: {}", "Sector size".bold(), info.sector_size);
    println!(
        "  {}: {}",
        "Lookup".bold(),
        info.lookup.map_or("none", LookupStrategy::name)
    );

    if let Some(user_data) = &info.user_data {
        println!();
        println!("{}", "User Data".bold().underline());
        println!("  {}: {} bytes", "Size".bold(), user_data.size);
        println!("  {}: 0x{:X}", "Header offset".bold(), user_data.header_offset);
    }

    println!();
    println!("{}", "Tables".bold().underline());
    if info.tables.is_empty() {
        println!("  {}", "(none)".yellow());
    }
    for table in &info.tables {
        println!(
            "  {:<9} at 0x{:08X}  {} entries",
            table.name, table.position, table.entries
        );
    }

    Ok(())
}
