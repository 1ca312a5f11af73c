//! Table display operations

use super::open_archive;
use crate::output::{self, flag_names};
use crate::{global_opts, TableType};
use anyhow::{anyhow, Result};
use colored::Colorize;
use mpq::tables::{BetEntry, BlockEntry, HashEntry};
use mpq::{ArchiveTables, FileFlags};
use serde::Serialize;

#[derive(Serialize)]
struct HetSlot {
    slot: usize,
    hash: u8,
    index: u64,
}

#[derive(Serialize)]
struct HiBlockEntry {
    index: usize,
    high: u16,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum TableDump<'a> {
    Hash(Vec<(usize, &'a HashEntry)>),
    Block(Vec<(usize, &'a BlockEntry)>),
    HiBlock(Vec<HiBlockEntry>),
    Het(Vec<HetSlot>),
    Bet(Vec<(usize, &'a BetEntry)>),
}

/// Display table contents
pub fn show(
    archive_path: &str,
    table_type: Option<TableType>,
    limit: usize,
    occupied_only: bool,
) -> Result<()> {
    let opts = global_opts();
    let archive = open_archive(archive_path)?;
    let tables = archive.tables();

    let selected = match table_type {
        Some(table) => vec![table],
        None => [
            TableType::Het,
            TableType::Bet,
            TableType::Hash,
            TableType::Block,
            TableType::HiBlock,
        ]
        .into_iter()
        .filter(|&t| present(tables, t))
        .collect(),
    };

    let mut dumps = Vec::with_capacity(selected.len());
    for table in selected {
        if !present(tables, table) {
            return Err(anyhow!("Archive has no {:?} table", table));
        }
        dumps.push(dump(tables, table, limit, occupied_only)?);
    }

    if output::print_structured(&dumps)? || opts.quiet {
        return Ok(());
    }

    for dump in &dumps {
        print_dump(dump);
        println!();
    }
    Ok(())
}

fn present(tables: &ArchiveTables, table: TableType) -> bool {
    match table {
        TableType::Hash => tables.hash_table().is_some(),
        TableType::Block => tables.block_table().is_some(),
        TableType::HiBlock => tables.hi_block_table().is_some(),
        TableType::Het => tables.het().is_some(),
        TableType::Bet => tables.bet().is_some(),
    }
}

fn dump<'a>(
    tables: &'a ArchiveTables,
    table: TableType,
    limit: usize,
    occupied_only: bool,
) -> Result<TableDump<'a>> {
    let dump = match table {
        TableType::Hash => TableDump::Hash(
            tables
                .hash_entries()?
                .iter()
                .enumerate()
                .filter(|(_, e)| !occupied_only || !e.is_empty())
                .take(limit)
                .collect(),
        ),
        TableType::Block => {
            TableDump::Block(tables.block_entries()?.iter().enumerate().take(limit).collect())
        }
        TableType::HiBlock => {
            let hi_block = tables
                .hi_block_table()
                .ok_or_else(|| anyhow!("Archive has no hi-block table"))?;
            TableDump::HiBlock(
                (0..hi_block.len())
                    .filter_map(|index| {
                        hi_block.get(index).map(|high| HiBlockEntry { index, high })
                    })
                    .take(limit)
                    .collect(),
            )
        }
        TableType::Het => {
            let het = tables.het().ok_or_else(|| anyhow!("Archive has no HET table"))?;
            let indexes = tables.het_indexes()?;
            TableDump::Het(
                het.hashes()
                    .iter()
                    .zip(indexes)
                    .enumerate()
                    .filter(|&(_, (&hash, _))| !occupied_only || hash != 0)
                    .map(|(slot, (&hash, &index))| HetSlot { slot, hash, index })
                    .take(limit)
                    .collect(),
            )
        }
        TableType::Bet => {
            TableDump::Bet(tables.bet_entries()?.iter().enumerate().take(limit).collect())
        }
    };
    Ok(dump)
}

fn print_dump(dump: &TableDump<'_>) {
    match dump {
        TableDump::Hash(entries) => {
            println!("{}", "Hash table".bold().underline());
            println!(
                "  {:>6}  {:>10}  {:>10}  {:>6}  {:>8}  {:>10}",
                "slot", "name A", "name B", "locale", "platform", "block"
            );
            for (slot, entry) in entries {
                let block = if entry.is_empty() {
                    "empty".dimmed().to_string()
                } else if entry.is_deleted() {
                    "deleted".yellow().to_string()
                } else {
                    entry.block_index.to_string()
                };
                println!(
                    "  {:>6}  0x{:08X}  0x{:08X}  0x{:04X}  {:>8}  {:>10}",
                    slot, entry.name_1, entry.name_2, entry.locale, entry.platform, block
                );
            }
        }
        TableDump::Block(entries) => {
            println!("{}", "Block table".bold().underline());
            println!(
                "  {:>6}  {:>10}  {:>10}  {:>10}  flags",
                "index", "position", "stored", "size"
            );
            for (index, entry) in entries {
                println!(
                    "  {:>6}  0x{:08X}  {:>10}  {:>10}  {}",
                    index,
                    entry.file_pos,
                    entry.compressed_size,
                    entry.file_size,
                    flag_names(entry.file_flags()).join(",")
                );
            }
        }
        TableDump::HiBlock(entries) => {
            println!("{}", "Hi-block table".bold().underline());
            for entry in entries {
                println!("  {:>6}  0x{:04X}", entry.index, entry.high);
            }
        }
        TableDump::Het(slots) => {
            println!("{}", "HET table".bold().underline());
            println!("  {:>6}  {:>4}  index", "slot", "hash");
            for slot in slots {
                println!("  {:>6}  0x{:02X}  {}", slot.slot, slot.hash, slot.index);
            }
        }
        TableDump::Bet(entries) => {
            println!("{}", "BET table".bold().underline());
            println!(
                "  {:>6}  {:>14}  {:>10}  {:>10}  {:>10}  flags",
                "index", "name hash", "position", "stored", "size"
            );
            for (index, entry) in entries {
                println!(
                    "  {:>6}  0x{:012X}  0x{:08X}  {:>10}  {:>10}  {}",
                    index,
                    entry.name_hash2,
                    entry.file_pos,
                    entry.compressed_size,
                    entry.file_size,
                    flag_names(FileFlags::from_bits_retain(entry.flags)).join(",")
                );
            }
        }
    }
}
