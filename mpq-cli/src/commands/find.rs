//! Find command implementation

use super::open_archive;
use crate::global_opts;
use crate::output::{self, flag_names, format_size};
use anyhow::Result;
use colored::*;
use mpq::{locale, Error, FileRecord};
use serde::Serialize;

#[derive(Serialize)]
struct FindResult<'a> {
    archive: &'a str,
    filename: &'a str,
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<&'a FileRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Resolve one name and print its record
///
/// A name that is absent or deleted is reported, not treated as a failure.
pub fn find(archive_path: &str, filename: &str) -> Result<()> {
    let opts = global_opts();
    let archive = open_archive(archive_path)?;

    let outcome = match archive.file_info(filename) {
        Ok(record) => Ok(record),
        Err(e) if e.is_lookup_miss() => Err(e),
        Err(e) => return Err(e.into()),
    };

    let result = FindResult {
        archive: archive_path,
        filename,
        found: outcome.is_ok(),
        record: outcome.as_ref().ok(),
        error: outcome.as_ref().err().map(|e| e.to_string()),
    };
    if output::print_structured(&result)? || opts.quiet {
        return Ok(());
    }

    let record = match &outcome {
        Ok(record) => record,
        Err(Error::FileDeleted(_)) => {
            println!("{} '{}' has been deleted", "✗".red().bold(), filename);
            return Ok(());
        }
        Err(_) => {
            println!("{} '{}' not found", "✗".red().bold(), filename);
            return Ok(());
        }
    };

    println!("{} File found!", "✓".green().bold());
    println!();
    println!("{}", "File Information:".bold().underline());
    println!("  {}: {}", "Filename".bold(), record.name.cyan());
    println!(
        "  {}: {}",
        "Table index".bold(),
        record.block_index.to_string().bright_blue()
    );
    println!(
        "  {}: {} ({})",
        "File size".bold(),
        record.file_size.to_string().green(),
        format_size(record.file_size).dimmed()
    );
    println!(
        "  {}: {} ({})",
        "Compressed size".bold(),
        record.compressed_size.to_string().yellow(),
        format_size(record.compressed_size).dimmed()
    );
    if record.file_size > 0 {
        let ratio = 100.0 * record.compressed_size as f64 / record.file_size as f64;
        println!("  {}: {:.1}%", "Compression ratio".bold(), ratio);
    }
    println!(
        "  {}: {}",
        "File position".bold(),
        format!("0x{:08X}", record.position).bright_magenta()
    );
    println!(
        "  {}: {} ({})",
        "Locale".bold(),
        locale::name(record.locale).unwrap_or("Unknown"),
        format!("0x{:04X}", record.locale).dimmed()
    );
    println!(
        "  {}: 0x{:08X} [{}]",
        "Flags".bold(),
        record.flags.bits(),
        flag_names(record.flags).join(", ")
    );

    Ok(())
}
