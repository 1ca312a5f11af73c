//! List command implementation

use super::open_archive;
use crate::output::{self, flag_names, format_size};
use crate::global_opts;
use anyhow::{Context, Result};
use colored::*;
use glob::{MatchOptions, Pattern};
use serde::Serialize;

#[derive(Serialize)]
struct FileListEntry {
    filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    compressed_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flags: Option<Vec<&'static str>>,
}

#[derive(Serialize)]
struct ListResult {
    archive: String,
    total_files: usize,
    files: Vec<FileListEntry>,
}

/// List files named by the archive's (listfile)
pub fn list(archive_path: &str, filter: Option<&str>, long: bool) -> Result<()> {
    let opts = global_opts();
    let mut archive = open_archive(archive_path)?;

    let names = archive
        .files()
        .context("Failed to list files (does the archive have a (listfile)?)")?;

    let names: Vec<String> = match filter {
        Some(pattern) => {
            let pattern = Pattern::new(pattern)
                .with_context(|| format!("Invalid filter pattern: {}", pattern))?;
            let options = MatchOptions {
                case_sensitive: false,
                require_literal_separator: false,
                require_literal_leading_dot: false,
            };
            names
                .into_iter()
                .filter(|name| pattern.matches_with(name, options))
                .collect()
        }
        None => names,
    };

    let mut entries = Vec::with_capacity(names.len());
    for name in names {
        let mut entry = FileListEntry {
            filename: name,
            size: None,
            compressed_size: None,
            flags: None,
        };
        if long {
            match archive.file_info(&entry.filename) {
                Ok(record) => {
                    entry.size = Some(record.file_size);
                    entry.compressed_size = Some(record.compressed_size);
                    entry.flags = Some(flag_names(record.flags));
                }
                Err(e) => log::warn!("{}: {}", entry.filename, e),
            }
        }
        entries.push(entry);
    }

    let result = ListResult {
        archive: archive_path.to_string(),
        total_files: entries.len(),
        files: entries,
    };
    if output::print_structured(&result)? || opts.quiet {
        return Ok(());
    }

    if output::use_color() {
        println!("{}: {}", "Archive".bold(), archive_path.cyan());
    } else {
        println!("Archive: {}", archive_path);
    }
    println!();

    for entry in &result.files {
        match (entry.size, entry.compressed_size, &entry.flags) {
            (Some(size), Some(compressed), Some(flags)) => println!(
                "{:>10} {:>10}  {:<40} {}",
                format_size(size),
                format_size(compressed),
                entry.filename,
                flags.join(",").dimmed()
            ),
            _ => println!("{}", entry.filename),
        }
    }

    println!();
    println!("{} {}", "Total files:".bold(), result.total_files);
    Ok(())
}
