use crate::{global_opts, OutputFormat};
use colored::*;
use mpq::FileFlags;
use serde::Serialize;
use std::io;

/// Print structured output if JSON was requested
///
/// Returns `true` when the data was printed and the caller should skip
/// its text rendering.
pub fn print_structured<T: Serialize>(data: &T) -> Result<bool, io::Error> {
    let opts = global_opts();
    match opts.output {
        OutputFormat::Json => {
            if !opts.quiet {
                print_json(data)?;
            }
            Ok(true)
        }
        OutputFormat::Text => Ok(false),
    }
}

/// Print JSON output
pub fn print_json<T: Serialize>(data: &T) -> Result<(), io::Error> {
    let json = serde_json::to_string_pretty(data)?;
    println!("{}", json);
    Ok(())
}

/// Print verbose message (only if verbose mode is on)
pub fn verbose_println(level: u8, message: &str) {
    let opts = global_opts();

    if !opts.quiet && opts.verbose >= level {
        eprintln!("{} {}", "[VERBOSE]".dimmed(), message);
    }
}

/// Check if we should use color
pub fn use_color() -> bool {
    let opts = global_opts();
    !opts.no_color && opts.output == OutputFormat::Text
}

/// Human readable byte count
pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", size, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Short names of the set flags
pub fn flag_names(flags: FileFlags) -> Vec<&'static str> {
    flags
        .iter_names()
        .map(|(name, _)| match name {
            "IMPLODE" => "implode",
            "COMPRESS" => "compress",
            "ENCRYPTED" => "encrypted",
            "FIX_KEY" => "fix-key",
            "PATCH_FILE" => "patch",
            "SINGLE_UNIT" => "single-unit",
            "DELETE_MARKER" => "delete-marker",
            "SECTOR_CRC" => "sector-crc",
            "EXISTS" => "exists",
            _ => "unknown",
        })
        .collect()
}
