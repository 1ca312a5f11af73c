//! Subcommand implementations

pub mod extract;
pub mod find;
pub mod hash;
pub mod info;
pub mod list;
pub mod tables;

use anyhow::{Context, Result};
use mpq::{Archive, OpenOptions};

/// Open an archive with the options in effect for this run
pub fn open_archive(archive_path: &str) -> Result<Archive> {
    let opts = crate::global_opts();
    OpenOptions::new()
        .wrap_probes(opts.wrap_probes)
        .open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path))
}
