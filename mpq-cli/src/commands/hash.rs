//! Hash generation utilities

use crate::output;
use crate::{global_opts, HashType};
use anyhow::{bail, Result};
use colored::Colorize;
use mpq::hash::{hash_string, hash_type, jenkins_hash};
use serde::Serialize;

#[derive(Serialize)]
struct HashValues<'a> {
    filename: &'a str,
    table_offset: String,
    name_a: String,
    name_b: String,
    file_key: String,
    jenkins: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    table_slot: Option<u32>,
}

/// Print the hashes the archive tables use for `filename`
pub fn generate(filename: &str, hash_type: Option<HashType>, table_size: Option<u32>) -> Result<()> {
    let opts = global_opts();

    if table_size == Some(0) {
        bail!("Table size must be greater than zero");
    }

    let table_offset = hash_string(filename, hash_type::TABLE_OFFSET);

    if let Some(ht) = hash_type {
        let value = match ht {
            HashType::TableOffset => format!("{:#010x}", table_offset),
            HashType::NameA => format!("{:#010x}", hash_string(filename, hash_type::NAME_A)),
            HashType::NameB => format!("{:#010x}", hash_string(filename, hash_type::NAME_B)),
            HashType::FileKey => format!("{:#010x}", hash_string(filename, hash_type::FILE_KEY)),
            HashType::Jenkins => format!("{:#018x}", jenkins_hash(filename)),
        };
        if !opts.quiet {
            println!("{}", value);
        }
        return Ok(());
    }

    let values = HashValues {
        filename,
        table_offset: format!("{:#010x}", table_offset),
        name_a: format!("{:#010x}", hash_string(filename, hash_type::NAME_A)),
        name_b: format!("{:#010x}", hash_string(filename, hash_type::NAME_B)),
        file_key: format!("{:#010x}", hash_string(filename, hash_type::FILE_KEY)),
        jenkins: format!("{:#018x}", jenkins_hash(filename)),
        table_slot: table_size.map(|size| table_offset % size),
    };

    if output::print_structured(&values)? || opts.quiet {
        return Ok(());
    }

    println!("{}", "Hash values:".bold());
    println!("  Table offset: {}", values.table_offset);
    println!("  Name A:       {}", values.name_a);
    println!("  Name B:       {}", values.name_b);
    println!("  File key:     {}", values.file_key);
    println!("  Jenkins:      {}", values.jenkins);
    if let (Some(slot), Some(size)) = (values.table_slot, table_size) {
        println!("  Slot:         {} of {}", slot, size);
    }

    Ok(())
}
