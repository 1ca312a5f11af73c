//! HET/BET and hash/block lookups must agree on the same archive layout

mod common;

use common::{het_hash, init_logging, ArchiveBuilder, TestFile};
use mpq::{Archive, Error, LookupStrategy};
use pretty_assertions::assert_eq;

const NAMES: [&str; 8] = [
    "war3map.j",
    "war3map.w3e",
    "war3map.doo",
    "Scripts\\common.j",
    "Scripts\\blizzard.j",
    "Units\\Human\\Footman.mdx",
    "Units\\Orc\\Grunt.mdx",
    "(attributes)",
];

fn builder() -> ArchiveBuilder {
    NAMES
        .iter()
        .enumerate()
        .fold(ArchiveBuilder::new().format_version(2), |b, (i, name)| {
            let body = format!("{name} #{i}").repeat(i + 1);
            let file = TestFile::new(name, body.as_bytes());
            b.file(if i % 2 == 0 { file.encrypted() } else { file.fix_key() })
        })
}

#[test]
fn test_modern_and_legacy_agree() {
    init_logging();
    let modern = builder().modern_tables(true).legacy_tables(false).write_temp();
    let legacy = builder().write_temp();

    let modern = Archive::open(modern.path()).unwrap();
    let legacy = Archive::open(legacy.path()).unwrap();
    assert_eq!(modern.tables().strategy(), Some(LookupStrategy::Modern));
    assert_eq!(legacy.tables().strategy(), Some(LookupStrategy::Legacy));

    for name in NAMES.iter().chain(&["(listfile)"]) {
        let a = modern.tables().find_file(name).unwrap();
        let b = legacy.tables().find_file(name).unwrap();
        assert_eq!(a, b, "{name}");
    }

    for name in ["missing.txt", "(userdata)", "war3map.w3i"] {
        assert!(matches!(
            modern.tables().find_file(name),
            Err(Error::FileNotFound(_))
        ));
        assert!(matches!(
            legacy.tables().find_file(name),
            Err(Error::FileNotFound(_))
        ));
    }
}

#[test]
fn test_contents_match_across_strategies() {
    let modern = builder().modern_tables(true).legacy_tables(false).write_temp();
    let legacy = builder().write_temp();
    let mut modern = Archive::open(modern.path()).unwrap();
    let mut legacy = Archive::open(legacy.path()).unwrap();

    assert_eq!(modern.files().unwrap(), legacy.files().unwrap());
    for name in NAMES {
        assert_eq!(
            modern.read_file(name).unwrap(),
            legacy.read_file(name).unwrap()
        );
    }
}

#[test]
fn test_table_accessors() {
    let temp = builder().modern_tables(true).write_temp();
    let archive = Archive::open(temp.path()).unwrap();
    let tables = archive.tables();

    // Both pairs are present; HET/BET wins
    assert_eq!(tables.strategy(), Some(LookupStrategy::Modern));

    let files = NAMES.len() + 1;
    assert_eq!(tables.bet_entries().unwrap().len(), files);
    assert_eq!(tables.block_entries().unwrap().len(), files);

    let het = tables.het().unwrap();
    let indexes = tables.het_indexes().unwrap();
    assert_eq!(indexes.len(), het.slot_count());
    let used = het.hashes().iter().filter(|&&b| b != 0).count();
    assert_eq!(used, files);
    assert_eq!(indexes.iter().filter(|&&i| (i as usize) < files).count(), files);

    let hash_entries = tables.hash_entries().unwrap();
    assert!(hash_entries.len().is_power_of_two());
    assert_eq!(
        hash_entries.iter().filter(|e| e.block_index < files as u32).count(),
        files
    );
}

#[test]
fn test_het_hash_parts() {
    let temp = builder().modern_tables(true).write_temp();
    let archive = Archive::open(temp.path()).unwrap();
    let het = archive.tables().het().unwrap();

    let parts = het.hash_parts("(listfile)");
    assert_eq!(parts.full, 0xBBC4_3BB0_B2F3_866A);
    assert_eq!(parts.full, het_hash("(listfile)"));
    assert_eq!(parts.top_byte, 0xBB);
    assert_eq!(parts.bet_hash, 0x00C4_3BB0_B2F3_866A);
}

#[test]
fn test_legacy_archive_has_no_modern_tables() {
    let temp = builder().write_temp();
    let archive = Archive::open(temp.path()).unwrap();
    let tables = archive.tables();

    assert!(tables.het().is_none());
    assert!(matches!(tables.het_indexes(), Err(Error::NoTablesAvailable)));
    assert!(matches!(tables.bet_entries(), Err(Error::NoTablesAvailable)));
    assert_eq!(tables.block_entries().unwrap().len(), NAMES.len() + 1);
}
