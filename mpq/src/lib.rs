//! # mpq - read-only MPQ archive access
//!
//! A safe Rust implementation of the table layer of the MPQ (Mo'PaQ)
//! archive format used by Blizzard Entertainment games.
//!
//! ## Features
//!
//! - Header discovery for format versions v1-v4, including user data blocks
//! - Decryption and decompression of hash, block, HET and BET tables
//! - Name hashing with both the table hash and the Jenkins hash
//! - File lookup through either HET/BET or hash/block tables
//! - Reading of single-unit files (encrypted and/or bzip2 compressed)
//!
//! ## Example
//!
//! ```no_run
//! use mpq::Archive;
//!
//! # fn main() -> Result<(), mpq::Error> {
//! let mut archive = Archive::open("example.mpq")?;
//!
//! for name in archive.files()? {
//!     println!("{}", name);
//! }
//!
//! let record = archive.file_info("(listfile)")?;
//! println!("{} bytes at 0x{:X}", record.file_size, record.position);
//!
//! let data = archive.read_file("(listfile)")?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod archive;
pub mod bits;
pub mod compression;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod header;
pub mod io;
pub mod locale;
pub mod special_files;
pub mod tables;

// Re-export commonly used types
pub use archive::{Archive, OpenOptions};
pub use bits::BitCursor;
pub use error::{Error, Result};
pub use hash::{hash_string, jenkins_hash};
pub use header::{FormatVersion, MpqHeader, UserData};
pub use tables::{ArchiveTables, FileFlags, FileRecord, LookupStrategy};
