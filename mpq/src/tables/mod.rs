//! MPQ table structures

pub mod bet;
pub mod block;
pub mod common;
pub mod hash;
pub mod het;
pub mod hi_block;
pub mod lookup;

pub use bet::{BetEntry, BetHeader, BetTable};
pub use block::{BlockEntry, BlockTable, FileFlags};
pub use common::{decode_ext_table, decode_table, ExtHeader};
pub use hash::{HashEntry, HashTable};
pub use het::{HetHash, HetHeader, HetTable};
pub use hi_block::HiBlockTable;
pub use lookup::{ArchiveTables, FileRecord, LookupStrategy};
