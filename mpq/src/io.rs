//! I/O abstractions for MPQ archives

use crate::Result;
use std::io::{self, Read, Seek, SeekFrom};

/// Largest buffer reserved up front for a read whose size came from the archive
const MAX_PREALLOC: usize = 1 << 20;

/// Positioned reads over a seekable archive stream
pub trait MpqRead {
    /// Read exactly `buf.len()` bytes at the given absolute offset
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Read `len` bytes at the given absolute offset into a new buffer
    ///
    /// The buffer grows with the data actually read, so a bogus `len`
    /// fails with `UnexpectedEof` instead of reserving `len` bytes.
    fn read_vec_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>>;
}

impl<R: Read + Seek> MpqRead for R {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(buf)?;
        Ok(())
    }

    fn read_vec_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::with_capacity(len.min(MAX_PREALLOC));
        self.by_ref().take(len as u64).read_to_end(&mut buf)?;
        if buf.len() != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {} bytes at 0x{:X}, got {}", len, offset, buf.len()),
            )
            .into());
        }
        Ok(buf)
    }
}
