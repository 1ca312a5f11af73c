//! Encryption and decryption algorithms for MPQ tables and files

use once_cell::sync::Lazy;
use std::io::{self, Read};

/// Size of the cipher table in 32-bit words
pub const CIPHER_TABLE_SIZE: usize = 0x500;

/// The process-wide cipher table used by all MPQ operations
pub static CIPHER_TABLE: Lazy<[u32; CIPHER_TABLE_SIZE]> = Lazy::new(generate_cipher_table);

/// Well-known table keys
pub mod keys {
    /// Key of the hash table and the HET table, `hash_string("(hash table)", FILE_KEY)`
    pub const HASH_TABLE: u32 = 0xC3AF3770;
    /// Key of the block table and the BET table, `hash_string("(block table)", FILE_KEY)`
    pub const BLOCK_TABLE: u32 = 0xEC83B3A3;
}

const KEY2_SEED: u32 = 0xEEEEEEEE;

/// Generate the MPQ cipher table
///
/// This table drives encryption, decryption and the table hash family.
/// It is a pure function of no input; [`cipher_table`] caches the result.
pub fn generate_cipher_table() -> [u32; CIPHER_TABLE_SIZE] {
    let mut table = [0u32; CIPHER_TABLE_SIZE];
    let mut seed: u32 = 0x00100001;

    for index1 in 0..0x100 {
        for index2 in 0..5 {
            seed = (seed * 125 + 3) % 0x2AAAAB;
            let temp1 = (seed & 0xFFFF) << 0x10;

            seed = (seed * 125 + 3) % 0x2AAAAB;
            let temp2 = seed & 0xFFFF;

            table[index1 + index2 * 0x100] = temp1 | temp2;
        }
    }

    table
}

/// Get the cached cipher table, generating it on first use
#[inline]
pub fn cipher_table() -> &'static [u32; CIPHER_TABLE_SIZE] {
    &CIPHER_TABLE
}

/// Running decryption state
///
/// Carries `key1`/`key2` across calls so a stream can be decrypted in
/// pieces. Pieces must be fed in whole 32-bit words; see [`DecryptReader`]
/// for a reader that handles arbitrary read sizes.
#[derive(Debug, Clone, Copy)]
pub struct Decrypter {
    key1: u32,
    key2: u32,
}

impl Decrypter {
    /// Start decrypting with the given key
    pub fn new(key: u32) -> Self {
        Self {
            key1: key,
            key2: KEY2_SEED,
        }
    }

    /// Decrypt one word and advance the state
    #[inline]
    pub fn decrypt_word(&mut self, value: u32) -> u32 {
        let table = cipher_table();
        self.key2 = self
            .key2
            .wrapping_add(table[0x400 + (self.key1 & 0xFF) as usize]);

        let plain = value ^ self.key1.wrapping_add(self.key2);

        self.key1 = ((!self.key1) << 0x15).wrapping_add(0x11111111) | (self.key1 >> 0x0B);
        self.key2 = plain
            .wrapping_add(self.key2)
            .wrapping_add(self.key2 << 5)
            .wrapping_add(3);

        plain
    }

    /// Decrypt every whole little-endian word of `data` in place
    ///
    /// A trailing partial word is left untouched.
    pub fn apply(&mut self, data: &mut [u8]) {
        for chunk in data.chunks_exact_mut(4) {
            let value = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            chunk.copy_from_slice(&self.decrypt_word(value).to_le_bytes());
        }
    }
}

/// Decrypt a block of data in place
pub fn decrypt_block(data: &mut [u8], key: u32) {
    Decrypter::new(key).apply(data);
}

/// Encrypt a block of data in place
///
/// The inverse of [`decrypt_block`]; used to build test archives and by
/// tooling that needs to produce encrypted tables.
pub fn encrypt_block(data: &mut [u8], mut key: u32) {
    let table = cipher_table();
    let mut seed = KEY2_SEED;

    for chunk in data.chunks_exact_mut(4) {
        let plain = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);

        seed = seed.wrapping_add(table[0x400 + (key & 0xFF) as usize]);
        let encrypted = plain ^ key.wrapping_add(seed);
        chunk.copy_from_slice(&encrypted.to_le_bytes());

        key = ((!key) << 0x15).wrapping_add(0x11111111) | (key >> 0x0B);
        seed = plain
            .wrapping_add(seed)
            .wrapping_add(seed << 5)
            .wrapping_add(3);
    }
}

/// Decrypt a single DWORD value
pub fn decrypt_dword(value: u32, key: u32) -> u32 {
    Decrypter::new(key).decrypt_word(value)
}

const STREAM_CHUNK: usize = 4096;

/// Reader adapter that decrypts an encrypted byte stream as it is read
///
/// Word boundaries are tracked across reads, so callers may read any
/// number of bytes at a time. Bytes past the last whole word of the
/// stream are passed through unchanged.
#[derive(Debug)]
pub struct DecryptReader<R> {
    inner: R,
    state: Decrypter,
    pending: Vec<u8>,
    pos: usize,
    eof: bool,
}

impl<R: Read> DecryptReader<R> {
    /// Wrap `inner`, decrypting with `key`
    pub fn new(inner: R, key: u32) -> Self {
        Self {
            inner,
            state: Decrypter::new(key),
            pending: Vec::new(),
            pos: 0,
            eof: false,
        }
    }

    /// Unwrap the underlying reader
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn refill(&mut self) -> io::Result<()> {
        let mut chunk = vec![0u8; STREAM_CHUNK];
        let mut filled = 0;

        // Keep reading until a whole number of words is buffered
        loop {
            let n = match self.inner.read(&mut chunk[filled..]) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if n == 0 {
                self.eof = true;
                break;
            }
            filled += n;
            if filled % 4 == 0 {
                break;
            }
        }

        chunk.truncate(filled);
        self.state.apply(&mut chunk);
        self.pending = chunk;
        self.pos = 0;
        Ok(())
    }
}

impl<R: Read> Read for DecryptReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pos >= self.pending.len() {
            if self.eof {
                return Ok(0);
            }
            self.refill()?;
        }

        let available = &self.pending[self.pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn words_to_bytes(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    const PLAIN: [u32; 8] = [
        0x12345678, 0x9ABCDEF0, 0x13579BDF, 0x2468ACE0, 0xFEDCBA98, 0x76543210, 0xF0DEBC9A,
        0xE1C3A597,
    ];

    const ENCRYPTED: [u32; 8] = [
        0x533922C0, 0x415526FA, 0xAEEEFA1F, 0xCAA77B16, 0x5EEAE319, 0xED3330F8, 0xE09B97EC,
        0x42315C85,
    ];

    #[test]
    fn test_cipher_table_generation() {
        let table = cipher_table();
        assert_eq!(table[0x000], 0x55C636E2);
        assert_eq!(table[0x001], 0x02BE0170);
        assert_eq!(table[0x002], 0x584B71D4);
        assert_eq!(table[0x003], 0x2984F00E);
        assert_eq!(table[0x004], 0xB682C809);

        assert_eq!(table[0x100], 0x76F8C1B1);
        assert_eq!(table[0x200], 0x3DF6965D);
        assert_eq!(table[0x300], 0x15F261D3);
        assert_eq!(table[0x400], 0x193AA698);

        assert_eq!(table[0x4FE], 0x4C10790D);
        assert_eq!(table[0x4FF], 0x7303286C);
    }

    #[test]
    fn test_cipher_table_is_deterministic() {
        let first = generate_cipher_table();
        let second = generate_cipher_table();
        assert_eq!(first[..], second[..]);
        assert_eq!(first[..], cipher_table()[..]);
    }

    #[test]
    fn test_known_encryption() {
        let mut data = words_to_bytes(&PLAIN);
        encrypt_block(&mut data, 0xC1EB1CEF);
        assert_eq!(data, words_to_bytes(&ENCRYPTED));
    }

    #[test]
    fn test_known_decryption() {
        let mut data = words_to_bytes(&ENCRYPTED);
        decrypt_block(&mut data, 0xC1EB1CEF);
        assert_eq!(data, words_to_bytes(&PLAIN));
    }

    #[test]
    fn test_decrypt_single_dword() {
        assert_eq!(decrypt_dword(0x533922C0, 0xC1EB1CEF), 0x12345678);
    }

    #[test]
    fn test_trailing_partial_word_untouched() {
        let mut data = words_to_bytes(&ENCRYPTED[..2]);
        data.extend_from_slice(&[0xAA, 0xBB, 0xCC]);
        decrypt_block(&mut data, 0xC1EB1CEF);

        assert_eq!(&data[..8], &words_to_bytes(&PLAIN[..2])[..]);
        assert_eq!(&data[8..], &[0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn test_zero_key_still_transforms() {
        let mut data = words_to_bytes(&PLAIN);
        encrypt_block(&mut data, 0);
        assert_ne!(data, words_to_bytes(&PLAIN));
        decrypt_block(&mut data, 0);
        assert_eq!(data, words_to_bytes(&PLAIN));
    }

    #[test]
    fn test_decrypter_resumes_across_calls() {
        let mut whole = words_to_bytes(&ENCRYPTED);
        decrypt_block(&mut whole, 0xC1EB1CEF);

        let mut pieces = words_to_bytes(&ENCRYPTED);
        let mut state = Decrypter::new(0xC1EB1CEF);
        let (head, tail) = pieces.split_at_mut(12);
        state.apply(head);
        state.apply(tail);

        assert_eq!(pieces, whole);
    }

    /// Reader that hands out at most `step` bytes per call
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_decrypt_reader_with_odd_read_sizes() {
        let mut encrypted = words_to_bytes(&ENCRYPTED);
        encrypted.push(0x5A);

        let source = Trickle {
            data: &encrypted,
            step: 3,
        };
        let mut reader = DecryptReader::new(source, 0xC1EB1CEF);

        let mut out = Vec::new();
        let mut buf = [0u8; 5];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }

        let mut expected = words_to_bytes(&PLAIN);
        expected.push(0x5A);
        assert_eq!(out, expected);
    }

    proptest! {
        #[test]
        fn prop_encrypt_decrypt_round_trip(data in proptest::collection::vec(any::<u8>(), 0..256), key in any::<u32>()) {
            let mut buffer = data.clone();
            encrypt_block(&mut buffer, key);
            decrypt_block(&mut buffer, key);
            prop_assert_eq!(buffer, data);
        }
    }
}
