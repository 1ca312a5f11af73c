//! Hash algorithms for MPQ file name hashing
//!
//! Two unrelated families are in use. The legacy hash table is keyed by
//! [`hash_string`], a substitution hash driven by the cipher table. The
//! HET table is keyed by [`jenkins_hash`], Bob Jenkins' `hashlittle2`
//! over the lower-cased name.

use crate::crypto::cipher_table;

/// Hash type offsets into the cipher table
pub mod hash_type {
    /// Starting slot in the hash table
    pub const TABLE_OFFSET: u32 = 0x000;
    /// First name check value
    pub const NAME_A: u32 = 0x100;
    /// Second name check value
    pub const NAME_B: u32 = 0x200;
    /// File decryption key
    pub const FILE_KEY: u32 = 0x300;
}

/// ASCII uppercase conversion table
pub const ASCII_TO_UPPER: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = i as u8;
        i += 1;
    }
    let mut i = b'a';
    while i <= b'z' {
        table[i as usize] = i - 32;
        i += 1;
    }
    table[b'/' as usize] = b'\\';
    table
};

/// ASCII lowercase conversion table
pub const ASCII_TO_LOWER: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = i as u8;
        i += 1;
    }
    let mut i = b'A';
    while i <= b'Z' {
        table[i as usize] = i + 32;
        i += 1;
    }
    table[b'/' as usize] = b'\\';
    table
};

/// Hash a file name with the cipher-table hash
///
/// The name is upper-cased and `/` is treated as `\`, so
/// `"units/human.mdx"` and `"UNITS\\HUMAN.MDX"` hash identically.
///
/// `hash_type` selects one of the four table slots in [`hash_type`];
/// only its slot bits (`0x300`) are used.
pub fn hash_string(filename: &str, hash_type: u32) -> u32 {
    let table = cipher_table();
    let hash_type = hash_type & 0x300;
    let mut seed1: u32 = 0x7FED7FED;
    let mut seed2: u32 = 0xEEEEEEEE;

    for &byte in filename.as_bytes() {
        let ch = ASCII_TO_UPPER[byte as usize] as u32;

        seed1 = table[(hash_type + ch) as usize] ^ seed1.wrapping_add(seed2);
        seed2 = ch
            .wrapping_add(seed1)
            .wrapping_add(seed2)
            .wrapping_add(seed2 << 5)
            .wrapping_add(3);
    }

    seed1
}

/// Bob Jenkins' `hashlittle2`
///
/// Hashes `key` with the two seeds `pc` and `pb`, writing the primary
/// result back to `pc` and the secondary result to `pb`. The byte-wise
/// variant is used throughout, which matches the word-aligned variants
/// on little-endian input.
pub fn hashlittle2(key: &[u8], pc: &mut u32, pb: &mut u32) {
    let mut a = 0xdeadbeef_u32
        .wrapping_add(key.len() as u32)
        .wrapping_add(*pc);
    let mut b = a;
    let mut c = a.wrapping_add(*pb);

    let mut k = key;
    while k.len() > 12 {
        a = a.wrapping_add(word_le(&k[0..4]));
        b = b.wrapping_add(word_le(&k[4..8]));
        c = c.wrapping_add(word_le(&k[8..12]));
        mix(&mut a, &mut b, &mut c);
        k = &k[12..];
    }

    if k.is_empty() {
        *pc = c;
        *pb = b;
        return;
    }

    // Zero-padding the tail is equivalent to the fall-through switch
    let mut tail = [0u8; 12];
    tail[..k.len()].copy_from_slice(k);
    a = a.wrapping_add(word_le(&tail[0..4]));
    b = b.wrapping_add(word_le(&tail[4..8]));
    c = c.wrapping_add(word_le(&tail[8..12]));

    final_mix(&mut a, &mut b, &mut c);
    *pc = c;
    *pb = b;
}

#[inline]
fn word_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[inline]
fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*c);
    *a ^= c.rotate_left(4);
    *c = c.wrapping_add(*b);

    *b = b.wrapping_sub(*a);
    *b ^= a.rotate_left(6);
    *a = a.wrapping_add(*c);

    *c = c.wrapping_sub(*b);
    *c ^= b.rotate_left(8);
    *b = b.wrapping_add(*a);

    *a = a.wrapping_sub(*c);
    *a ^= c.rotate_left(16);
    *c = c.wrapping_add(*b);

    *b = b.wrapping_sub(*a);
    *b ^= a.rotate_left(19);
    *a = a.wrapping_add(*c);

    *c = c.wrapping_sub(*b);
    *c ^= b.rotate_left(4);
    *b = b.wrapping_add(*a);
}

#[inline]
fn final_mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(14));

    *a ^= *c;
    *a = a.wrapping_sub(c.rotate_left(11));

    *b ^= *a;
    *b = b.wrapping_sub(a.rotate_left(25));

    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(16));

    *a ^= *c;
    *a = a.wrapping_sub(c.rotate_left(4));

    *b ^= *a;
    *b = b.wrapping_sub(a.rotate_left(14));

    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(24));
}

/// 64-bit Jenkins name hash used by HET tables
///
/// The name is lower-cased and `/` is treated as `\`. The two halves
/// come from `hashlittle2` seeded with 1 and 2; the half produced from
/// the first seed lands in the upper 32 bits.
pub fn jenkins_hash(filename: &str) -> u64 {
    let normalized: Vec<u8> = filename
        .bytes()
        .map(|b| ASCII_TO_LOWER[b as usize])
        .collect();

    let mut secondary: u32 = 2;
    let mut primary: u32 = 1;
    hashlittle2(&normalized, &mut secondary, &mut primary);

    ((primary as u64) << 32) | secondary as u64
}
