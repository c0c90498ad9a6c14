use std::fmt;

use crate::codec;

/// Exclusive upper bound of a block hash (`i32::MAX`).
pub const BLOCK_HASH_MODULO: i64 = i32::MAX as i64;

/// One content-defined block of a fingerprint.
///
/// Positions are zero-based and inclusive. They are not part of the encoded
/// form: a parsed block gets them back from the running offset of the blocks
/// before it. Equality therefore only looks at hash and size.
#[derive(Debug, Clone, Copy, Eq)]
pub struct Block {
    hash: u32,
    start: u64,
    end: u64,
}

impl Block {
    pub(crate) fn new(hash: u32, start: u64, end: u64) -> Self {
        debug_assert!(i64::from(hash) < BLOCK_HASH_MODULO);
        debug_assert!(end >= start);
        Self { hash, start, end }
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of bytes covered, always >= 1
    pub fn size(&self) -> u64 {
        self.end - self.start + 1
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.size() == other.size()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::with_capacity(codec::BLOCK_MAX_CHARS);
        codec::write_block(&mut out, self);
        f.write_str(&out)
    }
}
