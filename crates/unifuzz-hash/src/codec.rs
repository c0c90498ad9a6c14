//! Canonical text format
//!
//! ```text
//! fingerprint = factor ":" block *( "-" block )
//! block       = base36(hash) "/" base36(size)
//! ```
//!
//! `factor` is decimal. Hash and size digits are lowercase on output; parsing
//! accepts either case. Byte positions are not stored: each parsed block
//! starts one byte after the end of the previous one.

use unifuzz_core::{UfhError, UfhResult};

use crate::block::{Block, BLOCK_HASH_MODULO};
use crate::chunker::check_factor;
use crate::fuzzy::UniformFuzzyHash;

pub const BLOCK_BASE: u32 = 36;
pub const BLOCK_INNER_SEPARATOR: char = '/';
pub const FACTOR_SEPARATOR: char = ':';
pub const BLOCKS_SEPARATOR: char = '-';

/// Digits of `BLOCK_HASH_MODULO` in base 36 ("zik0zj").
const BLOCK_INT_MAX_CHARS: usize = 6;

/// Capacity hint for one encoded block.
pub const BLOCK_MAX_CHARS: usize = 2 * BLOCK_INT_MAX_CHARS + 1;

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Append `n` in base 36.
pub fn write_base36(out: &mut String, mut n: u64) {
    // u64::MAX has 13 base-36 digits
    let mut buf = [0u8; 13];
    let mut i = buf.len();
    loop {
        i -= 1;
        buf[i] = DIGITS[(n % u64::from(BLOCK_BASE)) as usize];
        n /= u64::from(BLOCK_BASE);
        if n == 0 {
            break;
        }
    }
    out.extend(buf[i..].iter().map(|&b| char::from(b)));
}

pub fn write_block(out: &mut String, block: &Block) {
    write_base36(out, u64::from(block.hash()));
    out.push(BLOCK_INNER_SEPARATOR);
    write_base36(out, block.size());
}

pub fn encode_hash(hash: &UniformFuzzyHash) -> String {
    let mut out = String::with_capacity(12 + hash.blocks().len() * (BLOCK_MAX_CHARS + 1));
    out.push_str(&hash.factor().to_string());
    out.push(FACTOR_SEPARATOR);
    for (i, block) in hash.blocks().iter().enumerate() {
        if i != 0 {
            out.push(BLOCKS_SEPARATOR);
        }
        write_block(&mut out, block);
    }
    out
}

fn parse_int(field: &'static str, value: &str, radix: u32) -> UfhResult<i64> {
    i64::from_str_radix(value, radix).map_err(|source| UfhError::Unparsable {
        field,
        value: value.to_string(),
        source,
    })
}

/// Decode a `hash/size` block whose first byte is at `start`.
pub fn parse_block(block: &str, start: u64) -> UfhResult<Block> {
    let invalid = || UfhError::InvalidBlockString(block.to_string());

    let (hash_str, size_str) = block.rsplit_once(BLOCK_INNER_SEPARATOR).ok_or_else(invalid)?;
    if hash_str.is_empty() {
        return Err(invalid());
    }

    let hash = parse_int("block hash", hash_str, BLOCK_BASE)?;
    if !(0..BLOCK_HASH_MODULO).contains(&hash) {
        return Err(UfhError::OutOfRange {
            field: "block hash",
            value: hash,
        });
    }

    if size_str.is_empty() {
        return Err(invalid());
    }

    let size = parse_int("block size", size_str, BLOCK_BASE)?;
    if size <= 0 {
        return Err(UfhError::OutOfRange {
            field: "block size",
            value: size,
        });
    }

    let end = start
        .checked_add(size as u64 - 1)
        .ok_or(UfhError::OutOfRange {
            field: "block size",
            value: size,
        })?;

    Ok(Block::new(hash as u32, start, end))
}

/// Decode a full `factor:blocks` fingerprint.
///
/// The factor ends at the last `:`. Blocks are then split at each `-` in
/// turn, threading the byte offset from one block to the next.
pub fn parse_hash(hash: &str) -> UfhResult<UniformFuzzyHash> {
    if hash.is_empty() {
        return Err(UfhError::EmptyHashString);
    }
    let invalid = || UfhError::InvalidHashString(hash.to_string());

    let (factor_str, blocks_str) = hash.rsplit_once(FACTOR_SEPARATOR).ok_or_else(invalid)?;
    if factor_str.is_empty() {
        return Err(invalid());
    }

    let factor = check_factor(parse_int("factor", factor_str, 10)?)?;

    if blocks_str.is_empty() {
        return Err(invalid());
    }

    let mut blocks = Vec::new();
    let mut offset = 0u64;
    let mut rest = blocks_str;
    loop {
        let (block_str, tail) = match rest.split_once(BLOCKS_SEPARATOR) {
            Some((block_str, tail)) => (block_str, Some(tail)),
            None => (rest, None),
        };

        let block = parse_block(block_str, offset).map_err(|e| {
            tracing::trace!(block = block_str, offset, "rejecting block: {e}");
            e
        })?;
        offset = block.end().checked_add(1).ok_or(UfhError::OutOfRange {
            field: "block size",
            value: block.size() as i64,
        })?;
        blocks.push(block);

        match tail {
            Some(tail) => rest = tail,
            None => break,
        }
    }

    Ok(UniformFuzzyHash::from_parts(factor, offset, blocks))
}
