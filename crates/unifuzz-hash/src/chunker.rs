//! Rolling-hash chunking
//!
//! Two hashes are rolled over the input in a single pass:
//!   - a window hash over the last `WINDOW_SIZE` bytes, modulo `factor`
//!   - a block hash over every byte since the last boundary, modulo
//!     `BLOCK_HASH_MODULO`
//!
//! A boundary falls on byte `i` when the window is full and its hash equals
//! `factor - 1`, or when `i` is the last byte of the input. Boundaries only
//! depend on the window contents, so an edit moves at most the blocks around
//! it and the rest of the input chunks the same way.
//!
//! The trigger fires with probability ~1/factor per byte, which makes the
//! mean block size roughly `factor` bytes.

use std::path::Path;

use unifuzz_core::{UfhError, UfhResult};

use crate::block::{Block, BLOCK_HASH_MODULO};
use crate::fuzzy::UniformFuzzyHash;

/// Rolling window length: the width of a machine integer plus 5 bytes.
pub const WINDOW_SIZE: usize = std::mem::size_of::<u64>() + 5;

const BYTE_BITS: u32 = 8;

/// Validate a chunking factor: odd, >= 3 and small enough that every
/// intermediate window value fits in an `i64`.
pub fn check_factor(factor: i64) -> UfhResult<u32> {
    if factor & 1 != 1 || factor < 3 || factor > i64::from(u32::MAX) {
        return Err(UfhError::InvalidFactor(factor));
    }
    Ok(factor as u32)
}

/// `256^bytes mod modulo`
fn shift_bytes_mod(bytes: usize, modulo: i64) -> i64 {
    let mut ret = 1i64;
    for _ in 0..bytes {
        ret = (ret << BYTE_BITS) % modulo;
    }
    ret
}

struct RollingWindow {
    modulo: i64,
    /// Weight of the byte leaving the window.
    shifter: i64,
    hash: i64,
}

impl RollingWindow {
    fn new(factor: u32) -> Self {
        let modulo = i64::from(factor);
        Self {
            modulo,
            shifter: shift_bytes_mod(WINDOW_SIZE, modulo),
            hash: 0,
        }
    }

    fn roll(&mut self, incoming: u8, outgoing: Option<u8>) {
        let mut hash = (self.hash << BYTE_BITS) + i64::from(incoming);
        if let Some(outgoing) = outgoing {
            hash -= i64::from(outgoing) * self.shifter;
        }
        hash %= self.modulo;
        // `%` truncates, so a negative dividend leaves a negative remainder
        if hash < 0 {
            hash += self.modulo;
        }
        self.hash = hash;
    }
}

/// Compute the uniform fuzzy hash of `data`.
///
/// `factor` is the relation between the data length and the mean number of
/// blocks. It must be odd and greater than 2. Empty input yields a
/// fingerprint without blocks.
pub fn compute(data: &[u8], factor: i64) -> UfhResult<UniformFuzzyHash> {
    let factor = check_factor(factor)?;

    // Any value in [0, factor) would do
    let trigger = i64::from(factor) - 1;

    let mut window = RollingWindow::new(factor);
    let mut block_hash = 0i64;
    let mut block_start = 0usize;
    let mut blocks = Vec::with_capacity(data.len() / factor as usize + 1);

    for (i, &datum) in data.iter().enumerate() {
        let outgoing = i.checked_sub(WINDOW_SIZE).map(|j| data[j]);
        window.roll(datum, outgoing);

        block_hash = ((block_hash << BYTE_BITS) + i64::from(datum)) % BLOCK_HASH_MODULO;

        let window_full = i + 1 >= WINDOW_SIZE;
        let triggered = window_full && window.hash == trigger;
        let last_byte = i + 1 == data.len();

        if triggered || last_byte {
            blocks.push(Block::new(block_hash as u32, block_start as u64, i as u64));
            block_hash = 0;
            block_start = i + 1;
        }
    }

    tracing::debug!(
        factor,
        data_size = data.len(),
        blocks = blocks.len(),
        "computed uniform fuzzy hash"
    );

    Ok(UniformFuzzyHash::from_parts(factor, data.len() as u64, blocks))
}

/// Read a file from disk and compute its fingerprint.
pub fn compute_file(path: &Path, factor: i64) -> UfhResult<UniformFuzzyHash> {
    let data = std::fs::read(path).map_err(|e| {
        UfhError::Io(std::io::Error::new(
            e.kind(),
            format!("reading file for hashing {}: {e}", path.display()),
        ))
    })?;
    compute(&data, factor)
}
