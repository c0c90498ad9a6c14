//! unifuzz-hash: uniform fuzzy hashing over content-defined blocks
//!
//! # Overview
//! - `chunker`: rolling-hash block boundaries, stable under local edits
//! - `block`: one (hash, size) block and its byte range
//! - `fuzzy`: the `UniformFuzzyHash` fingerprint
//! - `codec`: canonical `factor:hash/size-hash/size-...` text format
//! - `compare`: similarity scores between two fingerprints
//!
//! This is not a cryptographic hash. Two fingerprints built with the same
//! factor can be compared to estimate how much content they share.

pub mod block;
pub mod chunker;
pub mod codec;
pub mod compare;
pub mod fuzzy;

// Convenience re-exports for the most common operations
pub use block::{Block, BLOCK_HASH_MODULO};
pub use chunker::{check_factor, compute, compute_file, WINDOW_SIZE};
pub use codec::{parse_block, parse_hash};
pub use compare::{compare, compare_many, compare_similarity, SimilarityType};
pub use fuzzy::UniformFuzzyHash;
pub use unifuzz_core::{UfhError, UfhResult};
