use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use unifuzz_core::UfhError;

use crate::block::Block;
use crate::codec;

/// A uniform fuzzy hash: the chunking factor, the input length and the
/// ordered blocks covering that input.
///
/// Built by [`crate::compute`] or parsed with [`crate::parse_hash`] /
/// `str::parse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformFuzzyHash {
    factor: u32,
    data_size: u64,
    blocks: Vec<Block>,
}

impl UniformFuzzyHash {
    pub(crate) fn from_parts(factor: u32, data_size: u64, blocks: Vec<Block>) -> Self {
        Self {
            factor,
            data_size,
            blocks,
        }
    }

    pub fn factor(&self) -> u32 {
        self.factor
    }

    pub fn data_size(&self) -> u64 {
        self.data_size
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }
}

impl fmt::Display for UniformFuzzyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&codec::encode_hash(self))
    }
}

impl FromStr for UniformFuzzyHash {
    type Err = UfhError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        codec::parse_hash(s)
    }
}

/// Serialized as the canonical string. A fingerprint without blocks
/// (empty input) encodes as `"factor:"`, which the parser rejects, so it
/// does not deserialize back.
impl Serialize for UniformFuzzyHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&codec::encode_hash(self))
    }
}

impl<'de> Deserialize<'de> for UniformFuzzyHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        codec::parse_hash(&s).map_err(de::Error::custom)
    }
}
