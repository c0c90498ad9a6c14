use std::num::ParseIntError;
use thiserror::Error;

pub type UfhResult<T> = Result<T, UfhError>;

#[derive(Debug, Error)]
pub enum UfhError {
    #[error("factor must be odd and greater than two (got {0})")]
    InvalidFactor(i64),

    #[error("hash string is empty")]
    EmptyHashString,

    #[error("hash string does not fit the format factor:blocks: {0:?}")]
    InvalidHashString(String),

    #[error("block string does not fit the format blockHash/blockSize: {0:?}")]
    InvalidBlockString(String),

    #[error("{field} {value:?} is not able to be parsed: {source}")]
    Unparsable {
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("{field} {value} is out of range")]
    OutOfRange { field: &'static str, value: i64 },

    #[error("hash factors cannot be different ({left} vs {right})")]
    FactorMismatch { left: u32, right: u32 },

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UfhError {
    /// True for errors raised while decoding a canonical string.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            UfhError::EmptyHashString
                | UfhError::InvalidHashString(_)
                | UfhError::InvalidBlockString(_)
                | UfhError::Unparsable { .. }
                | UfhError::OutOfRange { .. }
        )
    }
}
