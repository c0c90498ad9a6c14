pub mod config;
pub mod error;

pub use config::UnifuzzConfig;
pub use error::{UfhError, UfhResult};
