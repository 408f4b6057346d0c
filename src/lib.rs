pub mod analysis;
pub mod args;
mod cache;
pub mod commands;
mod config;
mod error;
pub mod load;
mod mcp;
pub mod model;
#[cfg(test)]
mod test;
mod utils;

pub use cache::{CacheStatus, DatasetCache, Fingerprint};
pub use config::Config;
pub use error::{Error, ErrorType, IntoResult, Result};
