#![recursion_limit = "256"]

pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::ReqwestTransport;
pub use config::Settings;
pub use core::{ApiVersion, Operation, Outcome, SmAdapter};
pub use utils::error::{AdapterError, Result};
