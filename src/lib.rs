pub mod types;
pub mod events;
pub mod price_infra;
pub mod broadcast;
pub mod core;
pub mod api;
pub mod config;
pub mod observability;
pub mod utils;
pub mod service;
pub mod error;

pub use crate::config::RelayConfig;
pub use crate::error::{Error, FetchError, Result};
pub use crate::service::RelayService;
