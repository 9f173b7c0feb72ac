//! Plaza Core Library
//!
//! This crate provides shared types, errors, and configuration for the Plaza
//! offline cache engine.

pub mod config;
pub mod error;
pub mod ttl;
pub mod types;

pub use config::AppConfig;
pub use error::{PlazaError, PlazaResult};
pub use types::CacheName;
