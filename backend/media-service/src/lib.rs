//! Media Service
//!
//! Paginated FlourishTalents content listings (stream, listen, blog, gallery,
//! resources) served through an in-memory query cache, merged with the
//! caller's likes and follows. Like/follow changes published by any instance
//! invalidate cached interaction state everywhere.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;

// Public re-exports
pub use config::Config;
pub use error::{AppError, Result};
