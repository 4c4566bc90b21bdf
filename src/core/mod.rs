//! Core domain types and abstractions

pub mod cache;
pub mod config;
pub mod currency;
pub mod log;
pub mod rates;

// Re-export main types for cleaner imports
pub use currency::{Currency, Snapshot};
pub use rates::{RateBatch, RateProvider};
