//! Core domain + application logic for the maps-to-Waze Telegram bot.
//!
//! This crate is intentionally framework-agnostic. Telegram, the HTTP redirect
//! client and the geocoding service live behind ports (traits) implemented in
//! adapter crates.

pub mod config;
pub mod dedup;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod location;
pub mod logging;
pub mod ports;

pub use errors::{Error, Result};
pub use location::{GeoCoordinate, ResolutionResult, Resolver, StrategyKind};
