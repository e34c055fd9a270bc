//! Cross-marketplace arbitrage monitor for CS2 skins.
//!
//! Polls several skin marketplaces for lowest listing prices, normalizes
//! every listing onto a canonical item identity, and detects spreads that
//! stay profitable after the sell side's fees:
//!
//! ```text
//! CSFloat ask:           $10.00
//! Steam ask:             $13.50
//! Steam nets (15% fee):  $11.47
//! ──────────────────────────────
//! Net profit:            $1.47 per item (14.7%)
//! ```
//!
//! All money is integer minor units of the settlement currency; decimals
//! exist only at the adapter boundary where marketplace payloads are
//! parsed and FX-converted.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`catalog`]: Item identity resolution and the watchlist
//! - [`marketplace`]: Marketplace adapters and shared HTTP plumbing
//! - [`store`]: Latest prices, bounded history, marketplace health
//! - [`detector`]: Fee models and spread detection
//! - [`alert`]: Alert dedup and delivery
//! - [`scheduler`]: Poll and detection loops
//! - [`api`]: HTTP API for health and price lookups
//! - [`utils`]: Utility functions

pub mod alert;
pub mod api;
pub mod catalog;
pub mod config;
pub mod detector;
pub mod error;
pub mod marketplace;
pub mod metrics;
pub mod scheduler;
pub mod store;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
