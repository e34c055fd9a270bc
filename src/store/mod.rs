//! Price storage: latest records, bounded history, marketplace health.

pub mod price_store;
pub mod types;

pub use price_store::PriceStore;
pub use types::{MarketplaceHealth, PriceRecord, UpsertOutcome};
