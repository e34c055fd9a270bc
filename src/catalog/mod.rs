//! Item catalog and identity resolution.

pub mod resolver;
pub mod types;
pub mod watchlist;

pub use resolver::Resolver;
pub use types::{CanonicalItem, ItemId, Wear};
pub use watchlist::default_watchlist;
