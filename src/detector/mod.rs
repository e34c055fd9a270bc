//! Arbitrage detection: fee models, profit floors, pair evaluation.

pub mod engine;
pub mod fees;
pub mod types;

pub use engine::Detector;
pub use fees::FeeModel;
pub use types::{Opportunity, OpportunityKey};
