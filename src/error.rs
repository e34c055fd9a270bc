//! Unified error types for the arbitrage monitor.

use thiserror::Error;

/// Top-level error type for the monitor.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading or validation error. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Marketplace fetch error.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Item identity resolution error.
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors. Any of these halts startup before polling begins,
/// since a bad fee model or threshold corrupts every subsequent detection.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment deserialization failed.
    #[error("environment error: {0}")]
    Env(#[from] envy::Error),

    /// A required setting is missing.
    #[error("missing configuration: {0}")]
    Missing(String),

    /// A setting is present but invalid.
    #[error("invalid configuration for {field}: {reason}")]
    Invalid {
        /// The offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Marketplace fetch errors. Never fatal: the scheduler contains these,
/// records a failed poll, and retries with backoff at the next interval.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Rate limited by the marketplace API.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Authentication rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Non-success HTTP status.
    #[error("marketplace returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body snippet.
        body: String,
    },

    /// Network or transport failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response did not match the expected shape.
    #[error("failed to parse marketplace response: {0}")]
    Parse(String),

    /// Fetch exceeded its deadline.
    #[error("fetch timed out after {elapsed_ms}ms")]
    Timeout {
        /// Elapsed milliseconds before the deadline fired.
        elapsed_ms: u64,
    },

    /// A listing used a currency with no configured conversion rate.
    #[error("no FX rate configured for currency {0}")]
    UnknownCurrency(String),
}

/// Identity resolution errors. A wrong mapping corrupts arbitrage detection
/// and is worse than a dropped record, so unresolvable descriptors are
/// quarantined rather than guessed at.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Descriptor was empty after stripping decorations.
    #[error("empty item descriptor")]
    EmptyDescriptor,

    /// Descriptor did not match the `Weapon | Skin (Wear)` shape.
    #[error("unparseable item descriptor: {0}")]
    Unparseable(String),

    /// The wear/exterior token was not recognized.
    #[error("unknown wear tier {wear:?} in descriptor {descriptor:?}")]
    UnknownWear {
        /// The unrecognized wear token.
        wear: String,
        /// The full descriptor.
        descriptor: String,
    },
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;
