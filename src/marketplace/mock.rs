//! In-memory adapter for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::FetchError;

use super::{ItemFilter, MarketplaceAdapter, MarketplaceId, RawListing};

/// Failure modes the mock can simulate.
#[derive(Debug, Clone)]
pub enum MockFailure {
    /// Fail with a parse error carrying this message.
    Parse(String),
    /// Fail as rate-limited with this retry hint.
    RateLimited(u64),
}

/// Adapter that serves canned listings, for exercising the pipeline
/// without a network.
pub struct MockAdapter {
    id: MarketplaceId,
    listings: Mutex<Vec<RawListing>>,
    failure: Mutex<Option<MockFailure>>,
}

impl MockAdapter {
    /// Create a mock for the given marketplace with no listings.
    pub fn new(id: MarketplaceId) -> Self {
        Self {
            id,
            listings: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    /// Create a mock preloaded with listings.
    pub fn with_listings(id: MarketplaceId, listings: Vec<RawListing>) -> Self {
        let mock = Self::new(id);
        mock.set_listings(listings);
        mock
    }

    /// Replace the canned listings.
    pub fn set_listings(&self, listings: Vec<RawListing>) {
        *self.listings.lock().unwrap() = listings;
    }

    /// Make the next fetches fail; `None` restores success.
    pub fn set_failure(&self, failure: Option<MockFailure>) {
        *self.failure.lock().unwrap() = failure;
    }
}

#[async_trait]
impl MarketplaceAdapter for MockAdapter {
    fn id(&self) -> MarketplaceId {
        self.id
    }

    async fn fetch_prices(&self, filter: &ItemFilter) -> Result<Vec<RawListing>, FetchError> {
        if let Some(failure) = self.failure.lock().unwrap().clone() {
            return Err(match failure {
                MockFailure::Parse(msg) => FetchError::Parse(msg),
                MockFailure::RateLimited(retry_after_secs) => {
                    FetchError::RateLimited { retry_after_secs }
                }
            });
        }

        let listings = self.listings.lock().unwrap();
        Ok(listings
            .iter()
            .filter(|l| filter.names.is_empty() || filter.names.contains(&l.descriptor))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn listing(descriptor: &str) -> RawListing {
        RawListing {
            descriptor: descriptor.to_string(),
            price: dec!(10.00),
            currency: "USD".to_string(),
            listing_count: 1,
            listing_ref: None,
        }
    }

    #[tokio::test]
    async fn filters_by_requested_names() {
        let mock = MockAdapter::with_listings(
            MarketplaceId::CsFloat,
            vec![listing("a"), listing("b")],
        );
        let got = mock
            .fetch_prices(&ItemFilter::names(["a"]))
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].descriptor, "a");
    }

    #[tokio::test]
    async fn failure_mode_surfaces_as_fetch_error() {
        let mock = MockAdapter::new(MarketplaceId::Steam);
        mock.set_failure(Some(MockFailure::RateLimited(30)));
        let err = mock.fetch_prices(&ItemFilter::default()).await.unwrap_err();
        assert!(matches!(err, FetchError::RateLimited { retry_after_secs: 30 }));
    }
}
