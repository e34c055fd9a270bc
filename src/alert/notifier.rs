//! Alert delivery channels.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::detector::Opportunity;

/// Alert delivery failure.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP transport failure.
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Webhook endpoint rejected the payload.
    #[error("webhook returned HTTP {status}")]
    Status {
        /// Response status code.
        status: u16,
    },
}

/// A channel opportunities are announced on.
///
/// Delivery is best-effort: a failed notification is logged and dropped,
/// never retried, because the next detection pass re-derives the state
/// anyway.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name for logs.
    fn name(&self) -> &'static str;

    /// Deliver one opportunity alert.
    async fn notify(&self, opportunity: &Opportunity) -> Result<(), NotifyError>;
}

/// Notifier that writes alerts to the structured log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, opportunity: &Opportunity) -> Result<(), NotifyError> {
        info!(
            item_id = %opportunity.item_id,
            buy = %opportunity.buy_marketplace,
            sell = %opportunity.sell_marketplace,
            buy_price = opportunity.buy_price,
            sell_price = opportunity.sell_price,
            net_profit = opportunity.net_profit,
            net_profit_bps = opportunity.net_profit_bps,
            "Arbitrage opportunity"
        );
        Ok(())
    }
}

/// Webhook alert payload.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    event: &'static str,
    opportunity: &'a Opportunity,
}

/// Notifier that POSTs alerts to a configured webhook.
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Create a webhook notifier targeting `url`.
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn notify(&self, opportunity: &Opportunity) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(&self.url)
            .json(&WebhookPayload {
                event: "opportunity",
                opportunity,
            })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(NotifyError::Status {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}
