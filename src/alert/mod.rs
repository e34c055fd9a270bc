//! Opportunity alerting: dedup state machine and delivery channels.

pub mod dispatcher;
pub mod notifier;

pub use dispatcher::{AlertDecision, Dispatcher};
pub use notifier::{LogNotifier, Notifier, NotifyError, WebhookNotifier};
