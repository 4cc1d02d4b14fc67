use async_trait::async_trait;
use foreman_core::{Environment, Result};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::notification::Notification;

/// Errors raised while delivering a notification.
///
/// These never escape the [`Manager`](crate::manager::Manager): a failed
/// delivery is logged and the remaining carriers still get their turn.
#[derive(Debug, Error)]
pub enum CarrierError {
    /// The request never completed (connection, DNS, timeout, …).
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// The remote endpoint answered but refused the notification.
    #[error("Carrier rejected the notification (HTTP {status})")]
    Rejected { status: u16 },
}

/// A delivery channel for rendered notifications.
#[async_trait]
pub trait Carrier: Send + Sync + std::fmt::Debug {
    /// Stable lowercase identifier, matching its `[notifications]` key.
    fn name(&self) -> &str;

    /// Deliver a single notification.
    async fn deliver(&self, notification: &Notification) -> std::result::Result<(), CarrierError>;
}

/// Builds a carrier from its `[notifications.<name>]` options table.
pub type CarrierFactory = fn(&Environment, &Map<String, Value>) -> Result<Box<dyn Carrier>>;

/// Look up the factory for a configured carrier name.
pub fn find_carrier(name: &str) -> Option<CarrierFactory> {
    match name.to_lowercase().as_str() {
        "webhook" => Some(crate::carriers::webhook::WebhookCarrier::from_options),
        _ => None,
    }
}
