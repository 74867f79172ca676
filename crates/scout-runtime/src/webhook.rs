//! Terminal callback delivery.
//!
//! Fire-and-forget relative to the run: a delivery failure is recorded on
//! the run record as `callback_error` and never alters the run's terminal
//! status.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Bounded delivery timeout.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivery failures, isolated to the record's `callback_error` field.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The endpoint answered outside 2xx.
    #[error("callback endpoint returned {0}")]
    Status(u16),

    /// Transport-level failure (DNS, connect, timeout).
    #[error("callback delivery failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Terminal notification body.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackPayload {
    /// The run this notification is about.
    pub run_id: String,
    /// Terminal status name.
    pub status: String,
    /// Serialized outcome for completed runs.
    pub result: Option<Value>,
    /// Terminal error for failed/cancelled runs.
    pub error: Option<String>,
}

/// Webhook client with a bounded per-request timeout.
#[derive(Debug, Clone)]
pub struct CallbackDelivery {
    client: reqwest::Client,
}

impl CallbackDelivery {
    /// Build the delivery client.
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// POST the payload to `url`. Non-2xx answers are errors.
    pub async fn deliver(&self, url: &str, payload: &CallbackPayload) -> Result<(), DeliveryError> {
        let response = self.client.post(url).json(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }
        debug!(run_id = %payload.run_id, %url, "callback delivered");
        Ok(())
    }
}

impl Default for CallbackDelivery {
    fn default() -> Self {
        Self::new()
    }
}
