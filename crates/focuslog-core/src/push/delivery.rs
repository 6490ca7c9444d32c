//! Push delivery seam.
//!
//! The dispatcher only needs `send(subscription, payload)` with a three-way
//! outcome; everything behind that -- transport, encryption, relays -- is the
//! implementation's business. [`HttpPushDelivery`] is the bundled transport:
//! it POSTs the payload to the subscription endpoint and reads 404/410 as
//! "this subscription is permanently gone".

use super::subscription::PushSubscription;

/// Result of one delivery attempt to one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// The endpoint rejected the subscription permanently; deactivate it.
    Gone,
    /// Any other failure; contained to this subscription and retried on a
    /// later pass.
    Failed(String),
}

/// Push transport implemented by delivery backends (and test doubles).
pub trait PushDelivery {
    fn send(&self, subscription: &PushSubscription, payload: &str) -> DeliveryOutcome;
}

/// HTTP transport posting the JSON payload straight to the subscription
/// endpoint. Web-push payload encryption is left to the endpoint side (a
/// relay or a service worker dev harness); `TTL` and `Urgency` follow the
/// web-push conventions.
pub struct HttpPushDelivery {
    client: reqwest::blocking::Client,
    ttl_secs: u32,
}

impl HttpPushDelivery {
    pub fn new(ttl_secs: u32) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            ttl_secs,
        }
    }
}

impl Default for HttpPushDelivery {
    fn default() -> Self {
        Self::new(60)
    }
}

impl PushDelivery for HttpPushDelivery {
    fn send(&self, subscription: &PushSubscription, payload: &str) -> DeliveryOutcome {
        let response = self
            .client
            .post(&subscription.endpoint)
            .header("TTL", self.ttl_secs.to_string())
            .header("Urgency", "normal")
            .header("Content-Type", "application/json")
            .body(payload.to_string())
            .send();

        match response {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    DeliveryOutcome::Delivered
                } else if status == reqwest::StatusCode::NOT_FOUND
                    || status == reqwest::StatusCode::GONE
                {
                    DeliveryOutcome::Gone
                } else {
                    DeliveryOutcome::Failed(format!("push endpoint returned HTTP {status}"))
                }
            }
            Err(err) => DeliveryOutcome::Failed(err.to_string()),
        }
    }
}
