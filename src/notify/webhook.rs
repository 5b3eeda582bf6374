//! WebhookNotifier implementation

use crate::{Error, Result};
use serde_json::json;
use std::time::Duration;

/// Retries allowed on rate-limit (429) responses, per send
const MAX_RATE_LIMIT_RETRIES: u32 = 1;

/// Fallback wait when a 429 response carries no usable Retry-After header
const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(1);

/// Webhook chat-notification client
///
/// The target URL is bound at construction; each [`WebhookNotifier::send`]
/// issues one ephemeral HTTP request (no persisted connection state) with
/// a single bounded retry on rate-limit responses.
///
/// # Examples
///
/// ```no_run
/// use relaykit::WebhookNotifier;
/// use serde_json::json;
///
/// # fn example() -> relaykit::Result<()> {
/// let notifier = WebhookNotifier::new("https://hooks.example.com/T000/B000/XXX");
/// notifier.send(&json!([
///     {"type": "section", "text": {"type": "mrkdwn", "text": "deploy finished"}}
/// ]))?;
/// # Ok(())
/// # }
/// ```
pub struct WebhookNotifier {
    url: String,
}

impl WebhookNotifier {
    /// Create a notifier bound to a webhook URL
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Send one structured message.
    ///
    /// The payload carries a required fallback `text` field alongside the
    /// caller-supplied `blocks`. A 429 response is retried once (honoring
    /// the Retry-After header when the server supplies one); success
    /// requires HTTP status 200 exactly. Any other status, and any
    /// transport-level failure, surfaces as [`Error::Notification`].
    pub fn send(&self, blocks: &serde_json::Value) -> Result<()> {
        let payload = json!({
            "text": "fallback",
            "blocks": blocks,
        });

        let mut attempt = 0;
        loop {
            match ureq::post(&self.url).send_json(&payload) {
                Ok(response) if response.status() == 200 => {
                    tracing::debug!(url = %self.url, "notification delivered");
                    return Ok(());
                }
                Ok(response) => {
                    return Err(status_error(response.status(), response));
                }
                Err(ureq::Error::Status(429, response)) if attempt < MAX_RATE_LIMIT_RETRIES => {
                    attempt += 1;
                    let wait = retry_after(&response).unwrap_or(DEFAULT_RETRY_WAIT);
                    tracing::debug!(attempt, wait_secs = wait.as_secs(), "rate limited, retrying");
                    std::thread::sleep(wait);
                }
                Err(ureq::Error::Status(code, response)) => {
                    return Err(status_error(code, response));
                }
                Err(err) => {
                    return Err(Error::Notification(format!(
                        "transport failure sending to webhook: {}",
                        err
                    )));
                }
            }
        }
    }
}

fn status_error(code: u16, response: ureq::Response) -> Error {
    let body = response.into_string().unwrap_or_default();
    Error::Notification(format!(
        "request to webhook returned an error {}, the response is: {}",
        code, body
    ))
}

fn retry_after(response: &ureq::Response) -> Option<Duration> {
    response
        .header("Retry-After")
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failure_maps_to_notification_error() {
        // Nothing listens on this port.
        let notifier = WebhookNotifier::new("http://127.0.0.1:1/hook");
        let err = notifier.send(&json!([])).unwrap_err();
        match err {
            Error::Notification(message) => assert!(message.contains("transport failure")),
            other => panic!("expected notification error, got {:?}", other),
        }
    }
}
