//! Webhook notifications

mod webhook;

pub use webhook::WebhookNotifier;
