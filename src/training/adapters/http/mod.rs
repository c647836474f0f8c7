//! HTTP adapters: the training host protocol client and the model-ready
//! webhook.

mod client;
mod webhook;

pub use client::HttpTrainingHost;
pub use webhook::WebhookModelReadyNotifier;
