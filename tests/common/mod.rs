#![allow(dead_code)]

use cloud_logging_layer::{CloudLoggingHandler, CloudLoggingLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

#[path = "../../src/test_support.rs"]
mod test_support;

pub use test_support::Buffer;

/// Run `f` under a subscriber writing Cloud Logging JSON for `project_id`
/// and return the emitted lines.
pub fn capture(project_id: &str, f: impl FnOnce()) -> Vec<serde_json::Value> {
    let buffer = Buffer::default();
    let handler = CloudLoggingHandler::with_writer(project_id, buffer.clone());
    let subscriber = Registry::default().with(CloudLoggingLayer::new(handler));
    tracing::subscriber::with_default(subscriber, f);
    buffer.lines()
}
