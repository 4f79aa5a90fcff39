//! Notification dispatch: NATS-backed, with a tracing-only fallback

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::ports::Notifier;
use crate::domain::events::DomainEvent;

pub struct NatsNotifier {
    client: async_nats::Client,
    prefix: String,
}

impl NatsNotifier {
    pub fn new(client: async_nats::Client, prefix: impl Into<String>) -> Self {
        Self { client, prefix: prefix.into() }
    }

    async fn publish(&self, subject: String, payload: &serde_json::Value) {
        match serde_json::to_vec(payload) {
            Ok(bytes) => {
                if let Err(e) = self.client.publish(subject.clone(), bytes.into()).await {
                    warn!(subject = %subject, error = %e, "failed to publish notification");
                }
            }
            Err(e) => warn!(subject = %subject, error = %e, "unserializable notification payload"),
        }
    }
}

#[async_trait]
impl Notifier for NatsNotifier {
    async fn notify(&self, user_id: Uuid, title: &str, body: &str, metadata: serde_json::Value) {
        let payload = serde_json::json!({
            "user_id": user_id,
            "title": title,
            "body": body,
            "metadata": metadata,
        });
        self.publish(format!("{}.notify.{}", self.prefix, user_id), &payload).await;
    }

    async fn broadcast(&self, event: &DomainEvent) {
        match serde_json::to_value(event) {
            Ok(payload) => self.publish(format!("{}.{}", self.prefix, event.subject()), &payload).await,
            Err(e) => warn!(error = %e, "unserializable domain event"),
        }
    }
}

/// Logs instead of delivering; used when no NATS server is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: Uuid, title: &str, body: &str, _metadata: serde_json::Value) {
        info!(user = %user_id, title, body, "notification");
    }

    async fn broadcast(&self, event: &DomainEvent) {
        debug!(subject = event.subject(), "domain event");
    }
}
