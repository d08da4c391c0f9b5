//! Domain event publishing. NATS when connected, the log otherwise.

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub async fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in events {
            let subject = event.subject();
            let Some(client) = &self.nats else {
                tracing::info!(%subject, ?event, "domain event");
                continue;
            };
            let payload = match serde_json::to_vec(&event) {
                Ok(payload) => payload,
                Err(e) => { tracing::warn!(%subject, error = %e, "event not serializable"); continue; }
            };
            if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                tracing::warn!(%subject, error = %e, "event publish failed");
            }
        }
    }
}
