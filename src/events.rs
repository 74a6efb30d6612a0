use crate::kafka::{
    Event, EventType, KafkaProducer, TOPIC_ACCOUNT_EVENTS, TOPIC_AUTH_EVENTS, TOPIC_MODERATION_EVENTS,
};
use crate::models::{Account, ApprovalState, Decision, ModerationEntry, Role};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// Event payloads
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountRegisteredEvent {
    pub account_id: i64,
    pub email: String,
    pub role: Role,
    pub approval_state: ApprovalState,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecisionEvent {
    pub account_id: i64,
    pub email: String,
    pub role: Role,
    pub decision: Decision,
    pub decided_by: String,
    pub decided_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountLoginEvent {
    pub account_id: i64,
    pub email: String,
    pub role: Role,
    pub ip_address: Option<String>,
    pub login_timestamp: chrono::DateTime<chrono::Utc>,
}

// Publishes workflow events. Delivery is best-effort; callers log failures
// and carry on.
#[derive(Clone)]
pub struct EventPublisher {
    producer: Arc<KafkaProducer>,
}

impl EventPublisher {
    pub fn new(producer: Arc<KafkaProducer>) -> Self {
        Self { producer }
    }

    pub async fn publish_account_registered(&self, account: &Account) -> Result<(), String> {
        let key = account.id.to_string();
        let event = Event::new(
            EventType::AccountRegistered,
            AccountRegisteredEvent {
                account_id: account.id,
                email: account.email.clone(),
                role: account.role,
                approval_state: account.approval_state,
            },
        );
        let registered = self.producer.send(TOPIC_ACCOUNT_EVENTS, Some(&key), &event).await;

        // Sent even when the first publish failed.
        let moderation = if account.is_pending() {
            let entry = Event::new(EventType::ModerationRequested, ModerationEntry::from(account));
            self.producer.send(TOPIC_MODERATION_EVENTS, Some(&key), &entry).await
        } else {
            Ok(())
        };

        registered.and(moderation)
    }

    pub async fn publish_decision(&self, account: &Account, decision: Decision) -> Result<(), String> {
        let event_type = match decision {
            Decision::Approve => EventType::AccountApproved,
            Decision::Reject => EventType::AccountRejected,
        };
        let event = Event::new(
            event_type,
            DecisionEvent {
                account_id: account.id,
                email: account.email.clone(),
                role: account.role,
                decision,
                decided_by: account.reviewed_by.clone().unwrap_or_default(),
                decided_at: account.reviewed_at.unwrap_or_else(chrono::Utc::now),
            },
        );

        self.producer
            .send(TOPIC_MODERATION_EVENTS, Some(&account.id.to_string()), &event)
            .await
    }

    pub async fn publish_login(&self, account: &Account, ip_address: Option<String>) -> Result<(), String> {
        let event = Event::new(
            EventType::AccountLogin,
            AccountLoginEvent {
                account_id: account.id,
                email: account.email.clone(),
                role: account.role,
                ip_address,
                login_timestamp: chrono::Utc::now(),
            },
        );

        self.producer
            .send(TOPIC_AUTH_EVENTS, Some(&account.id.to_string()), &event)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kafka::RecordingProducer;
    use crate::store::tests::details;
    use crate::store::IdentityStore;

    #[actix_web::test]
    async fn pending_registration_also_requests_moderation() {
        let store = IdentityStore::new();
        let recorder = RecordingProducer::new();
        let publisher = EventPublisher::new(Arc::new(KafkaProducer::Recording(recorder.clone())));

        let customer = store.register("c@test.com", "h".into(), details(Role::Customer)).unwrap();
        let restaurant = store.register("r@test.com", "h".into(), details(Role::Restaurant)).unwrap();
        publisher.publish_account_registered(&customer).await.unwrap();
        publisher.publish_account_registered(&restaurant).await.unwrap();

        let messages = recorder.messages().await;
        let topics: Vec<_> = messages.iter().map(|m| m.topic.as_str()).collect();
        assert_eq!(
            topics,
            [TOPIC_ACCOUNT_EVENTS, TOPIC_ACCOUNT_EVENTS, TOPIC_MODERATION_EVENTS]
        );
        assert_eq!(messages[2].payload["event_type"], "ModerationRequested");
        assert_eq!(messages[2].payload["payload"]["email"], "r@test.com");
        assert_eq!(messages[2].key.as_deref(), Some(restaurant.id.to_string().as_str()));
    }

    #[actix_web::test]
    async fn moderation_request_survives_a_failed_registration_event() {
        let store = IdentityStore::new();
        let recorder = RecordingProducer::new().with_unavailable_topic(TOPIC_ACCOUNT_EVENTS);
        let publisher = EventPublisher::new(Arc::new(KafkaProducer::Recording(recorder.clone())));

        let restaurant = store.register("r@test.com", "h".into(), details(Role::Restaurant)).unwrap();
        assert!(publisher.publish_account_registered(&restaurant).await.is_err());

        let messages = recorder.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].topic, TOPIC_MODERATION_EVENTS);
        assert_eq!(messages[0].payload["event_type"], "ModerationRequested");
    }
}
