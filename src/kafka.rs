use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

#[cfg(feature = "kafka")]
use log::{error, info};
#[cfg(feature = "kafka")]
use rdkafka::config::ClientConfig;
#[cfg(feature = "kafka")]
use rdkafka::error::KafkaError;
#[cfg(feature = "kafka")]
use rdkafka::producer::{FutureProducer, FutureRecord};
#[cfg(feature = "kafka")]
use rdkafka::util::Timeout;
#[cfg(feature = "kafka")]
use std::time::Duration;

// Kafka configuration
#[derive(Clone, Debug)]
pub struct KafkaConfig {
    pub bootstrap_servers: Option<String>,
    pub client_id: String,
}

impl KafkaConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let bootstrap_servers = std::env::var("KAFKA_BOOTSTRAP_SERVERS")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let client_id = std::env::var("KAFKA_CLIENT_ID")
            .unwrap_or_else(|_| "kitchencloud-service".to_string());

        Self {
            bootstrap_servers,
            client_id,
        }
    }
}

#[derive(Clone)]
pub enum KafkaProducer {
    #[cfg(feature = "kafka")]
    Real(RdKafkaProducer),
    Dummy(DummyKafkaProducer),
    Recording(RecordingProducer),
}

impl KafkaProducer {
    pub async fn send<T: Serialize>(&self, topic: &str, key: Option<&str>, payload: &T) -> Result<(), String> {
        match self {
            #[cfg(feature = "kafka")]
            KafkaProducer::Real(producer) => producer.send(topic, key, payload).await,
            KafkaProducer::Dummy(producer) => producer.send(topic, key, payload).await,
            KafkaProducer::Recording(producer) => producer.send(topic, key, payload).await,
        }
    }
}

#[cfg(feature = "kafka")]
#[derive(Clone)]
pub struct RdKafkaProducer {
    producer: FutureProducer,
}

#[cfg(feature = "kafka")]
impl RdKafkaProducer {
    pub fn new(bootstrap_servers: &str, client_id: &str) -> Result<Self, KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("client.id", client_id)
            .set("message.timeout.ms", "5000")
            .set("acks", "all")
            .create()?;

        Ok(Self { producer })
    }

    pub async fn send<T: Serialize>(&self, topic: &str, key: Option<&str>, payload: &T) -> Result<(), String> {
        let json_payload = serde_json::to_string(payload).map_err(|e| format!("Serialization error: {}", e))?;

        let record = match key {
            Some(k) => FutureRecord::to(topic).key(k).payload(&json_payload),
            None => FutureRecord::to(topic).payload(&json_payload),
        };

        match self.producer.send(record, Timeout::After(Duration::from_secs(5))).await {
            Ok((partition, offset)) => {
                info!("Event sent to {} partition {} offset {}", topic, partition, offset);
                Ok(())
            }
            Err((err, _)) => {
                error!("Failed to send event to Kafka: {}", err);
                Err(format!("Failed to send message: {}", err))
            }
        }
    }
}

/// Picks a producer for the configured environment. Without brokers, or
/// without the `kafka` feature, events are only logged.
pub fn create_producer(config: &KafkaConfig) -> KafkaProducer {
    match &config.bootstrap_servers {
        #[cfg(feature = "kafka")]
        Some(servers) => match RdKafkaProducer::new(servers, &config.client_id) {
            Ok(producer) => KafkaProducer::Real(producer),
            Err(e) => {
                error!("Failed to create Kafka producer: {}. Using dummy producer.", e);
                KafkaProducer::Dummy(DummyKafkaProducer)
            }
        },
        #[cfg(not(feature = "kafka"))]
        Some(servers) => {
            warn!(
                "KAFKA_BOOTSTRAP_SERVERS={} ignored, built without the kafka feature",
                servers
            );
            KafkaProducer::Dummy(DummyKafkaProducer)
        }
        None => KafkaProducer::Dummy(DummyKafkaProducer),
    }
}

// Fallback when Kafka is unavailable
#[derive(Clone, Default)]
pub struct DummyKafkaProducer;

impl DummyKafkaProducer {
    pub async fn send<T: Serialize>(&self, topic: &str, key: Option<&str>, payload: &T) -> Result<(), String> {
        warn!("Kafka disabled, event for topic '{}' not sent", topic);
        if let Ok(json) = serde_json::to_string(payload) {
            debug!("Would have sent: key={:?}, payload={}", key, json);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMessage {
    pub topic: String,
    pub key: Option<String>,
    pub payload: serde_json::Value,
}

/// Keeps every message in memory. Topics marked unavailable refuse sends,
/// like a broker that is down for them.
#[derive(Clone, Default)]
pub struct RecordingProducer {
    messages: Arc<Mutex<Vec<RecordedMessage>>>,
    unavailable: Vec<String>,
}

impl RecordingProducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unavailable_topic(mut self, topic: &str) -> Self {
        self.unavailable.push(topic.to_string());
        self
    }

    pub async fn send<T: Serialize>(&self, topic: &str, key: Option<&str>, payload: &T) -> Result<(), String> {
        if self.unavailable.iter().any(|t| t == topic) {
            return Err(format!("Topic '{}' unavailable", topic));
        }
        let payload = serde_json::to_value(payload).map_err(|e| format!("Serialization error: {}", e))?;
        self.messages.lock().await.push(RecordedMessage {
            topic: topic.to_string(),
            key: key.map(str::to_string),
            payload,
        });
        Ok(())
    }

    pub async fn messages(&self) -> Vec<RecordedMessage> {
        self.messages.lock().await.clone()
    }
}

// Event types for Kafka messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    AccountRegistered,
    ModerationRequested,
    AccountApproved,
    AccountRejected,
    AccountLogin,
}

// Generic event envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct Event<T> {
    pub event_type: EventType,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub payload: T,
}

impl<T> Event<T> {
    pub fn new(event_type: EventType, payload: T) -> Self {
        Self {
            event_type,
            timestamp: chrono::Utc::now(),
            payload,
        }
    }
}

pub const TOPIC_ACCOUNT_EVENTS: &str = "account-events";
pub const TOPIC_MODERATION_EVENTS: &str = "moderation-events";
pub const TOPIC_AUTH_EVENTS: &str = "auth-events";

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn recording_producer_keeps_messages_in_order() {
        let producer = RecordingProducer::new();
        let wrapped = KafkaProducer::Recording(producer.clone());

        wrapped
            .send(TOPIC_AUTH_EVENTS, Some("1"), &Event::new(EventType::AccountLogin, "a"))
            .await
            .unwrap();
        wrapped.send(TOPIC_ACCOUNT_EVENTS, None, &"b").await.unwrap();

        let messages = producer.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].topic, TOPIC_AUTH_EVENTS);
        assert_eq!(messages[0].key.as_deref(), Some("1"));
        assert_eq!(messages[0].payload["event_type"], "AccountLogin");
        assert_eq!(messages[1].payload, serde_json::json!("b"));
    }

    #[test]
    fn falls_back_to_dummy_without_brokers() {
        let config = KafkaConfig {
            bootstrap_servers: None,
            client_id: "test".into(),
        };
        assert!(matches!(create_producer(&config), KafkaProducer::Dummy(_)));
    }
}
