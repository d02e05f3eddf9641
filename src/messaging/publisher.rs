use async_trait::async_trait;
use rdkafka::error::KafkaError;
use thiserror::Error;

use crate::error::DispatchError;
use crate::messages::{OutboundEvent, EVENT_TYPE_HEADER};

// ============================================================================
// Event Publisher
// ============================================================================

/// A record ready to be produced.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRecord {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
    pub headers: Vec<(String, String)>,
}

impl OutboundRecord {
    pub fn new(topic: impl Into<String>, key: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            key: key.into(),
            payload,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to publish to {topic}: {source}")]
    Broker {
        topic: String,
        #[source]
        source: KafkaError,
    },

    #[error("failed to serialize {event_type}: {source}")]
    Serialization {
        event_type: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl From<PublishError> for DispatchError {
    fn from(error: PublishError) -> Self {
        match error {
            PublishError::Broker { .. } => DispatchError::retryable(error),
            PublishError::Serialization { .. } => DispatchError::failed(error),
        }
    }
}

/// Send-and-wait producer.
///
/// `publish` resolves only once the broker has acknowledged the record, so
/// callers that await each publish in turn observe emission order.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, record: OutboundRecord) -> Result<(), PublishError>;
}

/// Serialize `event` and publish it to its topic under `key`.
pub async fn send_event<E: OutboundEvent>(
    publisher: &dyn EventPublisher,
    key: &str,
    event: &E,
) -> Result<(), PublishError> {
    let payload = serde_json::to_vec(event).map_err(|source| PublishError::Serialization {
        event_type: E::event_type(),
        source,
    })?;

    let record = OutboundRecord::new(E::topic(), key, payload)
        .with_header(EVENT_TYPE_HEADER, E::event_type());

    publisher.publish(record).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{DispatchPreparing, DISPATCH_TRACKING_TOPIC};
    use crate::testing::RecordingPublisher;
    use rdkafka::types::RDKafkaErrorCode;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_send_event_sets_topic_key_and_event_type() {
        let publisher = RecordingPublisher::new();
        let order_id = Uuid::new_v4();

        send_event(&publisher, "order-key", &DispatchPreparing { order_id })
            .await
            .unwrap();

        let records = publisher.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].topic, DISPATCH_TRACKING_TOPIC);
        assert_eq!(records[0].key, "order-key");
        assert_eq!(records[0].header(EVENT_TYPE_HEADER), Some("DispatchPreparing"));

        let decoded: DispatchPreparing = serde_json::from_slice(&records[0].payload).unwrap();
        assert_eq!(decoded.order_id, order_id);
    }

    #[test]
    fn test_broker_failure_is_retryable() {
        let error = PublishError::Broker {
            topic: DISPATCH_TRACKING_TOPIC.to_string(),
            source: KafkaError::MessageProduction(RDKafkaErrorCode::MessageTimedOut),
        };
        assert!(DispatchError::from(error).is_retryable());
    }

    #[test]
    fn test_serialization_failure_is_not_retryable() {
        let source = serde_json::from_str::<DispatchPreparing>("not json").unwrap_err();
        let error = PublishError::Serialization { event_type: "DispatchPreparing", source };
        assert!(!DispatchError::from(error).is_retryable());
    }
}
