use std::time::Duration;

use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    error::KafkaResult,
    message::{Header, OwnedHeaders},
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
};

use crate::config::DispatchConfig;
use super::publisher::{EventPublisher, OutboundRecord, PublishError};

// ============================================================================
// Redpanda Publisher
// ============================================================================
//
// Send-and-wait producer: every publish awaits the delivery report, so a
// record counts as emitted only once the broker has persisted it
// (acks=all). Delivery timeout is owned by librdkafka (message.timeout.ms).
//
// ============================================================================

pub struct RedpandaClient {
    producer: FutureProducer,
    queue_timeout: Duration,
}

impl RedpandaClient {
    pub fn new(config: &DispatchConfig) -> KafkaResult<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("message.timeout.ms", config.producer_timeout_ms.to_string())
            .set("acks", "all")
            .create()?;

        Ok(Self {
            producer,
            queue_timeout: config.producer_timeout(),
        })
    }
}

fn kafka_headers(headers: &[(String, String)]) -> OwnedHeaders {
    headers
        .iter()
        .fold(OwnedHeaders::new_with_capacity(headers.len()), |acc, (key, value)| {
            acc.insert(Header {
                key: key.as_str(),
                value: Some(value.as_str()),
            })
        })
}

#[async_trait]
impl EventPublisher for RedpandaClient {
    async fn publish(&self, record: OutboundRecord) -> Result<(), PublishError> {
        let kafka_record = FutureRecord::to(&record.topic)
            .key(record.key.as_str())
            .payload(record.payload.as_slice())
            .headers(kafka_headers(&record.headers));

        match self
            .producer
            .send(kafka_record, Timeout::After(self.queue_timeout))
            .await
        {
            Ok(_) => {
                tracing::debug!(
                    topic = %record.topic,
                    key = %record.key,
                    "Published to Redpanda"
                );
                Ok(())
            }
            Err((e, _)) => {
                tracing::error!(
                    error = %e,
                    topic = %record.topic,
                    key = %record.key,
                    "Failed to publish to Redpanda"
                );
                Err(PublishError::Broker {
                    topic: record.topic,
                    source: e,
                })
            }
        }
    }
}
