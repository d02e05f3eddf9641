use std::fmt;
use std::sync::Arc;

use chrono::Utc;

use crate::messages::dead_letter_topic;
use crate::messaging::{EventPublisher, OutboundRecord, PublishError};
use super::record::InboundRecord;

// ============================================================================
// Dead Letter Publisher
// ============================================================================
//
// Republishes the original record, payload bytes and key untouched, to
// `<topic>.DLT`. Failure context travels in headers so the record can be
// inspected and replayed by hand.
//
// ============================================================================

pub const ORIGINAL_TOPIC_HEADER: &str = "dlt-original-topic";
pub const ORIGINAL_PARTITION_HEADER: &str = "dlt-original-partition";
pub const ORIGINAL_OFFSET_HEADER: &str = "dlt-original-offset";
pub const EXCEPTION_MESSAGE_HEADER: &str = "dlt-exception-message";
pub const FAILURE_KIND_HEADER: &str = "dlt-failure-kind";
pub const FAILED_AT_HEADER: &str = "dlt-failed-at";

/// Why a record ended up on the dead-letter topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Payload could not be decoded into an OrderCreated
    Deserialization,
    /// Handler signalled a non-retryable failure
    NotRetryable,
    /// Handler kept signalling retryable failures until the budget ran out
    RetriesExhausted,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Deserialization => "deserialization",
            FailureKind::NotRetryable => "not_retryable",
            FailureKind::RetriesExhausted => "retries_exhausted",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct DeadLetterPublisher {
    publisher: Arc<dyn EventPublisher>,
}

impl DeadLetterPublisher {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    pub async fn publish(
        &self,
        record: &InboundRecord,
        kind: FailureKind,
        error: &(dyn fmt::Display + Sync),
    ) -> Result<(), PublishError> {
        let topic = dead_letter_topic(&record.topic);

        let dead_letter = OutboundRecord::new(topic.as_str(), record.key.as_str(), record.payload.clone())
            .with_header(ORIGINAL_TOPIC_HEADER, record.topic.as_str())
            .with_header(ORIGINAL_PARTITION_HEADER, record.partition.to_string())
            .with_header(ORIGINAL_OFFSET_HEADER, record.offset.to_string())
            .with_header(EXCEPTION_MESSAGE_HEADER, error.to_string())
            .with_header(FAILURE_KIND_HEADER, kind.as_str())
            .with_header(FAILED_AT_HEADER, Utc::now().to_rfc3339());

        self.publisher.publish(dead_letter).await?;

        tracing::error!(
            topic = %topic,
            key = %record.key,
            partition = record.partition,
            offset = record.offset,
            failure_kind = %kind,
            error = %error,
            "💀 Record routed to dead-letter topic"
        );
        Ok(())
    }
}
