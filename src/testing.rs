use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rdkafka::error::KafkaError;
use rdkafka::types::RDKafkaErrorCode;
use uuid::Uuid;

use crate::client::{AvailabilityChecker, StockServiceError};
use crate::error::DispatchError;
use crate::messages::{OrderCreated, EVENT_TYPE_HEADER};
use crate::messaging::{EventPublisher, OutboundRecord, PublishError};

// ============================================================================
// Test Doubles
// ============================================================================
//
// In-memory collaborators for exercising the dispatch stage without a broker
// or a stock service.
//
//   RecordingPublisher -> records every published record, can be told to
//                         fail for a given topic / event type
//   ScriptedChecker    -> replays scripted stock service replies; the last
//                         reply repeats once the script runs out
//
// ============================================================================

pub(crate) fn order_created(item: &str) -> OrderCreated {
    OrderCreated {
        order_id: Uuid::new_v4(),
        item: item.to_string(),
    }
}

// ============================================================================
// Recording Publisher
// ============================================================================

struct FailureRule {
    topic: String,
    event_type: Option<String>,
}

impl FailureRule {
    fn matches(&self, record: &OutboundRecord) -> bool {
        record.topic == self.topic
            && self
                .event_type
                .as_deref()
                .map_or(true, |event_type| record.header(EVENT_TYPE_HEADER) == Some(event_type))
    }
}

#[derive(Default)]
pub(crate) struct RecordingPublisher {
    records: Mutex<Vec<OutboundRecord>>,
    failures: Mutex<Vec<FailureRule>>,
    attempts: AtomicUsize,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every publish to `topic` with a broker error.
    pub fn fail_topic(&self, topic: &str) {
        self.failures.lock().unwrap().push(FailureRule {
            topic: topic.to_string(),
            event_type: None,
        });
    }

    /// Fail publishes of `event_type` on `topic` with a broker error.
    pub fn fail_event(&self, topic: &str, event_type: &str) {
        self.failures.lock().unwrap().push(FailureRule {
            topic: topic.to_string(),
            event_type: Some(event_type.to_string()),
        });
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Successfully published records, in publish order.
    pub fn records(&self) -> Vec<OutboundRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn records_for(&self, topic: &str) -> Vec<OutboundRecord> {
        self.records()
            .into_iter()
            .filter(|record| record.topic == topic)
            .collect()
    }

    /// Event type header of every published record, in publish order.
    pub fn event_types(&self) -> Vec<String> {
        self.records()
            .iter()
            .filter_map(|record| record.header(EVENT_TYPE_HEADER).map(str::to_string))
            .collect()
    }

    /// Publish calls, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, record: OutboundRecord) -> Result<(), PublishError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let failing = self.failures.lock().unwrap().iter().any(|rule| rule.matches(&record));
        if failing {
            return Err(PublishError::Broker {
                topic: record.topic,
                source: KafkaError::MessageProduction(RDKafkaErrorCode::BrokerTransportFailure),
            });
        }

        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

// ============================================================================
// Scripted Checker
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) enum StockReply {
    Body(&'static str),
    Status(u16),
}

pub(crate) struct ScriptedChecker {
    replies: Mutex<VecDeque<StockReply>>,
    last: Mutex<Option<StockReply>>,
    items: Mutex<Vec<String>>,
}

impl ScriptedChecker {
    pub fn new(replies: Vec<StockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            items: Mutex::new(Vec::new()),
        }
    }

    pub fn available() -> Self {
        Self::new(vec![StockReply::Body("true")])
    }

    pub fn calls(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn items(&self) -> Vec<String> {
        self.items.lock().unwrap().clone()
    }

    fn next_reply(&self) -> StockReply {
        let mut last = self.last.lock().unwrap();
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            *last = Some(reply);
        }
        last.clone().unwrap_or(StockReply::Body("true"))
    }
}

#[async_trait]
impl AvailabilityChecker for ScriptedChecker {
    async fn check_available(&self, item: &str) -> Result<String, DispatchError> {
        self.items.lock().unwrap().push(item.to_string());

        match self.next_reply() {
            StockReply::Body(body) => Ok(body.to_string()),
            StockReply::Status(status) if status >= 500 => Err(StockServiceError::ServerError {
                status,
                body: "service unavailable".to_string(),
            }
            .into()),
            StockReply::Status(status) => Err(StockServiceError::UnexpectedStatus {
                status,
                body: String::new(),
            }
            .into()),
        }
    }
}
