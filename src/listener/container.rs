use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    error::KafkaResult,
    Offset, TopicPartitionList,
};
use tokio::sync::watch;
use tokio::time::sleep;

use crate::config::DispatchConfig;
use crate::error::ListenerError;
use crate::handler::OrderCreatedHandler;
use crate::messaging::PublishError;
use crate::metrics::{outcome, Metrics};
use super::backoff::BackOffConfig;
use super::dead_letter::{DeadLetterPublisher, FailureKind};
use super::record::InboundRecord;

// ============================================================================
// Listener Container
// ============================================================================
//
// Drives the OrderCreated handler for every inbound record:
//
//   decode ──fail──────────────────────────────────────────► DLT
//     │
//   handler ──Ok──► commit
//     │  └─NotRetryable────────────────────────────────────► DLT
//     └─Retryable ──► backoff ──► handler (same record) ...
//                        └─ attempts exhausted ─────────────► DLT
//
// One container instance processes records strictly one at a time, so a
// partition (and every key on it) is never processed concurrently. Start
// several consumers in the same group to work partitions in parallel.
//
// ============================================================================

const SEEK_TIMEOUT: Duration = Duration::from_secs(5);

/// Terminal state of one inbound record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Acknowledged { attempts: u32 },
    DeadLettered { kind: FailureKind, attempts: u32 },
}

pub struct ListenerContainer {
    handler: Arc<OrderCreatedHandler>,
    dead_letters: DeadLetterPublisher,
    backoff: BackOffConfig,
    metrics: Arc<Metrics>,
}

impl ListenerContainer {
    pub fn new(
        handler: Arc<OrderCreatedHandler>,
        dead_letters: DeadLetterPublisher,
        backoff: BackOffConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            handler,
            dead_letters,
            backoff,
            metrics,
        }
    }

    /// Run one record to a terminal outcome.
    ///
    /// Errors only when the record had to be dead-lettered and the
    /// dead-letter publish itself failed; the record must then be redelivered.
    pub async fn dispatch_record(&self, record: &InboundRecord) -> Result<RecordOutcome, PublishError> {
        let started = Instant::now();
        self.metrics.record_received();

        let order = match record.decode() {
            Ok(order) => order,
            Err(e) => {
                tracing::error!(
                    key = %record.key,
                    partition = record.partition,
                    offset = record.offset,
                    error = %e,
                    "Failed to decode OrderCreated payload"
                );
                return self
                    .dead_letter(record, FailureKind::Deserialization, &e, 0, started)
                    .await;
            }
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            self.metrics.record_attempt(attempt);

            match self.handler.on_message(record.partition, &record.key, &order).await {
                Ok(()) => {
                    if attempt > 1 {
                        tracing::info!(
                            order_id = %order.order_id,
                            attempt = attempt,
                            "Record processed after retry"
                        );
                    }
                    self.metrics.record_outcome(outcome::ACKNOWLEDGED);
                    self.metrics
                        .record_processing_time(outcome::ACKNOWLEDGED, started.elapsed().as_secs_f64());
                    return Ok(RecordOutcome::Acknowledged { attempts: attempt });
                }
                Err(ListenerError::Retryable(e)) if !self.backoff.is_exhausted(attempt) => {
                    let delay = self.backoff.delay_after(attempt);
                    tracing::warn!(
                        order_id = %order.order_id,
                        attempt = attempt,
                        max_attempts = self.backoff.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retryable failure, redelivering after backoff"
                    );
                    self.metrics.record_outcome(outcome::RETRY);
                    sleep(delay).await;
                }
                Err(ListenerError::Retryable(e)) => {
                    tracing::error!(
                        order_id = %order.order_id,
                        attempt = attempt,
                        error = %e,
                        "Retries exhausted"
                    );
                    return self
                        .dead_letter(record, FailureKind::RetriesExhausted, &e, attempt, started)
                        .await;
                }
                Err(ListenerError::NotRetryable(e)) => {
                    return self
                        .dead_letter(record, FailureKind::NotRetryable, &e, attempt, started)
                        .await;
                }
            }
        }
    }

    async fn dead_letter(
        &self,
        record: &InboundRecord,
        kind: FailureKind,
        error: &(dyn fmt::Display + Sync),
        attempts: u32,
        started: Instant,
    ) -> Result<RecordOutcome, PublishError> {
        self.dead_letters.publish(record, kind, error).await?;

        self.metrics.record_dead_letter(kind.as_str());
        self.metrics.record_outcome(outcome::DEAD_LETTER);
        self.metrics
            .record_processing_time(outcome::DEAD_LETTER, started.elapsed().as_secs_f64());
        Ok(RecordOutcome::DeadLettered { kind, attempts })
    }

    /// Consume until `shutdown` flips. The record in flight when shutdown is
    /// requested is finished first.
    pub async fn run(&self, consumer: StreamConsumer, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        tracing::info!("Listener started");

        while !*shutdown.borrow() {
            let received = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                message = consumer.recv() => message.map(|m| InboundRecord::from_message(&m)),
            };

            let record = match received {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(error = %e, "Kafka receive error");
                    continue;
                }
            };

            match self.dispatch_record(&record).await {
                Ok(done) => {
                    tracing::debug!(
                        key = %record.key,
                        partition = record.partition,
                        offset = record.offset,
                        outcome = ?done,
                        "Record complete, committing offset"
                    );
                    if let Err(e) = commit(&consumer, &record) {
                        tracing::warn!(error = %e, offset = record.offset, "Offset commit failed");
                    }
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        partition = record.partition,
                        offset = record.offset,
                        "Dead-letter publish failed, seeking back for redelivery"
                    );
                    if let Err(e) = consumer.seek(
                        &record.topic,
                        record.partition,
                        Offset::Offset(record.offset),
                        SEEK_TIMEOUT,
                    ) {
                        tracing::error!(error = %e, "Seek failed, record will be redelivered after rebalance");
                    }
                }
            }
        }

        tracing::info!("Listener stopped");
        Ok(())
    }
}

fn commit(consumer: &StreamConsumer, record: &InboundRecord) -> KafkaResult<()> {
    let mut offsets = TopicPartitionList::new();
    offsets.add_partition_offset(&record.topic, record.partition, Offset::Offset(record.offset + 1))?;
    consumer.commit(&offsets, CommitMode::Async)
}

/// Consumer subscribed to the inbound topic with manual offset commits.
///
/// Retries run inline between polls, so `max.poll.interval.ms` comes from the
/// same config that `DispatchConfig::validate` checks the retry budget against.
pub fn create_consumer(config: &DispatchConfig, instance: usize) -> KafkaResult<StreamConsumer> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &config.bootstrap_servers)
        .set("group.id", &config.consumer_group)
        .set("client.id", format!("order-dispatch-{}", instance))
        .set("enable.auto.commit", "false")
        .set("max.poll.interval.ms", config.max_poll_interval_ms.to_string())
        .set("auto.offset.reset", "earliest")
        .create()?;

    consumer.subscribe(&[config.order_created_topic.as_str()])?;
    Ok(consumer)
}
