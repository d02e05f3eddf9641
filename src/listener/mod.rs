// ============================================================================
// Listener Module
// ============================================================================
//
// Consumer side of the dispatch stage: redelivery with backoff for
// retryable failures, dead-letter routing for everything else.
//
// - backoff.rs     - redelivery schedule
// - dead_letter.rs - <topic>.DLT publisher
// - record.rs      - inbound record detached from the consumer
// - container.rs   - consume loop, retry decisions, offset commits
//
// ============================================================================

mod backoff;
mod container;
mod dead_letter;
mod record;

pub use backoff::BackOffConfig;
pub use container::{create_consumer, ListenerContainer, RecordOutcome};
pub use dead_letter::{DeadLetterPublisher, FailureKind};
pub use record::InboundRecord;
