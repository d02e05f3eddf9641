// ============================================================================
// Messaging Module
// ============================================================================
//
// Producer side of the dispatch stage:
// - publisher.rs - EventPublisher seam, OutboundRecord, typed send_event
// - redpanda.rs  - rdkafka-backed send-and-wait publisher
//
// ============================================================================

mod publisher;
mod redpanda;

pub use publisher::{send_event, EventPublisher, OutboundRecord, PublishError};
pub use redpanda::RedpandaClient;
