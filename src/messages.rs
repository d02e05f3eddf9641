use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Dispatch Messages
// ============================================================================
//
// Wire types consumed and produced by the dispatch stage. All payloads are
// JSON with camelCase field names.
//
//   order.created      -> OrderCreated          (inbound)
//   dispatch.tracking  -> DispatchPreparing, DispatchCompleted
//   order.dispatched   -> OrderDispatched
//
// ============================================================================

pub const ORDER_CREATED_TOPIC: &str = "order.created";
pub const DISPATCH_TRACKING_TOPIC: &str = "dispatch.tracking";
pub const ORDER_DISPATCHED_TOPIC: &str = "order.dispatched";

/// Suffix appended to an inbound topic to form its dead-letter topic.
pub const DEAD_LETTER_SUFFIX: &str = ".DLT";

/// Header carrying the outbound event name on every produced record.
pub const EVENT_TYPE_HEADER: &str = "event_type";

/// Trait implemented by every event the dispatch stage produces.
pub trait OutboundEvent: Serialize + Send + Sync {
    fn topic() -> &'static str where Self: Sized;
    fn event_type() -> &'static str where Self: Sized;
    fn order_id(&self) -> Uuid;
}

// ============================================================================
// Inbound
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_id: Uuid,
    pub item: String,
}

// ============================================================================
// Outbound
// ============================================================================

/// Work on an order has started.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DispatchPreparing {
    pub order_id: Uuid,
}

impl OutboundEvent for DispatchPreparing {
    fn topic() -> &'static str { DISPATCH_TRACKING_TOPIC }
    fn event_type() -> &'static str { "DispatchPreparing" }
    fn order_id(&self) -> Uuid { self.order_id }
}

/// The order has been dispatched by the process identified by `processed_by_id`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderDispatched {
    pub order_id: Uuid,
    pub processed_by_id: Uuid,
    pub notes: String,
}

impl OrderDispatched {
    pub fn for_order(order: &OrderCreated, processed_by_id: Uuid) -> Self {
        Self {
            order_id: order.order_id,
            processed_by_id,
            notes: format!("Dispatch: {}", order.item),
        }
    }
}

impl OutboundEvent for OrderDispatched {
    fn topic() -> &'static str { ORDER_DISPATCHED_TOPIC }
    fn event_type() -> &'static str { "OrderDispatched" }
    fn order_id(&self) -> Uuid { self.order_id }
}

/// Terminal tracking event for a dispatched order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DispatchCompleted {
    pub order_id: Uuid,
}

impl OutboundEvent for DispatchCompleted {
    fn topic() -> &'static str { DISPATCH_TRACKING_TOPIC }
    fn event_type() -> &'static str { "DispatchCompleted" }
    fn order_id(&self) -> Uuid { self.order_id }
}

pub fn dead_letter_topic(topic: &str) -> String {
    format!("{}{}", topic, DEAD_LETTER_SUFFIX)
}

// ============================================================================
// Unit Tests
// ============================================================================
