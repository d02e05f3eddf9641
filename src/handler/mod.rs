// ============================================================================
// Handler Module
// ============================================================================
//
// Ingress boundary: turns dispatch failures into listener signals.
//
// ============================================================================

mod order_created;

pub use order_created::OrderCreatedHandler;
