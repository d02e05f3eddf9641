// ============================================================================
// Order Dispatch
// ============================================================================
//
// Consumes order.created, checks stock availability, and emits the
// dispatch event sequence keyed by the inbound record key:
//
//   order.created ─► listener ─► handler ─► dispatch service
//                       │                      ├─ stock service (HTTP)
//                       │                      └─ dispatch.tracking / order.dispatched
//                       └─ order.created.DLT
//
// Failures are classified once (retryable vs. not) and the listener turns
// that into redelivery or dead-lettering.
//
// ============================================================================

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod listener;
pub mod messages;
pub mod messaging;
pub mod metrics;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use config::DispatchConfig;
pub use error::{DispatchError, ListenerError};
