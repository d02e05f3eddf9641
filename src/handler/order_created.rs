use std::sync::Arc;

use crate::error::{DispatchError, ListenerError};
use crate::messages::OrderCreated;
use crate::service::OrderProcessor;

// ============================================================================
// OrderCreated Handler
// ============================================================================
//
// Received -> process(key, payload)
//   Ok                      -> Acknowledged
//   DispatchError::Retryable -> ListenerError::Retryable (same cause)
//   anything else           -> ListenerError::NotRetryable
//
// No retry loop lives here; redelivery belongs to the listener container.
//
// ============================================================================

pub struct OrderCreatedHandler {
    processor: Arc<dyn OrderProcessor>,
}

impl OrderCreatedHandler {
    pub fn new(processor: Arc<dyn OrderProcessor>) -> Self {
        Self { processor }
    }

    pub async fn on_message(
        &self,
        partition: i32,
        key: &str,
        payload: &OrderCreated,
    ) -> Result<(), ListenerError> {
        tracing::info!(
            partition = partition,
            key = %key,
            order_id = %payload.order_id,
            item = %payload.item,
            "Received message"
        );

        match self.processor.process(key, payload).await {
            Ok(()) => Ok(()),
            Err(e @ DispatchError::Retryable(_)) => {
                tracing::warn!(order_id = %payload.order_id, error = %e, "Retryable failure");
                Err(ListenerError::Retryable(e))
            }
            Err(e) => {
                tracing::error!(order_id = %payload.order_id, error = %e, "Not retryable failure");
                Err(ListenerError::NotRetryable(e))
            }
        }
    }
}
