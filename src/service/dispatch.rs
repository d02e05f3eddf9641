use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::client::AvailabilityChecker;
use crate::error::DispatchError;
use crate::messages::{DispatchCompleted, DispatchPreparing, OrderCreated, OrderDispatched, OutboundEvent};
use crate::messaging::{send_event, EventPublisher};
use crate::metrics::Metrics;

// ============================================================================
// Dispatch Service
// ============================================================================
//
// For one OrderCreated:
//   1. check stock availability for the item
//   2. DispatchPreparing  -> dispatch.tracking
//   3. OrderDispatched    -> order.dispatched
//   4. DispatchCompleted  -> dispatch.tracking
//
// Every event is keyed with the inbound record key. Each emission waits for
// the broker acknowledgment before the next one starts; the first failure
// stops the sequence. Events already emitted are never retracted, so a
// redelivered order may produce a second DispatchPreparing.
//
// ============================================================================

/// Processes one inbound order. Implemented by [`DispatchService`].
#[async_trait]
pub trait OrderProcessor: Send + Sync {
    async fn process(&self, key: &str, order: &OrderCreated) -> Result<(), DispatchError>;
}

pub struct DispatchService {
    checker: Arc<dyn AvailabilityChecker>,
    publisher: Arc<dyn EventPublisher>,
    processed_by_id: Uuid,
    metrics: Arc<Metrics>,
}

impl DispatchService {
    pub fn new(
        checker: Arc<dyn AvailabilityChecker>,
        publisher: Arc<dyn EventPublisher>,
        processed_by_id: Uuid,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            checker,
            publisher,
            processed_by_id,
            metrics,
        }
    }

    /// Identity of this dispatching process, fixed for its lifetime.
    #[cfg(test)]
    pub fn processed_by_id(&self) -> Uuid {
        self.processed_by_id
    }

    async fn check_stock(&self, order: &OrderCreated) -> Result<bool, DispatchError> {
        match self.checker.check_available(&order.item).await {
            Ok(body) => {
                let available = is_available(&body);
                self.metrics
                    .record_availability(if available { "available" } else { "unavailable" });
                Ok(available)
            }
            Err(e) => {
                self.metrics
                    .record_availability(if e.is_retryable() { "retryable" } else { "failed" });
                Err(e)
            }
        }
    }

    async fn emit<E: OutboundEvent>(&self, key: &str, event: &E) -> Result<(), DispatchError> {
        if let Err(e) = send_event(self.publisher.as_ref(), key, event).await {
            tracing::warn!(
                order_id = %event.order_id(),
                key = %key,
                event_type = E::event_type(),
                error = %e,
                "Emission failed, abandoning dispatch sequence"
            );
            return Err(e.into());
        }

        self.metrics.record_event_published(E::topic(), E::event_type());
        tracing::debug!(
            order_id = %event.order_id(),
            key = %key,
            topic = E::topic(),
            event_type = E::event_type(),
            "Sent event"
        );
        Ok(())
    }
}

/// The stock service answers with a plain-text boolean.
fn is_available(body: &str) -> bool {
    body.trim().eq_ignore_ascii_case("true")
}

#[async_trait]
impl OrderProcessor for DispatchService {
    async fn process(&self, key: &str, order: &OrderCreated) -> Result<(), DispatchError> {
        if !self.check_stock(order).await? {
            tracing::info!(
                order_id = %order.order_id,
                item = %order.item,
                "Item is unavailable, nothing dispatched"
            );
            return Ok(());
        }

        self.emit(key, &DispatchPreparing { order_id: order.order_id }).await?;
        self.emit(key, &OrderDispatched::for_order(order, self.processed_by_id)).await?;
        self.emit(key, &DispatchCompleted { order_id: order.order_id }).await?;

        tracing::info!(
            order_id = %order.order_id,
            processed_by_id = %self.processed_by_id,
            key = %key,
            "Order dispatched"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{DISPATCH_TRACKING_TOPIC, ORDER_DISPATCHED_TOPIC};
    use crate::testing::{order_created, RecordingPublisher, ScriptedChecker, StockReply};

    struct Fixture {
        checker: Arc<ScriptedChecker>,
        publisher: Arc<RecordingPublisher>,
        service: DispatchService,
    }

    fn fixture(checker: ScriptedChecker) -> Fixture {
        let checker = Arc::new(checker);
        let publisher = Arc::new(RecordingPublisher::new());
        let service = DispatchService::new(
            checker.clone(),
            publisher.clone(),
            Uuid::new_v4(),
            Arc::new(Metrics::new().unwrap()),
        );
        Fixture { checker, publisher, service }
    }

    #[tokio::test]
    async fn test_process_success_emits_ordered_keyed_events() {
        let f = fixture(ScriptedChecker::available());
        let order = order_created("test-item");

        f.service.process("order-key", &order).await.unwrap();

        assert_eq!(f.checker.items(), vec!["test-item".to_string()]);
        assert_eq!(
            f.publisher.event_types(),
            vec!["DispatchPreparing", "OrderDispatched", "DispatchCompleted"]
        );

        let records = f.publisher.records();
        assert!(records.iter().all(|record| record.key == "order-key"));
        assert_eq!(records[0].topic, DISPATCH_TRACKING_TOPIC);
        assert_eq!(records[1].topic, ORDER_DISPATCHED_TOPIC);
        assert_eq!(records[2].topic, DISPATCH_TRACKING_TOPIC);

        let dispatched: OrderDispatched = serde_json::from_slice(&records[1].payload).unwrap();
        assert_eq!(dispatched.order_id, order.order_id);
        assert_eq!(dispatched.processed_by_id, f.service.processed_by_id());
        assert_eq!(dispatched.notes, "Dispatch: test-item");
    }

    #[tokio::test]
    async fn test_processed_by_id_is_fixed_across_orders() {
        let f = fixture(ScriptedChecker::available());

        f.service.process("k1", &order_created("a")).await.unwrap();
        f.service.process("k2", &order_created("b")).await.unwrap();

        let ids: Vec<Uuid> = f
            .publisher
            .records_for(ORDER_DISPATCHED_TOPIC)
            .iter()
            .map(|record| serde_json::from_slice::<OrderDispatched>(&record.payload).unwrap().processed_by_id)
            .collect();
        assert_eq!(ids, vec![f.service.processed_by_id(); 2]);
    }

    #[tokio::test]
    async fn test_unavailable_item_emits_nothing() {
        let f = fixture(ScriptedChecker::new(vec![StockReply::Body("false")]));

        f.service.process("order-key", &order_created("test-item")).await.unwrap();

        assert_eq!(f.checker.calls(), 1);
        assert_eq!(f.publisher.attempts(), 0);
    }

    #[tokio::test]
    async fn test_stock_server_error_is_retryable_and_emits_nothing() {
        let f = fixture(ScriptedChecker::new(vec![StockReply::Status(503)]));

        let err = f.service.process("order-key", &order_created("test-item")).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(f.publisher.attempts(), 0);
    }

    #[tokio::test]
    async fn test_stock_client_error_is_not_retryable() {
        let f = fixture(ScriptedChecker::new(vec![StockReply::Status(400)]));

        let err = f.service.process("order-key", &order_created("test-item")).await.unwrap_err();

        assert!(!err.is_retryable());
        assert_eq!(f.publisher.attempts(), 0);
    }

    #[tokio::test]
    async fn test_preparing_failure_stops_sequence() {
        let f = fixture(ScriptedChecker::available());
        f.publisher.fail_event(DISPATCH_TRACKING_TOPIC, "DispatchPreparing");

        let err = f.service.process("order-key", &order_created("test-item")).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(f.publisher.attempts(), 1);
        assert!(f.publisher.records().is_empty());
    }

    #[tokio::test]
    async fn test_dispatched_failure_leaves_preparing_emitted() {
        let f = fixture(ScriptedChecker::available());
        f.publisher.fail_topic(ORDER_DISPATCHED_TOPIC);

        let err = f.service.process("order-key", &order_created("test-item")).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(f.publisher.attempts(), 2);
        assert_eq!(f.publisher.event_types(), vec!["DispatchPreparing"]);
    }

    #[tokio::test]
    async fn test_completed_failure_after_dispatched() {
        let f = fixture(ScriptedChecker::available());
        f.publisher.fail_event(DISPATCH_TRACKING_TOPIC, "DispatchCompleted");

        let err = f.service.process("order-key", &order_created("test-item")).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(f.publisher.attempts(), 3);
        assert_eq!(f.publisher.event_types(), vec!["DispatchPreparing", "OrderDispatched"]);
    }

    #[tokio::test]
    async fn test_reprocessing_after_failure_repeats_full_sequence() {
        let f = fixture(ScriptedChecker::available());
        let order = order_created("test-item");

        f.publisher.fail_topic(ORDER_DISPATCHED_TOPIC);
        assert!(f.service.process("order-key", &order).await.is_err());

        f.publisher.clear_failures();
        f.service.process("order-key", &order).await.unwrap();

        // orphaned DispatchPreparing from the first attempt stays in place
        assert_eq!(
            f.publisher.event_types(),
            vec!["DispatchPreparing", "DispatchPreparing", "OrderDispatched", "DispatchCompleted"]
        );
        assert_eq!(f.checker.calls(), 2);
    }

    #[test]
    fn test_is_available() {
        assert!(is_available("true"));
        assert!(is_available(" TRUE\n"));
        assert!(!is_available("false"));
        assert!(!is_available(""));
    }
}
