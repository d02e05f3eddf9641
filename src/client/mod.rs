// ============================================================================
// Client Module
// ============================================================================
//
// Outbound calls made while dispatching an order.
//
// ============================================================================

mod stock_service;

pub use stock_service::{AvailabilityChecker, StockServiceClient, StockServiceError};
