// ============================================================================
// Service Module
// ============================================================================
//
// Orchestrates: availability check -> ordered, keyed event emission
//
// ============================================================================

mod dispatch;

pub use dispatch::{DispatchService, OrderProcessor};
