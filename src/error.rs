use thiserror::Error;

// ============================================================================
// Failure Classification
// ============================================================================
//
// Every failure raised while dispatching an order collapses into one of two
// kinds before it leaves the dispatch service:
// - Retryable: transient, the record is redelivered after a backoff
// - Failed:    anything else, never retried by the listener
//
// The ingress handler then translates these into the two signals understood
// by the listener container (retry vs. dead letter).
//
// ============================================================================

/// Failure surfaced by the availability checker or the dispatch service.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Transient failure: stock service 5xx, stock service unreachable,
    /// broker transport failure while emitting.
    #[error(transparent)]
    Retryable(anyhow::Error),

    /// Any other failure. Opaque to the service, treated as permanent by
    /// the ingress handler.
    #[error(transparent)]
    Failed(anyhow::Error),
}

impl DispatchError {
    pub fn retryable(error: impl Into<anyhow::Error>) -> Self {
        DispatchError::Retryable(error.into())
    }

    pub fn failed(error: impl Into<anyhow::Error>) -> Self {
        DispatchError::Failed(error.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::Retryable(_))
    }
}

/// The only two outcomes the listener container acts on.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Redeliver the record after backoff, until the attempt budget runs out.
    #[error("retryable failure: {0}")]
    Retryable(#[source] DispatchError),

    /// Route the record to the dead-letter topic without further attempts.
    #[error("not retryable failure: {0}")]
    NotRetryable(#[source] DispatchError),
}

impl ListenerError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ListenerError::Retryable(_))
    }

    /// The underlying dispatch failure, whichever way it was classified.
    #[cfg(test)]
    pub fn cause(&self) -> &DispatchError {
        match self {
            ListenerError::Retryable(e) | ListenerError::NotRetryable(e) => e,
        }
    }
}
