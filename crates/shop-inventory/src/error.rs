use shop_schemas::OrderId;
use thiserror::Error;

/// Why a status transition was refused or failed.
///
/// Every variant means nothing was committed: validation and lookup failures
/// happen before any write, and storage failures roll back the status write
/// together with any stock writes.
#[derive(Debug, Error)]
pub enum TransitionError {
    /// Malformed order id or status, rejected before any I/O.
    #[error("invalid transition request: {0}")]
    Validation(&'static str),

    #[error("order {0} not found")]
    NotFound(OrderId),

    /// The inventory adjustment could not commit; status and stock were
    /// rolled back.
    #[error("inventory adjustment failed for order {order_id}")]
    AdjustmentFailure {
        order_id: OrderId,
        #[source]
        source: anyhow::Error,
    },

    #[error("transition failed for order {order_id}")]
    Internal {
        order_id: OrderId,
        #[source]
        source: anyhow::Error,
    },
}

impl TransitionError {
    /// Caller-side mistakes (bad input, unknown order), as opposed to
    /// storage failures.
    pub fn is_client_error(&self) -> bool {
        matches!(self, TransitionError::Validation(_) | TransitionError::NotFound(_))
    }

    pub(crate) fn internal(order_id: OrderId) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| TransitionError::Internal { order_id, source }
    }

    pub(crate) fn adjustment(order_id: OrderId) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| TransitionError::AdjustmentFailure { order_id, source }
    }
}
