//! Order status transitions with conditional inventory effect.
//!
//! # Guard
//!
//! ```text
//!   previous != completado  AND  requested == completado  AND  marker unset
//!       → status write + inventory adjustment
//!   any other edge
//!       → status write only
//! ```
//!
//! `completado` is sticky with respect to inventory: re-entering it never
//! decrements again, and the per-order marker keeps that true even if an
//! order is reopened and completed a second time.
//!
//! # Atomicity
//!
//! Lock order row → write status → (claim marker → adjust stock) → commit,
//! all inside one store transaction. A failure anywhere rolls back the status
//! write along with every stock write. Concurrent completions of the same
//! order serialize on the order-row lock, so the second one observes
//! `completado` and does nothing to stock.

use std::sync::Arc;

use anyhow::anyhow;
use shop_schemas::{normalize_status, OrderId, OrderStatus};
use tracing::{info, warn};

use crate::adjuster::{AdjustmentReport, InventoryAdjuster};
use crate::error::TransitionError;
use crate::store::{InventoryStore, StoreTx};

/// What a transition does to inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryEffect {
    None,
    Decrement,
}

/// Pure guard over normalized statuses. The per-order marker is checked
/// separately inside the transaction.
pub fn inventory_effect(previous: &OrderStatus, requested: &OrderStatus) -> InventoryEffect {
    if !previous.is_completed() && requested.is_completed() {
        InventoryEffect::Decrement
    } else {
        InventoryEffect::None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub order_id: OrderId,
    /// Stored status before the transition (`pendiente` if it was unset).
    pub previous_status: String,
    /// Status text written, exactly as requested.
    pub status_applied: String,
    pub inventory_adjusted: bool,
    pub adjustment: Option<AdjustmentReport>,
}

pub struct TransitionService<S> {
    store: S,
    adjuster: InventoryAdjuster,
}

impl<S: InventoryStore> TransitionService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            adjuster: InventoryAdjuster::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Move `order_id` to `requested` and, when the guard fires, decrement
    /// stock for its cart snapshot, atomically.
    pub async fn transition_status(
        &self,
        order_id: OrderId,
        requested: &str,
    ) -> Result<TransitionOutcome, TransitionError> {
        if order_id <= 0 {
            return Err(TransitionError::Validation("order id must be a positive integer"));
        }
        if normalize_status(requested).is_empty() {
            return Err(TransitionError::Validation("status must be a non-empty string"));
        }

        let mut tx = self
            .store
            .begin()
            .await
            .map_err(TransitionError::internal(order_id))?;

        let outcome = match self.apply(&mut tx, order_id, requested).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if let Err(rb) = tx.rollback().await {
                    warn!(order_id, error = %rb, "rollback failed; transaction dropped");
                }
                if !err.is_client_error() {
                    warn!(order_id, error = ?err, "transition rolled back");
                }
                return Err(err);
            }
        };

        if let Err(source) = tx.commit().await {
            return Err(if outcome.inventory_adjusted {
                TransitionError::AdjustmentFailure { order_id, source }
            } else {
                TransitionError::Internal { order_id, source }
            });
        }

        info!(
            order_id,
            previous = %outcome.previous_status,
            requested = %outcome.status_applied,
            inventory_adjusted = outcome.inventory_adjusted,
            lines_applied = outcome.adjustment.as_ref().map_or(0, |r| r.applied.len()),
            lines_skipped = outcome.adjustment.as_ref().map_or(0, |r| r.skipped.len()),
            "order status transitioned"
        );

        Ok(outcome)
    }

    async fn apply(
        &self,
        tx: &mut S::Tx,
        order_id: OrderId,
        requested: &str,
    ) -> Result<TransitionOutcome, TransitionError> {
        let order = tx
            .lock_order(order_id)
            .await
            .map_err(TransitionError::internal(order_id))?
            .ok_or(TransitionError::NotFound(order_id))?;

        let previous = order.current_status();
        let next = OrderStatus::parse(requested);

        tx.write_status(order_id, requested)
            .await
            .map_err(TransitionError::internal(order_id))?;

        let mut adjustment = None;
        if inventory_effect(&previous, &next) == InventoryEffect::Decrement {
            let claimed = tx
                .claim_inventory_marker(order_id)
                .await
                .map_err(TransitionError::adjustment(order_id))?;

            if claimed {
                let report = self
                    .adjuster
                    .apply_in(tx, &order.cart)
                    .await
                    .map_err(TransitionError::adjustment(order_id))?;
                adjustment = Some(report);
            } else {
                warn!(order_id, "inventory already applied for this order; stock left unchanged");
            }
        }

        Ok(TransitionOutcome {
            order_id,
            previous_status: order.status_or_default().to_string(),
            status_applied: requested.to_string(),
            inventory_adjusted: adjustment.is_some(),
            adjustment,
        })
    }
}

impl<S: InventoryStore + 'static> TransitionService<S> {
    /// Run the transition on its own task and wait for it.
    ///
    /// Dropping the returned future (client disconnect, request timeout) does
    /// not cancel the transaction; it still runs to commit or rollback.
    pub async fn transition_status_detached(
        self: Arc<Self>,
        order_id: OrderId,
        requested: String,
    ) -> Result<TransitionOutcome, TransitionError> {
        let handle =
            tokio::spawn(async move { self.transition_status(order_id, &requested).await });

        match handle.await {
            Ok(result) => result,
            Err(join_err) => Err(TransitionError::Internal {
                order_id,
                source: anyhow!(join_err).context("transition task did not complete"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effect(prev: &str, next: &str) -> InventoryEffect {
        inventory_effect(&OrderStatus::parse(prev), &OrderStatus::parse(next))
    }

    #[test]
    fn only_first_entry_into_completed_decrements() {
        assert_eq!(effect("pendiente", "completado"), InventoryEffect::Decrement);
        assert_eq!(effect("enviado", " COMPLETADO "), InventoryEffect::Decrement);
        assert_eq!(effect("en camino", "completado"), InventoryEffect::Decrement);
    }

    #[test]
    fn every_other_edge_is_status_only() {
        assert_eq!(effect("completado", "completado"), InventoryEffect::None);
        assert_eq!(effect("Completado", "pendiente"), InventoryEffect::None);
        assert_eq!(effect("completado", "enviado"), InventoryEffect::None);
        assert_eq!(effect("pendiente", "enviado"), InventoryEffect::None);
        assert_eq!(effect("pendiente", "cancelado"), InventoryEffect::None);
    }

    #[test]
    fn english_and_spanish_completed_are_the_same_state() {
        assert_eq!(effect("completed", "completado"), InventoryEffect::None);
        assert_eq!(effect("pending", "completed"), InventoryEffect::Decrement);
    }
}
