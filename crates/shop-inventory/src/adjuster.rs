//! Inventory adjuster: applies a cart snapshot's quantities to product stock.
//!
//! # Line rules
//!
//! | line                                  | effect                           |
//! |---------------------------------------|----------------------------------|
//! | no usable product id                  | skipped (`MissingProductId`)     |
//! | `quantity <= 0`                       | skipped (`NonPositiveQuantity`)  |
//! | product no longer exists              | skipped (`UnknownProduct`)       |
//! | otherwise                             | `stock = max(0, stock - qty)`    |
//!
//! Skips are not errors: a cart may reference a product removed from the
//! catalog after purchase. A failed read or write is an error and aborts the
//! whole adjustment; the surrounding transaction then rolls back every stock
//! write made for the order.
//!
//! # Lock order
//!
//! Lines naming the same product are summed, and product rows are locked in
//! ascending id order regardless of cart order. Two orders sharing products
//! therefore always acquire row locks in the same sequence and cannot
//! deadlock against each other.

use anyhow::{Context, Result};
use shop_schemas::{CartSnapshot, ProductId};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use crate::store::{InventoryStore, StoreTx};

/// Floor-clamped decrement. Never returns a negative value.
pub fn clamp_decrement(current: i64, quantity: i64) -> i64 {
    current.saturating_sub(quantity.max(0)).max(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingProductId,
    NonPositiveQuantity,
    UnknownProduct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// Position of the line in the cart snapshot.
    pub line_index: usize,
    pub product_id: Option<ProductId>,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockChange {
    pub product_id: ProductId,
    pub requested: i64,
    pub before: i64,
    pub after: i64,
}

impl StockChange {
    /// True when the floor absorbed part of the requested quantity.
    pub fn was_clamped(&self) -> bool {
        self.before < self.requested
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjustmentReport {
    pub applied: Vec<StockChange>,
    pub skipped: Vec<SkippedLine>,
}

impl AdjustmentReport {
    pub fn clamped(&self) -> impl Iterator<Item = &StockChange> {
        self.applied.iter().filter(|c| c.was_clamped())
    }

    fn skip(&mut self, line_index: usize, product_id: Option<ProductId>, reason: SkipReason) {
        self.skipped.push(SkippedLine {
            line_index,
            product_id,
            reason,
        });
    }
}

/// Compact log rendering for a stock change.
struct StockChangeView<'a>(&'a StockChange);

impl fmt::Display for StockChangeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.0;
        write!(f, "product {} {} -> {} (qty {})", c.product_id, c.before, c.after, c.requested)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryAdjuster;

impl InventoryAdjuster {
    pub fn new() -> Self {
        Self
    }

    /// Apply `cart` inside the caller's transaction.
    ///
    /// The caller owns commit/rollback. On `Err`, the transaction must be
    /// rolled back; stock writes already made for lower product ids are
    /// still pending inside it.
    ///
    /// `applied` holds one change per product, in ascending id order.
    pub async fn apply_in<T: StoreTx>(&self, tx: &mut T, cart: &CartSnapshot) -> Result<AdjustmentReport> {
        let mut report = AdjustmentReport::default();

        // product id -> (total quantity, contributing line indexes)
        let mut wanted: BTreeMap<ProductId, (i64, Vec<usize>)> = BTreeMap::new();
        for (index, line) in cart.lines().iter().enumerate() {
            let Some(product_id) = line.product_id else {
                report.skip(index, None, SkipReason::MissingProductId);
                continue;
            };
            if line.quantity <= 0 {
                report.skip(index, Some(product_id), SkipReason::NonPositiveQuantity);
                continue;
            }
            let entry = wanted.entry(product_id).or_default();
            entry.0 = entry.0.saturating_add(line.quantity);
            entry.1.push(index);
        }

        for (product_id, (quantity, lines)) in wanted {
            let Some(before) = tx
                .lock_stock(product_id)
                .await
                .with_context(|| format!("lock stock for product {product_id}"))?
            else {
                warn!(product_id, ?lines, "cart references unknown product; skipped");
                for index in lines {
                    report.skip(index, Some(product_id), SkipReason::UnknownProduct);
                }
                continue;
            };

            let after = clamp_decrement(before, quantity);
            tx.write_stock(product_id, after)
                .await
                .with_context(|| format!("write stock for product {product_id}"))?;

            let change = StockChange {
                product_id,
                requested: quantity,
                before,
                after,
            };
            debug!(change = %StockChangeView(&change), "stock decremented");
            report.applied.push(change);
        }

        report.skipped.sort_by_key(|s| s.line_index);
        Ok(report)
    }

    /// Apply `cart` as its own atomic unit: every line commits, or none do.
    pub async fn apply<S: InventoryStore>(&self, store: &S, cart: &CartSnapshot) -> Result<AdjustmentReport> {
        let mut tx = store.begin().await.context("begin inventory transaction")?;

        match self.apply_in(&mut tx, cart).await {
            Ok(report) => {
                tx.commit().await.context("commit inventory transaction")?;
                Ok(report)
            }
            Err(err) => {
                if let Err(rb) = tx.rollback().await {
                    warn!(error = %rb, "inventory rollback failed; transaction dropped");
                }
                Err(err)
            }
        }
    }
}
