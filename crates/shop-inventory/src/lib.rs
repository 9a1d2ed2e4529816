//! shop-inventory
//!
//! Order transition & inventory adjustment engine.
//!
//! - [`TransitionService`] changes an order's status and, on the first entry
//!   into `completado`, decrements stock for the order's cart snapshot.
//! - [`InventoryAdjuster`] applies a cart snapshot to stock with a floor clamp
//!   at zero, skipping lines that reference nothing usable.
//! - [`InventoryStore`] / [`StoreTx`] are the storage seam; the engine is
//!   handed a store at construction and never reaches for a global handle.
//!
//! Pure decision logic (`inventory_effect`, `clamp_decrement`) is exported so
//! callers and tests can reason about a transition without touching storage.

mod adjuster;
mod error;
mod store;
mod transition;

pub use adjuster::{
    clamp_decrement, AdjustmentReport, InventoryAdjuster, SkipReason, SkippedLine, StockChange,
};
pub use error::TransitionError;
pub use store::{InventoryStore, StoreTx};
pub use transition::{inventory_effect, InventoryEffect, TransitionOutcome, TransitionService};
