//! Scenario: Concurrent Completions Of One Order Decrement Once
//!
//! # Invariant under test
//! When many requests race to move the same order into `completado`, exactly
//! one of them applies the inventory adjustment. The rest serialize behind the
//! order lock, observe `completado` and write status only.
//!
//! Product rows are always locked in ascending id order, whatever the cart
//! order, so orders sharing products cannot deadlock on each other's rows.

use std::sync::Arc;
use std::time::Duration;

use shop_inventory::{InventoryAdjuster, TransitionService};
use shop_schemas::{CartLine, CartSnapshot};
use shop_testkit::{seed_order, seed_product, MemoryStore};

const RACERS: usize = 16;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_completions_adjust_exactly_once() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let p = seed_product(&store, "P", 10).await;
    let order = seed_order(&store, &[(p, 3)]).await;
    // Widen the window between the stock read and write.
    store.delay_stock_writes(Duration::from_millis(5));

    let svc = Arc::new(TransitionService::new(store.clone()));
    let mut handles = Vec::with_capacity(RACERS);
    for _ in 0..RACERS {
        let svc = Arc::clone(&svc);
        handles.push(tokio::spawn(async move {
            svc.transition_status(order, "completado").await
        }));
    }

    let mut adjusted = 0;
    for h in handles {
        let out = h.await??;
        if out.inventory_adjusted {
            adjusted += 1;
        }
    }

    assert_eq!(adjusted, 1, "exactly one racer may apply inventory");
    assert_eq!(store.stock(p).await, Some(7));
    assert_eq!(store.counters().committed, RACERS as u64);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_orders_on_shared_product_both_apply() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let p = seed_product(&store, "P", 10).await;
    let a = seed_order(&store, &[(p, 3)]).await;
    let b = seed_order(&store, &[(p, 4)]).await;
    store.delay_stock_writes(Duration::from_millis(5));

    let svc = Arc::new(TransitionService::new(store.clone()));
    let ha = tokio::spawn({
        let svc = Arc::clone(&svc);
        async move { svc.transition_status(a, "completado").await }
    });
    let hb = tokio::spawn({
        let svc = Arc::clone(&svc);
        async move { svc.transition_status(b, "completado").await }
    });

    assert!(ha.await??.inventory_adjusted);
    assert!(hb.await??.inventory_adjusted);
    // No lost update: both decrements land.
    assert_eq!(store.stock(p).await, Some(3));
    Ok(())
}

// ---------------------------------------------------------------------------
// Lock order
// ---------------------------------------------------------------------------

#[tokio::test]
async fn product_rows_lock_in_ascending_id_order() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let mut ids = Vec::new();
    for name in ["P1", "P2", "P3", "P4", "P5", "P6"] {
        ids.push(seed_product(&store, name, 50).await);
    }
    let reversed: Vec<_> = ids.iter().rev().map(|&id| (id, 1)).collect();
    let order = seed_order(&store, &reversed).await;

    TransitionService::new(store.clone())
        .transition_status(order, "completado")
        .await?;

    assert_eq!(store.take_stock_lock_order(), ids);
    for id in &ids {
        assert_eq!(store.stock(*id).await, Some(49));
    }
    Ok(())
}

#[tokio::test]
async fn repeated_product_is_locked_once_with_summed_quantity() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let a = seed_product(&store, "A", 10).await;
    let b = seed_product(&store, "B", 10).await;
    let cart = CartSnapshot::new(vec![
        CartLine::new(b, 1),
        CartLine::new(a, 2),
        CartLine::new(b, 3),
    ]);

    let report = InventoryAdjuster::new().apply(&store, &cart).await?;

    assert_eq!(store.take_stock_lock_order(), vec![a, b]);
    let changes: Vec<_> = report.applied.iter().map(|c| (c.product_id, c.requested, c.after)).collect();
    assert_eq!(changes, vec![(a, 2, 8), (b, 4, 6)]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reverse_order_carts_both_complete() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let mut ids = Vec::new();
    for name in ["P1", "P2", "P3", "P4", "P5", "P6"] {
        ids.push(seed_product(&store, name, 100).await);
    }
    let forward: Vec<_> = ids.iter().map(|&id| (id, 1)).collect();
    let backward: Vec<_> = ids.iter().rev().map(|&id| (id, 2)).collect();
    store.delay_stock_writes(Duration::from_millis(1));

    let svc = Arc::new(TransitionService::new(store.clone()));
    for _ in 0..10 {
        let a = seed_order(&store, &forward).await;
        let b = seed_order(&store, &backward).await;
        let ha = tokio::spawn({
            let svc = Arc::clone(&svc);
            async move { svc.transition_status(a, "completado").await }
        });
        let hb = tokio::spawn({
            let svc = Arc::clone(&svc);
            async move { svc.transition_status(b, "completado").await }
        });
        assert!(ha.await??.inventory_adjusted);
        assert!(hb.await??.inventory_adjusted);
    }

    for id in &ids {
        assert_eq!(store.stock(*id).await, Some(100 - 10 * 3));
    }
    Ok(())
}
