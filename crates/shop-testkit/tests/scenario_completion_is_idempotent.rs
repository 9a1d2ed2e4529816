//! Scenario: Inventory Is Applied At Most Once Per Order
//!
//! # Invariant under test
//! Re-entering `completado`, whether by repeating the request or by reopening
//! the order and completing it again, never decrements stock a second time.

use shop_inventory::TransitionService;
use shop_testkit::{seed_order, seed_product, MemoryStore};

#[tokio::test]
async fn repeated_completion_is_status_only() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let p = seed_product(&store, "P1", 10).await;
    let order = seed_order(&store, &[(p, 3)]).await;
    let svc = TransitionService::new(store.clone());

    let first = svc.transition_status(order, "completado").await?;
    let second = svc.transition_status(order, "completado").await?;

    assert!(first.inventory_adjusted);
    assert!(!second.inventory_adjusted);
    assert_eq!(second.previous_status, "completado");
    assert_eq!(store.stock(p).await, Some(7));
    Ok(())
}

#[tokio::test]
async fn leaving_completed_does_not_restore_stock() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let p = seed_product(&store, "P", 10).await;
    let order = seed_order(&store, &[(p, 4)]).await;
    let svc = TransitionService::new(store.clone());

    svc.transition_status(order, "completado").await?;
    let back = svc.transition_status(order, "pendiente").await?;

    assert!(!back.inventory_adjusted);
    assert_eq!(store.stock(p).await, Some(6));
    assert_eq!(store.order(order).await.and_then(|o| o.status).as_deref(), Some("pendiente"));
    Ok(())
}

#[tokio::test]
async fn reopen_then_complete_again_does_not_decrement_twice() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let p = seed_product(&store, "P", 10).await;
    let order = seed_order(&store, &[(p, 4)]).await;
    let svc = TransitionService::new(store.clone());

    svc.transition_status(order, "completado").await?;
    svc.transition_status(order, "enviado").await?;
    let again = svc.transition_status(order, "completado").await?;

    assert!(!again.inventory_adjusted);
    assert_eq!(store.stock(p).await, Some(6));
    assert_eq!(store.order(order).await.and_then(|o| o.status).as_deref(), Some("completado"));
    Ok(())
}

#[tokio::test]
async fn completion_stamps_marker_once() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let p = seed_product(&store, "P", 10).await;
    let order = seed_order(&store, &[(p, 1)]).await;
    let svc = TransitionService::new(store.clone());

    assert!(store.order(order).await.and_then(|o| o.inventory_applied_at).is_none());
    svc.transition_status(order, "completado").await?;
    let stamped = store.order(order).await.and_then(|o| o.inventory_applied_at);
    assert!(stamped.is_some());

    svc.transition_status(order, "completado").await?;
    assert_eq!(store.order(order).await.and_then(|o| o.inventory_applied_at), stamped);
    Ok(())
}

#[tokio::test]
async fn other_orders_are_unaffected_by_marker() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let p = seed_product(&store, "P", 10).await;
    let first = seed_order(&store, &[(p, 2)]).await;
    let second = seed_order(&store, &[(p, 3)]).await;
    let svc = TransitionService::new(store.clone());

    svc.transition_status(first, "completado").await?;
    svc.transition_status(second, "completado").await?;

    assert_eq!(store.stock(p).await, Some(5));
    Ok(())
}
