//! Integration tests for the full cart pipeline.
//!
//! Engine and sweeper share one in-memory store, exercising:
//! - mutations feeding the lifecycle scans,
//! - abandonment and purge against live sessions,
//! - the projection the boundary serializes.

use std::sync::Arc;

use chrono::{Duration, Utc};

use trolley_catalog::Product;
use trolley_core::{ProductId, SessionId};

use crate::catalog::InMemoryCatalog;
use crate::engine::CartEngine;
use crate::store::{CartStore, InMemoryCartStore, InMemorySessionStore, SessionStore};
use crate::sweeper::{LifecycleSweeper, SweeperConfig};

type Engine = CartEngine<Arc<InMemoryCartStore>, Arc<InMemorySessionStore>, Arc<InMemoryCatalog>>;

struct World {
    engine: Engine,
    sweeper: LifecycleSweeper<Arc<InMemoryCartStore>>,
    store: Arc<InMemoryCartStore>,
    sessions: Arc<InMemorySessionStore>,
    iphone: ProductId,
    galaxy: ProductId,
}

fn world() -> World {
    let store = Arc::new(InMemoryCartStore::new());
    let sessions = Arc::new(InMemorySessionStore::new());
    let catalog = Arc::new(InMemoryCatalog::new());

    let iphone = ProductId::new();
    let galaxy = ProductId::new();
    catalog
        .insert(Product::new(iphone, "iPhone 15", 99_999))
        .unwrap();
    catalog
        .insert(Product::new(galaxy, "Samsung Galaxy", 79_999))
        .unwrap();

    World {
        engine: CartEngine::new(store.clone(), sessions.clone(), catalog),
        sweeper: LifecycleSweeper::new(store.clone(), SweeperConfig::default()),
        store,
        sessions,
        iphone,
        galaxy,
    }
}

#[test]
fn cart_lives_through_shopping_abandonment_and_purge() {
    let world = world();
    let session = SessionId::from("shopper");

    world.engine.add_item(&session, world.iphone, 2).unwrap();
    let snapshot = world.engine.add_item(&session, world.galaxy, 1).unwrap();
    let cart_id = snapshot.cart.id_typed();
    assert_eq!(snapshot.cart.total_price(), 279_997);

    // Idle past the inactivity threshold: the next sweep marks it.
    let marked_at = Utc::now() + Duration::hours(3);
    let report = world.sweeper.run_once(marked_at);
    assert_eq!(report.marked, 1);
    assert_eq!(report.purged, 0);
    assert!(world.store.get_cart(cart_id).unwrap().unwrap().is_abandoned());

    // Abandoned past the removal threshold: the next sweep destroys it,
    // items and all.
    let report = world.sweeper.run_once(marked_at + Duration::days(7));
    assert_eq!(report.purged, 1);
    assert!(world.store.get_cart(cart_id).unwrap().is_none());
    assert!(world.store.items_for_cart(cart_id).unwrap().is_empty());

    // The session still points at the dead cart; reads see nothing, and the
    // next mutation quietly starts a fresh cart.
    assert!(world.engine.get_cart(&session).unwrap().is_none());
    let fresh = world.engine.add_item(&session, world.iphone, 1).unwrap();
    assert_ne!(fresh.cart.id_typed(), cart_id);
    assert_eq!(fresh.cart.total_price(), 99_999);
    assert_eq!(
        world.sessions.get_cart_id(&session).unwrap(),
        Some(fresh.cart.id_typed())
    );
}

#[test]
fn sweep_leaves_active_carts_alone() {
    let world = world();
    let idle = SessionId::from("idle");
    let busy = SessionId::from("busy");

    world.engine.add_item(&idle, world.iphone, 1).unwrap();
    world.engine.add_item(&busy, world.galaxy, 1).unwrap();

    // The busy shopper interacts again two hours in; the idle one does not.
    let later = Utc::now() + Duration::hours(2);
    let busy_cart = world.engine.resolve(&busy).unwrap().unwrap();
    let mut refreshed = busy_cart.clone();
    refreshed.touch(later);
    world.store.update_cart(&refreshed).unwrap();

    let report = world.sweeper.run_once(Utc::now() + Duration::hours(3));
    assert_eq!(report.marked, 1);

    let idle_cart = world.engine.resolve(&idle).unwrap().unwrap();
    assert!(idle_cart.is_abandoned());
    let busy_cart = world.engine.resolve(&busy).unwrap().unwrap();
    assert!(!busy_cart.is_abandoned());
}

#[test]
fn revived_cart_survives_the_next_mark_pass() {
    let world = world();
    let session = SessionId::from("returning");

    world.engine.add_item(&session, world.iphone, 1).unwrap();
    let marked_at = Utc::now() + Duration::hours(3);
    world.sweeper.run_once(marked_at);
    assert!(world.engine.resolve(&session).unwrap().unwrap().is_abandoned());

    // The shopper comes back before the purge window: the mutation revives
    // the cart and the purge pass no longer sees it.
    world.engine.add_item(&session, world.galaxy, 1).unwrap();
    let cart = world.engine.resolve(&session).unwrap().unwrap();
    assert!(!cart.is_abandoned());

    let report = world.sweeper.run_once(marked_at + Duration::days(7));
    assert_eq!(report.purged, 0);
    assert!(world.engine.get_cart(&session).unwrap().is_some());
}

#[test]
fn projection_shape_end_to_end() {
    let world = world();
    let session = SessionId::from("shopper");

    let snapshot = world.engine.add_item(&session, world.iphone, 2).unwrap();
    let json = serde_json::to_value(snapshot.view()).unwrap();

    assert_eq!(
        json.get("id").unwrap(),
        &serde_json::json!(snapshot.cart.id_typed())
    );
    assert_eq!(json.get("total_price").unwrap(), &serde_json::json!(199_998));
    let items = json.get("items").unwrap().as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].get("name").unwrap(), "iPhone 15");
    assert_eq!(items[0].get("quantity").unwrap(), 2);
    assert_eq!(items[0].get("unit_price").unwrap(), 99_999);
    assert_eq!(items[0].get("line_total").unwrap(), 199_998);
}
