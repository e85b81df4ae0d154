/// Query tests
///
/// Tests for guest, staff, storeroom and hotel listings and history lookups
/// Run with: cargo test --test query_tests
///
/// Listings come back newest first.

mod common;

use common::World;
use luggage_custody::{CustodyError, Entity, IntakeRequest, LuggageStatus};

fn request(world: &World, guest: &str, phone: &str, storeroom_id: i64) -> IntakeRequest {
    IntakeRequest {
        contact_phone: Some(phone.into()),
        ..world.intake(guest, storeroom_id)
    }
}

#[tokio::test]
async fn test_guest_listings() {
    let world = World::new().await;
    let room = world.room(0).await;
    let engine = world.engine();

    let first = engine.create(request(&world, "Alice", "555-1000", room.id)).await.unwrap();
    let second = engine.create(request(&world, "Alice", "555-1000", room.id)).await.unwrap();
    engine.create(request(&world, "Bea", "555-2000", room.id)).await.unwrap();

    let alice = engine.list_by_guest(Some("Alice"), None, None).await.unwrap();
    let ids: Vec<_> = alice.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    let by_phone = engine.list_by_phone("555-2000", None).await.unwrap();
    assert_eq!(by_phone.len(), 1);
    assert_eq!(by_phone[0].guest_name, "Bea");

    let err = engine.list_by_guest(Some("  "), None, None).await.unwrap_err();
    assert!(matches!(err, CustodyError::InvalidInput { field: "guest", .. }));

    engine.retrieve(&first.retrieval_code, "bob").await.unwrap();
    let stored = engine.stored_by_guest(world.hotel.id, "Alice").await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, second.id);
}

#[tokio::test]
async fn test_phone_listing_filters_on_status() {
    let world = World::new().await;
    let room = world.room(0).await;
    let engine = world.engine();
    engine.create(request(&world, "Alice", "555-1000", room.id)).await.unwrap();

    let stored = engine
        .list_by_phone("555-1000", Some(LuggageStatus::Stored))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);

    let migrated = engine
        .list_by_phone("555-1000", Some(LuggageStatus::Migrated))
        .await
        .unwrap();
    assert!(migrated.is_empty());

    let err = engine.list_by_phone(" ", None).await.unwrap_err();
    assert!(matches!(err, CustodyError::InvalidInput { field: "contact_phone", .. }));
}

#[tokio::test]
async fn test_guest_names_are_distinct_and_sorted() {
    let world = World::new().await;
    let room = world.room(0).await;
    let engine = world.engine();

    for guest in ["Cleo", "Alice", "Cleo", "Bea"] {
        engine.create(world.intake(guest, room.id)).await.unwrap();
    }

    let names = engine.guest_names(world.hotel.id, None).await.unwrap();
    assert_eq!(names, vec!["Alice", "Bea", "Cleo"]);

    let other = world.other_hotel().await;
    assert!(engine.guest_names(other.id, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_staff_and_room_listings() {
    let world = World::new().await;
    let lobby = world.room(0).await;
    let cellar = world.room(0).await;
    let engine = world.engine();

    engine.create(world.intake("Alice", lobby.id)).await.unwrap();
    engine.create(world.intake("Bea", cellar.id)).await.unwrap();

    assert_eq!(engine.list_by_staff("bob", None).await.unwrap().len(), 2);
    assert!(engine.list_by_staff("carol", None).await.unwrap().is_empty());

    let in_lobby = engine.list_by_storeroom(lobby.id, None).await.unwrap();
    assert_eq!(in_lobby.len(), 1);
    assert_eq!(in_lobby[0].guest_name, "Alice");

    let stored = engine
        .list_by_hotel(world.hotel.id, Some(LuggageStatus::Stored))
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);

    let err = engine.list_by_storeroom(0, None).await.unwrap_err();
    assert!(matches!(err, CustodyError::InvalidInput { field: "storeroom_id", .. }));
}

#[tokio::test]
async fn test_history_lookups() {
    let world = World::new().await;
    let room = world.room(0).await;
    let engine = world.engine();

    let alice = engine.create(request(&world, "Alice", "555-1000", room.id)).await.unwrap();
    let bea = engine.create(request(&world, "Bea", "555-2000", room.id)).await.unwrap();
    engine.retrieve(&alice.retrieval_code, "bob").await.unwrap();
    engine.retrieve(&bea.retrieval_code, "bob").await.unwrap();

    let hotel = engine.history_by_hotel(world.hotel.id, None, None).await.unwrap();
    let ids: Vec<_> = hotel.iter().map(|row| row.luggage_id).collect();
    assert_eq!(ids, vec![bea.id, alice.id]);

    let by_phone = engine.history_by_guest(None, Some("555-1000")).await.unwrap();
    assert_eq!(by_phone.len(), 1);
    assert_eq!(by_phone[0].luggage_id, alice.id);

    let filtered = engine
        .history_by_hotel(world.hotel.id, Some("Bea"), None)
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);

    let err = engine.history_by_guest(None, None).await.unwrap_err();
    assert!(matches!(err, CustodyError::InvalidInput { field: "guest", .. }));
}

#[tokio::test]
async fn test_detail_by_code() {
    let world = World::new().await;
    let room = world.room(0).await;
    let engine = world.engine();
    let item = engine.create(world.intake("Alice", room.id)).await.unwrap();

    let detail = engine.detail_by_code(&item.retrieval_code).await.unwrap();
    assert_eq!(detail, item);

    let err = engine.detail_by_code("ZZZZZZ").await.unwrap_err();
    assert!(matches!(err, CustodyError::NotFound { entity: Entity::RetrievalCode, .. }));
}
