use restaurant_catalog::{
    config::SearchConfig,
    error::AppError,
    models::{NewRestaurant, Restaurant, Review, SearchField, SortBy},
    state::{
        EntityStore, FavoriteStore, InMemoryStore, RestaurantFilter, RestaurantStore, ReviewStore,
        SledStore,
    },
};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

/// Helper to create a test restaurant
fn create_test_restaurant(name: &str, cuisine: &str, madad: f64, date: &str) -> Restaurant {
    Restaurant::from_import(NewRestaurant {
        name: name.to_string(),
        cuisine: cuisine.to_string(),
        madad_number: madad,
        date: date.to_string(),
        ..Default::default()
    })
}

fn create_test_review(restaurant_id: Uuid, user_id: &str, score: f64) -> Review {
    Review::new(
        restaurant_id,
        user_id.to_string(),
        "Tester".to_string(),
        score,
        "Good food".to_string(),
    )
}

/// Test suite that runs against any EntityStore implementation
async fn test_restaurant_operations<S: EntityStore + 'static>(store: Arc<S>) {
    let restaurant = create_test_restaurant("Pasta Basta", "Italian", 8.0, "2024-01-01");
    let id = restaurant.id;

    store.insert_restaurant(&restaurant).await.unwrap();

    let retrieved = store.get_restaurant(&id).await.unwrap().unwrap();
    assert_eq!(retrieved.name, "Pasta Basta");
    assert_eq!(store.find_by_slug("pasta-basta").await.unwrap().unwrap().id, id);

    // Duplicate slug is rejected
    let clash = create_test_restaurant("Pasta Basta", "Italian", 1.0, "2024-01-02");
    assert!(matches!(
        store.insert_restaurant(&clash).await,
        Err(AppError::Conflict(_))
    ));

    store.patch_user_score(&id, 7.5, 2).await.unwrap();
    let patched = store.get_restaurant(&id).await.unwrap().unwrap();
    assert_eq!(patched.user_score, Some(7.5));
    assert_eq!(patched.user_review_count, Some(2));

    store.set_embedding(&id, vec![1.0, 0.0]).await.unwrap();
    let hits = store.nearest_neighbors(&[1.0, 0.0], 5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, id);

    let found = store.search_field(SearchField::Name, "pasta", 10).await.unwrap();
    assert_eq!(found.len(), 1);

    assert_eq!(store.count_restaurants().await.unwrap(), 1);
    store.delete_restaurant(&id).await.unwrap();
    assert!(store.get_restaurant(&id).await.unwrap().is_none());
    assert!(store.search_field(SearchField::Name, "pasta", 10).await.unwrap().is_empty());
    assert!(matches!(
        store.patch_user_score(&id, 1.0, 1).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        store.delete_restaurant(&id).await,
        Err(AppError::NotFound(_))
    ));
}

async fn test_listing<S: EntityStore + 'static>(store: Arc<S>) {
    let rows = [
        ("A", "Italian", 6.0, "2024-03-01", Some(9.0)),
        ("B", "Asian", 9.0, "2024-01-01", None),
        ("C", "Italian", 7.0, "2024-02-01", Some(4.0)),
    ];
    for (name, cuisine, madad, date, user_score) in rows {
        let r = create_test_restaurant(name, cuisine, madad, date);
        store.insert_restaurant(&r).await.unwrap();
        if let Some(score) = user_score {
            store.patch_user_score(&r.id, score, 1).await.unwrap();
        }
    }

    let names = |list: Vec<Restaurant>| list.into_iter().map(|r| r.name).collect::<Vec<_>>();

    let by_madad = store.list_restaurants(&RestaurantFilter::default()).await.unwrap();
    assert_eq!(names(by_madad), vec!["B", "C", "A"]);

    let by_user = store
        .list_restaurants(&RestaurantFilter {
            sort_by: SortBy::UserScore,
            ..Default::default()
        })
        .await
        .unwrap();
    // Missing user score sorts as 0
    assert_eq!(names(by_user), vec!["A", "C", "B"]);

    let by_date = store
        .list_restaurants(&RestaurantFilter {
            sort_by: SortBy::Date,
            limit: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(names(by_date), vec!["A", "C"]);

    let italian = store
        .list_restaurants(&RestaurantFilter {
            cuisine: Some("Italian".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(names(italian), vec!["C", "A"]);
}

async fn test_review_uniqueness<S: EntityStore + 'static>(store: Arc<S>) {
    let restaurant = create_test_restaurant("Mashya", "Israeli", 9.0, "2024-01-01");
    store.insert_restaurant(&restaurant).await.unwrap();

    let first = create_test_review(restaurant.id, "u1", 8.0);
    store.insert_review(&first).await.unwrap();

    let second = create_test_review(restaurant.id, "u1", 3.0);
    assert!(matches!(
        store.insert_review(&second).await,
        Err(AppError::Conflict(_))
    ));

    let mut edited = first.clone();
    edited.score = 6.0;
    edited.text = "Changed my mind".to_string();
    store.update_review(&edited).await.unwrap();
    let stored = store.get_review(&first.id).await.unwrap().unwrap();
    assert_eq!(stored.score, 6.0);
    assert_eq!(stored.text, "Changed my mind");

    assert_eq!(store.reviews_for_restaurant(&restaurant.id).await.unwrap().len(), 1);
    assert_eq!(
        store.find_user_review("u1", &restaurant.id).await.unwrap().unwrap().id,
        first.id
    );

    // Deleting frees the pair for a new review
    store.delete_review(&first.id).await.unwrap();
    assert!(store.find_user_review("u1", &restaurant.id).await.unwrap().is_none());
    store.insert_review(&second).await.unwrap();
    assert!(matches!(
        store.delete_review(&first.id).await,
        Err(AppError::NotFound(_))
    ));
}

/// A write that fails after the uniqueness check must not leave the slug or
/// the (user, restaurant) pair claimed
async fn test_failed_insert_leaves_no_claim<S: EntityStore + 'static>(store: Arc<S>) {
    let first = create_test_restaurant("Port Said", "Israeli", 8.0, "2024-01-01");
    store.insert_restaurant(&first).await.unwrap();

    // Fresh slug, but the row id is taken
    let mut clash = create_test_restaurant("Taizu", "Asian", 9.0, "2024-01-02");
    clash.id = first.id;
    assert!(matches!(
        store.insert_restaurant(&clash).await,
        Err(AppError::Conflict(_))
    ));
    assert!(store.find_by_slug("taizu").await.unwrap().is_none());
    assert_eq!(store.get_restaurant(&first.id).await.unwrap().unwrap().name, "Port Said");

    let taizu = create_test_restaurant("Taizu", "Asian", 9.0, "2024-01-02");
    store.insert_restaurant(&taizu).await.unwrap();
    assert_eq!(store.find_by_slug("taizu").await.unwrap().unwrap().id, taizu.id);

    let review = create_test_review(first.id, "u1", 8.0);
    store.insert_review(&review).await.unwrap();

    // Fresh pair, but the review id is taken
    let mut clash = create_test_review(first.id, "u2", 2.0);
    clash.id = review.id;
    assert!(matches!(
        store.insert_review(&clash).await,
        Err(AppError::Conflict(_))
    ));
    assert!(store.find_user_review("u2", &first.id).await.unwrap().is_none());
    assert_eq!(store.get_review(&review.id).await.unwrap().unwrap().user_id, "u1");

    // The pair is still free for a real review
    store
        .insert_review(&create_test_review(first.id, "u2", 6.0))
        .await
        .unwrap();
    assert_eq!(store.reviews_for_restaurant(&first.id).await.unwrap().len(), 2);
}

async fn test_favorite_toggle<S: EntityStore + 'static>(store: Arc<S>) {
    let rid = Uuid::new_v4();

    assert!(store.toggle_favorite("u1", &rid).await.unwrap());
    assert!(store.find_favorite("u1", &rid).await.unwrap().is_some());
    assert_eq!(store.favorites_for_user("u1").await.unwrap().len(), 1);
    assert!(store.favorites_for_user("u2").await.unwrap().is_empty());

    assert!(!store.toggle_favorite("u1", &rid).await.unwrap());
    assert!(store.find_favorite("u1", &rid).await.unwrap().is_none());
    assert!(store.favorites_for_user("u1").await.unwrap().is_empty());
}

async fn test_concurrent_toggles<S: EntityStore + 'static>(store: Arc<S>) {
    let rid = Uuid::new_v4();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.toggle_favorite("u1", &rid).await.unwrap() })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    // An even number of toggles leaves no row behind
    assert!(store.find_favorite("u1", &rid).await.unwrap().is_none());
    assert!(store.favorites_for_user("u1").await.unwrap().is_empty());
}

fn memory_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new(&SearchConfig::default()).unwrap())
}

fn sled_store() -> (TempDir, Arc<SledStore>) {
    let temp_dir = TempDir::new().unwrap();
    let store = SledStore::new(temp_dir.path(), &SearchConfig::default()).unwrap();
    (temp_dir, Arc::new(store))
}

#[tokio::test]
async fn test_in_memory_store() {
    test_restaurant_operations(memory_store()).await;
    test_listing(memory_store()).await;
    test_review_uniqueness(memory_store()).await;
    test_failed_insert_leaves_no_claim(memory_store()).await;
    test_favorite_toggle(memory_store()).await;
    test_concurrent_toggles(memory_store()).await;
}

#[tokio::test]
async fn test_sled_store() {
    let (_dir, store) = sled_store();
    test_restaurant_operations(store).await;

    let (_dir, store) = sled_store();
    test_listing(store).await;

    let (_dir, store) = sled_store();
    test_review_uniqueness(store).await;

    let (_dir, store) = sled_store();
    test_failed_insert_leaves_no_claim(store).await;

    let (_dir, store) = sled_store();
    test_favorite_toggle(store).await;

    let (_dir, store) = sled_store();
    test_concurrent_toggles(store).await;
}

#[tokio::test]
async fn test_sled_persistence_across_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let restaurant = create_test_restaurant("Shila", "Seafood", 8.5, "2024-05-05");

    {
        let store = SledStore::new(temp_dir.path(), &SearchConfig::default()).unwrap();
        store.insert_restaurant(&restaurant).await.unwrap();
        store
            .insert_review(&create_test_review(restaurant.id, "u1", 9.0))
            .await
            .unwrap();
        store.toggle_favorite("u1", &restaurant.id).await.unwrap();
        store.flush().await.unwrap();
    }

    let store = SledStore::new(temp_dir.path(), &SearchConfig::default()).unwrap();
    assert_eq!(store.count_restaurants().await.unwrap(), 1);
    assert_eq!(store.reviews_for_restaurant(&restaurant.id).await.unwrap().len(), 1);
    assert!(store.find_favorite("u1", &restaurant.id).await.unwrap().is_some());

    // Text index is rebuilt on open
    let hits = store.search_field(SearchField::Name, "shila", 5).await.unwrap();
    assert_eq!(hits.len(), 1);
}
