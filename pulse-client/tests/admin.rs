mod common;

use common::{Backend, loaded, signed_in, store, wait_for};
use pulse_client::{ApiError, Endpoint, admin::UserAdmin};
use pulse_common::model::Id;
use std::sync::{Arc, atomic::Ordering};

fn user_ids(resource: &pulse_client::Resource) -> Vec<u64> {
    let page = resource.admin_users().unwrap();
    page.items.iter().map(|user| user.id.get()).collect()
}

#[tokio::test]
async fn pages_report_their_position_in_the_listing() {
    let backend = Backend::seeded();
    let store = store(backend, signed_in()).await;
    let admin = UserAdmin::new(store.clone());
    assert!(admin.pagination(2).is_none());

    let page = loaded(&store, Endpoint::AdminUsers { page: 2 }).await;
    assert_eq!(user_ids(&page), (16..=30).collect::<Vec<_>>());

    let pagination = admin.pagination(2).unwrap();
    assert_eq!(pagination.label().to_string(), "Showing 16–30 of 40");
    assert_eq!(pagination.page_count(), 3);
    assert!(pagination.has_previous());
    assert!(pagination.has_next());
}

#[tokio::test]
async fn refused_deletes_roll_the_page_back() {
    let backend = Backend::seeded();
    backend.fail_writes.store(true, Ordering::SeqCst);
    let store = store(Arc::clone(&backend), signed_in()).await;
    let admin = UserAdmin::new(store.clone());
    let key = Endpoint::AdminUsers { page: 1 };
    loaded(&store, key).await;

    let result = admin.delete_users(1, vec![Id::new(1), Id::new(2)]).await;

    assert!(matches!(result, Err(ApiError::Server { .. })));
    let page = store.get(&key).value.unwrap();
    assert_eq!(user_ids(&page), (1..=15).collect::<Vec<_>>());
    assert_eq!(page.admin_users().unwrap().total, 40);
    assert_eq!(backend.users.lock().len(), 40);
}

#[tokio::test]
async fn deletes_shrink_the_page_and_the_total() {
    let backend = Backend::seeded();
    let store = store(Arc::clone(&backend), signed_in()).await;
    let admin = UserAdmin::new(store.clone());
    let key = Endpoint::AdminUsers { page: 1 };
    loaded(&store, key).await;

    admin.delete_users(1, vec![Id::new(3)]).await.unwrap();

    let page = store.get(&key).value.unwrap();
    assert_eq!(page.admin_users().unwrap().items.len(), 14);
    assert_eq!(page.admin_users().unwrap().total, 39);

    // The server backfills the page from the next one.
    let page = wait_for(&store, key, |page| user_ids(page).contains(&16)).await;
    assert!(!user_ids(&page).contains(&3));
    assert_eq!(page.admin_users().unwrap().total, 39);
    assert_eq!(admin.pagination(1).unwrap().label().to_string(), "Showing 1–15 of 39");
}

#[tokio::test]
async fn deleting_nobody_sends_nothing() {
    let backend = Backend::seeded();
    backend.fail_writes.store(true, Ordering::SeqCst);
    let admin = UserAdmin::new(store(backend, signed_in()).await);

    admin.delete_users(1, Vec::new()).await.unwrap();
}
