use crate::{
    client::ApiClient,
    endpoint::{Endpoint, Resource},
    error::Result,
};
use pulse_common::{
    model::{Id, user::UserMarker},
    pagination::Pagination,
};
use pulse_sync::{FailurePolicy, Snapshot, SyncStore};

/// The paged user listing of the back-office.
#[derive(Clone, Debug)]
pub struct UserAdmin {
    store: SyncStore<ApiClient>,
}

impl UserAdmin {
    #[must_use]
    pub fn new(store: SyncStore<ApiClient>) -> Self {
        Self { store }
    }

    pub fn read(&self, page: u32) -> Snapshot<Resource> {
        self.store.read(&Endpoint::AdminUsers { page })
    }

    /// Pagination for `page` once its listing is cached.
    #[must_use]
    pub fn pagination(&self, page: u32) -> Option<Pagination> {
        let resource = self.store.get(&Endpoint::AdminUsers { page }).value?;
        let total = resource.admin_users()?.total;
        Some(Pagination::admin(page, total))
    }

    /// Removes the users from the visible page at once and rolls the page
    /// back if the server refuses.
    pub async fn delete_users(&self, page: u32, ids: Vec<Id<UserMarker>>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let key = Endpoint::AdminUsers { page };
        let before = self
            .store
            .get(&key)
            .value
            .and_then(|resource| resource.admin_users().cloned());

        let remove = {
            let ids = ids.clone();
            move |resource: &mut Resource| {
                if let Some(page) = resource.admin_users_mut() {
                    let count = page.items.len();
                    page.items.retain(|user| !ids.contains(&user.id));
                    let removed = u32::try_from(count - page.items.len()).unwrap_or(u32::MAX);
                    page.total = page.total.saturating_sub(removed);
                }
            }
        };
        let restore = move |resource: &mut Resource| {
            if let (Some(page), Some(before)) = (resource.admin_users_mut(), before) {
                *page = before;
            }
        };

        self.store
            .optimistic()
            .policy(FailurePolicy::Rollback)
            .patch(key, remove, restore)
            .run(self.store.fetcher().delete_users(&ids))
            .await
    }
}
