use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::core::{
    AuditStamp, AuditTrail, CancelSignal, EntityData, EntityId, Managed, NewEntity, PageRequest,
    PagedResult, StoreError, StoreResult,
};

use super::{EntityStore, RowFilter, UniqueKey};

struct StoreState<T> {
    rows: BTreeMap<EntityId, Managed<T>>,
    next_id: EntityId,
}

/// Process-local store with row-level atomic writes.
///
/// Soft-deleted rows stay in `rows` forever; every read filters them out.
/// Unique keys are checked inside the write lock, which makes them the
/// authoritative guard against concurrent duplicate inserts.
pub struct InMemoryEntityStore<T> {
    state: RwLock<StoreState<T>>,
    unique_keys: Vec<UniqueKey<T>>,
}

impl<T: EntityData> Default for InMemoryEntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: EntityData> InMemoryEntityStore<T> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState {
                rows: BTreeMap::new(),
                next_id: 1,
            }),
            unique_keys: Vec::new(),
        }
    }

    pub fn with_unique_key(mut self, key: UniqueKey<T>) -> Self {
        self.unique_keys.push(key);
        self
    }

    fn check_unique(&self, state: &StoreState<T>, data: &T, exclude: Option<EntityId>) -> StoreResult<()> {
        for key in &self.unique_keys {
            let value = key.key_of(data);
            let taken = live_rows(&state.rows)
                .filter(|row| Some(row.id) != exclude)
                .any(|row| key.key_of(&row.data) == value);

            if taken {
                return Err(StoreError::UniqueViolation {
                    kind: T::KIND,
                    key: key.name(),
                    message: key.conflict_message(data),
                    value,
                });
            }
        }
        Ok(())
    }
}

fn live_rows<T>(rows: &BTreeMap<EntityId, Managed<T>>) -> impl Iterator<Item = &Managed<T>> {
    rows.values().filter(|row| !row.is_deleted())
}

#[async_trait]
impl<T: EntityData> EntityStore<T> for InMemoryEntityStore<T> {
    async fn get_by_id(
        &self,
        id: EntityId,
        cancel: &CancelSignal,
    ) -> StoreResult<Option<Managed<T>>> {
        cancel.ensure_active()?;
        let state = self.state.read().await;
        Ok(state.rows.get(&id).filter(|row| !row.is_deleted()).cloned())
    }

    async fn get_all(&self, cancel: &CancelSignal) -> StoreResult<Vec<Managed<T>>> {
        cancel.ensure_active()?;
        let state = self.state.read().await;
        Ok(live_rows(&state.rows).cloned().collect())
    }

    async fn get_paged(
        &self,
        page: PageRequest,
        cancel: &CancelSignal,
    ) -> StoreResult<PagedResult<Managed<T>>> {
        cancel.ensure_active()?;
        let state = self.state.read().await;

        let mut live = live_rows(&state.rows).collect::<Vec<_>>();
        live.sort_by(|left, right| {
            right
                .audit
                .created_at
                .cmp(&left.audit.created_at)
                .then_with(|| right.id.cmp(&left.id))
        });

        let total = u64::try_from(live.len()).unwrap_or(u64::MAX);
        let items = live
            .into_iter()
            .skip(page.offset())
            .take(page.limit())
            .cloned()
            .collect();

        Ok(PagedResult::new(items, page, total))
    }

    async fn add(&self, entity: NewEntity<T>, cancel: &CancelSignal) -> StoreResult<Managed<T>> {
        let mut state = self.state.write().await;
        self.check_unique(&state, &entity.data, None)?;
        cancel.ensure_active()?;

        let id = state.next_id;
        state.next_id += 1;

        let stored = Managed {
            id,
            data: entity.data,
            audit: AuditTrail::created(entity.created),
        };
        state.rows.insert(id, stored.clone());

        debug!(kind = T::KIND, id, "row inserted");
        Ok(stored)
    }

    async fn update(&self, entity: Managed<T>, cancel: &CancelSignal) -> StoreResult<Managed<T>> {
        let mut state = self.state.write().await;

        let live = state
            .rows
            .get(&entity.id)
            .is_some_and(|row| !row.is_deleted());
        if !live {
            return Err(StoreError::NotFound {
                kind: T::KIND,
                id: entity.id,
            });
        }

        self.check_unique(&state, &entity.data, Some(entity.id))?;
        cancel.ensure_active()?;

        let row = state.rows.get_mut(&entity.id).ok_or(StoreError::NotFound {
            kind: T::KIND,
            id: entity.id,
        })?;
        row.data = entity.data;
        row.audit.updated_by = entity.audit.updated_by;
        row.audit.updated_at = entity.audit.updated_at;

        debug!(kind = T::KIND, id = row.id, "row updated");
        Ok(row.clone())
    }

    async fn delete(
        &self,
        id: EntityId,
        stamp: AuditStamp,
        cancel: &CancelSignal,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;

        let row = state
            .rows
            .get_mut(&id)
            .filter(|row| !row.is_deleted())
            .ok_or(StoreError::NotFound { kind: T::KIND, id })?;

        cancel.ensure_active()?;
        row.audit.mark_deleted(stamp);

        debug!(kind = T::KIND, id, "row soft-deleted");
        Ok(())
    }

    async fn exists(&self, id: EntityId, cancel: &CancelSignal) -> StoreResult<bool> {
        cancel.ensure_active()?;
        let state = self.state.read().await;
        Ok(state.rows.get(&id).is_some_and(|row| !row.is_deleted()))
    }

    async fn count(&self, cancel: &CancelSignal) -> StoreResult<u64> {
        cancel.ensure_active()?;
        let state = self.state.read().await;
        Ok(u64::try_from(live_rows(&state.rows).count()).unwrap_or(u64::MAX))
    }

    async fn find_where(
        &self,
        filter: RowFilter<'_, T>,
        cancel: &CancelSignal,
    ) -> StoreResult<Vec<Managed<T>>> {
        cancel.ensure_active()?;
        let state = self.state.read().await;
        Ok(live_rows(&state.rows)
            .filter(|row| filter(row))
            .cloned()
            .collect())
    }

    async fn any_where(
        &self,
        filter: RowFilter<'_, T>,
        exclude: Option<EntityId>,
        cancel: &CancelSignal,
    ) -> StoreResult<bool> {
        cancel.ensure_active()?;
        let state = self.state.read().await;
        Ok(live_rows(&state.rows)
            .filter(|row| Some(row.id) != exclude)
            .any(|row| filter(row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Actor;
    use chrono::{DateTime, Duration, Utc};
    use serde::Serialize;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Tag {
        code: String,
    }

    impl EntityData for Tag {
        const KIND: &'static str = "Tag";
    }

    fn tag(code: &str) -> Tag {
        Tag {
            code: code.to_string(),
        }
    }

    fn stamp_at(at: DateTime<Utc>) -> AuditStamp {
        AuditStamp::new(&Actor::system(), at)
    }

    fn unique_store() -> InMemoryEntityStore<Tag> {
        InMemoryEntityStore::new().with_unique_key(UniqueKey::new(
            "code",
            |t: &Tag| t.code.to_lowercase(),
            |t: &Tag| format!("Tag with code '{}' already exists", t.code),
        ))
    }

    async fn insert(store: &InMemoryEntityStore<Tag>, code: &str, at: DateTime<Utc>) -> Managed<Tag> {
        store
            .add(
                NewEntity {
                    data: tag(code),
                    created: stamp_at(at),
                },
                &CancelSignal::new(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn add_assigns_sequential_ids() {
        let store = InMemoryEntityStore::new();
        let first = insert(&store, "a", Utc::now()).await;
        let second = insert(&store, "b", Utc::now()).await;

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.count(&CancelSignal::new()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn soft_deleted_rows_are_invisible_to_reads() {
        let store = InMemoryEntityStore::new();
        let cancel = CancelSignal::new();
        let kept = insert(&store, "keep", Utc::now()).await;
        let gone = insert(&store, "gone", Utc::now()).await;

        store
            .delete(gone.id, AuditStamp::now(&Actor::new("eve")), &cancel)
            .await
            .unwrap();

        assert!(store.get_by_id(gone.id, &cancel).await.unwrap().is_none());
        assert!(!store.exists(gone.id, &cancel).await.unwrap());
        assert_eq!(store.count(&cancel).await.unwrap(), 1);

        let all = store.get_all(&cancel).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, kept.id);

        let page = store.get_paged(PageRequest::new(1, 10), &cancel).await.unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items.len(), 1);

        let raw = store.state.read().await;
        let row = raw.rows.get(&gone.id).unwrap();
        assert!(row.audit.is_deleted);
        assert_eq!(row.audit.deleted_by.as_deref(), Some("eve"));
        assert!(row.audit.deleted_at.is_some());
    }

    #[tokio::test]
    async fn delete_is_not_idempotent() {
        let store = InMemoryEntityStore::new();
        let cancel = CancelSignal::new();
        let row = insert(&store, "x", Utc::now()).await;

        store.delete(row.id, AuditStamp::now(&Actor::system()), &cancel).await.unwrap();
        let again = store.delete(row.id, AuditStamp::now(&Actor::system()), &cancel).await;
        assert!(matches!(again, Err(StoreError::NotFound { id, .. }) if id == row.id));

        let missing = store.delete(99, AuditStamp::now(&Actor::system()), &cancel).await;
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn update_refuses_deleted_rows_and_keeps_creation_columns() {
        let store = InMemoryEntityStore::new();
        let cancel = CancelSignal::new();
        let created_at = Utc::now() - Duration::hours(1);
        let row = insert(&store, "x", created_at).await;

        let mut changed = row.clone();
        changed.data = tag("y");
        changed.audit.created_by = "mallory".to_string();
        changed.audit.mark_updated(AuditStamp::now(&Actor::new("bob")));

        let stored = store.update(changed.clone(), &cancel).await.unwrap();
        assert_eq!(stored.data, tag("y"));
        assert_eq!(stored.audit.created_by, "system");
        assert_eq!(stored.audit.created_at, created_at);
        assert_eq!(stored.audit.updated_by.as_deref(), Some("bob"));

        store.delete(row.id, AuditStamp::now(&Actor::system()), &cancel).await.unwrap();
        let after_delete = store.update(changed, &cancel).await;
        assert!(matches!(after_delete, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn paging_orders_newest_first_with_id_tiebreak() {
        let store = InMemoryEntityStore::new();
        let cancel = CancelSignal::new();
        let base = Utc::now() - Duration::days(1);

        for index in 0..25 {
            insert(&store, &format!("t{index}"), base + Duration::seconds(index)).await;
        }
        let same_instant = base + Duration::seconds(100);
        let older_twin = insert(&store, "twin-a", same_instant).await;
        let newer_twin = insert(&store, "twin-b", same_instant).await;

        let first = store.get_paged(PageRequest::new(1, 2), &cancel).await.unwrap();
        assert_eq!(
            first.items.iter().map(|row| row.id).collect::<Vec<_>>(),
            vec![newer_twin.id, older_twin.id]
        );
        assert_eq!(first.total_count, 27);

        let last = store.get_paged(PageRequest::new(14, 2), &cancel).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].data, tag("t0"));
        assert_eq!(last.total_count, 27);
    }

    #[tokio::test]
    async fn unique_key_is_enforced_on_live_rows_only() {
        let store = unique_store();
        let cancel = CancelSignal::new();
        let original = insert(&store, "Alpha", Utc::now()).await;

        let duplicate = store
            .add(
                NewEntity {
                    data: tag("alpha"),
                    created: AuditStamp::now(&Actor::system()),
                },
                &cancel,
            )
            .await;
        assert!(matches!(
            duplicate,
            Err(StoreError::UniqueViolation { ref message, .. })
                if message == "Tag with code 'alpha' already exists"
        ));

        let self_update = store.update(original.clone(), &cancel).await;
        assert!(self_update.is_ok());

        store
            .delete(original.id, AuditStamp::now(&Actor::system()), &cancel)
            .await
            .unwrap();
        let reused = insert(&store, "ALPHA", Utc::now()).await;
        assert_eq!(reused.data, tag("ALPHA"));
    }

    #[tokio::test]
    async fn cancelled_writes_leave_state_untouched() {
        let store = InMemoryEntityStore::new();
        let row = insert(&store, "x", Utc::now()).await;

        let cancel = CancelSignal::new();
        cancel.cancel();

        let add = store
            .add(
                NewEntity {
                    data: tag("y"),
                    created: AuditStamp::now(&Actor::system()),
                },
                &cancel,
            )
            .await;
        assert!(matches!(add, Err(StoreError::Cancelled)));

        let delete = store
            .delete(row.id, AuditStamp::now(&Actor::system()), &cancel)
            .await;
        assert!(matches!(delete, Err(StoreError::Cancelled)));

        let live = CancelSignal::new();
        assert_eq!(store.count(&live).await.unwrap(), 1);
        assert!(store.exists(row.id, &live).await.unwrap());
    }

    #[tokio::test]
    async fn predicate_queries_skip_excluded_and_deleted_rows() {
        let store = InMemoryEntityStore::new();
        let cancel = CancelSignal::new();
        let a = insert(&store, "same", Utc::now()).await;
        let b = insert(&store, "same", Utc::now()).await;
        let is_same = |row: &Managed<Tag>| row.data.code == "same";

        assert!(store.any_where(&is_same, Some(a.id), &cancel).await.unwrap());
        store.delete(b.id, AuditStamp::now(&Actor::system()), &cancel).await.unwrap();
        assert!(!store.any_where(&is_same, Some(a.id), &cancel).await.unwrap());

        let found = store.find_where(&is_same, &cancel).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, a.id);
    }
}
