//! Durable CRUD contract for one entity type.
//!
//! Every read path of an [`EntityStore`] excludes soft-deleted rows; there is
//! no query flag to opt back in. Deleting is a soft delete that stamps the
//! audit columns and is terminal.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{
    AuditStamp, CancelSignal, EntityData, EntityId, Managed, NewEntity, PageRequest, PagedResult,
    StoreResult,
};

pub use memory::InMemoryEntityStore;

/// Predicate over stored rows, evaluated only against non-deleted rows.
pub type RowFilter<'a, T> = &'a (dyn Fn(&Managed<T>) -> bool + Send + Sync);

#[async_trait]
pub trait EntityStore<T: EntityData>: Send + Sync {
    async fn get_by_id(
        &self,
        id: EntityId,
        cancel: &CancelSignal,
    ) -> StoreResult<Option<Managed<T>>>;

    /// All non-deleted rows; ordering is unspecified.
    async fn get_all(&self, cancel: &CancelSignal) -> StoreResult<Vec<Managed<T>>>;

    /// Rows ordered by `createdAt` descending, ties by id descending.
    async fn get_paged(
        &self,
        page: PageRequest,
        cancel: &CancelSignal,
    ) -> StoreResult<PagedResult<Managed<T>>>;

    async fn add(&self, entity: NewEntity<T>, cancel: &CancelSignal) -> StoreResult<Managed<T>>;

    /// Replaces the payload and update stamp of a live row. Creation and
    /// deletion columns are kept as stored.
    async fn update(&self, entity: Managed<T>, cancel: &CancelSignal) -> StoreResult<Managed<T>>;

    /// Soft delete. Fails with `NotFound` when the row is absent or already deleted.
    async fn delete(
        &self,
        id: EntityId,
        stamp: AuditStamp,
        cancel: &CancelSignal,
    ) -> StoreResult<()>;

    async fn exists(&self, id: EntityId, cancel: &CancelSignal) -> StoreResult<bool>;

    async fn count(&self, cancel: &CancelSignal) -> StoreResult<u64>;

    /// Non-deleted rows matching `filter`, in id order.
    async fn find_where(
        &self,
        filter: RowFilter<'_, T>,
        cancel: &CancelSignal,
    ) -> StoreResult<Vec<Managed<T>>>;

    /// Whether any non-deleted row other than `exclude` matches `filter`.
    async fn any_where(
        &self,
        filter: RowFilter<'_, T>,
        exclude: Option<EntityId>,
        cancel: &CancelSignal,
    ) -> StoreResult<bool>;
}

/// A uniqueness rule over non-deleted rows.
///
/// The same declaration drives the lifecycle pre-check and the store's
/// authoritative constraint, so both agree on normalization and messages.
pub struct UniqueKey<T> {
    name: &'static str,
    extract: Arc<dyn Fn(&T) -> String + Send + Sync>,
    message: Arc<dyn Fn(&T) -> String + Send + Sync>,
}

impl<T> Clone for UniqueKey<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            extract: Arc::clone(&self.extract),
            message: Arc::clone(&self.message),
        }
    }
}

impl<T> UniqueKey<T> {
    pub fn new(
        name: &'static str,
        extract: impl Fn(&T) -> String + Send + Sync + 'static,
        message: impl Fn(&T) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            extract: Arc::new(extract),
            message: Arc::new(message),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn key_of(&self, data: &T) -> String {
        (self.extract)(data)
    }

    /// Message for a rejected write, built from the submitted payload rather
    /// than the normalized key.
    pub fn conflict_message(&self, data: &T) -> String {
        (self.message)(data)
    }
}

impl<T> std::fmt::Debug for UniqueKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniqueKey").field("name", &self.name).finish()
    }
}
