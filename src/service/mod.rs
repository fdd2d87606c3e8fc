//! Generic entity lifecycle: validation, uniqueness, store calls and audit stamps.
//!
//! [`LifecycleService`] holds no per-request state; one instance serves every
//! concurrent request for its entity type. Entity types plug in behaviour
//! through [`CreateRequest`], [`UpdateRequest`] and [`UniqueKey`] values
//! instead of overriding service methods.
//!
//! The uniqueness pre-check and the following write are two store calls and
//! are not atomic with each other. Stores that declare the same [`UniqueKey`]
//! (see [`InMemoryEntityStore::with_unique_key`]) reject the losing writer of
//! such a race with `UniqueViolation`, which surfaces as the same
//! `BusinessRuleViolation` as the pre-check.
//!
//! [`InMemoryEntityStore::with_unique_key`]: crate::store::InMemoryEntityStore::with_unique_key

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, info};

use crate::core::{
    Actor, AuditStamp, CancelSignal, EntityData, EntityId, Managed, NewEntity, PageRequest,
    PagedResult, Result, ServiceError,
};
use crate::store::{EntityStore, UniqueKey};
use crate::validation::{Validate, ensure_valid};

/// Payload that creates a new entity from business fields only.
pub trait CreateRequest<T>: Validate + Send {
    fn into_entity(self) -> T;
}

/// Payload that overwrites the business fields of a loaded entity.
pub trait UpdateRequest<T>: Validate + Send {
    fn apply_to(self, entity: &mut T);
}

pub struct LifecycleService<T, C, U> {
    store: Arc<dyn EntityStore<T>>,
    unique_keys: Vec<UniqueKey<T>>,
    _requests: PhantomData<fn(C, U)>,
}

impl<T, C, U> Clone for LifecycleService<T, C, U> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            unique_keys: self.unique_keys.clone(),
            _requests: PhantomData,
        }
    }
}

impl<T, C, U> LifecycleService<T, C, U>
where
    T: EntityData,
    C: CreateRequest<T>,
    U: UpdateRequest<T>,
{
    pub fn new(store: Arc<dyn EntityStore<T>>) -> Self {
        Self {
            store,
            unique_keys: Vec::new(),
            _requests: PhantomData,
        }
    }

    pub fn with_unique_key(mut self, key: UniqueKey<T>) -> Self {
        self.unique_keys.push(key);
        self
    }

    pub fn store(&self) -> &Arc<dyn EntityStore<T>> {
        &self.store
    }

    pub async fn get_by_id(&self, id: EntityId, cancel: &CancelSignal) -> Result<Managed<T>> {
        self.store
            .get_by_id(id, cancel)
            .await?
            .ok_or_else(|| ServiceError::not_found(T::KIND, id))
    }

    pub async fn get_all(&self, cancel: &CancelSignal) -> Result<Vec<Managed<T>>> {
        Ok(self.store.get_all(cancel).await?)
    }

    pub async fn get_paged(
        &self,
        page: PageRequest,
        cancel: &CancelSignal,
    ) -> Result<PagedResult<Managed<T>>> {
        Ok(self.store.get_paged(page, cancel).await?)
    }

    pub async fn create(&self, request: C, actor: &Actor, cancel: &CancelSignal) -> Result<Managed<T>> {
        ensure_valid(&request)?;

        let data = request.into_entity();
        self.ensure_unique(&data, None, cancel).await?;

        let created = self
            .store
            .add(
                NewEntity {
                    data,
                    created: AuditStamp::now(actor),
                },
                cancel,
            )
            .await?;

        info!(kind = T::KIND, id = created.id, actor = %actor, "entity created");
        Ok(created)
    }

    pub async fn update(
        &self,
        id: EntityId,
        request: U,
        actor: &Actor,
        cancel: &CancelSignal,
    ) -> Result<Managed<T>> {
        ensure_valid(&request)?;

        let mut entity = self.get_by_id(id, cancel).await?;
        request.apply_to(&mut entity.data);
        self.ensure_unique(&entity.data, Some(id), cancel).await?;

        entity.audit.mark_updated(AuditStamp::now(actor));
        let updated = self.store.update(entity, cancel).await?;

        info!(kind = T::KIND, id, actor = %actor, "entity updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: EntityId, actor: &Actor, cancel: &CancelSignal) -> Result<()> {
        if !self.store.exists(id, cancel).await? {
            return Err(ServiceError::not_found(T::KIND, id));
        }

        self.store.delete(id, AuditStamp::now(actor), cancel).await?;

        info!(kind = T::KIND, id, actor = %actor, "entity soft-deleted");
        Ok(())
    }

    async fn ensure_unique(
        &self,
        data: &T,
        exclude: Option<EntityId>,
        cancel: &CancelSignal,
    ) -> Result<()> {
        for key in &self.unique_keys {
            let value = key.key_of(data);
            let matches = |row: &Managed<T>| key.key_of(&row.data) == value;

            if self.store.any_where(&matches, exclude, cancel).await? {
                debug!(kind = T::KIND, key = key.name(), "uniqueness pre-check failed");
                return Err(ServiceError::business_rule(key.conflict_message(data)));
            }
        }
        Ok(())
    }
}
