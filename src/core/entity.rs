//! Managed entity shape shared by every stored type.
//!
//! A stored row is a [`Managed<T>`]: the business payload `T` plus the
//! identifier and the [`AuditTrail`] owned by the lifecycle layer. Entity
//! types only describe their business fields; identity, audit stamps and
//! the soft-delete flag are never part of a request payload.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::actor::Actor;

/// Numeric row identifier assigned by the store.
pub type EntityId = i64;

/// Business payload of a managed entity.
pub trait EntityData: Clone + Send + Sync + Serialize + 'static {
    /// Resource name used in not-found messages and logs.
    const KIND: &'static str;
}

/// Who touched a row and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTrail {
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AuditTrail {
    pub fn created(stamp: AuditStamp) -> Self {
        Self {
            created_by: stamp.actor,
            created_at: stamp.at,
            updated_by: None,
            updated_at: None,
            is_deleted: false,
            deleted_by: None,
            deleted_at: None,
        }
    }

    pub fn mark_updated(&mut self, stamp: AuditStamp) {
        self.updated_by = Some(stamp.actor);
        self.updated_at = Some(stamp.at);
    }

    pub fn mark_deleted(&mut self, stamp: AuditStamp) {
        self.is_deleted = true;
        self.deleted_by = Some(stamp.actor);
        self.deleted_at = Some(stamp.at);
    }
}

/// Actor + timestamp pair applied to one audit column group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditStamp {
    pub actor: String,
    pub at: DateTime<Utc>,
}

impl AuditStamp {
    pub fn new(actor: &Actor, at: DateTime<Utc>) -> Self {
        Self {
            actor: actor.name().to_string(),
            at,
        }
    }

    pub fn now(actor: &Actor) -> Self {
        Self::new(actor, Utc::now())
    }
}

/// A stored entity: identifier, audit trail and business payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Managed<T> {
    pub id: EntityId,
    #[serde(flatten)]
    pub data: T,
    #[serde(flatten)]
    pub audit: AuditTrail,
}

impl<T> Managed<T> {
    pub fn is_deleted(&self) -> bool {
        self.audit.is_deleted
    }
}

/// Payload handed to the store for insertion; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewEntity<T> {
    pub data: T,
    pub created: AuditStamp,
}
