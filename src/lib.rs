//! Audited, soft-deletable entity lifecycle with a uniform HTTP surface.
//!
//! Layers, bottom-up: `core` (audit trail, errors, paging, cancellation),
//! `validation`, `store` (persistence contract and the in-process store),
//! `service` (generic lifecycle), `employee` (the concrete entity) and `web`
//! (router, problem translation, response envelope).

pub mod config;
pub mod core;
pub mod employee;
pub mod service;
pub mod store;
pub mod validation;
pub mod web;

pub use crate::core::{
    Actor, AuditTrail, CancelSignal, EntityData, EntityId, Managed, PageRequest, PagedResult,
    Result, ServiceError, StoreError,
};
pub use employee::{Employee, EmployeeRequest, EmployeeService};
pub use service::LifecycleService;
pub use store::{EntityStore, UniqueKey, memory::InMemoryEntityStore};
pub use validation::{Validate, ValidationOutcome};
pub use web::{AppState, WebSettings, build_router};
