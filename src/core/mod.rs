pub mod actor;
pub mod cancel;
pub mod entity;
pub mod error;
pub mod paging;

pub use actor::{Actor, SYSTEM_ACTOR};
pub use cancel::CancelSignal;
pub use entity::{AuditStamp, AuditTrail, EntityData, EntityId, Managed, NewEntity};
pub use error::{Result, ServiceError, StoreError, StoreResult};
pub use paging::{PageRequest, PagedResult};
