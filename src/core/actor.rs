use std::fmt;

/// Identity recorded in `createdBy` / `updatedBy` / `deletedBy`.
pub const SYSTEM_ACTOR: &str = "system";

/// The acting identity for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(String);

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn system() -> Self {
        Self(SYSTEM_ACTOR.to_string())
    }

    /// Falls back to [`Actor::system`] for absent or blank names.
    pub fn from_optional(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some(name) if !name.is_empty() => Self::new(name),
            _ => Self::system(),
        }
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for Actor {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
