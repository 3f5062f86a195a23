//! Identifiers for audit records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of one applied override, referenced from audit history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverrideId(Uuid);

impl OverrideId {
    /// Create a new random override identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an override identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OverrideId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OverrideId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(OverrideId::new(), OverrideId::new());
    }

    #[test]
    fn serializes_as_bare_uuid() {
        let id = OverrideId::from_uuid(Uuid::nil());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
    }
}
