//! Permission levels for request authorization

use serde::{Deserialize, Serialize};

/// Permission level attached to a request or token
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    /// Unauthenticated requests (public catalog, demos, lead capture)
    Public,
    /// Logged-in store customers
    Authenticated,
    /// Operators (catalog management)
    Admin,
}

impl PermissionLevel {
    /// Whether this level satisfies a required level
    pub fn satisfies(&self, required: PermissionLevel) -> bool {
        *self >= required
    }
}

impl std::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionLevel::Public => write!(f, "public"),
            PermissionLevel::Authenticated => write!(f, "authenticated"),
            PermissionLevel::Admin => write!(f, "admin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(PermissionLevel::Admin.satisfies(PermissionLevel::Authenticated));
        assert!(PermissionLevel::Authenticated.satisfies(PermissionLevel::Public));
        assert!(!PermissionLevel::Public.satisfies(PermissionLevel::Authenticated));
    }
}
