//! Role-based authorization and the authenticated principal.

use uuid::Uuid;

use super::error::AuthError;
use super::models::Role;
use super::token::AccessClaims;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

/// An empty requirement is open; otherwise the caller needs any one role.
#[must_use]
pub fn authorize(required: &[Role], caller: &[Role]) -> Access {
    if required.is_empty() || required.iter().any(|role| caller.contains(role)) {
        Access::Allow
    } else {
        Access::Deny
    }
}

/// Authenticated identity, passed explicitly to operations that need it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn require_any(&self, required: &[Role]) -> Result<(), AuthError> {
        match authorize(required, &self.roles) {
            Access::Allow => Ok(()),
            Access::Deny => Err(AuthError::Forbidden),
        }
    }
}

impl From<AccessClaims> for Principal {
    fn from(claims: AccessClaims) -> Self {
        Self {
            user_id: claims.id,
            email: claims.email,
            roles: claims.roles,
        }
    }
}
