//! The authenticated caller every service operation is scoped to.

use models::user::UserRole;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: Uuid, tenant_id: Uuid, role: UserRole) -> Self { Self { user_id, tenant_id, role } }

    pub fn is_admin(&self) -> bool { self.role == UserRole::Admin }

    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() { Ok(()) } else { Err(ServiceError::forbidden("admin role required")) }
    }

    /// Rows from another tenant are reported as missing, never as forbidden.
    pub fn ensure_tenant(&self, tenant_id: Uuid, entity: &str) -> Result<(), ServiceError> {
        if self.tenant_id == tenant_id { Ok(()) } else { Err(ServiceError::not_found(entity)) }
    }
}
