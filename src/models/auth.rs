use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserRole;

/// Claims embedded in the JWT access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // user UUID
    pub role: UserRole,
    pub code: String, // booking code
    pub exp: usize,
    pub iat: usize,
}

/// Extracted from the validated JWT, available via Axum extractors
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: UserRole,
    pub code: String,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admins may act on any booking; users only on their own code.
    pub fn can_access_code(&self, code: &str) -> bool {
        self.is_admin() || self.code == code
    }
}
