use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Display name used when the gateway forwards none
pub const DEFAULT_USER_NAME: &str = "User";

/// Identity of an authenticated caller, as forwarded by the auth gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub name: String,
}

impl AuthUser {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Require an authenticated caller
pub fn require_caller(caller: Option<&AuthUser>) -> Result<&AuthUser> {
    caller.ok_or_else(|| AppError::Authentication("Not authenticated".to_string()))
}
