use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ADMIN_ROLE: &str = "admin";

/// Identity of the caller, inserted into request extensions by `protect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPayload {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
}

impl AuthPayload {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}
