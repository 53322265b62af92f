use serde::{Deserialize, Serialize};

/// Roles carried in the access token. Accounts themselves live in the
/// account service; this crate only reads the role claim.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    Admin,
    Worker,
    Employer,
    User,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::SuperAdmin => "super_admin",
            UserRole::Admin => "admin",
            UserRole::Worker => "worker",
            UserRole::Employer => "employer",
            UserRole::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::SuperAdmin)
    }
}
