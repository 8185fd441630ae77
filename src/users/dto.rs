use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{Role, User};

/// Headline counts shown on the administrative listing.
#[derive(Debug, Serialize)]
pub struct UserStats {
    pub total: i64,
    pub doctors: i64,
    pub patients: i64,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub external_id: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub age: Option<i32>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
    pub created_at: OffsetDateTime,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            external_id: user.external_id,
            full_name: user.full_name,
            email: user.email,
            role: user.role,
            age: user.age,
            specialty: user.specialty,
            license_number: user.license_number,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserSummary>,
    pub stats: UserStats,
}

#[derive(Debug, Deserialize)]
pub struct RoleFilter {
    pub role: Option<Role>,
}

/// Admin edit of a user record. Role-specific fields are optional and keep
/// their stored value when omitted.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: String,
    pub email: String,
    pub age: Option<i32>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
}
