use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::repo::{Role, User};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub external_id: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub age: Option<i32>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
}

/// Request body for login. The identifier is the external id, not email.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub external_id: String,
    pub password: String,
}

/// Response returned after login or registration.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub external_id: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub age: Option<i32>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
}

impl From<User> for PublicUser {
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
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ForgotPasswordResponse {
    pub message: String,
    pub email_sent: bool,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_hides_credentials() {
        let user = PublicUser {
            id: Uuid::new_v4(),
            external_id: "PAC001".into(),
            full_name: "Ana Perez".into(),
            email: "ana@x.com".into(),
            role: Role::Patient,
            age: Some(34),
            specialty: None,
            license_number: None,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("PAC001"));
        assert!(json.contains("\"role\":\"patient\""));
        assert!(!json.contains("password"));
    }
}
