use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::characters::repo::Character;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response returned on a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct Created {
    pub created: bool,
}

/// Authenticated profile: everything except the secrets, with the owned
/// characters expanded into full records.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub characters: Vec<Character>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_response_uses_camel_case_user_id() {
        let resp = LoginResponse {
            message: "login successful".into(),
            token: "t".into(),
            user_id: Uuid::new_v4(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"userId\""));
        assert!(!json.contains("user_id"));
    }

    #[test]
    fn profile_has_no_secret_fields() {
        let profile = ProfileResponse {
            id: Uuid::new_v4(),
            username: "a".into(),
            email: "a@a.com".into(),
            characters: vec![],
        };
        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("token"));
    }
}
