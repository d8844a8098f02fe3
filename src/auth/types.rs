//! Types for authentication and user management

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// User profile as returned by the backend.
///
/// Only a handful of fields are known; everything else the backend sends is
/// kept in `extra` so it survives a save/load through the local store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user ID, a string or a number depending on the backend
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub id: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "firstName", default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(rename = "lastName", default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub permissions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    /// Any other profile fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Name to show in the UI: `name`, else first and last name, else email
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = self.name.as_ref().filter(|n| !n.trim().is_empty()) {
            return Some(name.clone());
        }
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !full.is_empty() {
            return Some(full);
        }
        self.email.clone()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Login request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Registration request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignupForm {
    #[serde(rename = "firstName")]
    pub first_name: String,

    #[serde(rename = "lastName")]
    pub last_name: String,

    pub email: String,

    pub password: String,

    pub organization: String,

    pub role: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Password change request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordChange {
    #[serde(rename = "currentPassword")]
    pub current_password: String,

    #[serde(rename = "newPassword")]
    pub new_password: String,
}

/// Body of the login, register and current-user responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    pub user: Option<User>,
    pub message: Option<String>,
}

impl AuthResponse {
    /// Read whatever a 2xx auth body offers.
    ///
    /// Bodies that are not JSON objects, and `user` values that are not a
    /// user profile, decode to a response without a user.
    pub fn from_body(data: &Value) -> Self {
        let user = match data.get("user") {
            None | Some(Value::Null) => None,
            Some(raw) => match serde_json::from_value(raw.clone()) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("Ignoring malformed user in auth response: {}", e);
                    None
                }
            },
        };
        Self {
            user,
            message: data.get("message").and_then(Value::as_str).map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let raw = json!({
            "id": "5f1c",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "role": "operator",
            "phone": "",
            "created_at": "2024-01-01T00:00:00",
            "last_login": null
        });

        let user: User = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert_eq!(user.extra["created_at"], "2024-01-01T00:00:00");

        assert_eq!(serde_json::to_value(&user).unwrap(), raw);
    }

    #[test]
    fn display_name_prefers_name_then_full_name_then_email() {
        let mut user = User {
            email: Some("ops@example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(user.display_name().as_deref(), Some("ops@example.com"));

        user.first_name = Some("Grace".to_string());
        user.last_name = Some("Hopper".to_string());
        assert_eq!(user.display_name().as_deref(), Some("Grace Hopper"));

        user.name = Some("Admiral".to_string());
        assert_eq!(user.display_name().as_deref(), Some("Admiral"));
    }

    #[test]
    fn null_permissions_read_as_empty() {
        let user: User = serde_json::from_value(json!({
            "id": 3,
            "email": "ops@example.com",
            "permissions": null
        }))
        .unwrap();
        assert!(user.permissions.is_empty());
        assert!(!user.has_permission("admin"));

        let body = json!({"user": {"id": 3, "permissions": null}});
        assert!(AuthResponse::from_body(&body).user.is_some());
    }

    #[test]
    fn auth_body_without_usable_user() {
        assert!(AuthResponse::from_body(&json!("OK")).user.is_none());
        assert!(AuthResponse::from_body(&json!({"user": null})).user.is_none());
        assert!(AuthResponse::from_body(&json!({"user": "ada"})).user.is_none());

        let body = json!({"message": "Welcome", "user": {"id": 1}});
        let response = AuthResponse::from_body(&body);
        assert_eq!(response.message.as_deref(), Some("Welcome"));
        assert_eq!(response.user.unwrap().id, json!(1));
    }

    #[test]
    fn signup_form_uses_backend_field_names() {
        let form = SignupForm {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "pw".to_string(),
            organization: "City".to_string(),
            role: "engineer".to_string(),
            phone: None,
        };
        let value = serde_json::to_value(&form).unwrap();
        assert_eq!(value["firstName"], "Ada");
        assert_eq!(value["lastName"], "Lovelace");
        assert!(value.get("phone").is_none());
    }
}
