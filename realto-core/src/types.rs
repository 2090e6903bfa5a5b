//! Core data type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request header carrying the raw auth token
pub const TOKEN_HEADER: &str = "X-Auth-Token";

/// Key under which the token is kept in both backing stores
pub const TOKEN_STORAGE_KEY: &str = "token";

/// Opaque role identifier used for authorization checks elsewhere
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole(pub String);

impl UserRole {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserRole {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Profile of the signed-in back-office user
///
/// Replaced wholesale on login/restore, never field-patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub roles: Vec<UserRole>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
            .trim()
            .to_string()
    }
}

/// In-memory record of the current authentication token and user profile
///
/// An empty token means unauthenticated. Token and profile are set together
/// and cleared together; no partially-populated session survives an operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

impl Session {
    pub fn new(token: String, user: UserProfile) -> Self {
        Self { token, user }
    }

    /// "Authenticated" is purely local: the token is non-empty. It may be
    /// stale relative to the server until the next request triggers a 401.
    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }
}

/// Login request body
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Reference to a titled dictionary entity (city, action, entity kind)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TitledRef {
    #[serde(default)]
    pub title: String,
}

/// Short reference to a person (listing author, moderator)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonRef {
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
}

impl PersonRef {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
            .trim()
            .to_string()
    }
}

/// One property listing row in a paginated list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RealtySummary {
    pub guid: String,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_sale_published: bool,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub city: TitledRef,
    #[serde(default)]
    pub author: PersonRef,
    #[serde(default)]
    pub action: TitledRef,
    #[serde(default)]
    pub entity: TitledRef,
}

impl RealtySummary {
    /// Human-readable publication status
    pub fn status_label(&self) -> &'static str {
        if !self.is_published {
            "inactive"
        } else if self.is_sale_published {
            "published for sale"
        } else {
            "active"
        }
    }
}

/// One realtor row in a paginated list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RealtorSummary {
    pub guid: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub city: TitledRef,
}

/// Full realtor profile returned by the info endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RealtorProfile {
    pub guid: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub city: TitledRef,
    #[serde(default)]
    pub about: Option<String>,
}

/// Fields accepted by the realtor profile update endpoint
#[derive(Debug, Clone, Default, Serialize)]
pub struct RealtorUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_authentication_predicate() {
        let mut session = Session::default();
        assert!(!session.is_authenticated());

        session.token = "T1".to_string();
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_user_role_deserializes_from_bare_string() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"guid":"u1","roles":["admin","moderator"]}"#).unwrap();
        assert_eq!(
            profile.roles,
            vec![UserRole::from("admin"), UserRole::from("moderator")]
        );
    }

    #[test]
    fn test_realty_status_label() {
        let mut realty = RealtySummary {
            is_published: true,
            ..Default::default()
        };
        assert_eq!(realty.status_label(), "active");

        realty.is_sale_published = true;
        assert_eq!(realty.status_label(), "published for sale");

        realty.is_published = false;
        assert_eq!(realty.status_label(), "inactive");
    }
}
