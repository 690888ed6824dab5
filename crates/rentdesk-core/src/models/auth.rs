use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Credentials submitted to the login endpoint.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Account creation payload. The backend creates the user (and the company
/// when `company_name` is given) and answers like a login.
#[derive(Debug, Clone, Default, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

/// Response of login and register.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response of the refresh endpoint. Backends that rotate refresh tokens
/// send a new one; otherwise the stored refresh token stays valid.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// The authenticated user as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
    /// Fields this layer does not interpret (permissions, subscription, ...)
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: Map<String, Value>,
}

impl User {
    /// Name for display, falling back to the email address
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// `/auth/me` answers either with the bare user or wrapped as `{ "user": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum MeResponse {
    Wrapped { user: User },
    Bare(User),
}

impl MeResponse {
    pub(crate) fn into_user(self) -> User {
        match self {
            MeResponse::Wrapped { user } | MeResponse::Bare(user) => user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_response() {
        let json = r#"{"accessToken":"A1","refreshToken":"R1","user":{"id":"u-1","email":"ops@yard.example","name":"Dana","role":"admin","companyId":"c-9","permissions":["fleet:read"]}}"#;
        let resp: LoginResponse = serde_json::from_str(json).expect("login response should parse");

        assert_eq!(resp.access_token, "A1");
        assert_eq!(resp.refresh_token, "R1");
        assert_eq!(resp.user.company_id.as_deref(), Some("c-9"));
        assert_eq!(resp.user.display_name(), "Dana");
        assert!(resp.user.extra.contains_key("permissions"));
    }

    #[test]
    fn test_refresh_response_without_rotation() {
        let resp: RefreshResponse =
            serde_json::from_str(r#"{"accessToken":"A2"}"#).expect("refresh response should parse");
        assert_eq!(resp.access_token, "A2");
        assert!(resp.refresh_token.is_none());
    }

    #[test]
    fn test_me_response_shapes() {
        let bare: MeResponse = serde_json::from_str(r#"{"_id":"u-1","email":"a@b.c"}"#).unwrap();
        assert_eq!(bare.into_user().id, "u-1");

        let wrapped: MeResponse =
            serde_json::from_str(r#"{"user":{"id":"u-2","email":"a@b.c","name":" "}}"#).unwrap();
        let user = wrapped.into_user();
        assert_eq!(user.id, "u-2");
        // Blank names fall back to the email
        assert_eq!(user.display_name(), "a@b.c");
    }

    #[test]
    fn test_register_request_skips_empty_fields() {
        let req = RegisterRequest {
            email: "a@b.c".to_string(),
            password: "pw".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"email": "a@b.c", "password": "pw"}));
    }
}
