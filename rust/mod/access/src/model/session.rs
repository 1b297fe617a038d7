use serde::{Deserialize, Serialize};

use crate::model::Role;

/// JWT claims payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the verified email.
    pub sub: String,
    /// Display name reported by the identity provider.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Session id.
    pub sid: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

/// Session record kept in KV under `access/sessions/<id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub identity: String,
    pub issued_at: String,
    pub expires_at: String,
    #[serde(default)]
    pub revoked: bool,
}

/// Pending OAuth `state` value, kept in KV under `access/login_states/<state>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginState {
    pub state: String,
    pub expires_at: i64,
}

/// Profile returned by the identity provider after a successful exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityProfile {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
}

/// The authenticated, authorized caller of a request.
///
/// Inserted into request extensions by the auth middleware. The role is
/// resolved from the live role store on every request, never from the token.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub identity: String,
    pub name: String,
    pub picture: Option<String>,
    pub role: Role,
    pub session_id: String,
}

impl Principal {
    pub fn level(&self) -> i32 {
        self.role.level
    }

    /// JSON view used by `/access/me` and the login response.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "identity": self.identity,
            "name": self.name,
            "picture": self.picture,
            "role": {
                "display_name": self.role.display_name,
                "level": self.role.level,
                "capabilities": self.role.capabilities,
            },
        })
    }
}

/// Signed access token handed to the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}
