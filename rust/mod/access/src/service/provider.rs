use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::model::IdentityProfile;
use crate::service::AccessError;

/// OAuth2 identity provider used by the login flow.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the browser is redirected to for the given `state`.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an authorization code for the caller's verified profile.
    /// Every transport, status or parse failure is `AccessError::Upstream`.
    async fn exchange(&self, code: &str) -> Result<IdentityProfile, AccessError>;
}

/// OAuth client settings (`[oauth]` in the server config).
///
/// Endpoints default to Google's.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_userinfo_url")]
    pub userinfo_url: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

fn default_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_userinfo_url() -> String {
    "https://openidconnect.googleapis.com/v1/userinfo".to_string()
}

fn default_scopes() -> Vec<String> {
    vec!["openid".into(), "email".into(), "profile".into()]
}

/// Authorization-code client over reqwest.
pub struct OAuthProvider {
    config: OAuthConfig,
    client: reqwest::Client,
}

impl OAuthProvider {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct TokenReply {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

impl UserInfo {
    fn into_profile(self) -> Result<IdentityProfile, AccessError> {
        let email = self
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| AccessError::Upstream("identity provider returned no email".into()))?;
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.clone());
        Ok(IdentityProfile {
            email,
            name,
            picture: self.picture,
        })
    }
}

#[async_trait]
impl IdentityProvider for OAuthProvider {
    fn authorize_url(&self, state: &str) -> String {
        let scopes = self.config.scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&scope={}&state={}&response_type=code&access_type=offline&prompt=consent",
            self.config.auth_url,
            urlencoded(&self.config.client_id),
            urlencoded(&self.config.redirect_url),
            urlencoded(&scopes),
            urlencoded(state),
        )
    }

    async fn exchange(&self, code: &str) -> Result<IdentityProfile, AccessError> {
        let token_resp = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AccessError::Upstream(format!("token exchange failed: {e}")))?;

        if !token_resp.status().is_success() {
            let status = token_resp.status();
            let body = token_resp.text().await.unwrap_or_default();
            return Err(AccessError::Upstream(format!(
                "token exchange returned {status}: {body}"
            )));
        }

        let token: TokenReply = token_resp
            .json()
            .await
            .map_err(|e| AccessError::Upstream(format!("token response parse failed: {e}")))?;

        let userinfo_resp = self
            .client
            .get(&self.config.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| AccessError::Upstream(format!("userinfo request failed: {e}")))?;

        if !userinfo_resp.status().is_success() {
            return Err(AccessError::Upstream(format!(
                "userinfo returned {}",
                userinfo_resp.status()
            )));
        }

        let info: UserInfo = userinfo_resp
            .json()
            .await
            .map_err(|e| AccessError::Upstream(format!("userinfo parse failed: {e}")))?;
        let profile = info.into_profile()?;
        debug!(email = %profile.email, "identity provider exchange complete");
        Ok(profile)
    }
}

/// Percent-encode a query parameter value (RFC 3986 unreserved set kept).
fn urlencoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OAuthConfig {
        toml::from_str(
            r#"
            client_id = "123.apps.googleusercontent.com"
            client_secret = "s3cret"
            redirect_url = "https://mediflow.hospital.pe/access/callback"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn config_defaults_to_google_endpoints() {
        let config = config();
        assert_eq!(config.auth_url, "https://accounts.google.com/o/oauth2/v2/auth");
        assert_eq!(config.token_url, "https://oauth2.googleapis.com/token");
        assert_eq!(config.scopes, vec!["openid", "email", "profile"]);
    }

    #[test]
    fn authorize_url_encodes_parameters() {
        let provider = OAuthProvider::new(config());
        let url = provider.authorize_url("abc 123");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=123.apps.googleusercontent.com"));
        assert!(url.contains(
            "redirect_uri=https%3A%2F%2Fmediflow.hospital.pe%2Faccess%2Fcallback"
        ));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("state=abc%20123"));
        assert!(url.contains("response_type=code"));
    }

    #[test]
    fn userinfo_requires_email_and_falls_back_to_it_for_name() {
        let info: UserInfo = serde_json::from_value(serde_json::json!({
            "email": "ana@hospital.pe",
            "picture": "https://img/ana.png"
        }))
        .unwrap();
        let profile = info.into_profile().unwrap();
        assert_eq!(profile.name, "ana@hospital.pe");
        assert_eq!(profile.picture.as_deref(), Some("https://img/ana.png"));

        let info: UserInfo = serde_json::from_value(serde_json::json!({"name": "Ana"})).unwrap();
        assert!(matches!(info.into_profile(), Err(AccessError::Upstream(_))));
    }

    #[test]
    fn urlencoded_handles_utf8() {
        assert_eq!(urlencoded("técnica"), "t%C3%A9cnica");
        assert_eq!(urlencoded("a-b_c.d~e"), "a-b_c.d~e");
    }
}
