use std::collections::HashSet;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Header};
use tracing::{info, warn};

use mediflow_core::new_id;

use crate::model::{Claims, LoginState, Principal, Session, TokenResponse};
use crate::service::gate::GateState;
use crate::service::resolver::{resolve, Resolution};
use crate::service::{AccessError, AccessService, NOT_AUTHORIZED};

const SESSION_PREFIX: &str = "access/sessions/";
const LOGIN_STATE_PREFIX: &str = "access/login_states/";

/// A completed login: the signed token and who it was issued to.
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub token: TokenResponse,
    pub principal: Principal,
}

impl AccessService {
    // ── Login flow ──

    /// Start a login: remember a fresh `state` and return the provider URL.
    pub fn begin_login(&self) -> Result<String, AccessError> {
        let state = new_id();
        let record = LoginState {
            state: state.clone(),
            expires_at: chrono::Utc::now().timestamp() + self.config.login_state_ttl,
        };
        self.put_json(&format!("{LOGIN_STATE_PREFIX}{state}"), &record)?;
        Ok(self.provider.authorize_url(&state))
    }

    /// The provider reported an error instead of a code: forget the state.
    pub fn cancel_login(&self, state: &str) -> Result<(), AccessError> {
        if !state.is_empty() {
            self.kv.delete(&format!("{LOGIN_STATE_PREFIX}{state}"))?;
        }
        Ok(())
    }

    fn consume_login_state(&self, state: &str) -> Result<(), AccessError> {
        let key = format!("{LOGIN_STATE_PREFIX}{state}");
        let record: Option<LoginState> = self.get_json(&key)?;
        self.kv.delete(&key)?;
        match record {
            Some(r) if r.expires_at >= chrono::Utc::now().timestamp() => Ok(()),
            Some(_) => Err(AccessError::Unauthenticated("login expired, try again".into())),
            None => Err(AccessError::Unauthenticated("unknown login state".into())),
        }
    }

    /// Finish a login from the provider callback.
    ///
    /// Unknown identities are refused with [`NOT_AUTHORIZED`]; provider
    /// failures come back as `Upstream` and no session is created.
    pub async fn complete_login(&self, code: &str, state: &str) -> Result<LoginSession, AccessError> {
        self.consume_login_state(state)?;

        let outcome = self.provider.exchange(code).await;
        if let Err(e) = &outcome {
            warn!(error = %e, "identity provider exchange failed");
        }

        let mut gate = GateState::Unauthenticated;
        gate.complete_login(outcome, &self.directory.snapshot())?;

        match gate {
            GateState::Authorized(mut principal) => {
                let (token, sid) = self.issue_session(&principal)?;
                principal.session_id = sid;
                info!(
                    identity = %principal.identity,
                    level = principal.level(),
                    "login authorized"
                );
                Ok(LoginSession { token, principal })
            }
            GateState::Denied { identity } => {
                warn!(%identity, "login denied: identity not in role store");
                Err(AccessError::Forbidden(NOT_AUTHORIZED.into()))
            }
            GateState::Unauthenticated => {
                Err(AccessError::Internal("login did not leave the unauthenticated state".into()))
            }
        }
    }

    // ── Sessions ──

    /// Sign a token for an authorized principal and record its session.
    pub fn issue_session(&self, principal: &Principal) -> Result<(TokenResponse, String), AccessError> {
        let sid = new_id();
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::seconds(self.config.token_ttl);

        let claims = Claims {
            sub: principal.identity.clone(),
            name: principal.name.clone(),
            picture: principal.picture.clone(),
            sid: sid.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        let access_token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AccessError::Internal(format!("JWT encode failed: {e}")))?;

        let session = Session {
            id: sid.clone(),
            identity: principal.identity.clone(),
            issued_at: now.to_rfc3339(),
            expires_at: exp.to_rfc3339(),
            revoked: false,
        };
        self.put_json(&format!("{SESSION_PREFIX}{sid}"), &session)?;

        let token = TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.token_ttl,
        };
        Ok((token, sid))
    }

    /// Decode a token and check its session is still live.
    ///
    /// A token that is expired, revoked or points at an unknown session also
    /// drops that session's user-management draft.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AccessError> {
        let claims = match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                if matches!(e.kind(), ErrorKind::ExpiredSignature) {
                    self.discard_expired_draft(token);
                }
                return Err(AccessError::Unauthenticated(format!("invalid token: {e}")));
            }
        };

        let session: Option<Session> = self.get_json(&format!("{SESSION_PREFIX}{}", claims.sid))?;
        match session {
            Some(s) if !s.revoked => Ok(claims),
            Some(_) => {
                self.directory.discard_draft(&claims.sid);
                Err(AccessError::Unauthenticated("session has been revoked".into()))
            }
            None => {
                self.directory.discard_draft(&claims.sid);
                Err(AccessError::Unauthenticated("unknown session".into()))
            }
        }
    }

    /// The signature is still checked; only the expiry is ignored.
    fn discard_expired_draft(&self, token: &str) {
        let mut validation = self.validation.clone();
        validation.validate_exp = false;
        if let Ok(data) = decode::<Claims>(token, &self.decoding_key, &validation) {
            self.directory.discard_draft(&data.claims.sid);
        }
    }

    /// Turn a bearer token into the request's principal.
    ///
    /// The role always comes from the live role store, so an identity
    /// removed by a commit or reload is refused on its next request.
    pub fn authenticate(&self, token: &str) -> Result<Principal, AccessError> {
        let claims = self.verify_token(token)?;
        match resolve(&claims.sub, &self.directory.snapshot()) {
            Resolution::Authorized(role) => Ok(Principal {
                identity: claims.sub,
                name: claims.name,
                picture: claims.picture,
                role,
                session_id: claims.sid,
            }),
            Resolution::Unauthorized => Err(AccessError::Forbidden(NOT_AUTHORIZED.into())),
        }
    }

    /// End a session: revoke the token and drop any user-management draft.
    pub fn logout(&self, principal: &Principal) -> Result<(), AccessError> {
        let mut gate = GateState::Authorized(principal.clone());
        gate.logout()?;
        self.revoke_session(&principal.session_id)?;
        self.directory.discard_draft(&principal.session_id);
        info!(identity = %principal.identity, "logout");
        Ok(())
    }

    pub fn revoke_session(&self, sid: &str) -> Result<(), AccessError> {
        let key = format!("{SESSION_PREFIX}{sid}");
        let mut session: Session = self
            .get_json(&key)?
            .ok_or_else(|| AccessError::NotFound(format!("session {sid} not found")))?;
        session.revoked = true;
        self.put_json(&key, &session)
    }

    /// Delete session and login-state records that can no longer be used,
    /// and the drafts of sessions that are no longer live.
    pub fn purge_expired(&self) -> Result<usize, AccessError> {
        let now = chrono::Utc::now();
        let mut purged = 0;
        let mut live_sids = HashSet::new();

        for (key, bytes) in self.kv.scan(SESSION_PREFIX)? {
            let session = serde_json::from_slice::<Session>(&bytes).ok();
            let expired = match &session {
                Some(s) => chrono::DateTime::parse_from_rfc3339(&s.expires_at)
                    .map(|exp| exp < now)
                    .unwrap_or(true),
                None => true,
            };
            if expired {
                self.kv.delete(&key)?;
                purged += 1;
            } else if let Some(s) = session.filter(|s| !s.revoked) {
                live_sids.insert(s.id);
            }
        }

        let drafts = self.directory.retain_drafts(|sid| live_sids.contains(sid));
        if drafts > 0 {
            info!(drafts, "drafts of ended sessions dropped");
        }

        for (key, bytes) in self.kv.scan(LOGIN_STATE_PREFIX)? {
            let expired = serde_json::from_slice::<LoginState>(&bytes)
                .map(|s| s.expires_at < now.timestamp())
                .unwrap_or(true);
            if expired {
                self.kv.delete(&key)?;
                purged += 1;
            }
        }

        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::test_service;

    fn state_from(url: &str) -> String {
        url.split("state=").nth(1).unwrap().to_string()
    }

    #[tokio::test]
    async fn login_issues_a_working_token() {
        let (_dir, svc) = test_service();
        let state = state_from(&svc.begin_login().unwrap());

        let login = svc.complete_login("user@example.com", &state).await.unwrap();
        assert_eq!(login.token.token_type, "Bearer");
        assert_eq!(login.principal.role.level, 2);
        assert!(!login.principal.session_id.is_empty());

        let principal = svc.authenticate(&login.token.access_token).unwrap();
        assert_eq!(principal.identity, "user@example.com");
        assert_eq!(principal.session_id, login.principal.session_id);
    }

    #[tokio::test]
    async fn state_is_single_use() {
        let (_dir, svc) = test_service();
        let state = state_from(&svc.begin_login().unwrap());
        svc.complete_login("user@example.com", &state).await.unwrap();

        let err = svc.complete_login("user@example.com", &state).await.unwrap_err();
        assert!(matches!(err, AccessError::Unauthenticated(_)));
        let err = svc.complete_login("user@example.com", "forged").await.unwrap_err();
        assert!(matches!(err, AccessError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn unknown_identity_gets_the_denial_message() {
        let (_dir, svc) = test_service();
        let state = state_from(&svc.begin_login().unwrap());
        match svc.complete_login("intruso@gmail.com", &state).await {
            Err(AccessError::Forbidden(msg)) => assert_eq!(msg, NOT_AUTHORIZED),
            other => panic!("unexpected {other:?}"),
        }
        assert!(svc.kv.scan(SESSION_PREFIX).unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_upstream_and_creates_no_session() {
        let (_dir, svc) = test_service();
        let state = state_from(&svc.begin_login().unwrap());
        let err = svc.complete_login("down", &state).await.unwrap_err();
        assert!(matches!(err, AccessError::Upstream(_)));
        assert!(svc.kv.scan(SESSION_PREFIX).unwrap().is_empty());
    }

    #[tokio::test]
    async fn logout_revokes_the_token() {
        let (_dir, svc) = test_service();
        let state = state_from(&svc.begin_login().unwrap());
        let login = svc.complete_login("jefe@hospital.pe", &state).await.unwrap();

        svc.directory.add_user(&login.principal.session_id, "n@x", "Pasante 0").unwrap();
        svc.logout(&login.principal).unwrap();

        assert!(matches!(
            svc.authenticate(&login.token.access_token),
            Err(AccessError::Unauthenticated(_))
        ));
        assert!(!svc.directory.has_pending_changes(&login.principal.session_id));
    }

    #[tokio::test]
    async fn removed_identity_is_forbidden_on_next_request() {
        let (_dir, svc) = test_service();
        let state = state_from(&svc.begin_login().unwrap());
        let login = svc.complete_login("user@example.com", &state).await.unwrap();

        let mut store = svc.directory.snapshot().as_ref().clone();
        store.remove("user@example.com");
        svc.directory.commit(store);

        match svc.authenticate(&login.token.access_token) {
            Err(AccessError::Forbidden(msg)) => assert_eq!(msg, NOT_AUTHORIZED),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn garbage_tokens_are_unauthenticated() {
        let (_dir, svc) = test_service();
        assert!(matches!(
            svc.authenticate("not.a.jwt"),
            Err(AccessError::Unauthenticated(_))
        ));
    }

    #[test]
    fn purge_drops_drafts_of_ended_sessions() {
        let (_dir, svc) = test_service();
        let principal = Principal {
            identity: "jefe@hospital.pe".into(),
            name: "Jefe".into(),
            picture: None,
            role: crate::model::Role::new("Jefe del Departamento", 5),
            session_id: String::new(),
        };
        let (_, live_sid) = svc.issue_session(&principal).unwrap();
        let stale = Session {
            id: "old".into(),
            identity: "jefe@hospital.pe".into(),
            issued_at: "2020-01-01T00:00:00+00:00".into(),
            expires_at: "2020-01-01T08:00:00+00:00".into(),
            revoked: false,
        };
        svc.put_json(&format!("{SESSION_PREFIX}old"), &stale).unwrap();

        svc.directory.add_user(&live_sid, "a@x", "Pasante 0").unwrap();
        svc.directory.add_user("old", "b@x", "Pasante 0").unwrap();
        svc.directory.add_user("never-issued", "c@x", "Pasante 0").unwrap();

        svc.purge_expired().unwrap();
        assert!(svc.directory.has_pending_changes(&live_sid));
        assert!(!svc.directory.has_pending_changes("old"));
        assert!(!svc.directory.has_pending_changes("never-issued"));
    }

    #[test]
    fn expired_token_drops_its_draft() {
        let (_dir, svc) = test_service();
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "jefe@hospital.pe".into(),
            name: "Jefe".into(),
            picture: None,
            sid: "s-expired".into(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(&Header::default(), &claims, &svc.encoding_key).unwrap();
        svc.directory.add_user("s-expired", "a@x", "Pasante 0").unwrap();

        assert!(matches!(
            svc.authenticate(&token),
            Err(AccessError::Unauthenticated(_))
        ));
        assert!(!svc.directory.has_pending_changes("s-expired"));
    }

    #[test]
    fn purge_removes_only_expired_records() {
        let (_dir, svc) = test_service();
        let principal = Principal {
            identity: "jefe@hospital.pe".into(),
            name: "Jefe".into(),
            picture: None,
            role: crate::model::Role::new("Jefe del Departamento", 5),
            session_id: String::new(),
        };
        let (_, live_sid) = svc.issue_session(&principal).unwrap();

        let stale = Session {
            id: "old".into(),
            identity: "jefe@hospital.pe".into(),
            issued_at: "2020-01-01T00:00:00+00:00".into(),
            expires_at: "2020-01-01T08:00:00+00:00".into(),
            revoked: false,
        };
        svc.put_json(&format!("{SESSION_PREFIX}old"), &stale).unwrap();
        svc.put_json(
            &format!("{LOGIN_STATE_PREFIX}gone"),
            &LoginState {
                state: "gone".into(),
                expires_at: 0,
            },
        )
        .unwrap();

        assert_eq!(svc.purge_expired().unwrap(), 2);
        let left: Vec<String> = svc
            .kv
            .scan(SESSION_PREFIX)
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(left, vec![format!("{SESSION_PREFIX}{live_sid}")]);
    }
}
