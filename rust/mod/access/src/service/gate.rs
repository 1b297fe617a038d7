use crate::model::{IdentityProfile, MenuEntry, Principal, RoleStore};
use crate::service::menu::menu_for;
use crate::service::resolver::{resolve, Resolution};
use crate::service::AccessError;

/// Login state of one browser session.
///
/// ```text
/// Unauthenticated --login ok, unknown--> Denied --retry--> Unauthenticated
/// Unauthenticated --login ok, known----> Authorized --logout--> Unauthenticated
/// Unauthenticated --provider error-----> Unauthenticated (error returned)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum GateState {
    Unauthenticated,
    Denied { identity: String },
    Authorized(Principal),
}

impl GateState {
    /// Apply the identity provider's outcome.
    ///
    /// Fails closed: a provider error leaves the state `Unauthenticated` and
    /// is handed back to the caller as a retryable error.
    pub fn complete_login(
        &mut self,
        outcome: Result<IdentityProfile, AccessError>,
        store: &RoleStore,
    ) -> Result<(), AccessError> {
        if *self != GateState::Unauthenticated {
            return Err(AccessError::Validation(
                "login can only complete from an unauthenticated session".into(),
            ));
        }

        let profile = outcome?;
        *self = match resolve(&profile.email, store) {
            Resolution::Authorized(role) => GateState::Authorized(Principal {
                identity: profile.email,
                name: profile.name,
                picture: profile.picture,
                role,
                session_id: String::new(),
            }),
            Resolution::Unauthorized => GateState::Denied {
                identity: profile.email,
            },
        };
        Ok(())
    }

    /// Leave the denial screen to try another account.
    pub fn retry(&mut self) -> Result<(), AccessError> {
        match self {
            GateState::Denied { .. } => {
                *self = GateState::Unauthenticated;
                Ok(())
            }
            _ => Err(AccessError::Validation("nothing to retry".into())),
        }
    }

    pub fn logout(&mut self) -> Result<(), AccessError> {
        match self {
            GateState::Authorized(_) => {
                *self = GateState::Unauthenticated;
                Ok(())
            }
            _ => Err(AccessError::Unauthenticated("not logged in".into())),
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            GateState::Authorized(principal) => Some(principal),
            _ => None,
        }
    }

    /// Navigation menu; only an authorized session has one.
    pub fn menu(&self) -> Option<Vec<MenuEntry>> {
        self.principal().map(|p| menu_for(p.level()))
    }
}
