use crate::model::{Role, RoleStore};

/// Outcome of looking an identity up in the role store.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Authorized(Role),
    Unauthorized,
}

/// Resolve an identity against a role store snapshot.
///
/// Exact, case-sensitive lookup. Absence (including empty or garbage
/// identities) is the normal `Unauthorized` branch, not an error.
pub fn resolve(identity: &str, store: &RoleStore) -> Resolution {
    match store.get(identity) {
        Some(role) => Resolution::Authorized(role.clone()),
        None => Resolution::Unauthorized,
    }
}
