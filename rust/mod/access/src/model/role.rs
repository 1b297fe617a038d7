use std::collections::BTreeMap;

use serde::de::Deserializer;
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

// ── Levels ──────────────────────────────────────────────────────────

pub const LEVEL_PASANTE_0: i32 = 0;
pub const LEVEL_PASANTE_1: i32 = 1;
pub const LEVEL_PASANTE_2: i32 = 2;
pub const LEVEL_PREPROFESIONAL: i32 = 3;
pub const LEVEL_PROFESIONAL: i32 = 4;
pub const LEVEL_JEFE: i32 = 5;
pub const LEVEL_SALUD: i32 = 6;

/// Role names offered by the user-management form, with the level each
/// one grants.
pub const ROLE_CHOICES: &[(&str, i32)] = &[
    ("Pasante 0", LEVEL_PASANTE_0),
    ("Pasante 1", LEVEL_PASANTE_1),
    ("Pasante 2", LEVEL_PASANTE_2),
    ("Ingeniero Preprofesional", LEVEL_PREPROFESIONAL),
    ("Ingeniero Profesional", LEVEL_PROFESIONAL),
    ("Jefe del Departamento", LEVEL_JEFE),
    ("Personal de Salud", LEVEL_SALUD),
];

/// Level granted by a role name from [`ROLE_CHOICES`].
pub fn level_for_role_name(name: &str) -> Option<i32> {
    ROLE_CHOICES
        .iter()
        .find(|(choice, _)| *choice == name)
        .map(|(_, level)| *level)
}

// ── Role ────────────────────────────────────────────────────────────

/// Privileges attached to one identity.
///
/// Only `level` drives access decisions. `capabilities` are advisory labels
/// shown to the user; `metadata` carries any extra object found in the
/// configuration blob and is exported back unchanged.
///
/// On the wire a role is positional: `[name, level]`,
/// `[name, level, [caps...]]` or `[name, level, [caps...], {extra}]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Role {
    pub display_name: String,
    pub level: i32,
    pub capabilities: Vec<String>,
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Role {
    pub fn new(display_name: impl Into<String>, level: i32) -> Self {
        Self {
            display_name: display_name.into(),
            level,
            capabilities: Vec::new(),
            metadata: None,
        }
    }

    pub fn with_capabilities<I, S>(mut self, caps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = caps.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoleRepr {
    Extended(
        String,
        i32,
        Vec<String>,
        serde_json::Map<String, serde_json::Value>,
    ),
    WithCapabilities(String, i32, Vec<String>),
    Bare(String, i32),
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let role = match RoleRepr::deserialize(deserializer)? {
            RoleRepr::Extended(display_name, level, capabilities, metadata) => Role {
                display_name,
                level,
                capabilities,
                metadata: Some(metadata),
            },
            RoleRepr::WithCapabilities(display_name, level, capabilities) => Role {
                display_name,
                level,
                capabilities,
                metadata: None,
            },
            RoleRepr::Bare(display_name, level) => Role::new(display_name, level),
        };
        Ok(role)
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let with_caps = !self.capabilities.is_empty() || self.metadata.is_some();
        let len = 2 + usize::from(with_caps) + usize::from(self.metadata.is_some());

        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.display_name)?;
        seq.serialize_element(&self.level)?;
        if with_caps {
            seq.serialize_element(&self.capabilities)?;
        }
        if let Some(metadata) = &self.metadata {
            seq.serialize_element(metadata)?;
        }
        seq.end()
    }
}

// ── RoleStore ───────────────────────────────────────────────────────

/// Identity → Role mapping.
///
/// Backed by a `BTreeMap`, so iteration (and every list derived from it) is
/// ordered by identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleStore {
    entries: BTreeMap<String, Role>,
}

impl RoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the configuration blob `{"<email>": ["<name>", <level>, [...]]}`.
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    /// Canonical, pretty-printed JSON form of the store.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn get(&self, identity: &str) -> Option<&Role> {
        self.entries.get(identity)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    /// Insert a new identity. Returns false (and leaves the store unchanged)
    /// if the identity is already present.
    pub fn insert(&mut self, identity: impl Into<String>, role: Role) -> bool {
        let identity = identity.into();
        if self.entries.contains_key(&identity) {
            return false;
        }
        self.entries.insert(identity, role);
        true
    }

    pub fn remove(&mut self, identity: &str) -> Option<Role> {
        self.entries.remove(identity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Role)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Role)> for RoleStore {
    fn from_iter<I: IntoIterator<Item = (String, Role)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_positional_arity() {
        let store = RoleStore::from_json(
            r#"{
                "a@hospital.pe": ["Pasante 0", 0],
                "b@hospital.pe": ["Pasante 2", 2, ["Consultar equipos"]],
                "c@hospital.pe": ["Jefe del Departamento", 5, [], {"area": "UPSS"}]
            }"#,
        )
        .unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("a@hospital.pe"), Some(&Role::new("Pasante 0", 0)));

        let b = store.get("b@hospital.pe").unwrap();
        assert_eq!(b.level, 2);
        assert_eq!(b.capabilities, vec!["Consultar equipos"]);
        assert!(b.metadata.is_none());

        let c = store.get("c@hospital.pe").unwrap();
        assert_eq!(c.metadata.as_ref().unwrap()["area"], "UPSS");
    }

    #[test]
    fn rejects_malformed_roles() {
        assert!(RoleStore::from_json(r#"{"a@x": ["Solo nombre"]}"#).is_err());
        assert!(RoleStore::from_json(r#"{"a@x": ["Pasante", "dos"]}"#).is_err());
        assert!(RoleStore::from_json(r#"{"a@x": ["P", 1, [], {}, "extra"]}"#).is_err());
        assert!(RoleStore::from_json("not json").is_err());
    }

    #[test]
    fn export_uses_canonical_form() {
        let store: RoleStore = [
            ("z@x".to_string(), Role::new("Pasante 1", 1)),
            (
                "a@x".to_string(),
                Role::new("Pasante 2", 2).with_capabilities(["Consultar equipos"]),
            ),
        ]
        .into_iter()
        .collect();

        let value: serde_json::Value = serde_json::from_str(&store.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "a@x": ["Pasante 2", 2, ["Consultar equipos"]],
                "z@x": ["Pasante 1", 1],
            })
        );

        let back = RoleStore::from_json(&store.to_json().unwrap()).unwrap();
        assert_eq!(back, store);
    }

    #[test]
    fn insert_refuses_duplicates() {
        let mut store = RoleStore::new();
        assert!(store.insert("a@x", Role::new("Pasante 0", 0)));
        assert!(!store.insert("a@x", Role::new("Jefe del Departamento", 5)));
        assert_eq!(store.get("a@x").unwrap().level, 0);
    }

    #[test]
    fn iteration_is_ordered_by_identity() {
        let mut store = RoleStore::new();
        store.insert("m@x", Role::new("M", 1));
        store.insert("b@x", Role::new("B", 1));
        store.insert("z@x", Role::new("Z", 1));
        let keys: Vec<&str> = store.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b@x", "m@x", "z@x"]);
    }

    #[test]
    fn role_choices_map_to_levels() {
        assert_eq!(level_for_role_name("Pasante 2"), Some(2));
        assert_eq!(level_for_role_name("Jefe del Departamento"), Some(5));
        assert_eq!(level_for_role_name("Personal de Salud"), Some(6));
        assert_eq!(level_for_role_name("Director"), None);
    }
}
