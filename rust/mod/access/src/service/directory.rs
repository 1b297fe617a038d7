use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tracing::{info, warn};

use crate::model::{level_for_role_name, Role, RoleStore};
use crate::service::AccessError;

/// Where the role blob comes from.
#[derive(Debug, Clone)]
pub enum RoleSource {
    /// JSON embedded in the server configuration.
    Inline(String),
    /// JSON file on disk, re-read on every reload.
    File(PathBuf),
}

impl RoleSource {
    fn load(&self) -> Result<RoleStore, AccessError> {
        let data = match self {
            RoleSource::Inline(data) => data.clone(),
            RoleSource::File(path) => std::fs::read_to_string(path)
                .map_err(|e| AccessError::Config(format!("{}: {e}", path.display())))?,
        };
        RoleStore::from_json(&data).map_err(|e| AccessError::Config(e.to_string()))
    }
}

/// Export of a role store, ready to be pasted back into configuration.
#[derive(Debug, Clone, Serialize)]
pub struct RoleExport {
    pub json: String,
    pub toml: String,
}

#[derive(Serialize)]
struct ExportDoc<'a> {
    roles: ExportRoles<'a>,
}

#[derive(Serialize)]
struct ExportRoles<'a> {
    data: &'a str,
}

impl RoleExport {
    fn of(store: &RoleStore) -> Result<Self, AccessError> {
        let json = store
            .to_json()
            .map_err(|e| AccessError::Internal(e.to_string()))?;
        let toml = toml::to_string(&ExportDoc {
            roles: ExportRoles { data: &json },
        })
        .map_err(|e| AccessError::Internal(e.to_string()))?;
        Ok(Self { json, toml })
    }
}

/// One pending change in a session's draft.
#[derive(Debug, Clone)]
enum DraftEdit {
    Add { email: String, role: Role },
    Remove { email: String },
}

impl DraftEdit {
    fn apply(&self, store: &mut RoleStore) -> Result<Role, AccessError> {
        match self {
            DraftEdit::Add { email, role } => {
                if store.insert(email.clone(), role.clone()) {
                    Ok(role.clone())
                } else {
                    Err(AccessError::Conflict("El usuario ya existe.".into()))
                }
            }
            DraftEdit::Remove { email } => store
                .remove(email)
                .ok_or_else(|| AccessError::NotFound(format!("usuario {email} no existe"))),
        }
    }
}

/// Holder of the live role store.
///
/// Readers take a cheap `Arc` snapshot; `reload` and `commit` swap the whole
/// store. Changes made through `commit` live in memory only: they are lost
/// on restart or on the next `reload`, so the user-management screen offers
/// an export for pasting into configuration.
///
/// Each session editing users keeps its own list of edits, which never
/// affects access decisions until committed. The edits are replayed onto
/// whatever the live store is at commit time, so a draft never brings back
/// identities removed by a later reload or another session's commit.
pub struct RoleDirectory {
    source: RoleSource,
    live: RwLock<Arc<RoleStore>>,
    drafts: RwLock<HashMap<String, Vec<DraftEdit>>>,
}

impl RoleDirectory {
    /// Load the store from its source. A malformed blob is a startup error.
    pub fn load(source: RoleSource) -> Result<Self, AccessError> {
        let store = source.load()?;
        info!(identities = store.len(), "role store loaded");
        Ok(Self {
            source,
            live: RwLock::new(Arc::new(store)),
            drafts: RwLock::new(HashMap::new()),
        })
    }

    /// Directory over an in-memory store; `reload` restores this store.
    pub fn from_store(store: RoleStore) -> Self {
        let data = store.to_json().unwrap_or_else(|_| "{}".to_string());
        Self {
            source: RoleSource::Inline(data),
            live: RwLock::new(Arc::new(store)),
            drafts: RwLock::new(HashMap::new()),
        }
    }

    pub fn snapshot(&self) -> Arc<RoleStore> {
        self.live
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-read the source and replace the live store. Drafts are kept.
    pub fn reload(&self) -> Result<usize, AccessError> {
        let store = self.source.load()?;
        let count = store.len();
        *self.live.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(store);
        info!(identities = count, "role store reloaded");
        Ok(count)
    }

    /// Replace the live store in memory.
    pub fn commit(&self, store: RoleStore) {
        let count = store.len();
        *self.live.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(store);
        warn!(identities = count, "role store replaced in memory; export to persist");
    }

    // ── Drafts ──

    fn edits(&self, sid: &str) -> Vec<DraftEdit> {
        self.drafts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(sid)
            .cloned()
            .unwrap_or_default()
    }

    /// Live store with the session's edits applied. Edits that no longer
    /// apply to the live store are left out; `commit_draft` rejects them.
    fn view(&self, edits: &[DraftEdit]) -> RoleStore {
        let mut store = self.snapshot().as_ref().clone();
        for edit in edits {
            let _ = edit.apply(&mut store);
        }
        store
    }

    /// The session's working copy of the user list.
    pub fn draft(&self, sid: &str) -> RoleStore {
        self.view(&self.edits(sid))
    }

    /// Whether the session's draft differs from the live store.
    pub fn has_pending_changes(&self, sid: &str) -> bool {
        let edits = self.edits(sid);
        !edits.is_empty() && self.view(&edits) != *self.snapshot()
    }

    fn edit_draft(&self, sid: &str, edit: DraftEdit) -> Result<Role, AccessError> {
        let mut drafts = self.drafts.write().unwrap_or_else(PoisonError::into_inner);
        let edits = drafts.get(sid).map(Vec::as_slice).unwrap_or_default();
        let role = edit.apply(&mut self.view(edits))?;
        drafts.entry(sid.to_string()).or_default().push(edit);
        Ok(role)
    }

    /// Add an identity to the session's draft with one of the fixed role names.
    pub fn add_user(&self, sid: &str, email: &str, role_name: &str) -> Result<Role, AccessError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AccessError::Validation("El correo es obligatorio.".into()));
        }
        let level = level_for_role_name(role_name)
            .ok_or_else(|| AccessError::Validation(format!("Rol desconocido: {role_name}")))?;
        let role = Role::new(role_name, level);
        self.edit_draft(
            sid,
            DraftEdit::Add {
                email: email.to_string(),
                role,
            },
        )
    }

    /// Remove an identity from the session's draft. Nobody can remove themself.
    pub fn remove_user(&self, sid: &str, email: &str, actor: &str) -> Result<Role, AccessError> {
        if email == actor {
            return Err(AccessError::Validation(
                "No puedes eliminar tu propio usuario.".into(),
            ));
        }
        self.edit_draft(
            sid,
            DraftEdit::Remove {
                email: email.to_string(),
            },
        )
    }

    pub fn export(&self, sid: &str) -> Result<RoleExport, AccessError> {
        RoleExport::of(&self.draft(sid))
    }

    /// Replay the session's edits onto the current live store and make the
    /// result live. Returns the identity count.
    ///
    /// The draft is consumed either way. If an edit no longer applies
    /// (the user it adds now exists, or the one it removes is gone) nothing
    /// is committed and the error is `Conflict`.
    pub fn commit_draft(&self, sid: &str) -> Result<usize, AccessError> {
        let edits = self
            .drafts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(sid)
            .ok_or_else(|| AccessError::Validation("no hay cambios pendientes".into()))?;

        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        let mut store = live.as_ref().clone();
        for edit in &edits {
            edit.apply(&mut store).map_err(|e| {
                AccessError::Conflict(format!(
                    "La lista de usuarios cambió mientras editabas ({e}). Vuelve a aplicar tus cambios."
                ))
            })?;
        }
        let count = store.len();
        *live = Arc::new(store);
        drop(live);

        warn!(
            identities = count,
            edits = edits.len(),
            "role store replaced in memory; export to persist"
        );
        Ok(count)
    }

    pub fn discard_draft(&self, sid: &str) {
        self.drafts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(sid);
    }

    /// Drop the drafts of every session `keep` rejects. Returns how many.
    pub fn retain_drafts(&self, keep: impl Fn(&str) -> bool) -> usize {
        let mut drafts = self.drafts.write().unwrap_or_else(PoisonError::into_inner);
        let before = drafts.len();
        drafts.retain(|sid, _| keep(sid));
        before - drafts.len()
    }
}
