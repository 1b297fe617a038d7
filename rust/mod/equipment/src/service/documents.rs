use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use mediflow_blob::BlobStore;

use crate::model::{mime_for, Document, DocumentKind, EquipmentCode, FolderListing, ProvisionedFolder};
use crate::service::EquipmentError;

/// Equipment document folders on top of a blob store.
///
/// Layout: `<EQU-XXXXXXX>/<subfolder>/<file>`, one top-level folder per code.
pub struct DocumentStore {
    blobs: Arc<dyn BlobStore>,
    allocation: Mutex<()>,
}

impl DocumentStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            blobs,
            allocation: Mutex::new(()),
        }
    }

    /// The code the next provisioned folder would get.
    pub fn next_code(&self) -> Result<EquipmentCode, EquipmentError> {
        let folders = self.blobs.children("")?;
        EquipmentCode::next_after(folders.iter().map(String::as_str))
            .ok_or_else(|| EquipmentError::Internal("equipment code space exhausted".into()))
    }

    /// Allocate the next code and create its folder with every subfolder.
    pub fn provision(&self) -> Result<ProvisionedFolder, EquipmentError> {
        let _guard = self.allocation.lock().unwrap_or_else(PoisonError::into_inner);
        let code = self.next_code()?;
        let root = code.to_string();
        self.blobs.create_dir(&root)?;
        for kind in DocumentKind::ALL {
            self.blobs.create_dir(&format!("{root}/{}", kind.folder_name()))?;
        }
        info!(%code, "equipment folder provisioned");
        Ok(ProvisionedFolder {
            code,
            folders: DocumentKind::ALL.iter().map(|k| k.folder_name()).collect(),
        })
    }

    fn existing_folder(&self, code: &str) -> Result<String, EquipmentError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(EquipmentError::Validation("Código vacío.".into()));
        }
        if code.contains('/') || !self.blobs.dir_exists(code)? {
            return Err(EquipmentError::NotFound(format!(
                "No se encontró la carpeta '{code}' dentro de Equipos médicos."
            )));
        }
        Ok(code.to_string())
    }

    /// Every file stored for `code`, with the subfolders that exist.
    pub fn list(&self, code: &str) -> Result<FolderListing, EquipmentError> {
        let code = self.existing_folder(code)?;
        let prefix = format!("{code}/");

        let mut folders: BTreeSet<String> = self.blobs.children(&code)?.into_iter().collect();
        let mut documents = Vec::new();
        for meta in self.blobs.list(&code)? {
            let Some(rel) = meta.key.strip_prefix(&prefix) else {
                continue;
            };
            let (folder, name) = match rel.rsplit_once('/') {
                Some((folder, name)) => (Some(folder.to_string()), name.to_string()),
                None => (None, rel.to_string()),
            };
            if let Some(f) = &folder {
                folders.insert(f.clone());
            }
            documents.push(Document {
                mime_type: mime_for(&name),
                folder,
                name,
                size: meta.size,
            });
        }

        Ok(FolderListing {
            code,
            folders: folders.into_iter().collect(),
            documents,
        })
    }

    fn document_key(&self, code: &str, subfolder: &str, name: &str) -> Result<String, EquipmentError> {
        let code = self.existing_folder(code)?;
        let kind = DocumentKind::from_folder_name(subfolder).ok_or_else(|| {
            EquipmentError::Validation(format!("Subcarpeta desconocida: {subfolder}"))
        })?;
        let name = name.trim();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(EquipmentError::Validation(format!(
                "Nombre de archivo no válido: {name:?}"
            )));
        }
        Ok(format!("{code}/{}/{name}", kind.folder_name()))
    }

    /// Bytes and content type of one document.
    pub fn get(
        &self,
        code: &str,
        subfolder: &str,
        name: &str,
    ) -> Result<(Vec<u8>, &'static str), EquipmentError> {
        let key = self.document_key(code, subfolder, name)?;
        let data = self
            .blobs
            .get(&key)?
            .ok_or_else(|| EquipmentError::NotFound(format!("Documento no encontrado: {key}")))?;
        Ok((data, mime_for(&key)))
    }

    /// Store a document, replacing any file with the same name.
    pub fn put(
        &self,
        code: &str,
        subfolder: &str,
        name: &str,
        data: &[u8],
    ) -> Result<Document, EquipmentError> {
        let key = self.document_key(code, subfolder, name)?;
        self.blobs.put(&key, data)?;
        info!(%key, size = data.len(), "equipment document stored");
        let name = name.trim().to_string();
        Ok(Document {
            folder: Some(subfolder.to_string()),
            mime_type: mime_for(&name),
            name,
            size: data.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediflow_blob::FileStore;

    fn store() -> (tempfile::TempDir, DocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        let blobs = Arc::new(FileStore::open(dir.path()).unwrap());
        (dir, DocumentStore::new(blobs))
    }

    #[test]
    fn first_code_is_one_and_provision_advances() {
        let (_dir, docs) = store();
        assert_eq!(docs.next_code().unwrap().to_string(), "EQU-0000001");

        let first = docs.provision().unwrap();
        assert_eq!(first.code.to_string(), "EQU-0000001");
        assert_eq!(first.folders.len(), 6);
        assert_eq!(docs.next_code().unwrap().to_string(), "EQU-0000002");

        let listing = docs.list("EQU-0000001").unwrap();
        assert_eq!(listing.folders.len(), 6);
        assert!(listing.folders.contains(&"Ficha técnica".to_string()));
        assert!(listing.documents.is_empty());
    }

    #[test]
    fn next_code_ignores_foreign_folders() {
        let (dir, docs) = store();
        std::fs::create_dir_all(dir.path().join("EQU-0000041")).unwrap();
        std::fs::create_dir_all(dir.path().join("Plantillas")).unwrap();
        std::fs::create_dir_all(dir.path().join("EQU-12")).unwrap();
        assert_eq!(docs.next_code().unwrap().to_string(), "EQU-0000042");
    }

    #[test]
    fn put_then_list_and_get() {
        let (_dir, docs) = store();
        let code = docs.provision().unwrap().code.to_string();

        let doc = docs.put(&code, "Manual", "manual.pdf", b"%PDF-1.4").unwrap();
        assert_eq!(doc.mime_type, "application/pdf");
        docs.put(&code, "Fotos", "frente.JPG", b"jpeg").unwrap();

        let listing = docs.list(&format!("  {code} ")).unwrap();
        assert_eq!(listing.documents.len(), 2);
        let foto = &listing.documents[0];
        assert_eq!(foto.folder.as_deref(), Some("Fotos"));
        assert_eq!(foto.mime_type, "image/jpeg");
        assert_eq!(foto.size, 4);

        let (bytes, mime) = docs.get(&code, "Manual", "manual.pdf").unwrap();
        assert_eq!(bytes, b"%PDF-1.4");
        assert_eq!(mime, "application/pdf");
        assert!(matches!(
            docs.get(&code, "Manual", "otro.pdf"),
            Err(EquipmentError::NotFound(_))
        ));
    }

    #[test]
    fn list_validates_code() {
        let (_dir, docs) = store();
        match docs.list("   ") {
            Err(EquipmentError::Validation(m)) => assert_eq!(m, "Código vacío."),
            other => panic!("unexpected {other:?}"),
        }
        match docs.list("EQU-0000009") {
            Err(EquipmentError::NotFound(m)) => {
                assert_eq!(m, "No se encontró la carpeta 'EQU-0000009' dentro de Equipos médicos.")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn put_rejects_unknown_code_subfolder_or_path_names() {
        let (_dir, docs) = store();
        let code = docs.provision().unwrap().code.to_string();

        assert!(matches!(
            docs.put("EQU-0000077", "Manual", "a.pdf", b"x"),
            Err(EquipmentError::NotFound(_))
        ));
        assert!(matches!(
            docs.put(&code, "Facturas", "a.pdf", b"x"),
            Err(EquipmentError::Validation(_))
        ));
        for bad in ["", "..", "../a.pdf", "a\\b.pdf"] {
            assert!(
                matches!(docs.put(&code, "Manual", bad, b"x"), Err(EquipmentError::Validation(_))),
                "{bad}"
            );
        }
        assert!(matches!(
            docs.list("../etc"),
            Err(EquipmentError::NotFound(_))
        ));
    }
}
