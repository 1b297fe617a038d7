use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use access::Page;

// ---------------------------------------------------------------------------
// Equipment — one row of the equipment sheet
// ---------------------------------------------------------------------------

/// Sheet column names, as they appear in the header row.
pub mod column {
    pub const CODE: &str = "Codigo nuevo";
    pub const NAME: &str = "EQUIPO";
    pub const BRAND: &str = "MARCA";
    pub const MODEL: &str = "MODELO";
    pub const SERIAL: &str = "SERIE";
    pub const AREA: &str = "UPSS/UPS";
    pub const LOCATION: &str = "AMBIENTE";
}

/// A raw sheet row: header → cell.
pub type SheetRow = HashMap<String, serde_json::Value>;

/// A medical equipment record. Read-only; the sheet is the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub code: String,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub serial: String,
    pub area: String,
    pub location: String,
}

impl Equipment {
    /// Map a sheet row. Rows without a usable code are skipped.
    pub fn from_row(row: &SheetRow) -> Option<Self> {
        let code = cell(row, column::CODE);
        if code.is_empty() {
            return None;
        }
        Some(Self {
            code,
            name: cell(row, column::NAME),
            brand: cell(row, column::BRAND),
            model: cell(row, column::MODEL),
            serial: cell(row, column::SERIAL),
            area: cell(row, column::AREA),
            location: cell(row, column::LOCATION),
        })
    }

    /// Case-insensitive match on code, name, serial, brand or model.
    pub fn matches(&self, needle_lower: &str) -> bool {
        [&self.code, &self.name, &self.serial, &self.brand, &self.model]
            .iter()
            .any(|field| field.to_lowercase().contains(needle_lower))
    }
}

/// Trimmed text of a cell. Spreadsheet blanks (`null`, `""`, `nan`) are empty.
fn cell(row: &SheetRow, column: &str) -> String {
    let text = match row.get(column) {
        None | Some(serde_json::Value::Null) => return String::new(),
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    };
    if text.eq_ignore_ascii_case("nan") {
        String::new()
    } else {
        text
    }
}

// ---------------------------------------------------------------------------
// EquipmentCode — EQU-XXXXXXX
// ---------------------------------------------------------------------------

/// Equipment code: `EQU-` followed by exactly seven digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EquipmentCode(u32);

impl EquipmentCode {
    pub const PREFIX: &'static str = "EQU-";
    const DIGITS: usize = 7;
    const MAX: u32 = 9_999_999;

    pub fn new(number: u32) -> Option<Self> {
        (1..=Self::MAX).contains(&number).then_some(Self(number))
    }

    pub fn number(&self) -> u32 {
        self.0
    }

    /// Strict parse; `EQU-12` and `equ-0000001` are not codes.
    pub fn parse(s: &str) -> Option<Self> {
        let digits = s.strip_prefix(Self::PREFIX)?;
        if digits.len() != Self::DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().and_then(Self::new)
    }

    /// Next code after the highest of `existing`, or `EQU-0000001`.
    pub fn next_after<'a, I>(existing: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let max = existing
            .into_iter()
            .filter_map(Self::parse)
            .map(|c| c.0)
            .max()
            .unwrap_or(0);
        Self::new(max + 1)
    }
}

impl fmt::Display for EquipmentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:07}", Self::PREFIX, self.0)
    }
}

impl Serialize for EquipmentCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// DocumentKind — the fixed subfolders of an equipment folder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Manual,
    Fotos,
    FichaTecnica,
    PruebaSeguridad,
    InformeMalUso,
    InformesTecnicos,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 6] = [
        DocumentKind::Manual,
        DocumentKind::Fotos,
        DocumentKind::FichaTecnica,
        DocumentKind::PruebaSeguridad,
        DocumentKind::InformeMalUso,
        DocumentKind::InformesTecnicos,
    ];

    pub fn folder_name(&self) -> &'static str {
        match self {
            Self::Manual => "Manual",
            Self::Fotos => "Fotos",
            Self::FichaTecnica => "Ficha técnica",
            Self::PruebaSeguridad => "Prueba de seguridad",
            Self::InformeMalUso => "Informe de mal uso",
            Self::InformesTecnicos => "Informes técnicos",
        }
    }

    pub fn from_folder_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.folder_name() == name)
    }

    /// Page whose holders may upload into this subfolder.
    pub fn upload_page(&self) -> Page {
        match self {
            Self::Manual | Self::Fotos => Page::Inventario,
            Self::FichaTecnica => Page::FichaTecnica,
            Self::PruebaSeguridad => Page::PruebaSeguridad,
            Self::InformeMalUso => Page::InformeMalUso,
            Self::InformesTecnicos => Page::InformesTecnicos,
        }
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// A file inside an equipment folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Subfolder name, or `None` for files at the folder root.
    pub folder: Option<String>,
    pub name: String,
    pub size: u64,
    pub mime_type: &'static str,
}

/// Everything stored for one equipment code.
#[derive(Debug, Clone, Serialize)]
pub struct FolderListing {
    pub code: String,
    pub folders: Vec<String>,
    pub documents: Vec<Document>,
}

/// Result of provisioning a new equipment folder.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedFolder {
    pub code: EquipmentCode,
    pub folders: Vec<&'static str>,
}

/// Content type guessed from the file extension.
pub fn mime_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
