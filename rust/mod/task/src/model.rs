use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of an assignment.
///
/// ```text
/// Pendiente ⇄ En Proceso → Completada
///                        → Cancelada
/// ```
///
/// New assignments start as `Pendiente` or `En Proceso`. Transitions are not
/// otherwise restricted; who may make them is decided by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "Pendiente")]
    Pendiente,
    #[serde(rename = "En Proceso")]
    EnProceso,
    #[serde(rename = "Completada")]
    Completada,
    #[serde(rename = "Cancelada")]
    Cancelada,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        Self::Pendiente,
        Self::EnProceso,
        Self::Completada,
        Self::Cancelada,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pendiente => "Pendiente",
            Self::EnProceso => "En Proceso",
            Self::Completada => "Completada",
            Self::Cancelada => "Cancelada",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
    }

    /// Allowed as the status of a freshly created assignment.
    pub fn is_initial(&self) -> bool {
        matches!(self, Self::Pendiente | Self::EnProceso)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Baja,
    Media,
    Alta,
    #[serde(rename = "Crítica")]
    Critica,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Baja => "Baja",
            Self::Media => "Media",
            Self::Alta => "Alta",
            Self::Critica => "Crítica",
        }
    }

    /// Sort rank, most urgent first.
    pub fn urgency_rank(&self) -> u8 {
        match self {
            Self::Critica => 0,
            Self::Alta => 1,
            Self::Media => 2,
            Self::Baja => 3,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TaskKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    #[serde(rename = "Mantenimiento Preventivo")]
    MantenimientoPreventivo,
    #[serde(rename = "Mantenimiento Correctivo")]
    MantenimientoCorrectivo,
    #[serde(rename = "Inspección")]
    Inspeccion,
    #[serde(rename = "Calibración")]
    Calibracion,
    #[serde(rename = "Reparación")]
    Reparacion,
    Inventario,
    #[serde(rename = "Documentación")]
    Documentacion,
    #[serde(rename = "Capacitación")]
    Capacitacion,
    #[serde(rename = "Limpieza y Desinfección")]
    LimpiezaDesinfeccion,
    #[serde(rename = "Verificación de Funcionamiento")]
    VerificacionFuncionamiento,
    Otro,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MantenimientoPreventivo => "Mantenimiento Preventivo",
            Self::MantenimientoCorrectivo => "Mantenimiento Correctivo",
            Self::Inspeccion => "Inspección",
            Self::Calibracion => "Calibración",
            Self::Reparacion => "Reparación",
            Self::Inventario => "Inventario",
            Self::Documentacion => "Documentación",
            Self::Capacitacion => "Capacitación",
            Self::LimpiezaDesinfeccion => "Limpieza y Desinfección",
            Self::VerificacionFuncionamiento => "Verificación de Funcionamiento",
            Self::Otro => "Otro",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Assignment: one row of the assignment log, stored as JSON in KV
// ---------------------------------------------------------------------------

/// Date and time formats used for due dates.
pub const DATE_FORMAT: &str = "%d/%m/%Y";
pub const TIME_FORMAT: &str = "%H:%M";

/// Equipment the assignment is about, copied from the catalog at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentRef {
    pub code: String,
    pub serial: String,
    pub name: String,
    pub area: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,

    // --- people ---
    pub issuer_email: String,
    pub issuer_name: String,
    pub assignee_email: String,
    pub assignee_name: String,

    // --- the work ---
    pub kind: TaskKind,
    pub priority: Priority,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// One-line text shown in lists: `[<priority>] <kind>: <description>`.
    pub summary: String,

    // --- schedule ---
    /// `dd/mm/YYYY`
    pub due_date: String,
    /// `HH:MM`
    pub due_time: String,

    pub status: TaskStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<EquipmentRef>,

    pub created_at: String,
    pub updated_at: String,
}

/// Compose the one-line summary of an assignment.
pub fn summary(
    priority: Priority,
    kind: TaskKind,
    description: &str,
    instructions: Option<&str>,
) -> String {
    let mut text = format!("[{priority}] {kind}: {description}");
    if let Some(extra) = instructions {
        text.push_str(" | Instrucciones: ");
        text.push_str(extra);
    }
    text
}

/// Body of `POST /task/assignments`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAssignment {
    pub assignee_email: String,
    pub kind: TaskKind,
    pub priority: Priority,
    pub description: String,
    #[serde(default)]
    pub instructions: Option<String>,
    /// `dd/mm/YYYY`
    pub due_date: String,
    /// `HH:MM`
    pub due_time: String,
    #[serde(default = "default_initial_status")]
    pub status: TaskStatus,
    #[serde(default)]
    pub equipment_code: Option<String>,
}

fn default_initial_status() -> TaskStatus {
    TaskStatus::Pendiente
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// `(label, count)` pairs, largest count first.
pub type Counts = Vec<(String, usize)>;

#[derive(Debug, Clone, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    /// Completed over total, in percent, one decimal.
    pub completion_pct: f64,
    pub by_status: Counts,
    pub by_assignee: Counts,
    /// Ten most assigned pieces of equipment, as `"<code> - <name>"`.
    pub top_equipment: Counts,
    pub by_area: Counts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_with_and_without_instructions() {
        assert_eq!(
            summary(Priority::Alta, TaskKind::Calibracion, "Calibrar balanza", None),
            "[Alta] Calibración: Calibrar balanza"
        );
        assert_eq!(
            summary(
                Priority::Critica,
                TaskKind::Reparacion,
                "Cambiar batería",
                Some("Usar repuesto original")
            ),
            "[Crítica] Reparación: Cambiar batería | Instrucciones: Usar repuesto original"
        );
    }

    #[test]
    fn wire_names_are_the_spanish_labels() {
        assert_eq!(serde_json::to_value(TaskStatus::EnProceso).unwrap(), "En Proceso");
        assert_eq!(serde_json::to_value(Priority::Critica).unwrap(), "Crítica");
        let kind: TaskKind = serde_json::from_value("Limpieza y Desinfección".into()).unwrap();
        assert_eq!(kind, TaskKind::LimpiezaDesinfeccion);
        assert_eq!(kind.as_str(), "Limpieza y Desinfección");
    }

    #[test]
    fn status_parse_and_initial() {
        assert_eq!(TaskStatus::from_str("Completada"), Some(TaskStatus::Completada));
        assert_eq!(TaskStatus::from_str("COMPLETED"), None);
        assert!(TaskStatus::Pendiente.is_initial());
        assert!(TaskStatus::EnProceso.is_initial());
        assert!(!TaskStatus::Cancelada.is_initial());
    }

    #[test]
    fn new_assignment_defaults_to_pending() {
        let input: NewAssignment = serde_json::from_value(serde_json::json!({
            "assignee_email": "pasante0@hospital.pe",
            "kind": "Inventario",
            "priority": "Media",
            "description": "Contar equipos",
            "due_date": "01/01/2099",
            "due_time": "08:00"
        }))
        .unwrap();
        assert_eq!(input.status, TaskStatus::Pendiente);
        assert!(input.equipment_code.is_none());
    }
}
