use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::info;

use access::{can_assign, Principal};
use mediflow_core::{new_id, now_rfc3339, ListParams, ListResult};

use crate::model::{
    summary, Assignment, EquipmentRef, NewAssignment, TaskStatus, DATE_FORMAT, TIME_FORMAT,
};
use crate::service::{TaskError, TaskService};

const ASSIGNMENT_PREFIX: &str = "task/assignments/";

/// Levels at or above this see and manage every assignment.
const LEVEL_SUPERVISOR: i32 = 5;

/// Filters for [`TaskService::list`]. `None` means "all".
#[derive(Debug, Clone, Default)]
pub struct AssignmentFilter {
    pub status: Option<TaskStatus>,
    pub assignee: Option<String>,
    /// Only assignments the viewer issued. Defaults by level when unset.
    pub mine: Option<bool>,
}

/// Accepted values of `sort`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    DueDesc,
    DueAsc,
    Status,
    Priority,
}

impl SortOrder {
    pub fn parse(s: Option<&str>) -> Result<Self, TaskError> {
        match s.map(str::trim).filter(|s| !s.is_empty()) {
            None | Some("fecha_desc") => Ok(Self::DueDesc),
            Some("fecha_asc") => Ok(Self::DueAsc),
            Some("estado") => Ok(Self::Status),
            Some("prioridad") => Ok(Self::Priority),
            Some(other) => Err(TaskError::Validation(format!("Orden desconocido: {other}"))),
        }
    }
}

fn key(id: &str) -> String {
    format!("{ASSIGNMENT_PREFIX}{id}")
}

fn parse_due(date: &str, time: &str) -> Result<NaiveDateTime, TaskError> {
    let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).map_err(|_| {
        TaskError::Validation(format!("Fecha límite no válida (dd/mm/aaaa): {date}"))
    })?;
    let time = NaiveTime::parse_from_str(time.trim(), TIME_FORMAT)
        .map_err(|_| TaskError::Validation(format!("Hora límite no válida (HH:MM): {time}")))?;
    Ok(date.and_time(time))
}

/// Due moment of a stored record; unparseable ones sort first.
fn due_of(a: &Assignment) -> Option<NaiveDateTime> {
    parse_due(&a.due_date, &a.due_time).ok()
}

fn status_rank(status: TaskStatus) -> usize {
    TaskStatus::ALL
        .iter()
        .position(|s| *s == status)
        .unwrap_or(TaskStatus::ALL.len())
}

fn compare(order: SortOrder, a: &Assignment, b: &Assignment) -> Ordering {
    let by_due = || due_of(a).cmp(&due_of(b)).then_with(|| a.created_at.cmp(&b.created_at));
    match order {
        SortOrder::DueAsc => by_due(),
        SortOrder::DueDesc => by_due().reverse(),
        SortOrder::Status => status_rank(a.status)
            .cmp(&status_rank(b.status))
            .then_with(|| by_due()),
        SortOrder::Priority => a
            .priority
            .urgency_rank()
            .cmp(&b.priority.urgency_rank())
            .then_with(|| by_due()),
    }
}

impl TaskService {
    /// Create an assignment from `assigner` to a member of staff.
    ///
    /// The assignee must be one of the assigner's targets in the live role
    /// store at the moment of creation.
    pub async fn create(
        &self,
        assigner: &Principal,
        input: NewAssignment,
    ) -> Result<Assignment, TaskError> {
        let description = input.description.trim();
        if description.is_empty() {
            return Err(TaskError::Validation(
                "La descripción de la tarea es obligatoria.".into(),
            ));
        }
        if !input.status.is_initial() {
            return Err(TaskError::Validation(format!(
                "Estado inicial no válido: {}",
                input.status
            )));
        }

        let due = parse_due(&input.due_date, &input.due_time)?;
        if due.date() < chrono::Local::now().date_naive() {
            return Err(TaskError::Validation(
                "La fecha límite no puede ser anterior a hoy.".into(),
            ));
        }

        let assignee = input.assignee_email.trim();
        let store = self.directory.snapshot();
        if !can_assign(assigner.level(), assignee, &store) {
            return Err(TaskError::PermissionDenied(format!(
                "No puedes asignar tareas a {assignee}."
            )));
        }
        let assignee_name = store
            .get(assignee)
            .map(|role| role.display_name.clone())
            .unwrap_or_else(|| assignee.to_string());

        let equipment = match input
            .equipment_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            Some(code) => {
                let item = self.equipment.catalog.get(code).await?;
                Some(EquipmentRef {
                    code: item.code,
                    serial: item.serial,
                    name: item.name,
                    area: item.area,
                })
            }
            None => None,
        };

        let instructions = input
            .instructions
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let now = now_rfc3339();
        let assignment = Assignment {
            id: new_id(),
            issuer_email: assigner.identity.clone(),
            issuer_name: assigner.name.clone(),
            assignee_email: assignee.to_string(),
            assignee_name,
            kind: input.kind,
            priority: input.priority,
            description: description.to_string(),
            summary: summary(input.priority, input.kind, description, instructions.as_deref()),
            instructions,
            due_date: due.format(DATE_FORMAT).to_string(),
            due_time: due.format(TIME_FORMAT).to_string(),
            status: input.status,
            equipment,
            created_at: now.clone(),
            updated_at: now,
        };
        self.put_json(&key(&assignment.id), &assignment)?;

        info!(
            id = %assignment.id,
            issuer = %assignment.issuer_email,
            assignee = %assignment.assignee_email,
            "assignment created"
        );
        Ok(assignment)
    }

    pub fn get(&self, id: &str) -> Result<Assignment, TaskError> {
        self.get_json(&key(id))?
            .ok_or_else(|| TaskError::NotFound(format!("Tarea {id} no encontrada.")))
    }

    pub(crate) fn list_all(&self) -> Result<Vec<Assignment>, TaskError> {
        self.kv
            .scan(ASSIGNMENT_PREFIX)?
            .into_iter()
            .map(|(key, bytes)| {
                serde_json::from_slice(&bytes)
                    .map_err(|e| TaskError::Internal(format!("corrupt record {key}: {e}")))
            })
            .collect()
    }

    /// Assignments visible in the log, filtered and ordered.
    ///
    /// `total` counts every stored assignment, before any filter.
    pub fn list(
        &self,
        viewer: &Principal,
        filter: &AssignmentFilter,
        params: &ListParams,
    ) -> Result<ListResult<Assignment>, TaskError> {
        let order = SortOrder::parse(params.sort.as_deref())?;
        let all = self.list_all()?;
        let total = all.len();

        let mine = filter.mine.unwrap_or(viewer.level() < LEVEL_SUPERVISOR);
        let assignee = filter.assignee.as_deref().map(str::trim).filter(|a| !a.is_empty());

        let mut items: Vec<Assignment> = all
            .into_iter()
            .filter(|a| filter.status.map_or(true, |s| a.status == s))
            .filter(|a| assignee.map_or(true, |e| a.assignee_email == e))
            .filter(|a| !mine || a.issuer_email == viewer.identity)
            .collect();
        items.sort_by(|a, b| compare(order, a, b));

        Ok(ListResult {
            items: params.page(items),
            total,
        })
    }

    /// Work handed to `identity`, soonest due first.
    pub fn assigned_to(&self, identity: &str) -> Result<Vec<Assignment>, TaskError> {
        let mut items: Vec<Assignment> = self
            .list_all()?
            .into_iter()
            .filter(|a| a.assignee_email == identity)
            .collect();
        items.sort_by(|a, b| compare(SortOrder::DueAsc, a, b));
        Ok(items)
    }

    /// Change the status of an assignment.
    ///
    /// The issuer and supervisors may set any status; the assignee may only
    /// mark it `Completada`.
    pub fn update_status(
        &self,
        actor: &Principal,
        id: &str,
        status: TaskStatus,
    ) -> Result<Assignment, TaskError> {
        let mut assignment = self.get(id)?;

        let may_set_any =
            assignment.issuer_email == actor.identity || actor.level() >= LEVEL_SUPERVISOR;
        let may_complete =
            assignment.assignee_email == actor.identity && status == TaskStatus::Completada;
        if !may_set_any && !may_complete {
            return Err(TaskError::PermissionDenied(
                "Solo el emisor o el jefe pueden cambiar el estado de esta tarea.".into(),
            ));
        }

        let previous = assignment.status;
        assignment.status = status;
        assignment.updated_at = now_rfc3339();
        self.put_json(&key(id), &assignment)?;

        info!(%id, actor = %actor.identity, from = %previous, to = %status, "assignment status changed");
        Ok(assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, TaskKind};
    use crate::service::testing::{test_service, who};

    fn input(assignee: &str, due_date: &str) -> NewAssignment {
        NewAssignment {
            assignee_email: assignee.to_string(),
            kind: TaskKind::MantenimientoPreventivo,
            priority: Priority::Media,
            description: "Revisar filtros".to_string(),
            instructions: None,
            due_date: due_date.to_string(),
            due_time: "09:30".to_string(),
            status: TaskStatus::Pendiente,
            equipment_code: None,
        }
    }

    #[tokio::test]
    async fn create_fills_names_summary_and_equipment() {
        let (_dir, svc) = test_service();
        let mut new = input("pasante2@hospital.pe", "15/03/2099");
        new.priority = Priority::Alta;
        new.instructions = Some("  Usar guantes ".into());
        new.equipment_code = Some("EQU-0000002".into());

        let a = svc.create(&who("ingeniero@hospital.pe"), new).await.unwrap();
        assert_eq!(a.assignee_name, "Pasante 2");
        assert_eq!(a.issuer_email, "ingeniero@hospital.pe");
        assert_eq!(
            a.summary,
            "[Alta] Mantenimiento Preventivo: Revisar filtros | Instrucciones: Usar guantes"
        );
        let eq = a.equipment.as_ref().unwrap();
        assert_eq!((eq.serial.as_str(), eq.area.as_str()), ("DR-77", "UCI"));

        assert_eq!(svc.get(&a.id).unwrap().summary, a.summary);
    }

    #[tokio::test]
    async fn create_validates_input() {
        let (_dir, svc) = test_service();
        let ingeniero = who("ingeniero@hospital.pe");

        let mut blank = input("pasante2@hospital.pe", "15/03/2099");
        blank.description = "   ".into();
        assert!(matches!(svc.create(&ingeniero, blank).await, Err(TaskError::Validation(_))));

        let mut done = input("pasante2@hospital.pe", "15/03/2099");
        done.status = TaskStatus::Completada;
        assert!(matches!(svc.create(&ingeniero, done).await, Err(TaskError::Validation(_))));

        let past = input("pasante2@hospital.pe", "01/01/2000");
        match svc.create(&ingeniero, past).await {
            Err(TaskError::Validation(m)) => {
                assert_eq!(m, "La fecha límite no puede ser anterior a hoy.")
            }
            other => panic!("unexpected {other:?}"),
        }

        let garbled = input("pasante2@hospital.pe", "2099-03-15");
        assert!(matches!(svc.create(&ingeniero, garbled).await, Err(TaskError::Validation(_))));

        let mut unknown_equipment = input("pasante2@hospital.pe", "15/03/2099");
        unknown_equipment.equipment_code = Some("EQU-0000404".into());
        assert!(matches!(
            svc.create(&ingeniero, unknown_equipment).await,
            Err(TaskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn assignee_must_be_a_target_of_the_assigner() {
        let (_dir, svc) = test_service();

        // Pasante 2 assigns only to levels 0 and 1.
        let p2 = who("pasante2@hospital.pe");
        assert!(svc.create(&p2, input("pasante0@hospital.pe", "15/03/2099")).await.is_ok());
        assert!(matches!(
            svc.create(&p2, input("practicante@hospital.pe", "15/03/2099")).await,
            Err(TaskError::PermissionDenied(_))
        ));

        // Level 3 has no targets at all.
        let p3 = who("practicante@hospital.pe");
        assert!(matches!(
            svc.create(&p3, input("pasante0@hospital.pe", "15/03/2099")).await,
            Err(TaskError::PermissionDenied(_))
        ));

        // Level 4 reaches level >= 2, not interns 0 and 1, nor unknown people.
        let ing = who("ingeniero@hospital.pe");
        assert!(svc.create(&ing, input("jefe@hospital.pe", "15/03/2099")).await.is_ok());
        assert!(svc.create(&ing, input("pasante1@hospital.pe", "15/03/2099")).await.is_err());
        assert!(svc.create(&ing, input("nadie@hospital.pe", "15/03/2099")).await.is_err());
    }

    #[tokio::test]
    async fn list_filters_orders_and_counts_before_filtering() {
        let (_dir, svc) = test_service();
        let ing = who("ingeniero@hospital.pe");
        let jefe = who("jefe@hospital.pe");

        let mut a = input("pasante2@hospital.pe", "10/01/2099");
        a.priority = Priority::Baja;
        svc.create(&ing, a).await.unwrap();
        let mut b = input("practicante@hospital.pe", "20/01/2099");
        b.priority = Priority::Critica;
        b.status = TaskStatus::EnProceso;
        svc.create(&ing, b).await.unwrap();
        svc.create(&jefe, input("pasante2@hospital.pe", "05/01/2099")).await.unwrap();

        // Level 4 defaults to its own assignments.
        let mine = svc.list(&ing, &AssignmentFilter::default(), &ListParams::default()).unwrap();
        assert_eq!(mine.total, 3);
        assert_eq!(mine.items.len(), 2);
        assert_eq!(mine.items[0].due_date, "20/01/2099");

        // Level 5 defaults to everything.
        let all = svc.list(&jefe, &AssignmentFilter::default(), &ListParams::default()).unwrap();
        assert_eq!(all.items.len(), 3);

        let params = ListParams {
            sort: Some("fecha_asc".into()),
            ..Default::default()
        };
        let asc = svc.list(&jefe, &AssignmentFilter::default(), &params).unwrap();
        assert_eq!(asc.items[0].due_date, "05/01/2099");

        let params = ListParams {
            sort: Some("prioridad".into()),
            ..Default::default()
        };
        let by_priority = svc.list(&jefe, &AssignmentFilter::default(), &params).unwrap();
        assert_eq!(by_priority.items[0].priority, Priority::Critica);
        assert_eq!(by_priority.items[2].priority, Priority::Baja);

        let params = ListParams {
            sort: Some("estado".into()),
            ..Default::default()
        };
        let by_status = svc.list(&jefe, &AssignmentFilter::default(), &params).unwrap();
        assert_eq!(by_status.items[2].status, TaskStatus::EnProceso);

        let filter = AssignmentFilter {
            status: Some(TaskStatus::Pendiente),
            assignee: Some("pasante2@hospital.pe".into()),
            mine: Some(false),
        };
        let narrowed = svc.list(&ing, &filter, &ListParams::default()).unwrap();
        assert_eq!(narrowed.items.len(), 2);
        assert_eq!(narrowed.total, 3);

        let bad = ListParams {
            sort: Some("alfabetico".into()),
            ..Default::default()
        };
        assert!(matches!(
            svc.list(&jefe, &AssignmentFilter::default(), &bad),
            Err(TaskError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn assigned_to_returns_only_the_assignees_work() {
        let (_dir, svc) = test_service();
        let ing = who("ingeniero@hospital.pe");
        svc.create(&ing, input("pasante2@hospital.pe", "20/01/2099")).await.unwrap();
        svc.create(&ing, input("pasante2@hospital.pe", "10/01/2099")).await.unwrap();
        svc.create(&ing, input("jefe@hospital.pe", "10/01/2099")).await.unwrap();

        let mine = svc.assigned_to("pasante2@hospital.pe").unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].due_date, "10/01/2099");
        assert!(svc.assigned_to("pasante0@hospital.pe").unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_updates_follow_roles() {
        let (_dir, svc) = test_service();
        let ing = who("ingeniero@hospital.pe");
        let a = svc.create(&ing, input("pasante2@hospital.pe", "20/01/2099")).await.unwrap();

        // Assignee may only complete.
        let p2 = who("pasante2@hospital.pe");
        assert!(matches!(
            svc.update_status(&p2, &a.id, TaskStatus::Cancelada),
            Err(TaskError::PermissionDenied(_))
        ));
        let done = svc.update_status(&p2, &a.id, TaskStatus::Completada).unwrap();
        assert_eq!(done.status, TaskStatus::Completada);

        // Issuer and supervisors may set anything; bystanders nothing.
        svc.update_status(&ing, &a.id, TaskStatus::EnProceso).unwrap();
        svc.update_status(&who("jefe@hospital.pe"), &a.id, TaskStatus::Cancelada).unwrap();
        assert!(matches!(
            svc.update_status(&who("practicante@hospital.pe"), &a.id, TaskStatus::Completada),
            Err(TaskError::PermissionDenied(_))
        ));

        assert_eq!(svc.get(&a.id).unwrap().status, TaskStatus::Cancelada);
        assert!(matches!(
            svc.update_status(&ing, "missing", TaskStatus::Completada),
            Err(TaskError::NotFound(_))
        ));
    }
}
