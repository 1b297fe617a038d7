use std::collections::HashMap;

use crate::model::{Assignment, Counts, TaskStats, TaskStatus};
use crate::service::{TaskError, TaskService};

const TOP_EQUIPMENT: usize = 10;

/// Tally labels, largest count first, ties alphabetical.
fn tally<'a>(labels: impl Iterator<Item = &'a str>) -> Counts {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    let mut out: Counts = counts
        .into_iter()
        .map(|(label, n)| (label.to_string(), n))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

fn equipment_label(a: &Assignment) -> Option<String> {
    a.equipment
        .as_ref()
        .filter(|e| !e.name.is_empty())
        .map(|e| format!("{} - {}", e.code, e.name))
}

/// Completed share in percent, rounded to one decimal.
fn completion_pct(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (completed as f64 * 1000.0 / total as f64).round() / 10.0
}

pub fn compute(assignments: &[Assignment]) -> TaskStats {
    let total = assignments.len();
    let count = |status: TaskStatus| assignments.iter().filter(|a| a.status == status).count();
    let completed = count(TaskStatus::Completada);

    let equipment: Vec<String> = assignments.iter().filter_map(equipment_label).collect();
    let mut top_equipment = tally(equipment.iter().map(String::as_str));
    top_equipment.truncate(TOP_EQUIPMENT);

    TaskStats {
        total,
        pending: count(TaskStatus::Pendiente),
        completed,
        completion_pct: completion_pct(completed, total),
        by_status: tally(assignments.iter().map(|a| a.status.as_str())),
        by_assignee: tally(assignments.iter().map(|a| a.assignee_name.as_str())),
        top_equipment,
        by_area: tally(
            assignments
                .iter()
                .filter_map(|a| a.equipment.as_ref())
                .map(|e| e.area.as_str())
                .filter(|area| !area.is_empty()),
        ),
    }
}

impl TaskService {
    /// Summary figures over every stored assignment.
    pub fn stats(&self) -> Result<TaskStats, TaskError> {
        let all = self.list_all()?;
        Ok(compute(&all))
    }
}
