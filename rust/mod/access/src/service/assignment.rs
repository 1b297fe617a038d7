use crate::model::{Role, RoleStore, LEVEL_PASANTE_1, LEVEL_PASANTE_2, LEVEL_PROFESIONAL};

/// Identities an assigner of the given level may hand work to.
///
/// - level >= 4: everyone with level >= 2
/// - level == 2: everyone with level 0 or 1
/// - anything else: nobody
///
/// Level 3 holds the task-assignment page but gets no targets. The assigner
/// is not removed from its own result. Output is ascending by level, ties in
/// identity order.
pub fn assignable_targets(assigner_level: i32, store: &RoleStore) -> Vec<(String, Role)> {
    let admits = |level: i32| -> bool {
        if assigner_level >= LEVEL_PROFESIONAL {
            level >= LEVEL_PASANTE_2
        } else if assigner_level == LEVEL_PASANTE_2 {
            (0..=LEVEL_PASANTE_1).contains(&level)
        } else {
            false
        }
    };

    let mut targets: Vec<(String, Role)> = store
        .iter()
        .filter(|(_, role)| admits(role.level))
        .map(|(identity, role)| (identity.clone(), role.clone()))
        .collect();
    // Stable sort keeps the store's identity order within a level.
    targets.sort_by_key(|(_, role)| role.level);
    targets
}

/// Whether `target` is among the assigner's targets.
pub fn can_assign(assigner_level: i32, target: &str, store: &RoleStore) -> bool {
    assignable_targets(assigner_level, store)
        .iter()
        .any(|(identity, _)| identity == target)
}
