use crate::model::{MenuEntry, Page};

const LEVEL_0: &[Page] = &[Page::Inicio, Page::BaseDeDatos, Page::Inventario];

const LEVEL_1: &[Page] = &[
    Page::Inicio,
    Page::BaseDeDatos,
    Page::Mantenimientos,
    Page::Inventario,
];

const LEVEL_2: &[Page] = &[
    Page::Inicio,
    Page::BaseDeDatos,
    Page::Mantenimientos,
    Page::InformesTecnicos,
    Page::AsignacionTareas,
    Page::GestionPasantes,
    Page::Inventario,
];

const LEVEL_3: &[Page] = &[
    Page::Inicio,
    Page::BaseDeDatos,
    Page::Mantenimientos,
    Page::InformesTecnicos,
    Page::AsignacionTareas,
    Page::GestionPasantes,
    Page::Inventario,
    Page::EscanearQr,
    Page::FichaTecnica,
    Page::PruebaSeguridad,
    Page::InformeMalUso,
    Page::RendimientoEquipo,
];

const LEVEL_4: &[Page] = &[
    Page::Inicio,
    Page::BaseDeDatos,
    Page::Mantenimientos,
    Page::InformesTecnicos,
    Page::AsignacionTareas,
    Page::GestionPasantes,
    Page::Inventario,
    Page::EscanearQr,
    Page::FichaTecnica,
    Page::PruebaSeguridad,
    Page::InformeMalUso,
    Page::RendimientoEquipo,
    Page::GenerarQr,
    Page::DashboardKpis,
    Page::Reportes,
];

const LEVEL_5: &[Page] = &[
    Page::Inicio,
    Page::BaseDeDatos,
    Page::Mantenimientos,
    Page::InformesTecnicos,
    Page::AsignacionTareas,
    Page::GestionPasantes,
    Page::Inventario,
    Page::EscanearQr,
    Page::FichaTecnica,
    Page::PruebaSeguridad,
    Page::InformeMalUso,
    Page::RendimientoEquipo,
    Page::GenerarQr,
    Page::DashboardKpis,
    Page::Reportes,
    Page::GestionUsuarios,
];

const LEVEL_6: &[Page] = &[
    Page::Inicio,
    Page::BaseDeDatos,
    Page::EscanearQr,
    Page::InformeMalUso,
];

const DEFAULT: &[Page] = &[Page::Inicio, Page::BaseDeDatos];

const DEFAULT_ICON: &str = "circle";

/// Pages reachable from a level, in menu order.
pub fn pages_for(level: i32) -> &'static [Page] {
    match level {
        0 => LEVEL_0,
        1 => LEVEL_1,
        2 => LEVEL_2,
        3 => LEVEL_3,
        4 => LEVEL_4,
        5 => LEVEL_5,
        6 => LEVEL_6,
        _ => DEFAULT,
    }
}

/// Icon for a menu label; unknown labels get a neutral default.
pub fn icon_for(label: &str) -> &'static str {
    match label {
        "Inicio" => "house",
        "Base de Datos" => "database",
        "Mantenimientos" => "tools",
        "Informes Técnicos" => "file-earmark-text",
        "Asignación Tareas" => "clipboard-check",
        "Gestión Pasantes" => "people",
        "Inventario" => "box-seam",
        "Escanear QR" => "qr-code-scan",
        "Generar QR" => "qr-code",
        "Ficha Técnica" => "card-list",
        "Prueba Seguridad Eléctrica" => "lightning-charge",
        "Informe Mal Uso" => "exclamation-triangle",
        "Rendimiento Equipo" => "graph-up",
        "Dashboard KPIs" => "speedometer2",
        "Reportes" => "bar-chart",
        "Gestión de Usuarios" => "person-gear",
        _ => DEFAULT_ICON,
    }
}

/// Ordered navigation menu for a level.
pub fn menu_for(level: i32) -> Vec<MenuEntry> {
    pages_for(level)
        .iter()
        .map(|page| MenuEntry {
            label: page.label(),
            icon: icon_for(page.label()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(level: i32) -> Vec<&'static str> {
        menu_for(level).into_iter().map(|e| e.label).collect()
    }

    #[test]
    fn every_known_level_has_home_and_database() {
        for level in 0..=6 {
            let menu = labels(level);
            assert!(!menu.is_empty());
            assert!(menu.contains(&"Inicio"), "level {level}");
            assert!(menu.contains(&"Base de Datos"), "level {level}");
        }
    }

    #[test]
    fn unknown_levels_get_the_two_entry_default() {
        for level in [-1, 7, 42, i32::MIN, i32::MAX] {
            assert_eq!(labels(level), vec!["Inicio", "Base de Datos"]);
        }
    }

    #[test]
    fn level_two_menu() {
        assert_eq!(
            labels(2),
            vec![
                "Inicio",
                "Base de Datos",
                "Mantenimientos",
                "Informes Técnicos",
                "Asignación Tareas",
                "Gestión Pasantes",
                "Inventario",
            ]
        );
    }

    #[test]
    fn only_department_head_manages_users() {
        for level in 0..=6 {
            let has = labels(level).contains(&"Gestión de Usuarios");
            assert_eq!(has, level == 5, "level {level}");
        }
    }

    #[test]
    fn higher_engineering_levels_extend_lower_ones() {
        for level in 1..=5 {
            let lower = labels(level - 1);
            let upper = labels(level);
            for label in lower {
                assert!(upper.contains(&label), "{label} missing at level {level}");
            }
        }
    }

    #[test]
    fn every_page_label_has_its_own_icon() {
        for page in Page::ALL {
            assert_ne!(icon_for(page.label()), DEFAULT_ICON, "{page}");
        }
        assert_eq!(icon_for("Something New"), DEFAULT_ICON);
    }

    #[test]
    fn menu_is_stable_across_calls() {
        for level in -1..=7 {
            assert_eq!(menu_for(level), menu_for(level));
        }
    }
}
