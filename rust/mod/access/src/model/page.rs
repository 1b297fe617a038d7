use std::fmt;

use serde::Serialize;

/// A screen of the application. Every endpoint group is gated on one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Inicio,
    BaseDeDatos,
    Mantenimientos,
    InformesTecnicos,
    AsignacionTareas,
    GestionPasantes,
    Inventario,
    EscanearQr,
    GenerarQr,
    FichaTecnica,
    PruebaSeguridad,
    InformeMalUso,
    RendimientoEquipo,
    DashboardKpis,
    Reportes,
    GestionUsuarios,
}

impl Page {
    pub const ALL: [Page; 16] = [
        Page::Inicio,
        Page::BaseDeDatos,
        Page::Mantenimientos,
        Page::InformesTecnicos,
        Page::AsignacionTareas,
        Page::GestionPasantes,
        Page::Inventario,
        Page::EscanearQr,
        Page::GenerarQr,
        Page::FichaTecnica,
        Page::PruebaSeguridad,
        Page::InformeMalUso,
        Page::RendimientoEquipo,
        Page::DashboardKpis,
        Page::Reportes,
        Page::GestionUsuarios,
    ];

    /// Menu label, as shown to users.
    pub fn label(&self) -> &'static str {
        match self {
            Page::Inicio => "Inicio",
            Page::BaseDeDatos => "Base de Datos",
            Page::Mantenimientos => "Mantenimientos",
            Page::InformesTecnicos => "Informes Técnicos",
            Page::AsignacionTareas => "Asignación Tareas",
            Page::GestionPasantes => "Gestión Pasantes",
            Page::Inventario => "Inventario",
            Page::EscanearQr => "Escanear QR",
            Page::GenerarQr => "Generar QR",
            Page::FichaTecnica => "Ficha Técnica",
            Page::PruebaSeguridad => "Prueba Seguridad Eléctrica",
            Page::InformeMalUso => "Informe Mal Uso",
            Page::RendimientoEquipo => "Rendimiento Equipo",
            Page::DashboardKpis => "Dashboard KPIs",
            Page::Reportes => "Reportes",
            Page::GestionUsuarios => "Gestión de Usuarios",
        }
    }

    pub fn from_label(label: &str) -> Option<Page> {
        Page::ALL.into_iter().find(|p| p.label() == label)
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One navigation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub label: &'static str,
    pub icon: &'static str,
}
