//! Project and task code synthesis

use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Keyword table, first match wins
const PREFIXES: &[(&[&str], &str)] = &[
    (&["crm"], "CRM"),
    (&["migr", "cloud"], "MIG"),
    (&["app", "móvil", "movil"], "APP"),
    (&["reserv"], "RES"),
    (&["recursos", "rrhh"], "RRHH"),
    (&["iot", "monitor"], "IOT"),
    (&["erp", "sap"], "ERP"),
    (&["portal"], "PRT"),
    (&["sistema"], "SYS"),
];

const DEFAULT_PREFIX: &str = "PRJ";

/// Code prefix for a project name
pub fn project_prefix(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    PREFIXES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, prefix)| *prefix)
        .unwrap_or(DEFAULT_PREFIX)
}

/// `PREFIX-YEAR-NNN` for a project; the year comes from the start date or
/// `fallback_year`
pub fn project_code(name: &str, start_date: Option<NaiveDate>, id: i64, fallback_year: i32) -> String {
    let year = start_date.map(|d| d.year()).unwrap_or(fallback_year);
    format!("{}-{}-{:03}", project_prefix(name), year, id)
}

/// `<projectCode>-TNNN`
pub fn task_code(project_code: &str, sequence: i64) -> String {
    format!("{project_code}-T{sequence:03}")
}

/// Time-based code used when the owning project cannot be read
pub fn fallback_task_code(now: DateTime<Utc>) -> String {
    format!("TASK-{}", now.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_code_example() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1);
        assert_eq!(project_code("CRM Corporativo", start, 7, 1999), "CRM-2026-007");
    }

    #[test]
    fn test_project_code_is_deterministic() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 9);
        let a = project_code("Portal Clientes", start, 12, 2030);
        let b = project_code("Portal Clientes", start, 12, 2030);
        assert_eq!(a, b);
        assert_eq!(a, "PRT-2025-012");
    }

    #[test]
    fn test_prefix_first_match_wins() {
        // contains both "migr" and "sap"
        assert_eq!(project_prefix("Migración SAP"), "MIG");
        assert_eq!(project_prefix("App Móvil"), "APP");
        assert_eq!(project_prefix("Sistema de Reservas"), "RES");
        assert_eq!(project_prefix("Gestión RRHH"), "RRHH");
        assert_eq!(project_prefix("Monitorización planta"), "IOT");
        assert_eq!(project_prefix("Nuevo sistema contable"), "SYS");
        assert_eq!(project_prefix("Data Lake"), "PRJ");
    }

    #[test]
    fn test_year_falls_back_and_wide_ids_are_kept() {
        assert_eq!(project_code("Data Lake", None, 1234, 2027), "PRJ-2027-1234");
    }

    #[test]
    fn test_task_codes() {
        assert_eq!(task_code("CRM-2026-007", 1), "CRM-2026-007-T001");
        assert_eq!(task_code("CRM-2026-007", 1000), "CRM-2026-007-T1000");
        let now = DateTime::from_timestamp_millis(1_767_225_600_000).unwrap();
        assert_eq!(fallback_task_code(now), "TASK-1767225600000");
    }
}
