//! Report formatting modules.

pub mod json;
pub mod table;

pub use json::{format_json, report_schema_json};
pub use table::format_table;

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{TimeZone, Utc};
    use stratadump_core::{
        issue_codes, BackupPlan, BackupReport, Dialect, ExcludedTable, ExclusionReason,
        FilterResult, ForeignKeyEdge, GenerationMode, GenerationStats, Issue, ResolutionMethod,
        SchemaResolution, Stage,
    };

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Phased run over a small shop schema with one cycle.
    pub fn report() -> BackupReport {
        let plan = BackupPlan::new(
            "public",
            names(&["users", "orders", "invoices", "payments"]),
            vec![
                ForeignKeyEdge::new("orders", "users", "orders_user_id_fkey", "user_id", "id"),
                ForeignKeyEdge::new(
                    "invoices",
                    "payments",
                    "invoices_payment_id_fkey",
                    "payment_id",
                    "id",
                ),
                ForeignKeyEdge::new(
                    "payments",
                    "invoices",
                    "payments_invoice_id_fkey",
                    "invoice_id",
                    "id",
                ),
            ],
            names(&["invoices", "payments"]),
        )
        .expect("closed plan");

        let started_at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        BackupReport {
            dialect: Dialect::Postgres,
            schema: SchemaResolution::new("public", None, true, ResolutionMethod::ConnectionDefault),
            filter: FilterResult::new(
                5,
                names(&["users", "orders", "invoices", "payments"]),
                vec![ExcludedTable {
                    name: "spatial_ref_sys".to_string(),
                    reason: ExclusionReason::SystemTable,
                    pattern: Some("spatial_ref_sys".to_string()),
                }],
            ),
            plan: Some(plan),
            mode: GenerationMode::Phased,
            stats: GenerationStats {
                tables: 4,
                rows: 42,
                constraints: 3,
            },
            issues: vec![Issue::warning(
                Stage::DependencyAnalysis,
                issue_codes::CIRCULAR_REFERENCES,
                "circular foreign-key references among: invoices, payments",
            )],
            started_at,
            finished_at: started_at + chrono::Duration::seconds(3),
        }
    }
}
