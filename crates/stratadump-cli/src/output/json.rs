//! JSON report formatting.

use schemars::generate::SchemaSettings;
use stratadump_core::BackupReport;

/// Format the run report as JSON.
///
/// If `compact` is true, outputs minified JSON without whitespace.
pub fn format_json(report: &BackupReport, compact: bool) -> serde_json::Result<String> {
    if compact {
        serde_json::to_string(report)
    } else {
        serde_json::to_string_pretty(report)
    }
}

/// Draft-07 JSON Schema describing the report document.
pub fn report_schema_json() -> serde_json::Result<String> {
    let generator = SchemaSettings::draft07().into_generator();
    let schema = generator.into_root_schema_for::<BackupReport>();
    serde_json::to_string_pretty(&schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures;
    use serde_json::Value;

    #[test]
    fn test_json_pretty() {
        let json = format_json(&fixtures::report(), false).unwrap();
        assert!(json.contains('\n'));

        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["dialect"], "postgres");
        assert_eq!(value["schema"]["resolvedSchema"], "public");
        assert_eq!(value["stats"]["rows"], 42);
        assert_eq!(value["filter"]["excluded"][0]["name"], "spatial_ref_sys");
    }

    #[test]
    fn test_json_compact() {
        let json = format_json(&fixtures::report(), true).unwrap();
        assert!(!json.starts_with("{\n"));
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_report_schema_is_draft07() {
        let schema: Value = serde_json::from_str(&report_schema_json().unwrap()).unwrap();
        assert_eq!(schema["$schema"], "http://json-schema.org/draft-07/schema#");
        assert_eq!(schema["title"], "BackupReport");
    }
}
