// 📊 Run Report - Plain-data output for the external reporting layer
// Assembles one run's engine output into a serializable report with
// provenance. Rendering concerns (sheets, colors, column widths) live in the
// consuming layer, not here.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::comparator::{ComparisonResult, Conflict};
use crate::matcher::ReconciliationResult;
use crate::phases::PhaseConfig;

// ============================================================================
// REPORT MODEL
// ============================================================================

/// Provenance for one input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingSummary {
    pub total_model_types: usize,
    pub total_budget_items: usize,
    pub matched: usize,
    pub model_only: usize,
    pub budget_only: usize,
    pub match_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictSummary {
    pub total_conflicts: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub missing_in_budget: usize,
    pub missing_in_model: usize,
    pub code_mismatches: usize,
    pub quantity_mismatches: usize,
    pub property_mismatches: usize,
    pub total_properties_compared: usize,
    pub total_matched: usize,
    pub total_with_conflicts: usize,
}

/// One run's complete output, ready for an external reporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub phase: String,

    pub budget_file: Option<FileInfo>,
    pub model_file: Option<FileInfo>,

    pub matching: MatchingSummary,
    pub conflicts: ConflictSummary,

    /// Presentation-ordered, as produced by the comparator
    pub conflict_list: Vec<Conflict>,
}

impl RunReport {
    /// Assemble a report from the engine output of one run.
    pub fn build(
        reconciliation: &ReconciliationResult,
        comparison: &ComparisonResult,
        config: &PhaseConfig,
    ) -> RunReport {
        RunReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            phase: config.name.clone(),
            budget_file: None,
            model_file: None,
            matching: MatchingSummary {
                total_model_types: reconciliation.total_model_types,
                total_budget_items: reconciliation.total_budget_items,
                matched: reconciliation.matched.len(),
                model_only: reconciliation.model_only.len(),
                budget_only: reconciliation.budget_only.len(),
                match_rate: reconciliation.match_rate(),
            },
            conflicts: ConflictSummary {
                total_conflicts: comparison.conflicts.len(),
                errors: comparison.error_count(),
                warnings: comparison.warning_count(),
                infos: comparison.info_count(),
                missing_in_budget: comparison.missing_in_budget,
                missing_in_model: comparison.missing_in_model,
                code_mismatches: comparison.code_mismatches,
                quantity_mismatches: comparison.quantity_mismatches,
                property_mismatches: comparison.property_mismatches,
                total_properties_compared: comparison.total_properties_compared,
                total_matched: comparison.total_matched,
                total_with_conflicts: comparison.total_with_conflicts,
            },
            conflict_list: comparison.conflicts.clone(),
        }
    }

    /// Attach input-file provenance (path + checksum).
    pub fn with_input_files(mut self, budget_path: &Path, model_path: &Path) -> Result<RunReport> {
        self.budget_file = Some(file_fingerprint(budget_path)?);
        self.model_file = Some(file_fingerprint(model_path)?);
        Ok(self)
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write run report: {}", path.display()))?;
        Ok(())
    }
}

/// Path + sha256 fingerprint of an input file.
pub fn file_fingerprint(path: &Path) -> Result<FileInfo> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hasher.finalize();

    Ok(FileInfo {
        path: path.display().to_string(),
        sha256: format!("{:x}", digest),
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelCatalog;
    use crate::comparator::Comparator;
    use crate::matcher::Matcher;
    use crate::parser::BudgetParser;
    use std::io::Write;

    /// End-to-end: parse → match → compare → report.
    fn sample_report() -> RunReport {
        let budget_text = "\
~V|Test|FIEBDC-3/2020|
~C|350147|u|Pilar rectangular hormigón|150|
~C|T-NAN|u|Test|0|
";
        let parsed = BudgetParser::new().parse_str(budget_text);

        let model_json = r#"[
            {
                "id": "G1",
                "tag": "350147",
                "name": "Pilar rectangular hormigón",
                "class_name": "IfcColumnType",
                "instance_count": 5
            }
        ]"#;
        let types = serde_json::from_str(model_json).unwrap();
        let model = ModelCatalog::new(types);

        let config = crate::phases::PhaseConfig::full();
        let reconciliation = Matcher::new().reconcile(&model, &parsed.catalog);
        let comparison = Comparator::new().compare(&reconciliation, &config);
        RunReport::build(&reconciliation, &comparison, &config)
    }

    #[test]
    fn test_report_summaries() {
        let report = sample_report();

        assert_eq!(report.matching.total_model_types, 1);
        assert_eq!(report.matching.total_budget_items, 2);
        assert_eq!(report.matching.matched, 1);
        assert_eq!(report.matching.budget_only, 1);

        // T-NAN shows up as the single missing-in-model warning
        assert_eq!(report.conflicts.total_conflicts, 1);
        assert_eq!(report.conflicts.missing_in_model, 1);
        assert_eq!(report.conflicts.warnings, 1);
        assert_eq!(report.conflict_list.len(), 1);
        assert_eq!(report.phase, "Análisis completo");
    }

    #[test]
    fn test_report_json_round_trip() {
        let report = sample_report();

        let json = serde_json::to_string(&report).unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.run_id, report.run_id);
        assert_eq!(parsed.conflicts.total_conflicts, report.conflicts.total_conflicts);
        assert_eq!(parsed.conflict_list.len(), report.conflict_list.len());
    }

    #[test]
    fn test_write_json() {
        let report = sample_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        report.write_json(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"matching\""));
        assert!(content.contains("\"conflict_list\""));
    }

    #[test]
    fn test_file_fingerprint() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();

        let info = file_fingerprint(file.path()).unwrap();
        assert_eq!(
            info.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_with_input_files() {
        let mut budget = tempfile::NamedTempFile::new().unwrap();
        budget.write_all(b"~V|Test|F|").unwrap();
        let mut model = tempfile::NamedTempFile::new().unwrap();
        model.write_all(b"[]").unwrap();

        let report = sample_report()
            .with_input_files(budget.path(), model.path())
            .unwrap();

        assert!(report.budget_file.is_some());
        assert!(report.model_file.is_some());
        assert_ne!(
            report.budget_file.unwrap().sha256,
            report.model_file.unwrap().sha256
        );
    }
}
