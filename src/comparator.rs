// ⚖️ Comparator - Walk matched pairs and flag discrepancies
// Produces a flat, typed, severity-ranked conflict list plus summary
// counters. Comparison depth is controlled by the PhaseConfig fields only;
// the comparator never branches on which preset it was handed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::catalog::{BudgetItem, ModelType, PropertyValue};
use crate::matcher::{MatchMethod, MatchedPair, ReconciliationResult};
use crate::phases::{PhaseConfig, PropertyScope};

// ============================================================================
// CONFLICT TYPES
// ============================================================================

/// Kind of discrepancy detected. Closed set: the comparator matches on it
/// exhaustively, so adding a kind is a compile-time-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Entity exists in the model but was never budgeted
    MissingInBudget,
    /// Budget item has no counterpart in the model
    MissingInModel,
    /// Pair matched by description, but the identifiers differ
    CodeMismatch,
    /// Countable quantities differ beyond tolerance
    QuantityMismatch,
    /// Family or type name differs
    NameMismatch,
    /// Property present on both sides with different values
    PropertyMismatch,
    /// Property present on one side only
    PropertyMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Values are different
    Error,
    /// Missing data
    Warning,
    /// Informational
    Info,
}

/// One classified discrepancy, ready for human review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub severity: Severity,

    // Element identification
    pub code: Option<String>,
    pub element_name: String,

    // Conflict details
    pub property_name: Option<String>,
    pub model_value: Option<PropertyValue>,
    pub budget_value: Option<PropertyValue>,

    pub message: String,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        };
        let code = self.code.as_deref().unwrap_or("?");
        if let Some(property) = &self.property_name {
            write!(
                f,
                "[{}] {}: {} - model: {}, budget: {}",
                severity,
                code,
                property,
                self.model_value
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                self.budget_value
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            )
        } else {
            write!(f, "[{}] {}: {}", severity, code, self.message)
        }
    }
}

// ============================================================================
// COMPARISON RESULT
// ============================================================================

/// All conflicts found in one run, presentation-ordered, plus counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub conflicts: Vec<Conflict>,

    // Counts by type
    pub missing_in_budget: usize,
    pub missing_in_model: usize,
    pub code_mismatches: usize,
    pub quantity_mismatches: usize,
    pub property_mismatches: usize,

    pub total_properties_compared: usize,

    // Summary
    pub total_matched: usize,
    /// Distinct codes carrying at least one conflict
    pub total_with_conflicts: usize,
}

impl ComparisonResult {
    pub fn error_count(&self) -> usize {
        self.conflicts_by_severity(Severity::Error).len()
    }

    pub fn warning_count(&self) -> usize {
        self.conflicts_by_severity(Severity::Warning).len()
    }

    pub fn info_count(&self) -> usize {
        self.conflicts_by_severity(Severity::Info).len()
    }

    pub fn conflicts_by_kind(&self, kind: ConflictKind) -> Vec<&Conflict> {
        self.conflicts.iter().filter(|c| c.kind == kind).collect()
    }

    pub fn conflicts_by_severity(&self, severity: Severity) -> Vec<&Conflict> {
        self.conflicts
            .iter()
            .filter(|c| c.severity == severity)
            .collect()
    }

    pub fn conflicts_for_code(&self, code: &str) -> Vec<&Conflict> {
        self.conflicts
            .iter()
            .filter(|c| c.code.as_deref() == Some(code))
            .collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} conflicts ({} errors, {} warnings, {} info) across {} codes; {} pairs compared",
            self.conflicts.len(),
            self.error_count(),
            self.warning_count(),
            self.info_count(),
            self.total_with_conflicts,
            self.total_matched,
        )
    }
}

// ============================================================================
// COMPARATOR
// ============================================================================

/// Units whose quantities count discrete pieces. Area/volume/length units are
/// not quantity-checked against instance counts.
pub const COUNTABLE_UNITS: &[&str] = &["u", "ud", "un", "pza", "ut", "unidad", "unidades"];

/// Curated (budget key, model key) property pairs compared under the
/// spatial scope: dimensional, material and thermal names.
pub const CURATED_PROPERTIES: &[(&str, &str)] = &[
    // Dimensional
    ("h", "h"),
    ("b", "b"),
    ("Anchura", "width"),
    ("Altura", "height"),
    ("Grosor", "thickness"),
    ("Longitud", "length"),
    // Material
    ("Material", "Material"),
    ("Material estructural", "StructuralMaterial"),
    // Thermal
    ("Resistencia térmica (R)", "ThermalResistance"),
    ("Coeficiente de transferencia de calor (U)", "HeatTransferCoefficient"),
];

/// Compares matched pairs and flags differences.
pub struct Comparator;

impl Comparator {
    pub fn new() -> Self {
        Comparator
    }

    /// Compare every pair in a reconciliation result under a phase config.
    pub fn compare(
        &self,
        result: &ReconciliationResult,
        config: &PhaseConfig,
    ) -> ComparisonResult {
        let mut conflicts: Vec<Conflict> = Vec::new();
        let mut codes_with_conflicts: BTreeSet<String> = BTreeSet::new();

        // Missing counterparts are reported regardless of phase
        for pair in &result.model_only {
            conflicts.push(Conflict {
                kind: ConflictKind::MissingInBudget,
                severity: Severity::Warning,
                code: pair.code().map(|c| c.to_string()),
                element_name: pair.display_name().to_string(),
                property_name: None,
                model_value: None,
                budget_value: None,
                message: "Element exists in the model but not in the budget".to_string(),
            });
            if let Some(code) = pair.code() {
                codes_with_conflicts.insert(code.to_string());
            }
        }

        for pair in &result.budget_only {
            conflicts.push(Conflict {
                kind: ConflictKind::MissingInModel,
                severity: Severity::Warning,
                code: pair.code().map(|c| c.to_string()),
                element_name: pair.display_name().to_string(),
                property_name: None,
                model_value: None,
                budget_value: None,
                message: "Element exists in the budget but not in the model".to_string(),
            });
            if let Some(code) = pair.code() {
                codes_with_conflicts.insert(code.to_string());
            }
        }

        let mut total_properties_compared = 0;
        for pair in &result.matched {
            let (pair_conflicts, properties_compared) = self.compare_pair(pair, config);
            total_properties_compared += properties_compared;

            if !pair_conflicts.is_empty() {
                if let Some(code) = pair.code() {
                    codes_with_conflicts.insert(code.to_string());
                }
            }
            conflicts.extend(pair_conflicts);
        }

        sort_for_presentation(&mut conflicts);

        let count_kind = |kind: ConflictKind| conflicts.iter().filter(|c| c.kind == kind).count();

        ComparisonResult {
            missing_in_budget: count_kind(ConflictKind::MissingInBudget),
            missing_in_model: count_kind(ConflictKind::MissingInModel),
            code_mismatches: count_kind(ConflictKind::CodeMismatch),
            quantity_mismatches: count_kind(ConflictKind::QuantityMismatch),
            property_mismatches: count_kind(ConflictKind::PropertyMismatch),
            total_properties_compared,
            total_matched: result.matched.len(),
            total_with_conflicts: codes_with_conflicts.len(),
            conflicts,
        }
    }

    /// Compare one matched pair. Returns the conflicts plus the number of
    /// properties actually compared.
    fn compare_pair(&self, pair: &MatchedPair, config: &PhaseConfig) -> (Vec<Conflict>, usize) {
        let mut conflicts = Vec::new();
        let mut properties_compared = 0;

        let (Some(mt), Some(item)) = (&pair.model_type, &pair.budget_item) else {
            return (conflicts, properties_compared);
        };

        // Matched by description with diverging identifiers: renaming
        // happened on one side
        if pair.method == MatchMethod::Description {
            let model_code = mt.tag.as_deref().unwrap_or("?");
            if model_code != item.code {
                conflicts.push(Conflict {
                    kind: ConflictKind::CodeMismatch,
                    severity: Severity::Error,
                    code: Some(item.code.clone()),
                    element_name: pair.display_name().to_string(),
                    property_name: Some("Código".to_string()),
                    model_value: Some(PropertyValue::from(model_code)),
                    budget_value: Some(PropertyValue::from(item.code.as_str())),
                    message: format!(
                        "Códigos diferentes: el modelo usa '{}', el presupuesto usa '{}'",
                        model_code, item.code
                    ),
                });
            }
        }

        if let Some(conflict) = self.check_quantity(pair, mt, item, config.quantity_tolerance) {
            conflicts.push(conflict);
        }

        if config.check_names {
            self.check_names(pair, mt, item, &mut conflicts);
        }

        if config.check_properties && config.property_scope != PropertyScope::None {
            properties_compared = self.check_properties(
                pair,
                mt,
                item,
                config.property_scope,
                config.quantity_tolerance,
                &mut conflicts,
            );
        }

        (conflicts, properties_compared)
    }

    /// Quantities are only comparable when both sides report a positive one
    /// and the budget unit counts discrete pieces. The tolerance boundary is
    /// inclusive: a difference of exactly the tolerance is not a conflict.
    fn check_quantity(
        &self,
        pair: &MatchedPair,
        mt: &ModelType,
        item: &BudgetItem,
        tolerance: f64,
    ) -> Option<Conflict> {
        let budget_qty = item.quantity;
        let model_qty = mt.instance_count as f64;
        if budget_qty <= 0.0 || model_qty <= 0.0 {
            return None;
        }

        let unit = item.unit.to_lowercase();
        if !COUNTABLE_UNITS.contains(&unit.as_str()) {
            return None;
        }

        if (budget_qty - model_qty).abs() <= tolerance {
            return None;
        }

        Some(Conflict {
            kind: ConflictKind::QuantityMismatch,
            severity: Severity::Error,
            code: pair.code().map(|c| c.to_string()),
            element_name: pair.display_name().to_string(),
            property_name: Some("Cantidad".to_string()),
            model_value: Some(PropertyValue::Int(mt.instance_count as i64)),
            budget_value: Some(PropertyValue::Float(budget_qty)),
            message: format!(
                "Cantidad difiere: presupuesto={} {}, modelo={} instancias",
                budget_qty, item.unit, mt.instance_count
            ),
        })
    }

    /// Family and type name checked independently; a field only counts when
    /// both sides carry it.
    fn check_names(
        &self,
        pair: &MatchedPair,
        mt: &ModelType,
        item: &BudgetItem,
        conflicts: &mut Vec<Conflict>,
    ) {
        let fields = [
            ("Nombre de familia", &item.family_name, &mt.family_name),
            ("Nombre de tipo", &item.type_name, &mt.type_name),
        ];

        for (label, budget_name, model_name) in fields {
            let (Some(budget_name), Some(model_name)) = (budget_name, model_name) else {
                continue;
            };
            if normalized_eq(budget_name, model_name) {
                continue;
            }
            conflicts.push(Conflict {
                kind: ConflictKind::NameMismatch,
                severity: Severity::Warning,
                code: pair.code().map(|c| c.to_string()),
                element_name: pair.display_name().to_string(),
                property_name: Some(label.to_string()),
                model_value: Some(PropertyValue::from(model_name.as_str())),
                budget_value: Some(PropertyValue::from(budget_name.as_str())),
                message: format!("{} difiere", label),
            });
        }
    }

    /// Walk the property names applicable under the active scope.
    fn check_properties(
        &self,
        pair: &MatchedPair,
        mt: &ModelType,
        item: &BudgetItem,
        scope: PropertyScope,
        tolerance: f64,
        conflicts: &mut Vec<Conflict>,
    ) -> usize {
        let mut properties_compared = 0;

        // Curated dimensional/material/thermal names
        for &(budget_key, model_key) in CURATED_PROPERTIES {
            let budget_value = item.properties.get(budget_key);
            let model_value = mt.properties.get(model_key);

            match (budget_value, model_value) {
                (None, None) => continue,
                (Some(budget_value), None) => {
                    properties_compared += 1;
                    conflicts.push(self.property_missing(
                        pair,
                        budget_key,
                        None,
                        Some(budget_value.clone()),
                        "Property exists in the budget but not in the model",
                    ));
                }
                (None, Some(model_value)) => {
                    properties_compared += 1;
                    conflicts.push(self.property_missing(
                        pair,
                        budget_key,
                        Some(model_value.clone()),
                        None,
                        "Property exists in the model but not in the budget",
                    ));
                }
                (Some(budget_value), Some(model_value)) => {
                    properties_compared += 1;
                    if !values_equal(budget_value, model_value, tolerance) {
                        conflicts.push(self.property_mismatch(
                            pair,
                            budget_key,
                            model_value.clone(),
                            budget_value.clone(),
                        ));
                    }
                }
            }
        }

        // Under the widest scope, keys that coincide verbatim on both sides
        // are compared too, catching overlaps the curated list never knew
        if scope == PropertyScope::All {
            for (key, budget_value) in &item.properties {
                if CURATED_PROPERTIES.iter().any(|(bk, _)| bk == key) {
                    continue;
                }
                let Some(model_value) = mt.properties.get(key) else {
                    continue;
                };
                properties_compared += 1;
                if !values_equal(budget_value, model_value, tolerance) {
                    conflicts.push(self.property_mismatch(
                        pair,
                        key,
                        model_value.clone(),
                        budget_value.clone(),
                    ));
                }
            }
        }

        properties_compared
    }

    fn property_missing(
        &self,
        pair: &MatchedPair,
        property: &str,
        model_value: Option<PropertyValue>,
        budget_value: Option<PropertyValue>,
        message: &str,
    ) -> Conflict {
        Conflict {
            kind: ConflictKind::PropertyMissing,
            severity: Severity::Info,
            code: pair.code().map(|c| c.to_string()),
            element_name: pair.display_name().to_string(),
            property_name: Some(property.to_string()),
            model_value,
            budget_value,
            message: format!("'{}': {}", property, message),
        }
    }

    fn property_mismatch(
        &self,
        pair: &MatchedPair,
        property: &str,
        model_value: PropertyValue,
        budget_value: PropertyValue,
    ) -> Conflict {
        Conflict {
            kind: ConflictKind::PropertyMismatch,
            severity: Severity::Error,
            code: pair.code().map(|c| c.to_string()),
            element_name: pair.display_name().to_string(),
            property_name: Some(property.to_string()),
            message: format!(
                "Property '{}' differs: model={}, budget={}",
                property, model_value, budget_value
            ),
            model_value: Some(model_value),
            budget_value: Some(budget_value),
        }
    }
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// COMPARISON HELPERS
// ============================================================================

/// Numeric comparison with tolerance when both values have a numeric view,
/// case-insensitive trimmed string equality otherwise.
fn values_equal(budget_value: &PropertyValue, model_value: &PropertyValue, tolerance: f64) -> bool {
    if let (Some(a), Some(b)) = (budget_value.as_f64(), model_value.as_f64()) {
        return (a - b).abs() <= tolerance;
    }
    normalized_eq(&budget_value.to_string(), &model_value.to_string())
}

/// Case-insensitive, whitespace-collapsed equality.
fn normalized_eq(a: &str, b: &str) -> bool {
    let normalize = |s: &str| {
        s.to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    };
    normalize(a) == normalize(b)
}

/// Presentation order: plain errors, then code mismatches, then warnings,
/// then info; ties broken by code, ascending.
fn sort_for_presentation(conflicts: &mut [Conflict]) {
    conflicts.sort_by(|a, b| {
        presentation_rank(a)
            .cmp(&presentation_rank(b))
            .then_with(|| a.code.cmp(&b.code))
    });
}

fn presentation_rank(conflict: &Conflict) -> u8 {
    match (conflict.severity, conflict.kind) {
        (Severity::Error, ConflictKind::CodeMismatch) => 1,
        (Severity::Error, _) => 0,
        (Severity::Warning, _) => 2,
        (Severity::Info, _) => 3,
    }
}

// ============================================================================
// TESTS
// ============================================================================
