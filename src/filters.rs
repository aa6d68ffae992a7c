// 🚫 Entry Filters - Exclude non-comparable catalog entries
// Views, sheets, rooms, zones, openings and MEP noise show up in both
// catalogs but are not building work items; filtering them before matching
// keeps the unmatched lists reviewable.

use crate::catalog::{BudgetCatalog, ModelCatalog};

// ============================================================================
// IGNORE TERMS
// ============================================================================
// An entry whose code or description contains one of these terms
// (case-insensitive) is excluded from matching.

pub const IGNORE_TERMS_ES: &[&str] = &[
    // Project info / views
    "información",
    "plano",
    "vista",
    // Zones and areas
    "zona de",
    "climatización",
    "topografía",
    // Rooms
    "habitaciones",
    "áreas",
    "ocupacion",
    "sup.libre",
    "sup.construida",
    // Room types
    "almacén",
    "salón",
    "cocina",
    "aseo",
    "archivo",
    "circulación",
    "área de trabajo",
    "sala de reuniones",
    "dep. limpieza",
    "aseos femeninos",
    "aseos masculinos",
    // Openings and voids
    "aberturas",
    "hueco",
    "corte",
    "líneas",
    // Materials and MEP
    "materiales",
    "tubería",
    "segmentos",
];

pub const IGNORE_TERMS_EN: &[&str] = &[
    // Project info / views
    "project info",
    "sheet",
    "view",
    // Zones and areas
    "rooms",
    "areas",
    // Openings and voids
    "opening",
    "void",
    "lines",
    // Materials and MEP
    "materials",
    "pipe",
    // Panels
    "system panel",
    "empty panel",
];

/// Check whether an entry should be left out of matching.
///
/// Both the code and the description are checked, so "sheet_01" is filtered
/// even with an innocuous description.
pub fn is_ignored_entry(code: Option<&str>, description: Option<&str>, custom: &[String]) -> bool {
    let mut text = String::new();
    if let Some(code) = code {
        text.push_str(&code.to_lowercase());
        text.push(' ');
    }
    if let Some(description) = description {
        text.push_str(&description.to_lowercase());
    }
    if text.trim().is_empty() {
        return false;
    }

    IGNORE_TERMS_ES
        .iter()
        .chain(IGNORE_TERMS_EN)
        .any(|term| text.contains(term))
        || custom.iter().any(|term| text.contains(&term.to_lowercase()))
}

/// Budget catalog with ignored entries removed. Hierarchy edges are kept
/// as-is; they are structural and never matched anyway.
pub fn filter_budget_catalog(catalog: &BudgetCatalog, custom: &[String]) -> BudgetCatalog {
    let mut filtered = catalog.clone();
    filtered
        .items
        .retain(|code, item| !is_ignored_entry(Some(code), Some(&item.description), custom));
    filtered
}

/// Model catalog with ignored types removed.
pub fn filter_model_catalog(catalog: &ModelCatalog, custom: &[String]) -> ModelCatalog {
    let mut filtered = catalog.clone();
    filtered
        .types
        .retain(|t| !is_ignored_entry(t.tag.as_deref(), Some(&t.name), custom));
    filtered
}

/// Codes of budget entries that the filter would drop, for reporting.
pub fn ignored_budget_codes(catalog: &BudgetCatalog, custom: &[String]) -> Vec<String> {
    catalog
        .items
        .iter()
        .filter(|(code, item)| is_ignored_entry(Some(code), Some(&item.description), custom))
        .map(|(code, _)| code.clone())
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
