// Conflict Flagger - Core Library
// Reconciles a building-model type catalog with a cost-budget catalog:
// parse the budget records, link entities across catalogs with a cascading
// confidence-scored matcher, then compare matched pairs into a classified,
// severity-ranked conflict list.

pub mod catalog;       // Data model: budget items, model types, property values
pub mod parser;        // Budget record parser (BC3-style delimited format)
pub mod matcher;       // Strategy cascade + description similarity
pub mod filters;       // Non-comparable entry filters (views, sheets, rooms)
pub mod comparator;    // Conflict detection over matched pairs
pub mod phases;        // Analysis depth as plain configuration values
pub mod report;        // Plain-data run report for the external reporter

// Re-export commonly used types
pub use catalog::{BudgetCatalog, BudgetItem, ModelCatalog, ModelType, PropertyValue};
pub use parser::{
    BudgetParseResult, BudgetParser, ParseWarning, ParserError,
    CROSS_REFERENCE_KEY, FAMILY_NAME_KEY, TYPE_NAME_KEY,
};
pub use matcher::{
    calculate_similarity, normalize_description,
    MatchMethod, MatchStatus, MatchedPair, Matcher, ReconciliationResult, STOP_WORDS,
};
pub use filters::{
    filter_budget_catalog, filter_model_catalog, ignored_budget_codes, is_ignored_entry,
    IGNORE_TERMS_EN, IGNORE_TERMS_ES,
};
pub use comparator::{
    Comparator, ComparisonResult, Conflict, ConflictKind, Severity,
    COUNTABLE_UNITS, CURATED_PROPERTIES,
};
pub use phases::{Phase, PhaseConfig, PropertyScope};
pub use report::{file_fingerprint, FileInfo, RunReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
