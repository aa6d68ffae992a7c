// 🔗 Matcher - Link model types to budget items
// Four strategies, strict precedence, greedy first-match-wins:
// identifier, cross-reference, family/type name, description similarity.
// An entity claimed by an earlier strategy is never revisited by a later one.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::catalog::{BudgetCatalog, BudgetItem, ModelCatalog, ModelType};

// ============================================================================
// MATCH METHOD AND STATUS
// ============================================================================

/// How a pair was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// Model tag == budget code (exact)
    Identifier,
    /// Model id == budget cross-reference id
    CrossReference,
    /// Exact family:type (or plain name) key
    Name,
    /// Jaccard similarity over descriptions
    Description,
    /// No strategy claimed the entity
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Found on both sides
    Matched,
    /// Only in the building model (not budgeted)
    ModelOnly,
    /// Only in the budget (not modeled)
    BudgetOnly,
}

// ============================================================================
// MATCHED PAIR
// ============================================================================

/// One reconciliation outcome: a linked pair, or a one-sided leftover.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedPair {
    pub status: MatchStatus,
    pub method: MatchMethod,

    pub model_type: Option<ModelType>,
    pub budget_item: Option<BudgetItem>,

    /// The key the winning strategy matched on
    pub match_key: Option<String>,

    /// 1.0 for exact strategies, 0.8 for name, capped similarity for
    /// description, 0.0 for unmatched leftovers
    pub confidence: f64,
}

impl MatchedPair {
    pub fn matched(
        method: MatchMethod,
        model_type: ModelType,
        budget_item: BudgetItem,
        match_key: String,
        confidence: f64,
    ) -> Self {
        MatchedPair {
            status: MatchStatus::Matched,
            method,
            model_type: Some(model_type),
            budget_item: Some(budget_item),
            match_key: Some(match_key),
            confidence,
        }
    }

    pub fn model_only(model_type: ModelType) -> Self {
        MatchedPair {
            status: MatchStatus::ModelOnly,
            method: MatchMethod::None,
            model_type: Some(model_type),
            budget_item: None,
            match_key: None,
            confidence: 0.0,
        }
    }

    pub fn budget_only(budget_item: BudgetItem) -> Self {
        MatchedPair {
            status: MatchStatus::BudgetOnly,
            method: MatchMethod::None,
            model_type: None,
            budget_item: Some(budget_item),
            match_key: None,
            confidence: 0.0,
        }
    }

    /// Primary code/identifier for display and conflict grouping.
    pub fn code(&self) -> Option<&str> {
        if let Some(item) = &self.budget_item {
            return Some(&item.code);
        }
        self.model_type.as_ref().and_then(|t| t.tag.as_deref())
    }

    /// Descriptive name for human-facing output.
    pub fn display_name(&self) -> &str {
        if let Some(item) = &self.budget_item {
            return &item.description;
        }
        if let Some(t) = &self.model_type {
            return &t.name;
        }
        "Unknown"
    }
}

// ============================================================================
// RECONCILIATION RESULT
// ============================================================================

/// Result of reconciling the two catalogs. Produced once per run, then owned
/// by the caller; the matcher holds no state between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub matched: Vec<MatchedPair>,
    pub model_only: Vec<MatchedPair>,
    pub budget_only: Vec<MatchedPair>,

    pub total_model_types: usize,
    /// Comparable budget items only; structural/hierarchy-only records are
    /// not counted
    pub total_budget_items: usize,
}

impl ReconciliationResult {
    /// Match rate as a percentage: each match covers one item on each side.
    pub fn match_rate(&self) -> f64 {
        let total = self.total_model_types + self.total_budget_items;
        if total == 0 {
            return 0.0;
        }
        (self.matched.len() * 2) as f64 / total as f64 * 100.0
    }

    /// All matches established by a specific strategy.
    pub fn matched_by_method(&self, method: MatchMethod) -> Vec<&MatchedPair> {
        self.matched.iter().filter(|m| m.method == method).collect()
    }

    /// Matches at or above a confidence threshold.
    pub fn high_confidence_matches(&self, threshold: f64) -> Vec<&MatchedPair> {
        self.matched
            .iter()
            .filter(|m| m.confidence >= threshold)
            .collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "Reconciliation: {} model types, {} budget items, {} matched, {} model-only, {} budget-only, match rate {:.1}%",
            self.total_model_types,
            self.total_budget_items,
            self.matched.len(),
            self.model_only.len(),
            self.budget_only.len(),
            self.match_rate()
        )
    }
}

// ============================================================================
// DESCRIPTION SIMILARITY
// ============================================================================

/// Connector words and bare unit abbreviations ignored when tokenizing
/// descriptions.
pub const STOP_WORDS: &[&str] = &[
    "de", "la", "el", "en", "con", "para", "por", "a", "y", "o", "mm", "cm", "m", "m2", "m3",
    "the", "of", "and", "in", "to",
];

/// Lowercase, strip everything but letters/digits/whitespace, collapse runs
/// of whitespace. Accented letters survive.
pub fn normalize_description(text: &str) -> String {
    let lowered = text.to_lowercase();
    let filtered: String = lowered
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn token_set(text: &str) -> BTreeSet<String> {
    normalize_description(text)
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

/// Jaccard similarity of the stop-word-filtered token sets of two
/// descriptions. 0.0 if either set is empty after filtering.
pub fn calculate_similarity(a: &str, b: &str) -> f64 {
    let set_a = token_set(a);
    let set_b = token_set(b);

    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64
}

// ============================================================================
// MATCHER
// ============================================================================

/// Matches model types with budget items.
///
/// The cascade is intentionally greedy: each strategy commits its matches
/// before the next one runs, with no backtracking or global re-optimization.
pub struct Matcher {
    /// Strategy 3: family/type name lookup
    pub match_by_name: bool,

    /// Strategy 4: description similarity fallback
    pub match_by_description: bool,

    /// Minimum similarity score a description match must reach
    pub similarity_threshold: f64,
}

impl Matcher {
    pub fn new() -> Self {
        Matcher {
            match_by_name: true,
            match_by_description: true,
            similarity_threshold: 0.5,
        }
    }

    pub fn with_similarity_threshold(threshold: f64) -> Self {
        Matcher {
            similarity_threshold: threshold,
            ..Self::new()
        }
    }

    /// Run the strategy cascade over the two catalogs.
    ///
    /// Matching is one-to-one: a model id and a budget code each end up in at
    /// most one matched pair, and every entity lands in exactly one of
    /// matched / model-only / budget-only (structural budget records are
    /// excluded entirely).
    pub fn reconcile(
        &self,
        model: &ModelCatalog,
        budget: &BudgetCatalog,
    ) -> ReconciliationResult {
        let mut matched: Vec<MatchedPair> = Vec::new();
        let mut matched_model_ids: HashSet<&str> = HashSet::new();
        let mut matched_budget_codes: HashSet<&str> = HashSet::new();

        // Strategy 1: model tag == budget code
        for mt in &model.types {
            if matched_model_ids.contains(mt.id.as_str()) {
                continue;
            }
            let Some(tag) = mt.tag.as_deref() else {
                continue;
            };
            if matched_budget_codes.contains(tag) {
                continue;
            }
            if let Some(item) = budget.items.get(tag) {
                matched.push(MatchedPair::matched(
                    MatchMethod::Identifier,
                    mt.clone(),
                    item.clone(),
                    tag.to_string(),
                    1.0,
                ));
                matched_model_ids.insert(mt.id.as_str());
                matched_budget_codes.insert(tag);
            }
        }

        // Strategy 2: model id == budget cross-reference id
        let mut budget_by_xref: HashMap<&str, &str> = HashMap::new();
        for (code, item) in &budget.items {
            if matched_budget_codes.contains(code.as_str()) {
                continue;
            }
            if let Some(xref) = item.model_type_id.as_deref() {
                budget_by_xref.entry(xref).or_insert(code.as_str());
            }
        }
        for mt in &model.types {
            if matched_model_ids.contains(mt.id.as_str()) {
                continue;
            }
            let Some(&code) = budget_by_xref.get(mt.id.as_str()) else {
                continue;
            };
            if matched_budget_codes.contains(code) {
                continue;
            }
            let item = &budget.items[code];
            matched.push(MatchedPair::matched(
                MatchMethod::CrossReference,
                mt.clone(),
                item.clone(),
                mt.id.clone(),
                1.0,
            ));
            matched_model_ids.insert(mt.id.as_str());
            matched_budget_codes.insert(code);
        }

        // Strategy 3: exact family:type name key (lower confidence)
        if self.match_by_name {
            let mut budget_by_name: HashMap<String, &str> = HashMap::new();
            for (code, item) in &budget.items {
                if matched_budget_codes.contains(code.as_str()) {
                    continue;
                }
                if let (Some(family), Some(type_name)) =
                    (item.family_name.as_deref(), item.type_name.as_deref())
                {
                    let key = format!("{}:{}", family, type_name).to_lowercase();
                    budget_by_name.entry(key).or_insert(code.as_str());
                }
            }

            for mt in &model.types {
                if matched_model_ids.contains(mt.id.as_str()) {
                    continue;
                }

                // Fall back to the plain name when family/type is incomplete
                let key = match (mt.family_name.as_deref(), mt.type_name.as_deref()) {
                    (Some(family), Some(type_name)) => {
                        format!("{}:{}", family, type_name).to_lowercase()
                    }
                    _ if !mt.name.is_empty() => mt.name.to_lowercase(),
                    _ => continue,
                };

                let Some(&code) = budget_by_name.get(&key) else {
                    continue;
                };
                if matched_budget_codes.contains(code) {
                    continue;
                }
                let item = &budget.items[code];
                matched.push(MatchedPair::matched(
                    MatchMethod::Name,
                    mt.clone(),
                    item.clone(),
                    key,
                    0.8,
                ));
                matched_model_ids.insert(mt.id.as_str());
                matched_budget_codes.insert(code);
            }
        }

        // Strategy 4: description similarity (greedy, catalog iteration
        // order; ties keep the first candidate seen)
        if self.match_by_description {
            for mt in &model.types {
                if matched_model_ids.contains(mt.id.as_str()) {
                    continue;
                }

                let mut best: Option<(&str, f64)> = None;
                for (code, item) in &budget.items {
                    if matched_budget_codes.contains(code.as_str()) {
                        continue;
                    }
                    let score = calculate_similarity(&mt.name, &item.description);
                    if best.map_or(true, |(_, s)| score > s) {
                        best = Some((code.as_str(), score));
                    }
                }

                let Some((code, score)) = best else {
                    continue;
                };
                if score < self.similarity_threshold {
                    continue;
                }

                let item = &budget.items[code];
                matched.push(MatchedPair::matched(
                    MatchMethod::Description,
                    mt.clone(),
                    item.clone(),
                    code.to_string(),
                    // Capped below the confidence of exact matches
                    score.min(0.8),
                ));
                matched_model_ids.insert(mt.id.as_str());
                matched_budget_codes.insert(code);
            }
        }

        // Leftovers
        let mut model_only = Vec::new();
        for mt in &model.types {
            if !matched_model_ids.contains(mt.id.as_str()) {
                model_only.push(MatchedPair::model_only(mt.clone()));
            }
        }

        let mut budget_only = Vec::new();
        for (code, item) in &budget.items {
            if matched_budget_codes.contains(code.as_str()) {
                continue;
            }
            // Structural/hierarchy-only records are not comparable work items
            if item.is_comparable() {
                budget_only.push(MatchedPair::budget_only(item.clone()));
            }
        }

        ReconciliationResult {
            matched,
            model_only,
            budget_only,
            total_model_types: model.types.len(),
            total_budget_items: budget.comparable_count(),
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
