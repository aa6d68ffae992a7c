// 📦 Catalog Data Model - Budget items and model types
// Two independently produced catalogs describing the same construction project:
// the cost-budget side (parsed from BC3-style record files) and the building-model
// side (produced by an external extractor, consumed as-is).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// ============================================================================
// PROPERTY VALUES
// ============================================================================

/// A free-form property value carried by either catalog side.
///
/// Type decisions happen once, at parse time, with a fixed coercion order
/// (integer, then float, then string) instead of being deferred to comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl PropertyValue {
    /// Coerce a raw token into a typed value.
    ///
    /// Comma is accepted as decimal separator ("0,6" → 0.6). Empty tokens
    /// yield None and are not stored.
    pub fn parse(raw: &str) -> Option<PropertyValue> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if raw.contains('.') || raw.contains(',') {
            if let Ok(f) = raw.replace(',', ".").parse::<f64>() {
                return Some(PropertyValue::Float(f));
            }
        } else if let Ok(i) = raw.parse::<i64>() {
            return Some(PropertyValue::Int(i));
        }

        Some(PropertyValue::Text(raw.to_string()))
    }

    /// Numeric view of the value, if it has one.
    ///
    /// Text values that look numeric (either separator) still qualify, so
    /// "0.6" stored as text compares equal to 0.6 stored as float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(i) => Some(*i as f64),
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Text(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(i) => write!(f, "{}", i),
            PropertyValue::Float(v) => write!(f, "{}", v),
            PropertyValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_string())
    }
}

// ============================================================================
// BUDGET SIDE
// ============================================================================

/// One line of the cost budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetItem {
    /// Unique key within the catalog (trimmed, trailing `#` stripped)
    pub code: String,
    pub unit: String,
    pub description: String,
    pub price: f64,

    /// Cross-reference to the model catalog, if the source declared one
    pub model_type_id: Option<String>,

    // Classification
    pub family_name: Option<String>,
    pub type_name: Option<String>,

    /// Free-form properties from extended records
    pub properties: BTreeMap<String, PropertyValue>,

    // Hierarchy
    pub parent_code: Option<String>,
    pub children: Vec<(String, f64)>,
    /// Own quantity as a child of its parent
    pub quantity: f64,
}

impl BudgetItem {
    pub fn new(code: &str, unit: &str, description: &str, price: f64) -> Self {
        BudgetItem {
            code: code.to_string(),
            unit: unit.to_string(),
            description: description.to_string(),
            price,
            model_type_id: None,
            family_name: None,
            type_name: None,
            properties: BTreeMap::new(),
            parent_code: None,
            children: Vec::new(),
            quantity: 0.0,
        }
    }

    /// Whether this item represents comparable work.
    ///
    /// Items with no unit, no cross-reference and no properties are
    /// structural/hierarchy-only records (composite parents) and are left out
    /// of unmatched-budget reporting.
    pub fn is_comparable(&self) -> bool {
        !self.unit.is_empty() || self.model_type_id.is_some() || !self.properties.is_empty()
    }
}

/// The parsed cost-budget catalog: code → item, plus the raw hierarchy edges.
///
/// Catalogs are built once per run and read-only afterward. The item map is
/// ordered by code so every downstream pass iterates deterministically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetCatalog {
    /// Format/version banner from the source file (informational only)
    pub version: String,

    /// code → item
    pub items: BTreeMap<String, BudgetItem>,

    /// parent code → ordered (child code, quantity) edges.
    /// Edges whose child never got a definition are still recorded here.
    pub hierarchy: BTreeMap<String, Vec<(String, f64)>>,
}

impl BudgetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&BudgetItem> {
        self.items.get(code)
    }

    /// Number of items representing comparable work (structural parents excluded).
    pub fn comparable_count(&self) -> usize {
        self.items.values().filter(|i| i.is_comparable()).count()
    }

    /// Items carrying a cross-reference to the model catalog.
    pub fn items_with_cross_reference(&self) -> Vec<&BudgetItem> {
        self.items
            .values()
            .filter(|i| i.model_type_id.is_some())
            .collect()
    }

    /// Items whose family name contains the given text (case-insensitive).
    pub fn items_by_family(&self, family: &str) -> Vec<&BudgetItem> {
        let needle = family.to_lowercase();
        self.items
            .values()
            .filter(|i| {
                i.family_name
                    .as_ref()
                    .map(|f| f.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .collect()
    }
}

// ============================================================================
// MODEL SIDE
// ============================================================================

/// One distinguishable type from the building model.
///
/// Produced by an external extractor; the engine only requires these fields
/// and does not care how they were derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelType {
    /// Globally unique stable identifier
    pub id: String,

    /// Short human-assigned code, the preferred cross-reference key
    #[serde(default)]
    pub tag: Option<String>,

    pub name: String,
    pub class_name: String,

    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub type_name: Option<String>,

    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,

    #[serde(default)]
    pub instance_count: u32,
}

impl ModelType {
    pub fn new(id: &str, tag: Option<&str>, name: &str, class_name: &str) -> Self {
        ModelType {
            id: id.to_string(),
            tag: tag.map(|t| t.to_string()),
            name: name.to_string(),
            class_name: class_name.to_string(),
            family_name: None,
            type_name: None,
            properties: BTreeMap::new(),
            instance_count: 0,
        }
    }
}

/// The building-model type catalog, in extractor output order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelCatalog {
    pub types: Vec<ModelType>,
}

impl ModelCatalog {
    pub fn new(types: Vec<ModelType>) -> Self {
        let mut catalog = ModelCatalog { types };
        catalog.normalize();
        catalog
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Load a model catalog from extractor JSON output (an array of types).
    pub fn from_json_file(path: &Path) -> Result<ModelCatalog> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open model catalog: {}", path.display()))?;
        let types: Vec<ModelType> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse model catalog JSON: {}", path.display()))?;
        Ok(ModelCatalog::new(types))
    }

    /// Load a model catalog from a flat CSV export.
    ///
    /// Columns: id, tag, name, class_name, family_name, type_name,
    /// instance_count. The free-form property map is empty for CSV input.
    pub fn from_csv_file(path: &Path) -> Result<ModelCatalog> {
        #[derive(Deserialize)]
        struct Row {
            id: String,
            tag: Option<String>,
            name: String,
            class_name: String,
            family_name: Option<String>,
            type_name: Option<String>,
            instance_count: Option<u32>,
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open model catalog: {}", path.display()))?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(file);

        let mut types = Vec::new();
        for (line_num, result) in reader.deserialize::<Row>().enumerate() {
            let row = result.with_context(|| {
                format!(
                    "Failed to parse model catalog CSV line {} in {}",
                    line_num + 2,
                    path.display()
                )
            })?;
            types.push(ModelType {
                id: row.id,
                tag: row.tag,
                name: row.name,
                class_name: row.class_name,
                family_name: row.family_name,
                type_name: row.type_name,
                properties: BTreeMap::new(),
                instance_count: row.instance_count.unwrap_or(0),
            });
        }

        Ok(ModelCatalog::new(types))
    }

    // Empty strings in optional fields behave like absent values downstream.
    fn normalize(&mut self) {
        for t in &mut self.types {
            if t.tag.as_deref() == Some("") {
                t.tag = None;
            }
            if t.family_name.as_deref() == Some("") {
                t.family_name = None;
            }
            if t.type_name.as_deref() == Some("") {
                t.type_name = None;
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_property_value_coercion_order() {
        assert_eq!(PropertyValue::parse("42"), Some(PropertyValue::Int(42)));
        assert_eq!(PropertyValue::parse("0.6"), Some(PropertyValue::Float(0.6)));
        assert_eq!(PropertyValue::parse("0,6"), Some(PropertyValue::Float(0.6)));
        assert_eq!(
            PropertyValue::parse("HA-25"),
            Some(PropertyValue::Text("HA-25".to_string()))
        );
        assert_eq!(PropertyValue::parse(""), None);
        assert_eq!(PropertyValue::parse("   "), None);
    }

    #[test]
    fn test_property_value_numeric_looking_text() {
        // "600 x 600" has a separator-free mix: stays text
        assert_eq!(
            PropertyValue::parse("600 x 600"),
            Some(PropertyValue::Text("600 x 600".to_string()))
        );
        // malformed decimal falls back to text
        assert_eq!(
            PropertyValue::parse("1.2.3"),
            Some(PropertyValue::Text("1.2.3".to_string()))
        );
    }

    #[test]
    fn test_property_value_as_f64() {
        assert_eq!(PropertyValue::Int(5).as_f64(), Some(5.0));
        assert_eq!(PropertyValue::Float(0.6).as_f64(), Some(0.6));
        assert_eq!(PropertyValue::Text("0.6".to_string()).as_f64(), Some(0.6));
        assert_eq!(PropertyValue::Text("0,6".to_string()).as_f64(), Some(0.6));
        assert_eq!(PropertyValue::Text("acero".to_string()).as_f64(), None);
    }

    #[test]
    fn test_budget_item_comparable() {
        let mut item = BudgetItem::new("349637", "", "Pilar rectangular hormigón", 0.0);
        assert!(!item.is_comparable(), "bare structural parent");

        item.unit = "m3".to_string();
        assert!(item.is_comparable());

        let mut item = BudgetItem::new("X1", "", "Linked", 0.0);
        item.model_type_id = Some("guid1".to_string());
        assert!(item.is_comparable());

        let mut item = BudgetItem::new("X2", "", "With props", 0.0);
        item.properties
            .insert("h".to_string(), PropertyValue::Float(0.6));
        assert!(item.is_comparable());
    }

    #[test]
    fn test_budget_catalog_queries() {
        let mut catalog = BudgetCatalog::new();

        let mut a = BudgetItem::new("350147", "m3", "Pilar", 150.0);
        a.model_type_id = Some("guid1".to_string());
        a.family_name = Some("Pilar rectangular hormigón".to_string());
        catalog.items.insert(a.code.clone(), a);

        let b = BudgetItem::new("349637", "", "Capítulo estructura", 0.0);
        catalog.items.insert(b.code.clone(), b);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.comparable_count(), 1);
        assert_eq!(catalog.items_with_cross_reference().len(), 1);
        assert_eq!(catalog.items_by_family("pilar").len(), 1);
        assert_eq!(catalog.items_by_family("jácena").len(), 0);
    }

    #[test]
    fn test_model_catalog_from_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{
                    "id": "guid1",
                    "tag": "350147",
                    "name": "Pilar:600x600",
                    "class_name": "IfcColumnType",
                    "family_name": "Pilar",
                    "type_name": "600x600",
                    "properties": {{"h": 0.6, "Material": "HA-25"}},
                    "instance_count": 12
                }},
                {{
                    "id": "guid2",
                    "tag": "",
                    "name": "Jácena:I-220",
                    "class_name": "IfcBeamType"
                }}
            ]"#
        )
        .unwrap();

        let catalog = ModelCatalog::from_json_file(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);

        let first = &catalog.types[0];
        assert_eq!(first.tag.as_deref(), Some("350147"));
        assert_eq!(first.instance_count, 12);
        assert_eq!(
            first.properties.get("h"),
            Some(&PropertyValue::Float(0.6))
        );
        assert_eq!(
            first.properties.get("Material"),
            Some(&PropertyValue::Text("HA-25".to_string()))
        );

        // empty tag normalized to absent
        assert_eq!(catalog.types[1].tag, None);
        assert_eq!(catalog.types[1].instance_count, 0);
    }

    #[test]
    fn test_model_catalog_from_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "id,tag,name,class_name,family_name,type_name,instance_count"
        )
        .unwrap();
        writeln!(file, "guid1,350147,Pilar:600x600,IfcColumnType,Pilar,600x600,12").unwrap();
        writeln!(file, "guid2,,Jácena:I-220,IfcBeamType,,,").unwrap();

        let catalog = ModelCatalog::from_csv_file(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.types[0].tag.as_deref(), Some("350147"));
        assert_eq!(catalog.types[0].instance_count, 12);
        assert_eq!(catalog.types[1].tag, None);
        assert!(catalog.types[1].properties.is_empty());
    }

    #[test]
    fn test_model_catalog_missing_file() {
        let result = ModelCatalog::from_json_file(Path::new("/nonexistent/types.json"));
        assert!(result.is_err());
    }
}
