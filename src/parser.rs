// 🧾 Budget Record Parser - FIEBDC/BC3-style cost budget files
// Line-oriented records tagged ~V / ~C / ~X / ~D, pipe-separated fields,
// backslash-separated sub-tokens. Legacy single-byte encoding, decoded
// best-effort (never fatal).

use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::catalog::{BudgetCatalog, BudgetItem, PropertyValue};

// ============================================================================
// ERRORS AND WARNINGS
// ============================================================================

/// Fatal parser failures. Everything below file level is a `ParseWarning`.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("budget file not found: {0}")]
    NotFound(PathBuf),

    #[error("error reading budget file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A recoverable, line-level parse issue. Collected, never thrown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub line: usize,
    pub message: String,
}

impl ParseWarning {
    fn new(line: usize, message: impl Into<String>) -> Self {
        ParseWarning {
            line,
            message: message.into(),
        }
    }
}

/// Result of parsing a budget file: the catalog plus accumulated warnings.
#[derive(Debug, Clone, Default)]
pub struct BudgetParseResult {
    pub catalog: BudgetCatalog,
    pub warnings: Vec<ParseWarning>,
}

// ============================================================================
// RECORD GRAMMAR
// ============================================================================

/// Property names hoisted to named attributes instead of the generic map.
pub const CROSS_REFERENCE_KEY: &str = "Tipo IfcGUID";
pub const FAMILY_NAME_KEY: &str = "Nombre de familia";
pub const TYPE_NAME_KEY: &str = "Nombre de tipo";

static RECORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^~([A-Z])\|(.*)$").expect("record pattern is valid"));

/// Record types recognized by their `~X|` tag letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKind {
    /// Format/version banner (informational only)
    Version,
    /// Item definition: code, unit, description, price
    Component,
    /// Extended properties attached to a previously defined code
    Extended,
    /// Decomposition: parent code plus (child, factor, quantity) triples
    Decomposition,
}

impl RecordKind {
    fn from_letter(letter: char) -> Option<RecordKind> {
        match letter {
            'V' => Some(RecordKind::Version),
            'C' => Some(RecordKind::Component),
            'X' => Some(RecordKind::Extended),
            'D' => Some(RecordKind::Decomposition),
            _ => None,
        }
    }
}

// ============================================================================
// PARSER
// ============================================================================

/// Parser for BC3-style budget record files.
pub struct BudgetParser {
    encoding: &'static Encoding,
}

impl BudgetParser {
    /// Parser with the format's usual legacy encoding.
    pub fn new() -> Self {
        BudgetParser {
            encoding: encoding_rs::WINDOWS_1252,
        }
    }

    /// Parser for a caller-supplied source encoding.
    pub fn with_encoding(encoding: &'static Encoding) -> Self {
        BudgetParser { encoding }
    }

    /// Parse a budget file into a catalog.
    ///
    /// A missing or unreadable file is the only fatal outcome; malformed
    /// records are recorded as warnings and skipped, so a single bad line can
    /// never abort a multi-thousand-line parse.
    pub fn parse(&self, path: &Path) -> Result<BudgetParseResult, ParserError> {
        if !path.exists() {
            return Err(ParserError::NotFound(path.to_path_buf()));
        }

        let bytes = fs::read(path).map_err(|source| ParserError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        // Best-effort decode: invalid bytes are replaced, never fatal.
        let (content, _, _) = self.encoding.decode(&bytes);
        Ok(self.parse_str(&content))
    }

    /// Parse budget records from already-decoded text.
    pub fn parse_str(&self, content: &str) -> BudgetParseResult {
        let mut warnings = Vec::new();

        // Collect recognized records first, then process by kind: all ~C
        // records establish the code universe before any ~X property or ~D
        // hierarchy record refers into it.
        let mut records: Vec<(usize, RecordKind, &str)> = Vec::new();
        for (idx, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }
            let Some(caps) = RECORD_PATTERN.captures(line) else {
                continue;
            };
            let letter = caps.get(1).and_then(|m| m.as_str().chars().next());
            let data = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            match letter.and_then(RecordKind::from_letter) {
                Some(kind) => records.push((idx + 1, kind, data)),
                None => debug!(line = idx + 1, "unrecognized record tag, skipping"),
            }
        }

        let mut catalog = BudgetCatalog::new();

        for &(line, kind, data) in &records {
            if kind == RecordKind::Version {
                catalog.version = parse_version(data);
            } else if kind == RecordKind::Component {
                if let Some(item) = parse_component(data, line, &mut warnings) {
                    if catalog.items.contains_key(&item.code) {
                        warnings.push(ParseWarning::new(
                            line,
                            format!("duplicate code '{}', keeping latest definition", item.code),
                        ));
                    }
                    catalog.items.insert(item.code.clone(), item);
                }
            }
        }

        for &(line, kind, data) in &records {
            if kind == RecordKind::Extended {
                parse_extended(data, line, &mut catalog, &mut warnings);
            }
        }

        for &(line, kind, data) in &records {
            if kind == RecordKind::Decomposition {
                parse_decomposition(data, line, &mut catalog, &mut warnings);
            }
        }

        link_hierarchy(&mut catalog);

        BudgetParseResult { catalog, warnings }
    }
}

impl Default for BudgetParser {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// RECORD PARSERS
// ============================================================================

/// `~V|Owner|Format|Program|...` — keep the format field when present.
fn parse_version(data: &str) -> String {
    let parts: Vec<&str> = data.split('|').collect();
    if parts.len() >= 2 && !parts[1].is_empty() {
        parts[1].to_string()
    } else {
        parts.first().unwrap_or(&"").to_string()
    }
}

/// Trim surrounding whitespace and the trailing `#` composite marker.
fn normalize_code(raw: &str) -> String {
    raw.trim().trim_end_matches('#').trim_end().to_string()
}

/// Comma is the decimal separator in the source format.
fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().replace(',', ".").parse::<f64>().ok()
}

/// `~C|Code#|Unit|Description|Price|Date|Type|`
fn parse_component(data: &str, line: usize, warnings: &mut Vec<ParseWarning>) -> Option<BudgetItem> {
    let parts: Vec<&str> = data.split('|').collect();
    if parts.len() < 4 {
        warnings.push(ParseWarning::new(line, "incomplete component record"));
        return None;
    }

    let code = normalize_code(parts[0]);
    if code.is_empty() {
        warnings.push(ParseWarning::new(line, "component record missing code"));
        return None;
    }

    let unit = parts[1].trim();
    let description = parts[2].trim();
    // Unparseable price defaults to 0.0, never raises
    let price = parse_decimal(parts[3]).unwrap_or(0.0);

    Some(BudgetItem::new(&code, unit, description, price))
}

/// `~X|Code|PropName\PropValue\PropName\PropValue\...|`
///
/// Properties only attach to already-known codes; unknown codes are
/// silently ignored.
fn parse_extended(
    data: &str,
    line: usize,
    catalog: &mut BudgetCatalog,
    warnings: &mut Vec<ParseWarning>,
) {
    let parts: Vec<&str> = data.split('|').collect();
    if parts.len() < 2 {
        warnings.push(ParseWarning::new(line, "incomplete extended record"));
        return;
    }

    let code = parts[0].trim();
    let Some(item) = catalog.items.get_mut(code) else {
        debug!(line, code, "extended record for unknown code, skipping");
        return;
    };

    let tokens: Vec<&str> = parts[1].split('\\').collect();
    let mut i = 0;
    while i + 1 < tokens.len() {
        let key = tokens[i].trim();
        let value = tokens[i + 1].trim();

        if !key.is_empty() {
            match key {
                CROSS_REFERENCE_KEY => item.model_type_id = Some(value.to_string()),
                FAMILY_NAME_KEY => item.family_name = Some(value.to_string()),
                TYPE_NAME_KEY => item.type_name = Some(value.to_string()),
                _ => {
                    if let Some(parsed) = PropertyValue::parse(value) {
                        item.properties.insert(key.to_string(), parsed);
                    }
                }
            }
        }

        i += 2;
    }
}

/// `~D|ParentCode#|ChildCode\Factor\Quantity\ChildCode\Factor\Quantity\...|`
///
/// Edges are recorded even when the child code has no definition; such an
/// edge stays structural and never feeds property lookups.
fn parse_decomposition(
    data: &str,
    line: usize,
    catalog: &mut BudgetCatalog,
    warnings: &mut Vec<ParseWarning>,
) {
    let parts: Vec<&str> = data.split('|').collect();
    if parts.len() < 2 {
        warnings.push(ParseWarning::new(line, "incomplete decomposition record"));
        return;
    }

    let parent_code = normalize_code(parts[0]);
    if parent_code.is_empty() {
        warnings.push(ParseWarning::new(
            line,
            "decomposition record missing parent code",
        ));
        return;
    }

    let tokens: Vec<&str> = parts[1].split('\\').collect();
    let mut children: Vec<(String, f64)> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let child_code = tokens[i].trim();
        if child_code.is_empty() {
            i += 1;
            continue;
        }

        // (code, factor, quantity) — quantity at i+2, structural default 1.0
        let quantity = tokens
            .get(i + 2)
            .and_then(|q| parse_decimal(q))
            .unwrap_or(1.0);

        children.push((child_code.to_string(), quantity));
        i += 3;
    }

    if !children.is_empty() {
        catalog.hierarchy.insert(parent_code, children);
    }
}

/// Populate `children`/`parent_code`/`quantity` from the hierarchy edges once
/// all records have been read.
fn link_hierarchy(catalog: &mut BudgetCatalog) {
    let hierarchy = catalog.hierarchy.clone();
    for (parent_code, children) in &hierarchy {
        if !catalog.items.contains_key(parent_code) {
            continue;
        }
        if let Some(parent) = catalog.items.get_mut(parent_code) {
            parent.children = children.clone();
        }
        for (child_code, quantity) in children {
            if let Some(child) = catalog.items.get_mut(child_code) {
                child.parent_code = Some(parent_code.clone());
                child.quantity = *quantity;
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

    const SAMPLE: &str = "\
~V|RIB Spain|FIEBDC-3/2020|Presto 25.01||ANSI||2||||
~C|350147|m3|Pilar rectangular hormigón - 600 x 600 mm|150,50|181225|0|
~X|350147|Tipo IfcGUID\\2yt6D8WIv1pOA$7fKuaiRG\\Nombre de familia\\Pilar rectangular hormigón\\Nombre de tipo\\600 x 600 mm\\h\\0.6\\b\\0.6\\|
~C|352900|m|JACENA I - I-220|0|181225|0|
~X|352900|Tipo IfcGUID\\2yt6D8WIv1pOA$7fKualEN\\Nombre de familia\\JACENA I\\Nombre de tipo\\I-220\\ALTURA JACENA\\1.2\\Material\\S275\\|
~C|349637#||Pilar rectangular hormigón|0|181225|0|
~D|349637#|350147\\1\\63,62\\|
";

    fn parse_sample() -> BudgetParseResult {
        BudgetParser::new().parse_str(SAMPLE)
    }

    #[test]
    fn test_parse_version_banner() {
        let result = parse_sample();
        assert_eq!(result.catalog.version, "FIEBDC-3/2020");
    }

    #[test]
    fn test_parse_component() {
        let result = parse_sample();

        let item = result.catalog.get("350147").expect("item parsed");
        assert_eq!(item.code, "350147");
        assert_eq!(item.unit, "m3");
        assert!(item.description.contains("Pilar"));
        assert_eq!(item.price, 150.50);
    }

    #[test]
    fn test_parse_extended_hoists_known_properties() {
        let result = parse_sample();

        let item = result.catalog.get("350147").unwrap();
        assert_eq!(item.model_type_id.as_deref(), Some("2yt6D8WIv1pOA$7fKuaiRG"));
        assert_eq!(item.family_name.as_deref(), Some("Pilar rectangular hormigón"));
        assert_eq!(item.type_name.as_deref(), Some("600 x 600 mm"));

        // hoisted names never land in the generic map
        assert!(!item.properties.contains_key(CROSS_REFERENCE_KEY));
        assert_eq!(item.properties.get("h"), Some(&PropertyValue::Float(0.6)));
        assert_eq!(item.properties.get("b"), Some(&PropertyValue::Float(0.6)));
    }

    #[test]
    fn test_parse_extended_type_coercion() {
        let result = parse_sample();

        let beam = result.catalog.get("352900").unwrap();
        assert_eq!(
            beam.properties.get("ALTURA JACENA"),
            Some(&PropertyValue::Float(1.2))
        );
        assert_eq!(
            beam.properties.get("Material"),
            Some(&PropertyValue::Text("S275".to_string()))
        );
    }

    #[test]
    fn test_parse_decomposition() {
        let result = parse_sample();

        let children = result.catalog.hierarchy.get("349637").expect("edges kept");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].0, "350147");
        assert_eq!(children[0].1, 63.62);
    }

    #[test]
    fn test_hierarchy_linking() {
        let result = parse_sample();

        let parent = result.catalog.get("349637").unwrap();
        assert_eq!(parent.children.len(), 1);
        assert_eq!(parent.children[0].0, "350147");

        let child = result.catalog.get("350147").unwrap();
        assert_eq!(child.parent_code.as_deref(), Some("349637"));
        assert_eq!(child.quantity, 63.62);
    }

    #[test]
    fn test_structural_parent_not_comparable() {
        let result = parse_sample();

        let parent = result.catalog.get("349637").unwrap();
        assert!(!parent.is_comparable());
        assert_eq!(result.catalog.comparable_count(), 2);
    }

    #[test]
    fn test_codes_non_empty_and_unique() {
        let result = parse_sample();

        for (key, item) in &result.catalog.items {
            assert!(!item.code.is_empty());
            assert_eq!(key, &item.code);
        }
    }

    #[test]
    fn test_record_order_in_file_does_not_matter() {
        // ~X before the ~C that defines its code: the pass order still
        // attaches the property, since all ~C records are read first.
        let content = "\
~X|late|Material\\acero\\|
~C|late|u|Defined later|10|
";
        let result = BudgetParser::new().parse_str(content);
        let item = result.catalog.get("late").unwrap();
        assert_eq!(
            item.properties.get("Material"),
            Some(&PropertyValue::Text("acero".to_string()))
        );
    }

    #[test]
    fn test_malformed_records_become_warnings() {
        let content = "\
~V|Test|
~C|incomplete
~C||no_code|desc|0|
~X|nonexistent_code|prop\\value\\|
~C|valid|m2|Valid Element|100|
";
        let result = BudgetParser::new().parse_str(content);

        assert!(result.catalog.get("valid").is_some());
        assert_eq!(result.catalog.len(), 1);

        // incomplete ~C and code-less ~C warned; unknown ~X code is silent
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings.iter().any(|w| w.line == 2));
        assert!(result.warnings.iter().any(|w| w.line == 3));
    }

    #[test]
    fn test_duplicate_code_keeps_latest() {
        let content = "\
~C|dup|u|First|1|
~C|dup|u|Second|2|
";
        let result = BudgetParser::new().parse_str(content);

        assert_eq!(result.catalog.len(), 1);
        assert_eq!(result.catalog.get("dup").unwrap().description, "Second");
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_unparseable_price_defaults_to_zero() {
        let content = "~C|p1|u|Item|not-a-number|\n";
        let result = BudgetParser::new().parse_str(content);

        assert_eq!(result.catalog.get("p1").unwrap().price, 0.0);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_decomposition_edge_with_unknown_child() {
        let content = "\
~C|parent#||Chapter|0|
~D|parent#|ghost\\1\\5\\|
";
        let result = BudgetParser::new().parse_str(content);

        // structural edge recorded...
        let children = result.catalog.hierarchy.get("parent").unwrap();
        assert_eq!(children[0], ("ghost".to_string(), 5.0));
        assert_eq!(result.catalog.get("parent").unwrap().children.len(), 1);
        // ...but no item was conjured for it
        assert!(result.catalog.get("ghost").is_none());
    }

    #[test]
    fn test_decomposition_quantity_default() {
        let content = "\
~C|p#||Chapter|0|
~C|c|u|Child|1|
~D|p#|c\\1\\bad\\|
";
        let result = BudgetParser::new().parse_str(content);
        assert_eq!(result.catalog.get("c").unwrap().quantity, 1.0);
    }

    #[test]
    fn test_empty_input() {
        let result = BudgetParser::new().parse_str("");
        assert!(result.catalog.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_file_not_found() {
        let err = BudgetParser::new()
            .parse(Path::new("/nonexistent/budget.bc3"))
            .unwrap_err();
        assert!(matches!(err, ParserError::NotFound(_)));
    }

    #[test]
    fn test_legacy_encoding_decoded_best_effort() {
        // "hormigón" in the source single-byte encoding (ó = 0xF3)
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"~C|e1|m3|hormig\xf3n|10|\n").unwrap();

        let result = BudgetParser::new().parse(file.path()).unwrap();
        assert_eq!(result.catalog.get("e1").unwrap().description, "hormigón");
    }
}
