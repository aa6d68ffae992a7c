// ⚙️ Phase Configuration - Analysis depth as data
// A phase is a plain configuration value consumed by the one matcher/comparator
// implementation. New phases are added by constructing a new PhaseConfig, not
// by subclassing or branching on phase identity.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

// ============================================================================
// PHASE SELECTION
// ============================================================================

/// Built-in analysis phases selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Fast triage: identifiers, quantities, units only
    Quick,
    /// Exhaustive audit: names and all properties
    Full,
}

impl Phase {
    pub fn config(self) -> PhaseConfig {
        match self {
            Phase::Quick => PhaseConfig::quick(),
            Phase::Full => PhaseConfig::full(),
        }
    }
}

// ============================================================================
// PROPERTY SCOPE
// ============================================================================

/// Which property names the comparator walks on matched pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyScope {
    /// No property comparison at all
    None,
    /// The curated dimensional/material/thermal list only
    Spatial,
    /// Curated list plus every key present verbatim on both sides
    All,
}

// ============================================================================
// PHASE CONFIG
// ============================================================================

/// Immutable configuration value controlling comparison depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseConfig {
    /// Human-readable name for display
    pub name: String,

    /// Deep property comparison on matched pairs
    pub check_properties: bool,

    /// Family/type name comparison on matched pairs
    pub check_names: bool,

    /// Allowed difference for quantity comparison (inclusive boundary)
    pub quantity_tolerance: f64,

    pub property_scope: PropertyScope,
}

impl PhaseConfig {
    /// Fast validation of codes and quantities, ideal for initial review.
    pub fn quick() -> Self {
        PhaseConfig {
            name: "Códigos y cantidades".to_string(),
            check_properties: false,
            check_names: false,
            quantity_tolerance: 0.1,
            property_scope: PropertyScope::None,
        }
    }

    /// Exhaustive comparison of every property, for a full audit.
    pub fn full() -> Self {
        PhaseConfig {
            name: "Análisis completo".to_string(),
            check_properties: true,
            check_names: true,
            quantity_tolerance: 0.01,
            property_scope: PropertyScope::All,
        }
    }

    /// Same configuration with a different quantity tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.quantity_tolerance = tolerance;
        self
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quick_preset() {
        let config = PhaseConfig::quick();
        assert!(!config.check_properties);
        assert!(!config.check_names);
        assert_eq!(config.quantity_tolerance, 0.1);
        assert_eq!(config.property_scope, PropertyScope::None);
    }

    #[test]
    fn test_full_preset() {
        let config = PhaseConfig::full();
        assert!(config.check_properties);
        assert!(config.check_names);
        assert_eq!(config.quantity_tolerance, 0.01);
        assert_eq!(config.property_scope, PropertyScope::All);
    }

    #[test]
    fn test_phase_selection() {
        assert_eq!(Phase::Quick.config(), PhaseConfig::quick());
        assert_eq!(Phase::Full.config(), PhaseConfig::full());
    }

    #[test]
    fn test_custom_phase_is_just_a_value() {
        // A new preset needs no new code path: construct and hand it over.
        let strict_quantities = PhaseConfig {
            name: "Cantidades estrictas".to_string(),
            check_properties: false,
            check_names: false,
            quantity_tolerance: 0.001,
            property_scope: PropertyScope::None,
        };
        assert_eq!(strict_quantities.quantity_tolerance, 0.001);

        let relaxed = PhaseConfig::full().with_tolerance(0.5);
        assert_eq!(relaxed.quantity_tolerance, 0.5);
        assert!(relaxed.check_properties);
    }
}
