// Sample data generator
// Writes a paired demo dataset - a budget file in the BC3-style record format
// and a model catalog JSON - with one seeded discrepancy of every kind, for
// demos and smoke tests.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use conflict_flagger::{ModelType, PropertyValue};

fn main() -> Result<()> {
    let out_dir: PathBuf = env::args().nth(1).unwrap_or_else(|| "sample_data".to_string()).into();
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let budget_path = out_dir.join("presupuesto.bc3");
    let model_path = out_dir.join("modelo.json");

    write_budget_file(&budget_path)?;
    write_model_catalog(&model_path)?;

    println!("🏗️  Sample dataset written");
    println!("  Budget: {}", budget_path.display());
    println!("  Model:  {}", model_path.display());
    println!("\nSeeded discrepancies:");
    println!("  - D-010: quantity 5 budgeted vs 8 modeled");
    println!("  - W-XX/W-99: description match with diverging codes");
    println!("  - 350147: property 'b' differs (0.6 vs 0.65)");
    println!("  - M-770: modeled but never budgeted");
    println!("  - T-NAN: budgeted but never modeled");
    println!("\nTry:");
    println!(
        "  conflict-flagger --budget {} --model {} --phase full --verbose",
        budget_path.display(),
        model_path.display()
    );

    Ok(())
}

/// The budget side, written in the source format's legacy encoding.
fn write_budget_file(path: &std::path::Path) -> Result<()> {
    let content = "\
~V|Conflict Flagger|FIEBDC-3/2020|Sample||ANSI||2||||
~C|E-001#||Estructura y cerramientos|0|010125|0|
~C|350147|u|Pilar rectangular hormigón - 600 x 600 mm|150,50|010125|0|
~X|350147|Tipo IfcGUID\\G-PILAR-600\\Nombre de familia\\Pilar rectangular hormigón\\Nombre de tipo\\600 x 600 mm\\h\\0,6\\b\\0,6\\Material\\HA-25\\|
~C|D-010|u|Puerta de paso una hoja|210,00|010125|0|
~X|D-010|Nombre de familia\\Puerta de paso\\Nombre de tipo\\Una hoja\\|
~C|W-XX|m2|Muro cortina de vidrio estructural|320,00|010125|0|
~C|T-NAN|u|Partida sin modelar|95,00|010125|0|
~X|T-NAN|Material\\Acero galvanizado\\|
~D|E-001#|350147\\1\\12\\D-010\\1\\5\\|
";

    let (encoded, _, _) = encoding_rs::WINDOWS_1252.encode(content);
    fs::write(path, encoded)
        .with_context(|| format!("Failed to write budget file: {}", path.display()))?;
    Ok(())
}

/// The model side, as an extractor would emit it.
fn write_model_catalog(path: &std::path::Path) -> Result<()> {
    let types = vec![
        // Clean identifier match with one property discrepancy (b)
        model_type(
            "G-PILAR-600",
            Some("350147"),
            "Pilar rectangular hormigón:600 x 600 mm",
            "IfcColumnType",
            Some("Pilar rectangular hormigón"),
            Some("600 x 600 mm"),
            12,
            &[
                ("h", PropertyValue::Float(0.6)),
                ("b", PropertyValue::Float(0.65)),
                ("Material", PropertyValue::from("HA-25")),
            ],
        ),
        // Quantity and family-name discrepancies, plus a one-sided width
        model_type(
            "G-PUERTA-1H",
            Some("D-010"),
            "Puerta abatible:Una hoja",
            "IfcDoorType",
            Some("Puerta abatible"),
            Some("Una hoja"),
            8,
            &[("width", PropertyValue::Float(0.9))],
        ),
        // Renamed on one side: only the description still lines up
        model_type(
            "G-MURO-VIDRIO",
            Some("W-99"),
            "Muro cortina de vidrio estructural",
            "IfcCurtainWallType",
            None,
            None,
            1,
            &[],
        ),
        // Modeled but never budgeted
        model_type(
            "G-TECHO-REG",
            Some("M-770"),
            "Falso techo registrable 60x60",
            "IfcCoveringType",
            Some("Falso techo"),
            Some("Registrable 60x60"),
            30,
            &[],
        ),
    ];

    let json = serde_json::to_string_pretty(&types).context("Failed to serialize model catalog")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write model catalog: {}", path.display()))?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn model_type(
    id: &str,
    tag: Option<&str>,
    name: &str,
    class_name: &str,
    family_name: Option<&str>,
    type_name: Option<&str>,
    instance_count: u32,
    properties: &[(&str, PropertyValue)],
) -> ModelType {
    let mut props = BTreeMap::new();
    for (key, value) in properties {
        props.insert(key.to_string(), value.clone());
    }
    ModelType {
        id: id.to_string(),
        tag: tag.map(String::from),
        name: name.to_string(),
        class_name: class_name.to_string(),
        family_name: family_name.map(String::from),
        type_name: type_name.map(String::from),
        properties: props,
        instance_count,
    }
}
