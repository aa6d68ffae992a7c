// Conflict Flagger CLI
// Compare a building-model type catalog with a cost-budget file and flag
// discrepancies. Exit code 2 when ERROR-severity conflicts were found.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use conflict_flagger::{
    filter_budget_catalog, filter_model_catalog, BudgetParser, Comparator, ComparisonResult,
    Matcher, ModelCatalog, Phase, ReconciliationResult, RunReport, Severity,
};

#[derive(Parser)]
#[command(name = "conflict-flagger")]
#[command(about = "Compare a building-model catalog with a cost budget and flag differences")]
#[command(version)]
struct Cli {
    /// Path to the budget file (BC3-style records)
    #[arg(long)]
    budget: PathBuf,

    /// Path to the model catalog (extractor output, .json or .csv)
    #[arg(long)]
    model: PathBuf,

    /// Analysis phase: quick (codes/quantities) or full (all properties)
    #[arg(long, value_enum, default_value_t = Phase::Full)]
    phase: Phase,

    /// Override the phase's quantity tolerance
    #[arg(long)]
    tolerance: Option<f64>,

    /// Disable fallback name-based matching
    #[arg(long)]
    no_name_matching: bool,

    /// Disable description-similarity matching
    #[arg(long)]
    no_description_matching: bool,

    /// Minimum similarity score a description match must reach
    #[arg(long, default_value_t = 0.5)]
    similarity_threshold: f64,

    /// Drop non-comparable entries (views, sheets, rooms) before matching
    #[arg(long)]
    filter_ignored: bool,

    /// Write a JSON run report to this path
    #[arg(long)]
    json: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only print the conflict count
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    if !cli.quiet {
        println!("📂 Budget file: {}", cli.budget.display());
        println!("📂 Model file:  {}", cli.model.display());
        println!("🔧 Phase:       {}", cli.phase.config().name);
        println!("\nProcessing...");
    }

    // 1. Parse the budget file
    let parse_result = BudgetParser::new()
        .parse(&cli.budget)
        .context("Failed to parse budget file")?;
    if !cli.quiet && !parse_result.warnings.is_empty() {
        println!(
            "⚠️  {} parse warnings (bad lines were skipped)",
            parse_result.warnings.len()
        );
        if cli.verbose {
            for warning in &parse_result.warnings {
                println!("    line {}: {}", warning.line, warning.message);
            }
        }
    }
    let mut budget = parse_result.catalog;

    // 2. Load the model catalog (extractor output, consumed as-is)
    let mut model = load_model_catalog(&cli.model)?;

    // 3. Optional pre-matching filters
    if cli.filter_ignored {
        let before = (model.len(), budget.len());
        model = filter_model_catalog(&model, &[]);
        budget = filter_budget_catalog(&budget, &[]);
        if !cli.quiet {
            println!(
                "🚫 Filtered {} model / {} budget non-comparable entries",
                before.0 - model.len(),
                before.1 - budget.len()
            );
        }
    }

    // 4. Match + compare
    let matcher = Matcher {
        match_by_name: !cli.no_name_matching,
        match_by_description: !cli.no_description_matching,
        similarity_threshold: cli.similarity_threshold,
    };
    let reconciliation = matcher.reconcile(&model, &budget);

    let mut config = cli.phase.config();
    if let Some(tolerance) = cli.tolerance {
        config = config.with_tolerance(tolerance);
    }
    let comparison = Comparator::new().compare(&reconciliation, &config);

    // 5. Optional JSON run report
    if let Some(json_path) = &cli.json {
        let report = RunReport::build(&reconciliation, &comparison, &config)
            .with_input_files(&cli.budget, &cli.model)?;
        report.write_json(json_path)?;
        if !cli.quiet {
            println!("💾 JSON report: {}", json_path.display());
        }
    }

    // 6. Summary
    if cli.quiet {
        println!("{}", comparison.conflicts.len());
    } else {
        print_summary(&reconciliation, &comparison, cli.verbose);
    }

    if comparison.error_count() > 0 {
        std::process::exit(2);
    }
    Ok(())
}

fn load_model_catalog(path: &Path) -> Result<ModelCatalog> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "csv" => ModelCatalog::from_csv_file(path),
        "json" => ModelCatalog::from_json_file(path),
        other => bail!(
            "Unsupported model catalog format '{}' (expected .json or .csv): {}",
            other,
            path.display()
        ),
    }
}

fn print_summary(
    reconciliation: &ReconciliationResult,
    comparison: &ComparisonResult,
    verbose: bool,
) {
    println!("\n{}", "=".repeat(60));
    println!("MODEL-BUDGET COMPARISON RESULTS");
    println!("{}", "=".repeat(60));

    println!("\n📊 MATCHING SUMMARY");
    println!("  Total model types:   {}", reconciliation.total_model_types);
    println!("  Total budget items:  {}", reconciliation.total_budget_items);
    println!("  Matched:             {}", reconciliation.matched.len());
    println!(
        "  Model only:          {} (not budgeted)",
        reconciliation.model_only.len()
    );
    println!(
        "  Budget only:         {} (not modeled)",
        reconciliation.budget_only.len()
    );
    println!("  Match rate:          {:.1}%", reconciliation.match_rate());

    println!("\n🔍 CONFLICT SUMMARY");
    println!("  Total conflicts:     {}", comparison.conflicts.len());
    println!("  🔴 Errors:           {}", comparison.error_count());
    println!("  🟡 Warnings:         {}", comparison.warning_count());
    println!("  Property mismatches: {}", comparison.property_mismatches);
    println!("  Codes affected:      {}", comparison.total_with_conflicts);

    if verbose && !comparison.conflicts.is_empty() {
        println!("\n📝 TOP CONFLICTS:");
        for conflict in comparison.conflicts.iter().take(10) {
            let icon = match conflict.severity {
                Severity::Error => "🔴",
                Severity::Warning => "🟡",
                Severity::Info => "🔵",
            };
            println!("  {} {}", icon, conflict);
        }
        if comparison.conflicts.len() > 10 {
            println!("  ... and {} more", comparison.conflicts.len() - 10);
        }
    }

    println!("\n{}", "=".repeat(60));
}
