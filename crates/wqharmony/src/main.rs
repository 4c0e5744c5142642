use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wqharmony_core::pipeline;
use wqharmony_core::{ErrorMode, HarmonizeConfig, Rulebook, UnitRegistry};

mod io;

#[derive(Parser, Debug)]
#[command(author, version, about = "Water-quality result harmonization", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harmonize a raw result CSV into a wide table
    Harmonize(HarmonizeArgs),
    /// List the characteristic rules
    Rules,
}

#[derive(Args, Debug)]
struct HarmonizeArgs {
    /// Raw result CSV in the aggregator's result schema
    #[arg(long)]
    input: PathBuf,
    /// Directory for wide.csv, characteristics.csv and report.json
    #[arg(long)]
    out_dir: PathBuf,
    /// TOML configuration (falls back to WQHARMONY_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the configured errors mode: raise, warn or ignore
    #[arg(long)]
    errors: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Harmonize(args) => run_harmonize(args),
        Command::Rules => {
            print_rules();
            Ok(())
        }
    }
}

fn load_config(args: &HarmonizeArgs) -> Result<HarmonizeConfig> {
    dotenvy::dotenv().ok();
    let path = args
        .config
        .clone()
        .or_else(|| std::env::var("WQHARMONY_CONFIG").ok().map(PathBuf::from));
    let mut config = match path {
        Some(path) => HarmonizeConfig::from_path(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => HarmonizeConfig::default(),
    };
    if let Some(mode) = args.errors.as_deref() {
        config.errors = mode.parse::<ErrorMode>()?;
    }
    Ok(config)
}

fn run_harmonize(args: HarmonizeArgs) -> Result<()> {
    let config = load_config(&args)?;
    let input = io::read_csv_table(&args.input)?;
    info!(rows = input.height(), path = %args.input.display(), "loaded input");

    let rulebook = Rulebook::standard();
    let registry = UnitRegistry::standard();
    let output = pipeline::run(&input, &rulebook, &registry, &config)?;

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    io::write_csv_table(&output.wide, &args.out_dir.join("wide.csv"))?;
    io::write_csv_table(
        &output.characteristic_metadata,
        &args.out_dir.join("characteristics.csv"),
    )?;
    let report = serde_json::json!({
        "report": &output.report,
        "units": &output.units,
    });
    fs::write(
        args.out_dir.join("report.json"),
        serde_json::to_string_pretty(&report)?,
    )?;

    let mut table = Table::new();
    table.set_header(vec!["column", "unit", "results"]);
    for (column, count) in &output.report.rows_per_column {
        let unit = output.units.get(column).map(String::as_str).unwrap_or("-");
        table.add_row(vec![column.clone(), unit.to_string(), count.to_string()]);
    }
    println!("{table}");

    let mut flags = Table::new();
    flags.set_header(vec!["qa flag", "count"]);
    for (code, count) in &output.report.flags {
        flags.add_row(vec![code.to_string(), count.to_string()]);
    }
    println!("{flags}");

    info!(
        events = output.report.output_rows,
        out_dir = %args.out_dir.display(),
        "wrote harmonized tables"
    );
    Ok(())
}

fn print_rules() {
    let rulebook = Rulebook::standard();
    let mut table = Table::new();
    table.set_header(vec![
        "characteristic",
        "column(s)",
        "unit",
        "default unit",
        "bases",
    ]);
    for rule in rulebook.rules() {
        let bases = rule
            .bases
            .iter()
            .map(|basis| basis.label)
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            rule.name.to_string(),
            rule.placements().join(", "),
            rule.target_unit.clone().unwrap_or_else(|| "categorical".to_string()),
            rule.default_unit.unwrap_or("-").to_string(),
            bases,
        ]);
    }
    println!("{table}");
}
