use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use table_designer_core::ColumnType;
use table_designer_sqlite::{ApplyOutcome, DesignFile, Designer};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Output format for `show`.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ShowFormat {
    Sql,
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "table-designer")]
#[command(about = "Inspect, design, and apply SQLite table definitions")]
struct Cli {
    /// Log debug output to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List tables with their column counts.
    Tables(TablesArgs),
    /// Print one table's definition as read from the database.
    Show(ShowArgs),
    /// List the primary keys a column could reference.
    FkTargets(FkTargetsArgs),
    /// Apply the tables of a design file to the database.
    Apply(ApplyArgs),
    /// Write every table of the database to a design file.
    Export(ExportArgs),
}

#[derive(Debug, Args)]
struct TablesArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
}

#[derive(Debug, Args)]
struct ShowArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Table to show.
    #[arg(long)]
    table: String,
    /// Output format.
    #[arg(long, default_value = "sql")]
    format: ShowFormat,
}

#[derive(Debug, Args)]
struct FkTargetsArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Name of the referencing column.
    #[arg(long)]
    column: String,
    /// Declared type of the referencing column (e.g. INTEGER, VCHAR(20)).
    #[arg(long = "type")]
    column_type: String,
    /// Table the column belongs to; never offered as a target.
    #[arg(long, default_value = "")]
    exclude: String,
}

#[derive(Debug, Args)]
struct ApplyArgs {
    /// Database file path (created if missing).
    #[arg(long)]
    db: PathBuf,
    /// Design file (.yaml, .yml, or .json).
    #[arg(long)]
    design: PathBuf,
    /// Apply only this table from the design.
    #[arg(long)]
    table: Option<String>,
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Output design file (.yaml, .yml, or .json).
    #[arg(long)]
    output: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!(command = ?cli.command, "parsed arguments");

    let result = match cli.command {
        Command::Tables(args) => run_tables(args),
        Command::Show(args) => run_show(args),
        Command::FkTargets(args) => run_fk_targets(args),
        Command::Apply(args) => run_apply(args),
        Command::Export(args) => run_export(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

fn open(db: &Path) -> Result<Designer, String> {
    Designer::open(db).map_err(|e| format!("Failed to open database '{}': {e}", db.display()))
}

fn run_tables(args: TablesArgs) -> Result<(), String> {
    let designer = open(&args.db)?;
    let registry = designer.registry();
    if registry.is_empty() {
        println!("No tables in '{}'.", args.db.display());
        return Ok(());
    }
    for table in registry.tables() {
        println!("{}\t{} column(s)", table.name(), table.columns().len());
    }
    Ok(())
}

fn run_show(args: ShowArgs) -> Result<(), String> {
    let designer = open(&args.db)?;
    let table = designer
        .registry()
        .get(&args.table)
        .ok_or_else(|| format!("Table '{}' not found in '{}'", args.table, args.db.display()))?;

    let rendered = match args.format {
        ShowFormat::Sql => designer
            .sql_preview(&args.table)
            .map_err(|e| e.to_string())?,
        ShowFormat::Json => serde_json::to_string_pretty(table)
            .map_err(|e| format!("Failed to serialize table: {e}"))?,
        ShowFormat::Yaml => serde_yaml::to_string(table)
            .map_err(|e| format!("Failed to serialize table: {e}"))?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn run_fk_targets(args: FkTargetsArgs) -> Result<(), String> {
    let designer = open(&args.db)?;
    let column_type = ColumnType::parse_declared(&args.column_type);
    let targets = designer
        .registry()
        .fk_targets(&args.column, &column_type, &args.exclude);

    if targets.is_empty() {
        println!(
            "No eligible targets for '{}' {}.",
            args.column,
            column_type.effective_type()
        );
        return Ok(());
    }
    for target in targets {
        println!("{}.{}", target.table, target.column);
    }
    Ok(())
}

fn run_apply(args: ApplyArgs) -> Result<(), String> {
    let design = DesignFile::load(&args.design)
        .map_err(|e| format!("Failed to load design '{}': {e}", args.design.display()))?;

    let names: Vec<String> = match &args.table {
        Some(table) => {
            if !design.tables.iter().any(|t| t.name() == table.as_str()) {
                return Err(format!(
                    "Table '{table}' is not defined in '{}'",
                    args.design.display()
                ));
            }
            vec![table.clone()]
        }
        None => design.tables.iter().map(|t| t.name().to_string()).collect(),
    };

    let mut designer = Designer::create(&args.db)
        .map_err(|e| format!("Failed to open database '{}': {e}", args.db.display()))?;
    designer
        .import(&design)
        .map_err(|e| format!("Invalid design '{}': {e}", args.design.display()))?;

    for name in names {
        let outcome = designer
            .apply(&name)
            .map_err(|e| format!("Failed to apply '{name}': {e}"))?;
        match outcome {
            ApplyOutcome::Created => println!("Created '{name}'."),
            ApplyOutcome::Migrated {
                copied,
                dropped,
                added,
            } => {
                println!("Rebuilt '{name}':");
                println!("  Copied: {}", list_or_none(&copied));
                println!("  Dropped: {}", list_or_none(&dropped));
                println!("  Added: {}", list_or_none(&added));
            }
        }
    }
    Ok(())
}

fn run_export(args: ExportArgs) -> Result<(), String> {
    let designer = open(&args.db)?;
    let design = designer.export();
    design
        .save(&args.output)
        .map_err(|e| format!("Failed to write '{}': {e}", args.output.display()))?;
    println!(
        "Exported {} table(s) to '{}'.",
        design.tables.len(),
        args.output.display()
    );
    Ok(())
}

fn list_or_none(columns: &[String]) -> String {
    if columns.is_empty() {
        "(none)".to_string()
    } else {
        columns.join(", ")
    }
}
