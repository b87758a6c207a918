//! rqb: build, preview and run SELECT queries from the command line
//!
//! # Usage
//!
//! ```bash
//! # Show the SQL a builder state produces
//! rqb --table events -c 'COUNT(id)' -w "status = 'ok'" -g status --dry-run
//!
//! # Run it against a database
//! rqb --table events -w 'host IN ($hosts)' --var hosts=a,b \
//!     --database-url sqlite://metrics.db
//!
//! # Hand-written SQL with time macros
//! rqb --query-file panel.sql --from 2024-01-01T00:00:00Z --to now
//!
//! # Browse the schema
//! rqb tables
//! rqb columns events
//! ```

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use rqb::config::Config;
use rqb::macros::interval_ms;
use rqb::prelude::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_RANGE_SECONDS: i64 = 6 * 60 * 60;

#[derive(Parser)]
#[command(name = "rqb")]
#[command(version)]
#[command(about = "Visual SQL query builder backend", long_about = None)]
#[command(after_help = "EXAMPLES:
    rqb --table events -c id -c 'MAX(cpu)' -g host -o 'host desc' --limit 10 --dry-run
    rqb --table events -w 'host IN ($hosts)' --var hosts=a,b
    rqb --query-file panel.sql --from 2024-01-01T00:00:00Z --to now
    rqb columns events")]
struct Cli {
    /// Table to select from
    #[arg(short, long)]
    table: Option<String>,

    /// Column to select: `name` or `AGG(name)`
    #[arg(short = 'c', long = "column")]
    columns: Vec<String>,

    /// Filter: `column OP value`
    #[arg(short = 'w', long = "where")]
    conditions: Vec<String>,

    /// Column to group by
    #[arg(short = 'g', long = "group-by")]
    group_by: Vec<String>,

    /// Sort: `column [ASC|DESC]`
    #[arg(short = 'o', long = "order-by")]
    order_by: Vec<String>,

    #[arg(long)]
    limit: Option<String>,

    #[arg(long)]
    offset: Option<String>,

    /// Run hand-written SQL from a file instead of the builder
    #[arg(long, conflicts_with = "model")]
    query_file: Option<PathBuf>,

    /// Run a saved query record (JSON)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Dashboard variable: `name=value`, or `name=a,b` for a multi-value
    #[arg(long = "var")]
    vars: Vec<String>,

    /// Range start: RFC3339, epoch seconds or `now`
    #[arg(long)]
    from: Option<String>,

    /// Range end: RFC3339, epoch seconds or `now`
    #[arg(long)]
    to: Option<String>,

    /// Query interval for `$__interval`, e.g. `30s`
    #[arg(long, default_value = "1m")]
    interval: String,

    /// Double single quotes inside quoted filter values
    #[arg(long)]
    escape_literals: bool,

    /// Don't execute, just show the generated SQL
    #[arg(short, long)]
    dry_run: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Config file (defaults to ./rqb.toml, then the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database connection URL
    #[arg(long, env = "RQB_DATABASE_URL")]
    database_url: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List tables
    Tables,
    /// List the columns of a table
    Columns {
        table: String,
    },
    /// Show the macro reference
    Macros,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "rqb=debug" } else { "rqb=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Some(Commands::Macros) => {
            show_macros();
            Ok(())
        }
        Some(Commands::Tables) => list_tables(&cli).await,
        Some(Commands::Columns { table }) => list_columns(&cli, table).await,
        None => run_query(&cli).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("failed to load config")?;

    if let Some(url) = &cli.database_url {
        config.datasource.url = Some(url.clone());
    }
    if cli.escape_literals {
        config.query.escape_literals = true;
    }

    Ok(config)
}

async fn connect(config: &Config) -> anyhow::Result<Datasource> {
    if config.datasource.url.is_none() {
        bail!("no database URL. Use --database-url, set RQB_DATABASE_URL or add one to rqb.toml");
    }

    let db = Datasource::connect(&config.datasource).await?;
    Ok(db)
}

async fn list_tables(cli: &Cli) -> anyhow::Result<()> {
    let db = connect(&load_config(cli)?).await?;

    let tables = db.try_list_tables().await?;
    if tables.is_empty() {
        println!("{}", "(no tables)".dimmed());
    }
    for table in tables {
        println!("{}", table.cyan());
    }

    Ok(())
}

async fn list_columns(cli: &Cli, table: &str) -> anyhow::Result<()> {
    let db = connect(&load_config(cli)?).await?;

    let columns = db.try_list_columns(table).await?;
    if columns.is_empty() {
        println!("{}", "(no columns)".dimmed());
        return Ok(());
    }

    let width = columns.iter().map(|c| c.name.len()).max().unwrap_or(0);
    for column in columns {
        let name = format!("{:width$}", column.name, width = width);
        println!("{}  {}", name.white().bold(), column.data_type.dimmed());
    }

    Ok(())
}

async fn run_query(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let model = build_model(cli, &config)?;
    let ctx = build_context(cli, &config)?;

    if cli.verbose && model.editor_mode == EditorMode::Builder {
        println!("{}", "Builder SQL:".dimmed());
        println!("{}", model.to_sql_with(ctx.literals).yellow());
        println!();
    }

    let sql = ctx.prepare(&model)?;

    if cli.dry_run || config.datasource.url.is_none() {
        println!("{}", "Generated SQL:".green().bold());
        println!("{}", sql.white());

        if config.datasource.url.is_none() && !cli.dry_run {
            println!();
            println!(
                "{}",
                "⚠ No database URL. Use --database-url or set RQB_DATABASE_URL".yellow()
            );
        }
        return Ok(());
    }

    let db = connect(&config).await?;
    let frame = db.query(&model, &ctx).await?;
    format_output(&frame, &cli.format)?;

    Ok(())
}

/// A saved record is used as-is. Otherwise the query takes its time columns
/// and format from the config.
fn build_model(cli: &Cli, config: &Config) -> anyhow::Result<QueryModel> {
    if let Some(path) = &cli.model {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return serde_json::from_str(&content)
            .with_context(|| format!("invalid query record in {}", path.display()));
    }

    let mut model = if let Some(path) = &cli.query_file {
        let sql = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        QueryModel::code(sql)
    } else {
        let Some(table) = &cli.table else {
            bail!("nothing to run. Pass --table, --query-file or --model (see --help)");
        };
        QueryModel::builder(build_state(cli, table)?)
    };

    model.time_columns = config.query.time_columns.clone();
    model.format = config.query.format;
    Ok(model)
}

fn build_state(cli: &Cli, table: &str) -> rqb::Result<BuilderState> {
    let mut state = BuilderState::new(table);

    for column in &cli.columns {
        state.columns.push(parse_column(column)?);
    }
    for condition in &cli.conditions {
        state.where_clause.push(parse_condition(condition)?);
    }
    for order in &cli.order_by {
        state.order_by.push(parse_order(order)?);
    }
    state.group_by = cli.group_by.clone();
    state.limit = cli.limit.clone().unwrap_or_default();
    state.offset = cli.offset.clone().unwrap_or_default();

    Ok(state)
}

fn build_context(cli: &Cli, config: &Config) -> anyhow::Result<QueryContext> {
    let now = Utc::now();
    let to = match &cli.to {
        Some(s) => parse_instant(s, now)?,
        None => now,
    };
    let from = match &cli.from {
        Some(s) => parse_instant(s, now)?,
        None => to - chrono::Duration::seconds(DEFAULT_RANGE_SECONDS),
    };

    let mut ctx = QueryContext::new(TimeRange::new(from, to));
    ctx.literals = config.query.literal_mode();

    ctx.interval_ms = interval_ms(&cli.interval)
        .with_context(|| format!("invalid interval: {}", cli.interval))?;

    for var in &cli.vars {
        let (name, value) = parse_var(var)?;
        ctx.vars.insert(name, value);
    }

    Ok(ctx)
}

fn parse_instant(s: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    if s.eq_ignore_ascii_case("now") {
        return Ok(now);
    }
    if let Ok(epoch) = s.parse::<i64>() {
        return DateTime::from_timestamp(epoch, 0)
            .with_context(|| format!("timestamp out of range: {}", s));
    }

    let parsed = DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("invalid time '{}': expected RFC3339, epoch seconds or now", s))?;
    Ok(parsed.with_timezone(&Utc))
}

fn parse_var(s: &str) -> anyhow::Result<(String, VariableValue)> {
    let Some((name, value)) = s.split_once('=') else {
        bail!("invalid --var '{}': expected name=value", s);
    };

    let name = name.trim().trim_start_matches('$').to_string();
    if name.is_empty() {
        bail!("invalid --var '{}': empty name", s);
    }

    let value = if value.contains(',') {
        VariableValue::Multi(value.split(',').map(|v| v.trim().to_string()).collect())
    } else {
        VariableValue::Single(value.to_string())
    };

    Ok((name, value))
}

fn format_output(frame: &Frame, format: &OutputFormat) -> anyhow::Result<()> {
    if frame.is_empty() {
        println!("{}", "(no results)".dimmed());
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(frame)?);
        }
        OutputFormat::Table => {
            let columns = frame.column_names();
            let rows: Vec<Vec<String>> = (0..frame.len())
                .map(|i| frame.row(i).iter().map(val_to_string).collect())
                .collect();

            let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
            for row in &rows {
                for (w, cell) in widths.iter_mut().zip(row) {
                    *w = (*w).max(cell.len());
                }
            }

            let header: Vec<String> = columns
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:width$}", c, width = w))
                .collect();
            println!("{}", header.join(" │ ").white().bold());

            let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
            println!("{}", sep.join("─┼─").dimmed());

            for row in &rows {
                let cells: Vec<String> = row
                    .iter()
                    .zip(&widths)
                    .map(|(v, w)| format!("{:width$}", v, width = w))
                    .collect();
                println!("{}", cells.join(" │ "));
            }

            println!();
            println!("{} row(s) returned", rows.len().to_string().cyan());
        }
    }

    Ok(())
}

fn val_to_string(val: &serde_json::Value) -> String {
    match val {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => val.to_string(),
    }
}

fn show_macros() {
    println!("{}", "rqb Macro Reference".cyan().bold());
    println!();

    let macros = [
        ("$__timeFilter(col)", "col >= <from> AND col <= <to>"),
        ("$__unixEpochFilter(col)", "col >= <from> AND col <= <to>"),
        ("$__timeGroup(col, 5m)", "(CAST(col / 300 AS INTEGER) * 300)"),
        ("$__timeGroup(col, $__interval)", "bucket by the query interval"),
        ("$__timeFrom", "<from> (epoch seconds)"),
        ("$__timeTo", "<to> (epoch seconds)"),
        ("$name / ${name}", "variable value, 'a','b' when multi-valued"),
    ];

    println!(
        "{:34} {}",
        "Macro".white().bold(),
        "Expands to".white().bold()
    );
    println!("{}", "─".repeat(80).dimmed());

    for (name, expansion) in macros {
        println!("{:34} {}", name.cyan().bold(), expansion.dimmed());
    }
}
