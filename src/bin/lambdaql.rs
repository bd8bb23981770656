//! lambdaql: compile predicate fragments to SQL from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Show the SQL and bindings
//! lambdaql --from users --where 'u => u.age > 18' --order-by name --take 10
//!
//! # Run it
//! lambdaql --from users --where 'u => u.isActive' --database-url sqlite://app.db
//!
//! # Inspect a fragment
//! lambdaql explain "u => u.name.startsWith('Jo') || u.age >= 21"
//! ```

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use lambdaql::engine::JsonRow;
use lambdaql::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lambdaql")]
#[command(version)]
#[command(about = "Compile predicate fragments into parameterized SQL", long_about = None)]
#[command(after_help = "EXAMPLES:
    lambdaql --from users --where 'u => u.age > 18 && u.isActive' --order-by name --take 10
    lambdaql --from users --select 'u => ({ name: u.name, email: u.email })' --placeholder dollar
    lambdaql --from orders --join 'LEFT customers ON customers.id = orders.customer_id' --format json
    lambdaql explain \"u => ['admin', 'mod'].includes(u.role)\"")]
struct Cli {
    /// Source table
    #[arg(long)]
    from: Option<String>,

    /// Filter predicate fragment, e.g. 'u => u.age > 18'
    #[arg(long = "where")]
    filter: Option<String>,

    /// Projection: a selector fragment or a comma-separated field list
    #[arg(long)]
    select: Option<String>,

    /// Ascending sort key (repeatable)
    #[arg(long)]
    order_by: Vec<String>,

    /// Descending sort key (repeatable)
    #[arg(long)]
    order_by_desc: Vec<String>,

    /// Row limit
    #[arg(long)]
    take: Option<u64>,

    /// Row offset
    #[arg(long)]
    skip: Option<u64>,

    /// Join clause: "[LEFT|INNER] table ON condition" (repeatable)
    #[arg(long)]
    join: Vec<String>,

    /// Group-by key
    #[arg(long)]
    group_by: Option<String>,

    /// Having predicate fragment
    #[arg(long)]
    having: Option<String>,

    /// Placeholder style (overrides the config file)
    #[arg(long, value_enum)]
    placeholder: Option<PlaceholderArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "sql")]
    format: OutputFormat,

    /// Config file (default: ./lambdaql.toml, then the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database connection URL
    #[arg(long, env = "LAMBDAQL_DATABASE_URL")]
    database_url: Option<String>,

    /// Don't execute, just show the generated SQL
    #[arg(short, long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PlaceholderArg {
    Question,
    Dollar,
}

impl From<PlaceholderArg> for PlaceholderStyle {
    fn from(arg: PlaceholderArg) -> Self {
        match arg {
            PlaceholderArg::Question => PlaceholderStyle::Question,
            PlaceholderArg::Dollar => PlaceholderStyle::Dollar,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Sql,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a predicate fragment and show its tree and SQL
    Explain {
        /// The fragment to explain
        fragment: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Some(Commands::Explain { fragment }) => explain(fragment, &cli),
        None => run(&cli).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("lambdaql=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::discover()?,
    };
    if let Some(placeholder) = cli.placeholder {
        config.compiler.placeholder = placeholder.into();
    }
    Ok(config)
}

fn build_query(cli: &Cli) -> Result<Query> {
    let Some(table) = &cli.from else {
        bail!("missing --from <TABLE>");
    };
    let mut query = Query::new(table.as_str());

    for clause in &cli.join {
        let (kind, table, condition) = parse_join(clause)?;
        query = match kind {
            JoinKind::Inner => query.join(table, condition),
            JoinKind::Left => query.left_join(table, condition),
        };
    }
    if let Some(text) = &cli.filter {
        query = query.filter(fragment(text));
    }
    if let Some(text) = &cli.select {
        query = if is_fragment(text) {
            query.select(fragment(text))
        } else {
            query.select(text.split(',').map(str::trim).collect::<Vec<_>>())
        };
    }
    if let Some(key) = &cli.group_by {
        query = query.group_by(KeyArg(key));
    }
    if let Some(text) = &cli.having {
        query = query.having(fragment(text));
    }
    for key in &cli.order_by {
        query = query.order_by(KeyArg(key));
    }
    for key in &cli.order_by_desc {
        query = query.order_by_desc(KeyArg(key));
    }
    if let Some(n) = cli.take {
        query = query.take(n);
    }
    if let Some(n) = cli.skip {
        query = query.skip(n);
    }

    Ok(query)
}

fn is_fragment(text: &str) -> bool {
    text.contains("=>") || text.trim_start().starts_with("function")
}

/// A key argument: a plain field name unless it looks like a fragment.
struct KeyArg<'a>(&'a str);

impl IntoKey for KeyArg<'_> {
    fn into_key(self) -> QueryResult<String> {
        if is_fragment(self.0) {
            fragment(self.0).into_key()
        } else {
            self.0.into_key()
        }
    }
}

/// `"[LEFT|INNER] table ON condition"`
fn parse_join(clause: &str) -> Result<(JoinKind, &str, &str)> {
    let clause = clause.trim();
    let (kind, rest) = match clause.split_once(char::is_whitespace) {
        Some((word, rest)) if word.eq_ignore_ascii_case("left") => (JoinKind::Left, rest),
        Some((word, rest)) if word.eq_ignore_ascii_case("inner") => (JoinKind::Inner, rest),
        _ => (JoinKind::Inner, clause),
    };
    let (table, condition) = rest
        .split_once(" ON ")
        .or_else(|| rest.split_once(" on "))
        .with_context(|| format!("join `{}` must look like `[LEFT] table ON condition`", clause))?;
    Ok((kind, table.trim(), condition.trim()))
}

async fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let query = build_query(cli)?;
    let database_url = cli
        .database_url
        .clone()
        .or_else(|| config.database_url().map(str::to_string));

    // Dry run or no database URL - just show SQL
    let Some(url) = database_url.filter(|_| !cli.dry_run) else {
        let compiled = query.compile_with(&config.compiler)?;
        print_compiled(&compiled, cli.format)?;
        return Ok(());
    };

    if cli.verbose {
        println!("{} {}", "Connecting to:".dimmed(), url);
    }
    let db = Database::connect(&url).await?;
    let mut compiler = *db.compiler();
    if let Some(placeholder) = cli.placeholder {
        compiler.placeholder = placeholder.into();
    }
    let compiled = query.compile_with(&compiler)?;
    if cli.verbose {
        println!("{} {}", "SQL:".dimmed(), compiled.sql.yellow());
    }

    let rows = db.fetch_compiled(&compiled).await?;
    print_rows(&rows, cli.format)?;
    Ok(())
}

fn print_compiled(compiled: &CompiledQuery, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(compiled)?),
        OutputFormat::Sql => {
            println!("{}", "Generated SQL:".green().bold());
            println!("{}", compiled.sql.white());

            if !compiled.params.is_empty() {
                println!();
                println!("{}", "Bindings:".cyan());
                for (i, value) in compiled.params.iter().enumerate() {
                    println!("  {} = {}", (i + 1).to_string().dimmed(), value.to_string().yellow());
                }
            }
        }
    }
    Ok(())
}

fn print_rows(rows: &[JsonRow], format: OutputFormat) -> Result<()> {
    if rows.is_empty() {
        println!("{}", "(no results)".dimmed());
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
        OutputFormat::Sql => {
            let (header, body) = render_table(rows);
            println!("{}", header.white().bold());
            let mut lines = body.iter();
            if let Some(rule) = lines.next() {
                println!("{}", rule.dimmed());
            }
            for line in lines {
                println!("{}", line);
            }
            println!();
            println!("{} row(s) returned", rows.len().to_string().cyan());
        }
    }
    Ok(())
}

/// Header line, then a rule line followed by one line per row.
///
/// Columns are the union of every row's keys in name order. A row missing a
/// column gets an empty cell.
fn render_table(rows: &[JsonRow]) -> (String, Vec<String>) {
    let columns: Vec<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let grid: Vec<Vec<String>> = rows
        .iter()
        .map(|row| columns.iter().map(|name| cell(row.get(*name))).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            grid.iter()
                .map(|cells| cells[i].chars().count())
                .fold(name.chars().count(), usize::max)
        })
        .collect();

    let header = aligned(columns.iter().copied(), &widths);
    let rule = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join("-+-");
    let body = std::iter::once(rule)
        .chain(grid.iter().map(|cells| aligned(cells.iter().map(String::as_str), &widths)))
        .collect();
    (header, body)
}

fn aligned<'a>(values: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    values
        .zip(widths)
        .map(|(value, width)| format!("{:<width$}", value, width = *width))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

fn cell(value: Option<&serde_json::Value>) -> String {
    match value {
        None => String::new(),
        Some(serde_json::Value::Null) => "NULL".to_string(),
        Some(serde_json::Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn explain(text: &str, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    println!("{} {}", "Fragment:".dimmed(), text.yellow());
    println!();

    let expr = lambdaql::parser::parse_predicate(text)?;
    println!("{}", "Parsed Tree:".green().bold());
    println!("  {}", expr.to_string().cyan());
    if cli.verbose {
        println!("{:#?}", expr);
    }

    let sql = expr.to_sql_with(config.compiler.placeholder)?;
    println!();
    println!("{}", "Generated SQL:".green().bold());
    println!("  {}", sql.sql.white());
    for (i, value) in sql.params.iter().enumerate() {
        println!("  {} = {}", (i + 1).to_string().dimmed(), value.to_string().yellow());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, serde_json::Value)]) -> JsonRow {
        cells
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_render_table() {
        let rows = vec![
            row(&[("name", serde_json::json!("Ada")), ("age", serde_json::json!(36))]),
            row(&[("name", serde_json::json!("Timothy")), ("age", serde_json::Value::Null)]),
        ];
        let (header, body) = render_table(&rows);
        assert_eq!(header, "age  | name");
        assert_eq!(
            body,
            vec![
                "-----+--------".to_string(),
                "36   | Ada".to_string(),
                "NULL | Timothy".to_string(),
            ]
        );
    }

    #[test]
    fn test_render_table_missing_column() {
        let rows = vec![
            row(&[("a", serde_json::json!(1))]),
            row(&[("b", serde_json::json!("x"))]),
        ];
        let (header, body) = render_table(&rows);
        assert_eq!(header, "a | b");
        assert_eq!(body[1], "1 |");
        assert_eq!(body[2], "  | x");
    }

    #[test]
    fn test_parse_join() {
        let (kind, table, condition) =
            parse_join("LEFT customers ON customers.id = orders.customer_id").unwrap();
        assert_eq!(kind, JoinKind::Left);
        assert_eq!(table, "customers");
        assert_eq!(condition, "customers.id = orders.customer_id");
        assert!(parse_join("customers").is_err());
    }
}
