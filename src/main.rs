use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use jsonq::config::JsonqConfig;
use jsonq::{ConnectionInfo, DialectKind, JsonFilter};
use serde_json::{json, Value};

/// Translate JSON key-path operations into native query syntax
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Driver name (mysql, pgsql, mongodb, sqlite, ...) or connection URL
    #[arg(long, short = 'd')]
    driver: String,

    /// Table or collection to query
    #[arg(long, short = 't', default_value = "users")]
    table: String,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Projection: "PATH" or "PATH as ALIAS"
    #[arg(long = "select", value_name = "SPEC")]
    selects: Vec<String>,

    /// Comparison filter
    #[arg(long = "filter", num_args = 3, value_names = ["PATH", "OP", "VALUE"])]
    filters: Vec<String>,

    /// Membership filter; values are comma separated
    #[arg(long = "where-in", num_args = 2, value_names = ["PATH", "VALUES"])]
    where_ins: Vec<String>,

    /// Substring filter
    #[arg(long = "contains", num_args = 2, value_names = ["PATH", "SEARCH"])]
    contains: Vec<String>,

    /// Path must be present and non-null
    #[arg(long = "exists", value_name = "PATH")]
    exists: Vec<String>,

    /// Ordering: "PATH" or "PATH:desc"
    #[arg(long = "order-by", value_name = "PATH[:DIR]")]
    order_by: Vec<String>,

    /// Write bound values into the SQL instead of placeholders
    #[arg(long)]
    inline: bool,

    /// Parse the generated SQL before printing it
    #[arg(long)]
    check: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => JsonqConfig::load_from(path)?,
        None => JsonqConfig::load()?,
    };
    let filter = config.build_filter();

    let connection = if cli.driver.contains("://") {
        ConnectionInfo::from_url(&cli.driver)
    } else {
        ConnectionInfo::new(&cli.driver)
    };

    let adapter = filter.adapter_for(&connection);
    eprintln!("using {} adapter ({})", adapter.name(), adapter.dialect());

    if adapter.dialect() == DialectKind::Document {
        let mut query = filter.document_query(connection, &cli.table);
        apply(&filter, &mut query, &cli)?;
        println!("{}", serde_json::to_string_pretty(&query.to_json())?);
        return Ok(());
    }

    let mut query = filter.sql_query(connection, &cli.table);
    apply(&filter, &mut query, &cli)?;

    if cli.check {
        query.validate().context("generated SQL does not parse")?;
    }

    if cli.inline {
        println!("{}", query.debug_sql());
    } else {
        let compiled = query.to_sql();
        println!("{}", compiled.sql);
        if !compiled.bindings.is_empty() {
            println!("{}", json!(compiled.bindings));
        }
    }

    Ok(())
}

fn apply<T: jsonq::QueryTarget>(filter: &JsonFilter, query: &mut T, cli: &Cli) -> Result<()> {
    for spec in &cli.selects {
        filter.select(query, spec)?;
    }
    for args in cli.filters.chunks(3) {
        if let [path, op, value] = args {
            filter.filter(query, path, op, parse_value(value))?;
        }
    }
    for args in cli.where_ins.chunks(2) {
        if let [path, values] = args {
            let values: Vec<Value> = values
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(parse_value)
                .collect();
            filter.where_in(query, path, values)?;
        }
    }
    for args in cli.contains.chunks(2) {
        if let [path, search] = args {
            filter.contains(query, path, search)?;
        }
    }
    for path in &cli.exists {
        filter.exists(query, path)?;
    }
    for spec in &cli.order_by {
        let (path, direction) = spec.rsplit_once(':').unwrap_or((spec.as_str(), "asc"));
        filter.order_by(query, path, direction)?;
    }
    Ok(())
}

/// JSON scalars (`42`, `true`, `null`, `"quoted"`) as themselves, anything
/// else as a string.
fn parse_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(v) if !v.is_object() && !v.is_array() => v,
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("active"), json!("active"));
        assert_eq!(parse_value("\"42\""), json!("42"));
        assert_eq!(parse_value("[1]"), json!("[1]"));
    }

    #[test]
    fn test_cli_builds_sql() {
        let cli = Cli::parse_from([
            "jsonq",
            "--driver",
            "pgsql",
            "--filter",
            "meta->status",
            "=",
            "active",
            "--order-by",
            "meta->score:desc",
        ]);
        let filter = JsonFilter::with_registry(Arc::new(jsonq::AdapterRegistry::new()));
        let mut query = filter.sql_query(ConnectionInfo::new(&cli.driver), &cli.table);
        apply(&filter, &mut query, &cli).unwrap();
        assert_eq!(
            query.debug_sql(),
            "SELECT * FROM users WHERE meta->>'status' = 'active' ORDER BY meta->>'score' DESC"
        );
    }
}
