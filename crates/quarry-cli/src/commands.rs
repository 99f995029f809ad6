//! Subcommand implementations

use crate::config::Config;
use crate::relations;
use crate::OutputFormat;
use anyhow::{bail, Context};
use quarry_delegate::{Delegator, Plan};
use quarry_duck::{DuckExecutor, ExecutionBudget};
use quarry_query::{QueryNode, Row};
use quarry_site::{Site, StoreKind};
use std::path::Path;
use tracing::info;

/// Query from the command line, in text syntax or as a JSON tree
pub fn read_query(text: &str, json: bool) -> anyhow::Result<QueryNode> {
    if json {
        serde_json::from_str(text).context("invalid JSON query")
    } else {
        quarry_parse::parse(text).context("invalid query")
    }
}

fn load_site(config: &Config) -> anyhow::Result<Site> {
    Site::load(&config.site).with_context(|| format!("cannot load site {}", config.site.display()))
}

pub fn plan(config: &Config, store: &str, query: &QueryNode, output: OutputFormat) -> anyhow::Result<()> {
    let site = load_site(config)?;
    let plan = Delegator::new(&site).plan(store, query)?;
    println!("{}", render_plan(&plan, output)?);
    Ok(())
}

fn render_plan(plan: &Plan, output: OutputFormat) -> anyhow::Result<String> {
    match output {
        OutputFormat::Text => {
            let mut text = match &plan.statement {
                Some(statement) => statement.to_sql(),
                None => "-- store is not relational, nothing delegated".to_string(),
            };
            if let Some(residual) = &plan.residual {
                text.push_str("\n-- residual\n");
                text.push_str(&serde_json::to_string_pretty(residual)?);
            }
            Ok(text)
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "sql": plan.statement.as_ref().map(|statement| statement.to_sql()),
                "residual": plan.residual,
                "fully_delegated": plan.is_fully_delegated(),
            });
            Ok(serde_json::to_string_pretty(&json)?)
        }
    }
}

pub fn run(config: &Config, store: &str, query: &QueryNode, init: Option<&Path>) -> anyhow::Result<()> {
    let site = load_site(config)?;
    let executor = match &config.execution.database {
        Some(path) => DuckExecutor::open(path).with_context(|| format!("cannot open {}", path.display()))?,
        None => DuckExecutor::open_in_memory()?,
    };
    if let Some(init) = init {
        let sql = std::fs::read_to_string(init).with_context(|| format!("cannot read {}", init.display()))?;
        executor.connection().execute_batch(&sql).context("init script failed")?;
    }

    let budget = ExecutionBudget {
        max_rows: config.execution.max_rows,
        max_memory_mb: config.execution.max_memory_mb,
    };
    for row in execute(&site, &executor, store, query, budget)? {
        println!("{}", serde_json::Value::Object(row));
    }
    Ok(())
}

/// Plan `query`, run the statement and evaluate the residual on its rows,
/// with the relations the residual reads nested in
fn execute(
    site: &Site,
    executor: &DuckExecutor,
    store: &str,
    query: &QueryNode,
    budget: ExecutionBudget,
) -> anyhow::Result<Vec<Row>> {
    let plan = Delegator::new(site).plan(store, query)?;
    let Some(statement) = &plan.statement else {
        bail!("store {} is not relational, there are no rows to run the query on", store);
    };

    let rows = executor.execute(statement, Some(budget))?.into_rows();
    let fetched = rows.len();
    let rows = match &plan.residual {
        Some(residual) => {
            let rows = relations::nest(executor, site, site.store(store)?, &residual.properties_tree(), rows, budget)?;
            residual.evaluate(rows)?
        }
        None => rows,
    };

    info!(store, fetched, returned = rows.len(), delegated = plan.is_fully_delegated(), "query done");
    Ok(rows)
}

pub fn check(config: &Config) -> anyhow::Result<()> {
    let site = load_site(config)?;
    for store in site.stores() {
        let location = match store.kind() {
            StoreKind::Relational { database, table } => format!("relational {}.{}", database, table.name),
            StoreKind::External { backend } => format!("external {}", backend),
        };
        println!("{}\t{}\t{} properties", store.id(), location, store.properties().len());
    }
    Ok(())
}
