use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{MutationDialog, RelayClient, SortColumn, TableEngine, PAGE_SIZE};
use shared::domain::MutationIntent;

#[derive(Parser, Debug)]
#[command(name = "kv-console", about = "Console table client for the kv relay")]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColumnArg {
    Key,
    Value,
}

impl From<ColumnArg> for SortColumn {
    fn from(column: ColumnArg) -> Self {
        match column {
            ColumnArg::Key => SortColumn::Key,
            ColumnArg::Value => SortColumn::Value,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the listing and print one page of it.
    List {
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        sort_by: Option<ColumnArg>,
        /// Sort descending instead of ascending.
        #[arg(long)]
        desc: bool,
        #[arg(long, default_value_t = 0)]
        page: usize,
    },
    /// Insert a new key-value pair.
    Add { key: String, value: String },
    /// Replace the value of an existing key.
    Update { key: String, value: String },
    /// Remove a key.
    Delete { key: String },
    /// Look up a single key.
    Search { key: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("warn").init();
    let args = Args::parse();

    let relay = RelayClient::new(&args.server_url);
    let table = TableEngine::new(relay.clone());

    match args.command {
        Command::List {
            filter,
            sort_by,
            desc,
            page,
        } => {
            if let Some(filter) = filter {
                table.set_filter(filter);
            }
            if let Some(column) = sort_by {
                table.sort_by(column.into());
                if desc {
                    table.sort_by(column.into());
                }
            }
            table.set_page(page);
            table.refresh().await?;
            print_page(&table);
        }
        Command::Add { key, value } => {
            let outcome = submit(&table, MutationDialog::add(), &key, &value).await?;
            println!("{outcome}");
        }
        Command::Update { key, value } => {
            let mut dialog = MutationDialog::update(key, "");
            dialog
                .set_value(value)
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
            let outcome = run_dialog(&table, dialog).await?;
            println!("{outcome}");
        }
        Command::Delete { key } => {
            // Row actions skip the dialog and dispatch directly.
            let outcome = table.apply_mutation(MutationIntent::Delete { key }).await?;
            println!("{outcome}");
        }
        Command::Search { key } => {
            println!("{}", relay.search_kv(&key).await?);
        }
    }
    Ok(())
}

async fn submit(
    table: &TableEngine,
    mut dialog: MutationDialog,
    key: &str,
    value: &str,
) -> Result<String> {
    dialog
        .set_key(key)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    dialog
        .set_value(value)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    run_dialog(table, dialog).await
}

async fn run_dialog(table: &TableEngine, mut dialog: MutationDialog) -> Result<String> {
    let intent = dialog
        .begin_submit()
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    match table.apply_mutation(intent).await {
        Ok(outcome) => {
            dialog.complete(Ok(()));
            Ok(outcome)
        }
        Err(err) => {
            dialog.complete(Err(err.to_string()));
            bail!(
                "mutation failed: {}",
                dialog.last_error().unwrap_or("unknown error")
            );
        }
    }
}

fn print_page(table: &TableEngine) {
    let rows = table.visible_rows();
    if rows.is_empty() {
        println!("No results.");
        return;
    }
    let key_width = rows.iter().map(|r| r.key.len()).max().unwrap_or(3).max(3);
    println!("{:<key_width$}  value", "key");
    for row in &rows {
        println!("{:<key_width$}  {}", row.key, row.value);
    }
    let total = table.matching_row_count();
    let pages = total.div_ceil(PAGE_SIZE).max(1);
    println!(
        "page {}/{pages} ({total} row{} total)",
        table.view().page.min(pages - 1) + 1,
        if total == 1 { "" } else { "s" }
    );
}
