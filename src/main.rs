use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// Use library instead of local modules
use spendwise::{
    get_all_transactions, insert_transactions, load_csv, setup_database, verify_count,
    SearchConfig, SearchEngine, SearchField, Summary, Transaction,
};

const DEFAULT_DB: &str = "spendwise.db";

const USAGE: &str = "\
Usage: spendwise [--config <file>] [--field <name>] <command> [args]

Commands:
  import <csv> [db]       Import description,amount,category,date rows
  list [db]               Show every transaction
  search <query> [db]     Search, e.g. 'category:Food amount:>20 coffee|tea'
  suggest <partial> [db]  Suggest search terms
  stats [db]              Totals per category

Options:
  --config <file>         Search settings (JSON)
  --field <name>          Search only all|description|category|amount|date";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let config = match take_option(&mut args, "--config")? {
        Some(path) => SearchConfig::from_file(&path)?,
        None => SearchConfig::default(),
    };
    let field = match take_option(&mut args, "--field")? {
        Some(name) => Some(name.parse::<SearchField>()?),
        None => None,
    };

    let Some(command) = args.first().map(String::as_str) else {
        println!("{}", USAGE);
        return Ok(());
    };

    match command {
        "import" => {
            let Some(csv_path) = args.get(1) else {
                bail!("import needs a CSV path\n\n{}", USAGE);
            };
            run_import(Path::new(csv_path), &db_path(args.get(2)))
        }
        "list" => run_list(&db_path(args.get(1))),
        "search" => {
            let Some(query) = args.get(1) else {
                bail!("search needs a query\n\n{}", USAGE);
            };
            run_search(config, query, field, &db_path(args.get(2)))
        }
        "suggest" => {
            let Some(partial) = args.get(1) else {
                bail!("suggest needs a partial term\n\n{}", USAGE);
            };
            run_suggest(config, partial, &db_path(args.get(2)))
        }
        "stats" => run_stats(&db_path(args.get(1))),
        other => bail!("Unknown command {:?}\n\n{}", other, USAGE),
    }
}

/// Remove `flag <value>` from the arguments, returning the value
fn take_option(args: &mut Vec<String>, flag: &str) -> Result<Option<String>> {
    let Some(i) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    let Some(value) = args.get(i + 1).cloned() else {
        bail!("{} needs a value\n\n{}", flag, USAGE);
    };
    args.drain(i..=i + 1);
    Ok(Some(value))
}

fn db_path(arg: Option<&String>) -> PathBuf {
    arg.map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB))
}

fn open_existing(db_path: &Path) -> Result<Connection> {
    if !db_path.exists() {
        bail!(
            "Database not found at {:?}. Run: spendwise import <csv> to create it.",
            db_path
        );
    }
    Connection::open(db_path).with_context(|| format!("Failed to open {:?}", db_path))
}

fn run_import(csv_path: &Path, db_path: &Path) -> Result<()> {
    println!("📂 Loading CSV...");
    let transactions = load_csv(csv_path)?;
    println!("✓ Loaded {} transactions from CSV", transactions.len());

    let conn = Connection::open(db_path)?;
    setup_database(&conn)?;

    let inserted = insert_transactions(&conn, &transactions)?;
    let count = verify_count(&conn)?;

    println!("✓ Inserted: {} transactions", inserted);
    println!("✓ Skipped duplicates: {}", transactions.len() - inserted);
    println!("✓ Database contains {} transactions", count);

    Ok(())
}

fn print_rows(transactions: &[Transaction]) {
    for tx in transactions {
        println!(
            "{}  {:>10.2}  {:<13}  {}",
            tx.date, tx.amount, tx.category, tx.description
        );
    }
}

fn run_list(db_path: &Path) -> Result<()> {
    let conn = open_existing(db_path)?;
    let transactions = get_all_transactions(&conn)?;

    print_rows(&transactions);
    println!("\n{} transactions", transactions.len());

    Ok(())
}

fn run_search(
    config: SearchConfig,
    query: &str,
    field: Option<SearchField>,
    db_path: &Path,
) -> Result<()> {
    let engine = SearchEngine::new(config)?;
    let conn = open_existing(db_path)?;
    let transactions = get_all_transactions(&conn)?;

    let mut options = engine.parse_search_query(query);
    if let Some(field) = field {
        options.field = field;
    }
    let results = engine.advanced_search(&transactions, &options);

    print_rows(&results);

    let summary = Summary::from_transactions(&results);
    println!(
        "\n🔍 {} of {} transactions match, total {:.2}",
        summary.count,
        transactions.len(),
        summary.total
    );

    Ok(())
}

fn run_suggest(config: SearchConfig, partial: &str, db_path: &Path) -> Result<()> {
    let engine = SearchEngine::new(config)?;
    let conn = open_existing(db_path)?;
    let transactions = get_all_transactions(&conn)?;

    for suggestion in engine.search_suggestions(&transactions, partial) {
        println!("{}", suggestion);
    }

    Ok(())
}

fn run_stats(db_path: &Path) -> Result<()> {
    let conn = open_existing(db_path)?;
    let transactions = get_all_transactions(&conn)?;
    let summary = Summary::from_transactions(&transactions);

    println!(
        "📊 {} transactions, total {:.2}, average {:.2}",
        summary.count, summary.total, summary.average
    );
    for line in &summary.by_category {
        println!("  {:<13} {:>4}  {:>10.2}", line.category, line.count, line.total);
    }

    Ok(())
}
