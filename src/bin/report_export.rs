//! report_export - dump persisted detection reports as JSON

use anyhow::Result;
use clap::Parser;

use roadwatch::SqliteMetadataStore;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the roadwatch database.
    #[arg(long, default_value = "roadwatch.db", env = "ROADWATCH_DB_PATH")]
    db_path: String,
    /// Maximum number of reports to export, newest first.
    #[arg(long, default_value_t = 100)]
    limit: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let store = SqliteMetadataStore::open(&args.db_path)?;
    let reports = store.list_reports(args.limit)?;
    log::info!("exporting {} report(s) from {}", reports.len(), args.db_path);

    let items: Vec<serde_json::Value> = reports
        .into_iter()
        .map(|report| {
            serde_json::json!({
                "id": report.id,
                "created_at": report.created_at,
                "report": report.payload,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}
