use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use propsline::config::PipelineConfig;
use propsline::pipeline;
use propsline::store;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "all".to_string());
    let cfg = PipelineConfig::from_env();
    let mut conn = store::open_db(&cfg.db_path)?;

    match command.as_str() {
        "refresh" => {
            print_refresh(&pipeline::refresh_dataset(&mut conn, &cfg)?);
        }
        "process" => {
            print_process(&pipeline::process_dataset(&mut conn, &cfg)?);
        }
        "all" => {
            print_refresh(&pipeline::refresh_dataset(&mut conn, &cfg)?);
            print_process(&pipeline::process_dataset(&mut conn, &cfg)?);
        }
        other => {
            return Err(anyhow!(
                "unknown command {other:?} (expected refresh, process, or all)"
            ));
        }
    }

    Ok(())
}

fn print_refresh(summary: &pipeline::RefreshSummary) {
    println!("Refresh complete");
    println!("Months: {:?}", summary.months);
    println!(
        "Games fetched: {} (skipped {} already stored)",
        summary.games_fetched, summary.games_skipped
    );
    println!("Rows upserted: {}", summary.rows_upserted);
    println!("Prop lines stored: {}", summary.prop_lines_stored);
}

fn print_process(summary: &pipeline::ProcessSummary) {
    println!("Processing complete");
    println!("Raw rows: {}", summary.raw_rows);
    println!("Processed rows: {}", summary.processed_rows);
    println!("Rows with predictions: {}", summary.predicted_rows);
}
