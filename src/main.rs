use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;

use catalog_mirror::config::Config;
use catalog_mirror::sync::SyncEngine;
use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(true)
        .init();

    let cli = Cli::parse();
    let cfg = Config::from_env();
    tracing::info!(
        source = %cfg.source_base_url,
        destination = %cfg.destination_base_url(),
        categories = cfg.category_labels.len(),
        reconcile_variants = cfg.reconcile_variants,
        "Loaded configuration"
    );

    let engine = SyncEngine::new(cfg)?;
    match cli.command.unwrap_or(Command::Sync) {
        Command::Sync => print_json(&engine.run_full_sync().await?),
        Command::DryUpload { count } => print_json(&engine.run_dry_upload(count).await?),
        Command::FetchOnly => print_json(&engine.fetch_source_only().await?),
        Command::Reprice { divisor } => print_json(&engine.reprice_all(divisor).await?),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
