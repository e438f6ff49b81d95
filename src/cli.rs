//! Command-line surface for one-shot runs.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "catalog-mirror")]
#[command(about = "Mirror a storefront catalog into a destination store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a full sync over the source catalog (default)
    Sync,
    /// Create up to N new products, then stop
    DryUpload {
        /// Number of products to create
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
    /// Fetch and summarize the source catalog without writing anything
    FetchOnly,
    /// Recompute prices of every mirrored variant
    Reprice {
        /// Replace the configured price divisor for this run
        #[arg(long)]
        divisor: Option<f64>,
    },
}
