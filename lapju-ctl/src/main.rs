//! lapju-ctl - Operator maintenance and reporting CLI
//!
//! Manages the template catalog, materializes project task trees, records
//! daily progress and prints rollup reports against the shared LAPJU
//! database.

use anyhow::Result;
use clap::Parser;
use lapju_common::{config, db};
use tracing::info;

mod cli;
mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so report output stays pipeable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = cli::Cli::parse();

    info!("Starting lapju-ctl v{}", env!("CARGO_PKG_VERSION"));

    let root = config::resolve_root_folder(args.root.as_deref());
    config::ensure_root_folder(&root)?;

    let db_path = config::database_path(&root);
    info!("Database path: {}", db_path.display());

    let pool = db::init_database(&db_path).await?;

    commands::run(&pool, args.command).await
}
