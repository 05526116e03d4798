//! moviedb: load the IMDb datasets into SQLite and run the stored query
//!
//! Without flags the database file is deleted and every dataset under `data/`
//! is reloaded. With `--preserve` the existing database is reused as-is.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use moviedb::{driver, Config};

#[derive(Debug, Parser)]
#[command(name = "moviedb")]
#[command(about = "Load the IMDb datasets into SQLite and run the stored query")]
#[command(version)]
struct Command {
    /// Reuse the existing database instead of deleting and reloading it
    #[arg(long)]
    preserve: bool,
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the default `warn` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let opts = Command::parse();
    init_logging();

    let config = Config {
        preserve: opts.preserve,
        ..Config::default()
    };

    driver::run(&config)
}
