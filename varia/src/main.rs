//! varia CLI - smart wallpaper selection over a persistent catalog.
//!
//! Admin commands for the selection engine plus the one-shot theming
//! pass. The engine itself is embedded by the host rotator; this binary
//! exists for scripting and troubleshooting.

use std::process;

use clap::Parser;

mod cli;
mod logging;

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init() {
        eprintln!("Failed to initialize tracing: {e}");
    }

    if let Err(e) = cli::execute(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
