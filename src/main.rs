// Keychain Store — Application Entry Point
//
// Parses CLI arguments, initializes structured logging (to stderr, so
// printed passwords and JSON stay alone on stdout), and dispatches to the
// command handler.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use keychain_store::cli::{execute, Cli};

fn main() {
    // RUST_LOG=keychain_store=debug for per-call output. No level ever
    // includes password values.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("keychain_store=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = execute(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
