//! vk - Vault-Krate command-line client
//!
//! Uploads, lists, edits and shares files stored behind a Vault-Krate
//! balancer, and shows the health of its storage servers.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vaultkrate::cli::{Cli, Commands};
use vaultkrate::config::{load_config, load_config_no_validation};
use vaultkrate::Result;

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.debug);

    // Execute the command
    if let Err(e) = run(cli).await {
        error!("Error: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Starting vk {}", vaultkrate::built_info::PKG_VERSION);

    // Commands that must work before the configuration is valid
    let config = match &cli.command {
        Commands::Config { .. }
        | Commands::Init
        | Commands::Version
        | Commands::Completions { .. } => load_config_no_validation().await?,
        _ => load_config().await?,
    };

    cli.execute(config).await
}

/// Logs go to stderr so command output stays pipeable. `RUST_LOG` wins over
/// `--debug`; `VK_LOG_FORMAT=json` switches to JSON lines.
fn init_logging(debug: bool) {
    let default_level = if debug || env_flag("VK_DEBUG") {
        "vaultkrate=debug"
    } else {
        "vaultkrate=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());

    let json = std::env::var("VK_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
