//! CEP weather service
//!
//! One binary, two roles:
//!
//! ```text
//!   Client ── POST /cep ──▶ gateway ── POST /weather ──▶ resolver ──▶ ViaCEP
//!                             (cep-service)               (weather-service)
//!                                                                  └──▶ WeatherAPI
//! ```
//!
//! Both roles read the same configuration file; each only uses its own
//! section plus the shared timeout and observability settings.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use cep_weather::config::load_config;
use cep_weather::lifecycle::{self, Role, Shutdown};
use cep_weather::observability::logging;

#[derive(Parser)]
#[command(name = "cep-weather")]
#[command(about = "Postal code to temperature pipeline with distributed tracing", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults and environment are used when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    role: RoleCommand,
}

#[derive(Subcommand)]
enum RoleCommand {
    /// Accept POST /cep and forward to the resolver
    Gateway,
    /// Accept POST /weather and resolve location and temperature
    Resolver,
}

impl From<RoleCommand> for Role {
    fn from(cmd: RoleCommand) -> Self {
        match cmd {
            RoleCommand::Gateway => Role::Gateway,
            RoleCommand::Resolver => Role::Resolver,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    logging::init(&config.observability.log_level).context("failed to initialize logging")?;

    let role = Role::from(cli.role);
    tracing::info!(
        service = role.service_name(),
        version = env!("CARGO_PKG_VERSION"),
        "cep-weather starting"
    );

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    lifecycle::run(role, &config, &shutdown)
        .await
        .with_context(|| format!("{} failed", role.service_name()))?;

    tracing::info!("Shutdown complete");
    Ok(())
}
