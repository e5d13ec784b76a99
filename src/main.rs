use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vinti4_gateway::cli::{self, Cli, Commands};
use vinti4_gateway::config::{self, Config, GatewayConfig};
use vinti4_gateway::services::InMemoryOutcomeRecorder;
use vinti4_gateway::vinti4::Vinti4Gateway;
use vinti4_gateway::{create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Setup logging before configuration, which may reach Vault
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    if config::log_format_from_env() == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = Config::load().await?;

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Config => cli::handle_config_validate(&config),
        Commands::Status { merchant_ref } => cli::handle_status(&config, &merchant_ref).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let gateway = Vinti4Gateway::new(GatewayConfig::from_config(&config)?);
    tracing::info!(
        pos_id = gateway.config().pos_id(),
        gateway_url = %gateway.config().gateway_url(),
        "Vinti4 gateway initialized"
    );

    let app_state = AppState {
        gateway,
        recorder: Arc::new(InMemoryOutcomeRecorder::new()),
    };
    let app = create_app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
