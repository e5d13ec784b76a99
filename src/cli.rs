use clap::{Parser, Subcommand};

use crate::config::{Config, GatewayConfig};
use crate::vinti4::Vinti4Gateway;

#[derive(Parser)]
#[command(name = "vinti4-gateway")]
#[command(about = "Vinti4 payment gateway adapter for event ticketing", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Configuration validation
    Config,

    /// Query the gateway for the outcome of a transaction
    Status {
        /// Merchant reference sent with the original request
        #[arg(long, value_name = "MERCHANT_REF")]
        merchant_ref: String,
    },
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    let gateway = GatewayConfig::from_config(config)?;

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  POS ID: {}", gateway.pos_id());
    println!("  POS Auth Code: {}", mask_secret(gateway.pos_auth_code()));
    println!("  Merchant ID: {}", gateway.merchant_id().unwrap_or("-"));
    println!("  Gateway URL: {}", gateway.gateway_url());
    println!("  Response URL: {}", gateway.response_url());
    println!("  Currency: {}", gateway.currency());
    match gateway.status_endpoint() {
        Some(endpoint) => println!("  Status URL: {} (portal {})", endpoint.url, endpoint.portal_id),
        None => println!("  Status URL: not configured"),
    }

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

pub async fn handle_status(config: &Config, merchant_ref: &str) -> anyhow::Result<()> {
    let gateway = Vinti4Gateway::new(GatewayConfig::from_config(config)?);
    let status = gateway.check_status(merchant_ref).await?;

    println!("Transaction {}:", merchant_ref);
    println!("  Result: {}", status.result);
    println!("  Success: {}", status.transaction_success);
    println!("  Description: {}", status.transaction_status_description);
    if !status.msg.is_empty() {
        println!("  Message: {}", status.msg);
    }

    Ok(())
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("****{}", tail)
}
