use std::{
    net::SocketAddr,
    path::PathBuf,
    sync::Arc,
};

use alloy_primitives::Address;
use anyhow::Context;
use ccip_gateway_core::{
    Gateway,
    GatewayConfig,
};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;

use crate::{
    resolver::{
        RecordDb,
        register_resolver,
    },
    server::GatewayServer,
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Gateway server address
    #[arg(long, env = "CCIP_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: SocketAddr,
    /// Path of the record database, defaults to the platform data directory
    #[arg(long, env = "CCIP_DB_PATH")]
    pub db_path: Option<PathBuf>,
    /// Cache size in bytes
    #[arg(long, env = "CCIP_CACHE_SIZE", default_value = "1000000")]
    pub cache_size: usize,
    /// Comma separated addresses allowed as request `sender`. Any sender is
    /// accepted when empty.
    #[arg(long, env = "CCIP_ALLOWED_SENDERS", value_delimiter = ',')]
    pub allowed_senders: Vec<Address>,
    /// Maximum request body size in bytes
    #[arg(long, env = "CCIP_MAX_BODY_SIZE", default_value = "1048576")]
    pub max_body_size: usize,
    /// Log level
    #[arg(long, env = "CCIP_LOG_LEVEL", default_value = "info")]
    pub log_level: LevelFilter,
    /// Insert the demo resolver records on startup
    #[arg(long, env = "CCIP_SEED_EXAMPLES")]
    pub seed_examples: bool,
    /// Return a generic message instead of handler error details
    #[arg(long, env = "CCIP_HIDE_HANDLER_ERRORS")]
    pub hide_handler_errors: bool,
}

impl Config {
    /// Pipeline options derived from the command line.
    pub fn gateway_config(&self) -> GatewayConfig {
        let config = if self.allowed_senders.is_empty() {
            GatewayConfig::default()
        } else {
            GatewayConfig::with_allowed_senders(self.allowed_senders.iter().copied())
        };
        config.expose_handler_errors(!self.hide_handler_errors)
    }

    /// Build the CCIP-Read gateway server
    pub async fn build(self) -> anyhow::Result<GatewayServer> {
        // Bind to an address
        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!(listen_addr = ?self.listen_addr, "Listening on address");

        let db_path = match &self.db_path {
            Some(db_path) => db_path.clone(),
            None => {
                directories::ProjectDirs::from("com", "phylaxsystems", "ccip-gateway")
                    .context("no data directory available, pass --db-path")?
                    .data_dir()
                    .join("db")
            }
        };

        let records = RecordDb::open(&db_path, self.cache_size)
            .with_context(|| format!("failed to open record database at {}", db_path.display()))?;
        tracing::info!(database_path = %db_path.display(), "Opened database");

        if self.seed_examples {
            records.seed_examples()?;
        }
        let store = records.into_store()?;

        let mut gateway = Gateway::new(self.gateway_config());
        register_resolver(&mut gateway, store)?;
        tracing::info!(
            allowed_senders = self.allowed_senders.len(),
            expose_handler_errors = !self.hide_handler_errors,
            "Configured gateway"
        );

        Ok(GatewayServer {
            listener,
            gateway: Arc::new(gateway),
            max_body_size: self.max_body_size,
        })
    }
}
