//! CLI configuration.
//!
//! All options can be provided as CLI arguments or environment variables;
//! `.env` files are loaded before parsing.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::anyhow;
use clap::{Args, Parser};
use rxtract_server::middleware::CorsConfig;
use rxtract_server::service::ServiceConfig;
use serde::{Deserialize, Serialize};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "rxtract")]
#[command(about = "Prescription-image extraction server")]
#[command(version)]
pub struct Cli {
    /// Network binding and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// Inference, storage and authentication configuration.
    #[clap(flatten)]
    pub service: ServiceConfig,

    /// CORS configuration.
    #[clap(flatten)]
    pub cors: CorsConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct ServerConfig {
    /// Host address to bind the server to.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// TCP port number for the server to listen on.
    #[arg(short = 'p', long, env = "PORT", default_value_t = 8080)]
    pub port: u16,
}

impl ServerConfig {
    /// Returns the socket address to bind to.
    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns true when bound to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        self.host.is_unspecified()
    }

    /// Validates the network configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port < 1024 {
            return Err(anyhow!(
                "port {} is in the privileged range, use 1024 or above",
                self.port
            ));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
        }
    }
}
