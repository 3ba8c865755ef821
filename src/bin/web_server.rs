// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # WHOOP MCP Web Server Binary
//!
//! Serves the MCP tools over HTTP (`POST /mcp`) and WebSocket (`/mcp`) for
//! remote clients, plus the browser-facing WHOOP OAuth routes.

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use whoop_mcp_server::config::ServerConfig;
use whoop_mcp_server::{logging, web};

#[derive(Parser)]
#[command(name = "whoop-web-server")]
#[command(about = "HTTP/WebSocket transport for the WHOOP MCP tools")]
pub struct Args {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_from_env()?;

    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    config.validate()?;

    info!("{}", config.summary());

    if let Err(e) = web::run(config).await {
        error!("Server error: {}", e);
        return Err(e);
    }

    Ok(())
}
