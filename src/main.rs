// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use whoop_mcp_server::config::WhoopConfig;
use whoop_mcp_server::logging;
use whoop_mcp_server::mcp::tools::ToolRegistry;
use whoop_mcp_server::mcp::McpServer;

/// WHOOP MCP server over stdio
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Override the WHOOP API base URL
    #[arg(long)]
    api_base: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    // stdout carries the protocol
    logging::init_stderr()?;

    let args = Args::parse();

    let mut config = WhoopConfig::from_env();
    if let Some(base) = args.api_base {
        config = config.with_base_url(&base);
    }

    info!("Starting WHOOP MCP server on stdio");
    let registry = Arc::new(ToolRegistry::from_config(config));
    McpServer::new(registry).run_stdio().await?;

    Ok(())
}
