// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Drives a Parallel task run that calls back into a public `/mcp` endpoint.

use anyhow::Result;
use clap::Parser;

use whoop_mcp_server::demo::{run_demo, ParallelConfig};

#[derive(Parser)]
#[command(name = "parallel-demo")]
#[command(about = "Parallel AI x WHOOP MCP integration demo")]
#[command(after_help = "Examples:\n  parallel-demo https://abc123.ngrok-free.app")]
struct Args {
    /// Public URL of the web server, without the /mcp suffix
    ngrok_url: String,

    /// Task API base URL
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let mut config = match ParallelConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Please set your Parallel AI API key:");
            eprintln!("export PARALLEL_API_KEY='your_api_key_here'");
            std::process::exit(1);
        }
    };
    if let Some(base_url) = args.base_url {
        config = config.with_base_url(base_url);
    }

    tokio::select! {
        outcome = run_demo(config, &args.ngrok_url) => {
            outcome?;
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nDemo interrupted by user");
        }
    }

    Ok(())
}
