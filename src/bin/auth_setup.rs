// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing::info;

use whoop_mcp_server::config::WhoopConfig;
use whoop_mcp_server::constants::oauth;
use whoop_mcp_server::oauth2_client::{authentication_status, OAuth2Client, OAuth2Config, OAuthFlow};
use whoop_mcp_server::token_store::TokenStore;

#[derive(Parser)]
#[command(name = "whoop-auth")]
#[command(about = "Set up WHOOP OAuth2 authentication from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize in the browser and save the token
    Login {
        /// Callback port (must match the registered redirect URI)
        #[arg(long, default_value_t = oauth::CALLBACK_PORT)]
        port: u16,

        /// Seconds to wait for the redirect
        #[arg(long, default_value_t = oauth::AUTH_TIMEOUT_SECS)]
        timeout: u64,

        /// Print the authorization URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
    },
    /// Show whether a token is saved
    Status,
    /// Delete the saved token
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = WhoopConfig::from_env();
    let store = TokenStore::new(config.token_file.clone());

    match cli.command {
        Commands::Login {
            port,
            timeout,
            no_browser,
        } => {
            let oauth_config = OAuth2Config::from_whoop(&config)
                .context("Set WHOOP_CLIENT_ID and WHOOP_CLIENT_SECRET before logging in")?;
            let mut flow = OAuthFlow::new(OAuth2Client::new(oauth_config, store))
                .with_callback_port(port)
                .with_timeout(Duration::from_secs(timeout));
            if no_browser {
                flow = flow.with_browser_launcher(|url| {
                    println!("\nOpen this URL to authorize:\n{}\n", url);
                    Ok(())
                });
            }

            info!("Starting WHOOP authorization on port {}", port);
            println!("{}", flow.authenticate().await);
        }
        Commands::Status => {
            println!("{}", authentication_status(&store).await);
        }
        Commands::Logout => {
            store.clear().await?;
            println!("Removed token file {}", store.path().display());
        }
    }

    Ok(())
}
