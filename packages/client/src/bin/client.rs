//! GameHub chat client.
//!
//! Joins one channel of a server: shows its history, relays new messages
//! live, uploads voice clips and can join the channel's video call.
//! Reconnects on disconnection (max 5 attempts with 5 second interval).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin gamehub-client -- -n alice -s guild1 -c general
//! ```

use clap::Parser;

use gamehub_client::ClientConfig;
use gamehub_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    let config = ClientConfig::parse();

    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);

    if let Err(e) = gamehub_client::cli::run_client(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
