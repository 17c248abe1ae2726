//! Signaling server for chat channels and video-call rooms.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin gamehub-signaling
//! cargo run --bin gamehub-signaling -- --host 0.0.0.0 --port 5000 --video-room-capacity 20
//! ```

use clap::Parser;
use gamehub_shared::logger::setup_logger;
use gamehub_signaling::{Server, ServerConfig};

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);

    let server = Server::new(config);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
