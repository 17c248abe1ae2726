//! Client configuration.

use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "gamehub-client")]
#[command(about = "GameHub chat client: channel chat with voice clips and video calls", long_about = None)]
pub struct ClientConfig {
    /// Username (REST identity)
    #[arg(short = 'n', long, env = "GAMEHUB_USERNAME")]
    pub username: String,

    /// Server (guild) name
    #[arg(short = 's', long, env = "GAMEHUB_SERVER")]
    pub server: String,

    /// Channel name
    #[arg(short = 'c', long, env = "GAMEHUB_CHANNEL", default_value = "general")]
    pub channel: String,

    /// Signaling WebSocket URL
    #[arg(
        short = 'u',
        long,
        env = "GAMEHUB_SIGNALING_URL",
        default_value = "ws://127.0.0.1:5000/ws"
    )]
    pub url: String,

    /// REST API base URL
    #[arg(long, env = "GAMEHUB_API_URL", default_value = "http://127.0.0.1:8000")]
    pub api_url: String,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long, env = "GAMEHUB_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,
}

/// STUN / TURN server entry handed to the media engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceServer {
    pub urls: String,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServer {
    pub fn stun(urls: &str) -> Self {
        Self {
            urls: urls.to_string(),
            username: None,
            credential: None,
        }
    }

    pub fn turn(urls: &str, username: &str, credential: &str) -> Self {
        Self {
            urls: urls.to_string(),
            username: Some(username.to_string()),
            credential: Some(credential.to_string()),
        }
    }
}

/// Settings shared by every peer link of a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationConfig {
    pub ice_servers: Vec<IceServer>,
    pub ice_candidate_pool_size: u8,
    /// How long ICE candidates from a not-yet-known peer are held.
    ///
    /// Zero drops them immediately.
    pub ice_grace_period: Duration,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![
                IceServer::stun("stun:stun.l.google.com:19302"),
                IceServer::stun("stun:stun1.l.google.com:19302"),
                IceServer::stun("stun:stun2.l.google.com:19302"),
                IceServer::turn(
                    "turn:openrelay.metered.ca:80",
                    "openrelayproject",
                    "openrelayproject",
                ),
                IceServer::turn(
                    "turn:openrelay.metered.ca:443",
                    "openrelayproject",
                    "openrelayproject",
                ),
                IceServer::turn(
                    "turn:openrelay.metered.ca:443?transport=tcp",
                    "openrelayproject",
                    "openrelayproject",
                ),
            ],
            ice_candidate_pool_size: 10,
            ice_grace_period: Duration::ZERO,
        }
    }
}
