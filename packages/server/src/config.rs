//! Server configuration (command line with environment fallbacks).

use clap::Parser;

use crate::domain::DEFAULT_VIDEO_ROOM_CAPACITY;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "gamehub-signaling")]
#[command(about = "Signaling server for chat channels and video-call rooms", long_about = None)]
pub struct ServerConfig {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "GAMEHUB_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "GAMEHUB_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Maximum number of participants in one video room
    #[arg(
        long,
        env = "GAMEHUB_VIDEO_ROOM_CAPACITY",
        default_value_t = DEFAULT_VIDEO_ROOM_CAPACITY,
        value_parser = parse_capacity
    )]
    pub video_room_capacity: usize,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long, env = "GAMEHUB_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            video_room_capacity: DEFAULT_VIDEO_ROOM_CAPACITY,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_capacity(value: &str) -> Result<usize, String> {
    let capacity: usize = value
        .parse()
        .map_err(|e| format!("'{}' is not a number: {}", value, e))?;
    if capacity == 0 {
        return Err("video room capacity must be at least 1".to_string());
    }
    Ok(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // テスト項目: 引数なしの場合はデフォルト値になる
        // given (前提条件):
        let args = ["gamehub-signaling"];

        // when (操作):
        let config = ServerConfig::try_parse_from(args).unwrap();

        // then (期待する結果):
        assert_eq!(config.port, 5000);
        assert_eq!(config.video_room_capacity, 20);
        assert_eq!(config.bind_addr(), "127.0.0.1:5000");
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        // テスト項目: 定員 0 は引数エラーになる
        // given (前提条件):
        let args = ["gamehub-signaling", "--video-room-capacity", "0"];

        // when (操作):
        let result = ServerConfig::try_parse_from(args);

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_arguments() {
        // テスト項目: 引数で host / port / 定員を指定できる
        // given (前提条件):
        let args = [
            "gamehub-signaling",
            "-H",
            "0.0.0.0",
            "-p",
            "3000",
            "--video-room-capacity",
            "4",
        ];

        // when (操作):
        let config = ServerConfig::try_parse_from(args).unwrap();

        // then (期待する結果):
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.video_room_capacity, 4);
    }
}
