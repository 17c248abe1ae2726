//! Message formatting utilities for client display.

use gamehub_shared::{
    message::{ChatMessage, MessageKind},
    protocol::ConnectionId,
};

use crate::{error::SendError, rest::resolve_media_url};

const RULE: &str = "------------------------------------------------------------";
const BANNER: &str = "============================================================";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the channel history shown after mounting
    pub fn format_history(
        server: &str,
        channel: &str,
        messages: &[ChatMessage],
        api_base: &str,
    ) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n\n{}\n", BANNER));
        output.push_str(&format!("#{} @ {}\n", channel, server));

        if messages.is_empty() {
            output.push_str("(No messages yet)\n");
        } else {
            for message in messages {
                output.push_str(&format!(
                    "[{}] {}: {}\n",
                    message.timestamp,
                    message.user,
                    Self::content(message, api_base)
                ));
            }
        }

        output.push_str(&format!("{}\n", BANNER));
        output
    }

    /// Format a chat message
    ///
    /// Voice clips are shown as a resolved URL.
    pub fn format_chat_message(message: &ChatMessage, api_base: &str) -> String {
        format!(
            "\n\n{}\n@{}: {}\nsent at {}\n{}\n",
            RULE,
            message.user,
            Self::content(message, api_base),
            message.timestamp,
            RULE
        )
    }

    pub fn format_sent_confirmation(timestamp: &str) -> String {
        format!("sent at {}\n", timestamp)
    }

    /// User-facing text for a failed send
    pub fn format_send_error(error: &SendError) -> String {
        match error {
            SendError::NotMember => "\n! You must join this server to send messages!\n".to_string(),
            SendError::Empty => "\n! Nothing to send\n".to_string(),
            SendError::Failed(e) => {
                tracing::debug!("Send failure detail: {}", e);
                "\n! Failed to send message. Please try again.\n".to_string()
            }
        }
    }

    pub fn format_call_joined(room_id: &str, participants: &[ConnectionId]) -> String {
        format!(
            "\n* joined video room '{}' ({} already here)\n",
            room_id,
            participants.len()
        )
    }

    pub fn format_participant_joined(user_id: &str, connection_id: &ConnectionId) -> String {
        format!("\n+ {} joined the call ({})\n", user_id, connection_id)
    }

    pub fn format_participant_left(connection_id: &ConnectionId) -> String {
        format!("\n- {} left the call\n", connection_id)
    }

    pub fn format_peer_connected(connection_id: &ConnectionId, track_count: usize) -> String {
        format!(
            "\n~ receiving {} track(s) from {}\n",
            track_count, connection_id
        )
    }

    pub fn format_room_full(room_id: &str) -> String {
        format!(
            "\n! Video room '{}' is full. Try again later.\n",
            room_id
        )
    }

    pub fn format_help() -> String {
        [
            "",
            "  <text>          send a message",
            "  /voice <path>   upload and send a voice clip",
            "  /call           join the channel's video call",
            "  /hangup         leave the video call",
            "  /leave-server   leave this server",
            "  /quit           exit",
            "",
        ]
        .join("\n")
    }

    fn content(message: &ChatMessage, api_base: &str) -> String {
        match message.kind {
            MessageKind::Text => message.content.clone(),
            MessageKind::Voice => format!("[voice] {}", resolve_media_url(api_base, &message.content)),
        }
    }
}
