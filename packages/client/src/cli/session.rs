//! One interactive session: membership check, channel chat, optional call.

use std::{collections::HashSet, future, path::Path, sync::Arc};

use gamehub_shared::{
    protocol::{ConnectionId, ServerEvent},
    time::SystemClock,
};
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::{mpsc, watch};

use crate::{
    chat::{ChatBridge, ChatIdentity},
    config::{ClientConfig, NegotiationConfig},
    connection::SignalingConnection,
    error::{CallError, SessionError},
    peer::{SilentMicrophone, StreamMap, WebRtcTransportFactory},
    rest::{ChannelRef, RestClient, ServerMembership, VoiceClip},
    video_call::VideoCall,
};

use super::{
    domain::Command,
    formatter::MessageFormatter,
    ui::redisplay_prompt,
};

/// Ask a yes/no question on the terminal
async fn confirm(question: String) -> bool {
    tokio::task::spawn_blocking(move || {
        let mut rl = DefaultEditor::new().ok()?;
        rl.readline(&question).ok()
    })
    .await
    .ok()
    .flatten()
    .map(|answer| matches!(answer.trim(), "y" | "Y" | "yes"))
    .unwrap_or(false)
}

async fn ensure_membership(rest: &RestClient, config: &ClientConfig) -> Result<(), SessionError> {
    let is_member = match rest.is_member(&config.server, &config.username).await {
        Ok(is_member) => is_member,
        Err(e) => {
            tracing::error!(server = %config.server, "Failed to check membership: {}", e);
            false
        }
    };
    if is_member {
        return Ok(());
    }

    let question = format!(
        "You are not a member of '{}'. Join it? [y/N] ",
        config.server
    );
    if !confirm(question).await {
        return Err(SessionError::NotMember(config.server.clone()));
    }
    rest.join_server(&config.server, &config.username).await?;
    println!("Joined server '{}'.", config.server);
    Ok(())
}

async fn read_clip(path: &Path) -> std::io::Result<VoiceClip> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "voiceMessage.webm".to_string());
    Ok(VoiceClip { file_name, bytes })
}

async fn start_call(config: &ClientConfig) -> Result<VideoCall, CallError> {
    let connection = SignalingConnection::connect(&config.url).await?;
    VideoCall::join(
        connection,
        Box::new(SilentMicrophone::new(config.username.clone())),
        Arc::new(WebRtcTransportFactory::new()),
        NegotiationConfig::default(),
        &config.channel,
        &config.username,
    )
    .await
}

/// Next event of the active call; pending forever without one
async fn next_call_event(call: &mut Option<VideoCall>) -> Result<ServerEvent, CallError> {
    match call.as_mut() {
        Some(call) => call.pump().await,
        None => future::pending().await,
    }
}

/// Next snapshot of the published remote streams; `None` once the call is
/// gone
async fn streams_changed(
    streams: &mut Option<watch::Receiver<StreamMap>>,
) -> Option<StreamMap> {
    match streams.as_mut() {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(rx.borrow_and_update().clone()),
            Err(_) => None,
        },
        None => future::pending().await,
    }
}

fn spawn_readline(username: String) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        let prompt = format!("{}> ", username);

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    input_rx
}

/// Run one client session until the user exits or the connection drops
pub async fn run_client_session(config: &ClientConfig) -> Result<(), SessionError> {
    let rest = RestClient::new(&config.api_url)?;
    ensure_membership(&rest, config).await?;

    let connection = SignalingConnection::connect(&config.url).await?;
    let channel = ChannelRef::new(config.server.clone(), config.channel.clone());
    let mut bridge = ChatBridge::mount(
        connection,
        Arc::new(rest.clone()),
        Arc::new(SystemClock),
        channel,
        ChatIdentity::new(config.username.clone()),
    )
    .await?;

    print!(
        "{}",
        MessageFormatter::format_history(
            &config.server,
            &config.channel,
            bridge.messages(),
            &config.api_url
        )
    );
    println!(
        "\nYou are '{}'. Type messages and press Enter to send. /help lists commands.\n",
        config.username
    );

    let username = config.username.clone();
    let mut input_rx = spawn_readline(username.clone());
    let mut call: Option<VideoCall> = None;
    let mut streams: Option<watch::Receiver<StreamMap>> = None;
    let mut announced: HashSet<ConnectionId> = HashSet::new();

    let outcome = loop {
        tokio::select! {
            line = input_rx.recv() => {
                let Some(line) = line else { break Ok(()) };
                match Command::parse(&line) {
                    Command::Text(text) => match bridge.send_text(&text).await {
                        Ok(message) => {
                            print!("{}", MessageFormatter::format_sent_confirmation(&message.timestamp));
                        }
                        Err(e) => print!("{}", MessageFormatter::format_send_error(&e)),
                    },
                    Command::Voice(path) => match read_clip(&path).await {
                        Ok(clip) => match bridge.send_voice(&clip).await {
                            Ok(message) => {
                                print!("{}", MessageFormatter::format_sent_confirmation(&message.timestamp));
                            }
                            Err(e) => print!("{}", MessageFormatter::format_send_error(&e)),
                        },
                        Err(e) => println!("\n! Cannot read {}: {}", path.display(), e),
                    },
                    Command::Call => {
                        if call.is_some() {
                            println!("\n! Already in a call");
                        } else {
                            match start_call(config).await {
                                Ok(joined) => {
                                    print!(
                                        "{}",
                                        MessageFormatter::format_call_joined(
                                            joined.room_id(),
                                            joined.participants_at_join()
                                        )
                                    );
                                    streams = Some(joined.streams());
                                    call = Some(joined);
                                }
                                Err(CallError::RoomFull(room)) => {
                                    print!("{}", MessageFormatter::format_room_full(&room));
                                }
                                Err(e) => println!("\n! Cannot join the call: {}", e),
                            }
                        }
                    }
                    Command::HangUp => match call.take() {
                        Some(active) => {
                            streams = None;
                            announced.clear();
                            active.leave().await;
                            println!("\n* left the call");
                        }
                        None => println!("\n! Not in a call"),
                    },
                    Command::LeaveServer => {
                        match rest.leave_server(&config.server, &config.username).await {
                            Ok(()) => println!("\n* left server '{}'", config.server),
                            Err(e) => println!("\n! Failed to leave server: {}", e),
                        }
                    }
                    Command::Help => println!("{}", MessageFormatter::format_help()),
                    Command::Quit => break Ok(()),
                    Command::Unknown(line) => println!("\n! Unknown command: {}", line),
                }
                redisplay_prompt(&username);
            }
            message = bridge.next_message() => {
                let Some(message) = message else { break Err(SessionError::ConnectionLost) };
                print!("{}", MessageFormatter::format_chat_message(&message, &config.api_url));
                redisplay_prompt(&username);
            }
            event = next_call_event(&mut call) => {
                match event {
                    Ok(ServerEvent::UserJoined(payload)) => {
                        print!(
                            "{}",
                            MessageFormatter::format_participant_joined(&payload.user_id, &payload.connection_id)
                        );
                    }
                    Ok(ServerEvent::UserLeft(payload)) => {
                        print!("{}", MessageFormatter::format_participant_left(&payload.connection_id));
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::warn!("Video call ended: {}", e);
                        println!("\n! Video call connection lost");
                        call = None;
                        streams = None;
                    }
                }
                redisplay_prompt(&username);
            }
            published = streams_changed(&mut streams) => {
                let Some(published) = published else {
                    streams = None;
                    continue;
                };
                for (peer, stream) in &published {
                    if !announced.contains(peer) {
                        print!("{}", MessageFormatter::format_peer_connected(peer, stream.tracks.len()));
                        redisplay_prompt(&username);
                    }
                }
                announced = published.keys().cloned().collect();
            }
        }
    };

    if let Some(active) = call.take() {
        active.leave().await;
    }
    bridge.unmount().await;
    outcome
}
