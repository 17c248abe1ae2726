//! In-process media engine for tests.
//!
//! Produces synthetic session descriptions and a single host candidate per
//! link, and reports the remote stream once both descriptions are applied
//! and at least one remote candidate has arrived. Real calls go through
//! [`super::WebRtcTransport`].

use async_trait::async_trait;
use gamehub_shared::protocol::{ConnectionId, IceCandidate, SdpType, SessionDescription};

use crate::{config::NegotiationConfig, error::TransportError};

use super::transport::{
    CaptureDevice, LocalStream, MediaTrack, PeerTransport, PeerTransportFactory, RemoteStream,
    TrackKind, TransportEvent, TransportEventSender, TransportState,
};

const TRACK_PREFIX: &str = "a=track:";

fn render_sdp(owner: &str, stream: Option<&LocalStream>) -> String {
    let mut lines = vec![
        "v=0".to_string(),
        format!("o={} 0 0 IN IP4 127.0.0.1", owner),
        "s=-".to_string(),
    ];
    if let Some(stream) = stream {
        lines.push(format!("a=msid-semantic:{}", stream.id));
        for track in &stream.tracks {
            let kind = match track.kind {
                TrackKind::Audio => "audio",
                TrackKind::Video => "video",
            };
            lines.push(format!("m={}", kind));
            lines.push(format!("{}{}", TRACK_PREFIX, track.id));
        }
    }
    lines.join("\r\n")
}

fn parse_tracks(sdp: &str) -> Vec<MediaTrack> {
    let mut tracks = Vec::new();
    let mut kind = TrackKind::Video;
    for line in sdp.lines() {
        match line.trim() {
            "m=audio" => kind = TrackKind::Audio,
            "m=video" => kind = TrackKind::Video,
            other => {
                if let Some(id) = other.strip_prefix(TRACK_PREFIX) {
                    tracks.push(MediaTrack {
                        id: id.to_string(),
                        kind,
                    });
                }
            }
        }
    }
    tracks
}

pub struct SimulatedTransport {
    local_id: String,
    remote: ConnectionId,
    events: TransportEventSender,
    attached: Option<LocalStream>,
    local: Option<SessionDescription>,
    remote_description: Option<SessionDescription>,
    remote_candidates: usize,
    connected: bool,
    closed: bool,
}

impl SimulatedTransport {
    pub fn new(local_id: impl Into<String>, remote: ConnectionId, events: TransportEventSender) -> Self {
        let transport = Self {
            local_id: local_id.into(),
            remote,
            events,
            attached: None,
            local: None,
            remote_description: None,
            remote_candidates: 0,
            connected: false,
            closed: false,
        };
        transport.emit(TransportEvent::StateChanged(TransportState::New));
        transport
    }

    fn emit(&self, event: TransportEvent) {
        // The link may already be gone; nothing to report to then.
        let _ = self.events.send(event);
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    fn maybe_connect(&mut self) {
        if self.connected || self.remote_candidates == 0 {
            return;
        }
        let Some(remote) = &self.remote_description else {
            return;
        };
        if self.local.is_none() {
            return;
        }
        self.connected = true;
        let stream = RemoteStream {
            id: format!("{}-stream", self.remote),
            tracks: parse_tracks(&remote.sdp),
        };
        self.emit(TransportEvent::StateChanged(TransportState::Connected));
        self.emit(TransportEvent::RemoteStream(stream));
    }
}

#[async_trait]
impl PeerTransport for SimulatedTransport {
    async fn attach_local_stream(&mut self, stream: &LocalStream) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.attached = Some(stream.clone());
        Ok(())
    }

    async fn create_offer(&mut self) -> Result<SessionDescription, TransportError> {
        self.ensure_open()?;
        Ok(SessionDescription::offer(render_sdp(
            &self.local_id,
            self.attached.as_ref(),
        )))
    }

    async fn create_answer(&mut self) -> Result<SessionDescription, TransportError> {
        self.ensure_open()?;
        match &self.remote_description {
            Some(remote) if remote.kind == SdpType::Offer => Ok(SessionDescription::answer(
                render_sdp(&self.local_id, self.attached.as_ref()),
            )),
            _ => Err(TransportError::InvalidState(
                "no remote offer to answer".to_string(),
            )),
        }
    }

    async fn set_local_description(
        &mut self,
        description: SessionDescription,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        if description.sdp.is_empty() {
            return Err(TransportError::InvalidDescription("empty sdp".to_string()));
        }
        self.local = Some(description);
        self.emit(TransportEvent::StateChanged(TransportState::Connecting));
        self.emit(TransportEvent::LocalCandidate(IceCandidate {
            candidate: format!(
                "candidate:1 1 udp 2122260223 127.0.0.1 9 typ host generation 0 ufrag {}",
                self.local_id
            ),
            sdp_mid: Some("0".to_string()),
            sdp_m_line_index: Some(0),
        }));
        self.maybe_connect();
        Ok(())
    }

    async fn set_remote_description(
        &mut self,
        description: SessionDescription,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        if !description.sdp.starts_with("v=0") {
            return Err(TransportError::InvalidDescription(
                "missing version line".to_string(),
            ));
        }
        self.remote_description = Some(description);
        self.maybe_connect();
        Ok(())
    }

    async fn add_ice_candidate(&mut self, candidate: IceCandidate) -> Result<(), TransportError> {
        self.ensure_open()?;
        if !candidate.candidate.starts_with("candidate:") {
            return Err(TransportError::InvalidCandidate(candidate.candidate));
        }
        self.remote_candidates += 1;
        self.maybe_connect();
        Ok(())
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.emit(TransportEvent::StateChanged(TransportState::Closed));
    }
}

/// Creates a [`SimulatedTransport`] per link
#[derive(Debug, Clone)]
pub struct SimulatedTransportFactory {
    local_id: String,
}

impl SimulatedTransportFactory {
    pub fn new(local_id: impl Into<String>) -> Self {
        Self {
            local_id: local_id.into(),
        }
    }
}

impl PeerTransportFactory for SimulatedTransportFactory {
    fn create(
        &self,
        remote: &ConnectionId,
        config: &NegotiationConfig,
        events: TransportEventSender,
    ) -> Result<Box<dyn PeerTransport>, TransportError> {
        tracing::debug!(
            peer = %remote,
            ice_servers = config.ice_servers.len(),
            "Creating simulated transport"
        );
        Ok(Box::new(SimulatedTransport::new(
            self.local_id.clone(),
            remote.clone(),
            events,
        )))
    }
}

/// Capture device yielding one audio and one video track
#[derive(Debug, Default)]
pub struct SimulatedCapture {
    label: String,
    running: bool,
}

impl SimulatedCapture {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

#[async_trait]
impl CaptureDevice for SimulatedCapture {
    async fn start(&mut self) -> Result<LocalStream, TransportError> {
        self.running = true;
        Ok(LocalStream {
            id: format!("{}-local", self.label),
            tracks: vec![
                MediaTrack {
                    id: format!("{}-mic", self.label),
                    kind: TrackKind::Audio,
                },
                MediaTrack {
                    id: format!("{}-cam", self.label),
                    kind: TrackKind::Video,
                },
            ],
        })
    }

    fn stop(&mut self) {
        if self.running {
            tracing::debug!(device = %self.label, "Capture stopped");
        }
        self.running = false;
    }
}
