//! WebRTC media engine built on `webrtc-rs`.
//!
//! Each [`WebRtcTransport`] owns one `RTCPeerConnection`. Its callbacks are
//! forwarded to the link as [`TransportEvent`]s:
//!
//! - `on_ice_candidate` becomes [`TransportEvent::LocalCandidate`]
//! - `on_track` becomes [`TransportEvent::RemoteStream`]
//! - `on_peer_connection_state_change` becomes [`TransportEvent::StateChanged`]

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use gamehub_shared::protocol::{ConnectionId, IceCandidate, SdpType, SessionDescription};
use tokio::{sync::Mutex, task::JoinHandle};
use webrtc::{
    api::{
        APIBuilder,
        interceptor_registry::register_default_interceptors,
        media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine},
    },
    ice_transport::{
        ice_candidate::{RTCIceCandidate, RTCIceCandidateInit},
        ice_server::RTCIceServer,
    },
    media::Sample,
    peer_connection::{
        RTCPeerConnection, configuration::RTCConfiguration,
        peer_connection_state::RTCPeerConnectionState,
        sdp::session_description::RTCSessionDescription,
    },
    rtp_transceiver::{
        rtp_codec::{RTCRtpCodecCapability, RTPCodecType},
        rtp_receiver::RTCRtpReceiver,
        RTCRtpTransceiver,
    },
    track::{
        track_local::{TrackLocal, track_local_static_sample::TrackLocalStaticSample},
        track_remote::TrackRemote,
    },
};

use crate::{config::NegotiationConfig, error::TransportError};

use super::transport::{
    CaptureDevice, LocalStream, MediaTrack, PeerTransport, PeerTransportFactory, RemoteStream,
    TrackKind, TransportEvent, TransportEventSender, TransportState,
};

/// One 20 ms Opus frame of silence
const OPUS_SILENCE: [u8; 3] = [0xf8, 0xff, 0xfe];
const OPUS_FRAME: Duration = Duration::from_millis(20);

/// STUN / TURN servers and candidate pool for every peer connection
pub fn rtc_configuration(config: &NegotiationConfig) -> RTCConfiguration {
    let ice_servers = config
        .ice_servers
        .iter()
        .map(|server| RTCIceServer {
            urls: vec![server.urls.clone()],
            username: server.username.clone().unwrap_or_default(),
            credential: server.credential.clone().unwrap_or_default(),
            ..Default::default()
        })
        .collect();

    RTCConfiguration {
        ice_servers,
        ice_candidate_pool_size: config.ice_candidate_pool_size,
        ..Default::default()
    }
}

fn engine_error(context: &str, e: webrtc::Error) -> TransportError {
    TransportError::Media(format!("{}: {}", context, e))
}

fn track_kind(kind: RTPCodecType) -> TrackKind {
    match kind {
        RTPCodecType::Audio => TrackKind::Audio,
        _ => TrackKind::Video,
    }
}

fn codec_for(kind: TrackKind) -> RTCRtpCodecCapability {
    let (mime_type, clock_rate, channels) = match kind {
        TrackKind::Audio => (MIME_TYPE_OPUS, 48_000, 2),
        TrackKind::Video => (MIME_TYPE_VP8, 90_000, 0),
    };
    RTCRtpCodecCapability {
        mime_type: mime_type.to_owned(),
        clock_rate,
        channels,
        sdp_fmtp_line: String::new(),
        rtcp_feedback: vec![],
    }
}

async fn feed_silence(track: Arc<TrackLocalStaticSample>) {
    let mut ticker = tokio::time::interval(OPUS_FRAME);
    loop {
        ticker.tick().await;
        let sample = Sample {
            data: OPUS_SILENCE.to_vec().into(),
            duration: OPUS_FRAME,
            ..Default::default()
        };
        if let Err(e) = track.write_sample(&sample).await {
            tracing::debug!("Audio track stopped: {}", e);
            break;
        }
    }
}

/// A peer connection of the WebRTC engine.
///
/// The underlying `RTCPeerConnection` is created on first use, so the
/// factory stays synchronous. Remote candidates that arrive before the
/// remote description are held and applied right after it.
pub struct WebRtcTransport {
    remote: ConnectionId,
    configuration: RTCConfiguration,
    events: TransportEventSender,
    connection: Option<Arc<RTCPeerConnection>>,
    pending_candidates: Vec<RTCIceCandidateInit>,
    feeders: Vec<JoinHandle<()>>,
    closed: bool,
}

impl WebRtcTransport {
    pub fn new(
        remote: ConnectionId,
        configuration: RTCConfiguration,
        events: TransportEventSender,
    ) -> Self {
        Self {
            remote,
            configuration,
            events,
            connection: None,
            pending_candidates: Vec::new(),
            feeders: Vec::new(),
            closed: false,
        }
    }

    async fn connection(&mut self) -> Result<Arc<RTCPeerConnection>, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if let Some(connection) = &self.connection {
            return Ok(Arc::clone(connection));
        }

        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| engine_error("failed to register codecs", e))?;
        let registry = register_default_interceptors(Default::default(), &mut media_engine)
            .map_err(|e| engine_error("failed to register interceptors", e))?;
        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let connection = Arc::new(
            api.new_peer_connection(self.configuration.clone())
                .await
                .map_err(|e| engine_error("failed to create peer connection", e))?,
        );
        self.register_callbacks(&connection);
        tracing::debug!(peer = %self.remote, "Peer connection created");

        self.connection = Some(Arc::clone(&connection));
        Ok(connection)
    }

    fn register_callbacks(&self, connection: &RTCPeerConnection) {
        let events = self.events.clone();
        connection.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let events = events.clone();
            Box::pin(async move {
                // `None` marks the end of gathering.
                let Some(candidate) = candidate else {
                    return;
                };
                match candidate.to_json() {
                    Ok(init) => {
                        let _ = events.send(TransportEvent::LocalCandidate(IceCandidate {
                            candidate: init.candidate,
                            sdp_mid: init.sdp_mid,
                            sdp_m_line_index: init.sdp_mline_index,
                        }));
                    }
                    Err(e) => tracing::warn!("Cannot serialize local candidate: {}", e),
                }
            })
        }));

        let events = self.events.clone();
        connection.on_peer_connection_state_change(Box::new(
            move |state: RTCPeerConnectionState| {
                let events = events.clone();
                Box::pin(async move {
                    let state = match state {
                        RTCPeerConnectionState::New => TransportState::New,
                        RTCPeerConnectionState::Connecting => TransportState::Connecting,
                        RTCPeerConnectionState::Connected => TransportState::Connected,
                        RTCPeerConnectionState::Disconnected => TransportState::Disconnected,
                        RTCPeerConnectionState::Failed => TransportState::Failed,
                        RTCPeerConnectionState::Closed => TransportState::Closed,
                        _ => return,
                    };
                    let _ = events.send(TransportEvent::StateChanged(state));
                })
            },
        ));

        let events = self.events.clone();
        let remote = self.remote.clone();
        let received: Arc<Mutex<Vec<MediaTrack>>> = Arc::new(Mutex::new(Vec::new()));
        connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let events = events.clone();
                let remote = remote.clone();
                let received = Arc::clone(&received);
                Box::pin(async move {
                    let stream = {
                        let mut tracks = received.lock().await;
                        tracks.push(MediaTrack {
                            id: track.id().to_string(),
                            kind: track_kind(track.kind()),
                        });
                        RemoteStream {
                            id: track.stream_id().to_string(),
                            tracks: tracks.clone(),
                        }
                    };
                    tracing::info!(peer = %remote, stream = %stream.id, "Remote track added");
                    let _ = events.send(TransportEvent::RemoteStream(stream));

                    // Keep reading so RTCP feedback keeps flowing.
                    tokio::spawn(async move { while track.read_rtp().await.is_ok() {} });
                })
            },
        ));
    }

    async fn apply_pending_candidates(
        &mut self,
        connection: &RTCPeerConnection,
    ) -> Result<(), TransportError> {
        for candidate in std::mem::take(&mut self.pending_candidates) {
            connection
                .add_ice_candidate(candidate)
                .await
                .map_err(|e| TransportError::InvalidCandidate(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl PeerTransport for WebRtcTransport {
    async fn attach_local_stream(&mut self, stream: &LocalStream) -> Result<(), TransportError> {
        let connection = self.connection().await?;
        for track in &stream.tracks {
            let local = Arc::new(TrackLocalStaticSample::new(
                codec_for(track.kind),
                track.id.clone(),
                stream.id.clone(),
            ));
            connection
                .add_track(Arc::clone(&local) as Arc<dyn TrackLocal + Send + Sync>)
                .await
                .map_err(|e| engine_error("failed to add track", e))?;
            if track.kind == TrackKind::Audio {
                self.feeders.push(tokio::spawn(feed_silence(local)));
            }
        }
        Ok(())
    }

    async fn create_offer(&mut self) -> Result<SessionDescription, TransportError> {
        let connection = self.connection().await?;
        let offer = connection
            .create_offer(None)
            .await
            .map_err(|e| TransportError::InvalidState(e.to_string()))?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&mut self) -> Result<SessionDescription, TransportError> {
        let connection = self.connection().await?;
        let answer = connection
            .create_answer(None)
            .await
            .map_err(|e| TransportError::InvalidState(e.to_string()))?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(
        &mut self,
        description: SessionDescription,
    ) -> Result<(), TransportError> {
        let connection = self.connection().await?;
        connection
            .set_local_description(to_rtc_description(description)?)
            .await
            .map_err(|e| TransportError::InvalidDescription(e.to_string()))
    }

    async fn set_remote_description(
        &mut self,
        description: SessionDescription,
    ) -> Result<(), TransportError> {
        let connection = self.connection().await?;
        connection
            .set_remote_description(to_rtc_description(description)?)
            .await
            .map_err(|e| TransportError::InvalidDescription(e.to_string()))?;
        self.apply_pending_candidates(&connection).await
    }

    async fn add_ice_candidate(&mut self, candidate: IceCandidate) -> Result<(), TransportError> {
        let connection = self.connection().await?;
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: None,
        };
        if connection.remote_description().await.is_none() {
            self.pending_candidates.push(init);
            return Ok(());
        }
        connection
            .add_ice_candidate(init)
            .await
            .map_err(|e| TransportError::InvalidCandidate(e.to_string()))
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for feeder in self.feeders.drain(..) {
            feeder.abort();
        }
        self.pending_candidates.clear();
        if let Some(connection) = self.connection.take() {
            if let Err(e) = connection.close().await {
                tracing::warn!(peer = %self.remote, "Failed to close peer connection: {}", e);
            }
        }
    }
}

fn to_rtc_description(
    description: SessionDescription,
) -> Result<RTCSessionDescription, TransportError> {
    let parsed = match description.kind {
        SdpType::Offer => RTCSessionDescription::offer(description.sdp),
        SdpType::Answer => RTCSessionDescription::answer(description.sdp),
        other => {
            return Err(TransportError::InvalidDescription(format!(
                "unsupported description type {:?}",
                other
            )));
        }
    };
    parsed.map_err(|e| TransportError::InvalidDescription(e.to_string()))
}

/// Creates a [`WebRtcTransport`] per link from the call's ICE settings
#[derive(Debug, Default, Clone)]
pub struct WebRtcTransportFactory;

impl WebRtcTransportFactory {
    pub fn new() -> Self {
        Self
    }
}

impl PeerTransportFactory for WebRtcTransportFactory {
    fn create(
        &self,
        remote: &ConnectionId,
        config: &NegotiationConfig,
        events: TransportEventSender,
    ) -> Result<Box<dyn PeerTransport>, TransportError> {
        tracing::debug!(
            peer = %remote,
            ice_servers = config.ice_servers.len(),
            "Creating WebRTC transport"
        );
        Ok(Box::new(WebRtcTransport::new(
            remote.clone(),
            rtc_configuration(config),
            events,
        )))
    }
}

/// Microphone stand-in for terminals without audio capture.
///
/// Yields a single audio track; the engine sends Opus silence on it.
#[derive(Debug, Default)]
pub struct SilentMicrophone {
    label: String,
    running: bool,
}

impl SilentMicrophone {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            running: false,
        }
    }
}

#[async_trait]
impl CaptureDevice for SilentMicrophone {
    async fn start(&mut self) -> Result<LocalStream, TransportError> {
        self.running = true;
        Ok(LocalStream {
            id: format!("{}-local", self.label),
            tracks: vec![MediaTrack {
                id: format!("{}-mic", self.label),
                kind: TrackKind::Audio,
            }],
        })
    }

    fn stop(&mut self) {
        if self.running {
            tracing::debug!(device = %self.label, "Microphone stopped");
        }
        self.running = false;
    }
}
