//! Media engine abstraction.
//!
//! A [`PeerTransport`] is one peer connection inside the media engine. The
//! negotiation state machine drives it; the engine reports back through
//! [`TransportEvent`]s on the channel it was created with.

use async_trait::async_trait;
use gamehub_shared::protocol::{ConnectionId, IceCandidate, SessionDescription};
use tokio::sync::mpsc;

use crate::{config::NegotiationConfig, error::TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    pub id: String,
    pub kind: TrackKind,
}

/// The local capture stream. Every peer link attaches the same tracks;
/// only the capture device owner may stop it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStream {
    pub id: String,
    pub tracks: Vec<MediaTrack>,
}

/// Media received from one remote participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStream {
    pub id: String,
    pub tracks: Vec<MediaTrack>,
}

/// Connection state reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Callbacks from the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A local candidate was gathered and must be sent to the remote
    LocalCandidate(IceCandidate),
    RemoteStream(RemoteStream),
    StateChanged(TransportState),
}

pub type TransportEventSender = mpsc::UnboundedSender<TransportEvent>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PeerTransport: Send {
    async fn attach_local_stream(&mut self, stream: &LocalStream) -> Result<(), TransportError>;

    async fn create_offer(&mut self) -> Result<SessionDescription, TransportError>;

    async fn create_answer(&mut self) -> Result<SessionDescription, TransportError>;

    async fn set_local_description(
        &mut self,
        description: SessionDescription,
    ) -> Result<(), TransportError>;

    async fn set_remote_description(
        &mut self,
        description: SessionDescription,
    ) -> Result<(), TransportError>;

    /// Add a remote candidate to the pool; valid in any state
    async fn add_ice_candidate(&mut self, candidate: IceCandidate) -> Result<(), TransportError>;

    /// Release the engine resources. Idempotent.
    async fn close(&mut self);
}

/// Creates one transport per peer link
pub trait PeerTransportFactory: Send + Sync {
    fn create(
        &self,
        remote: &ConnectionId,
        config: &NegotiationConfig,
        events: TransportEventSender,
    ) -> Result<Box<dyn PeerTransport>, TransportError>;
}

/// Local camera / microphone
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptureDevice: Send {
    async fn start(&mut self) -> Result<LocalStream, TransportError>;

    /// Stop every local track
    fn stop(&mut self);
}
