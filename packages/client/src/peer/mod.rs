//! Peer negotiation: one state machine per remote participant.

mod link;
mod manager;
mod rtc;
mod simulated;
mod state;
mod transport;

pub use link::PeerLink;
pub use manager::{PeerManager, StreamMap};
pub use rtc::{SilentMicrophone, WebRtcTransport, WebRtcTransportFactory, rtc_configuration};
pub use simulated::{SimulatedCapture, SimulatedTransport, SimulatedTransportFactory};
pub use state::{NegotiationState, Role};
pub use transport::{
    CaptureDevice, LocalStream, MediaTrack, PeerTransport, PeerTransportFactory, RemoteStream,
    TrackKind, TransportEvent, TransportEventSender, TransportState,
};

#[cfg(test)]
pub use transport::{MockCaptureDevice, MockPeerTransport};
