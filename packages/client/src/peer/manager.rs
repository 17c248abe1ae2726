//! Keeps one [`PeerLink`] per remote participant of the current video room.
//!
//! Every link runs on its own task with its own input queue. Inputs for one
//! link are applied strictly in order; links never wait on each other.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use gamehub_shared::protocol::{
    ClientEvent, ConnectionId, IceCandidate, ServerEvent, SessionDescription,
};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::Instant,
};

use crate::{config::NegotiationConfig, connection::SignalSender};

use super::{
    link::PeerLink,
    state::{NegotiationState, Role},
    transport::{LocalStream, PeerTransportFactory, RemoteStream, TransportEvent},
};

/// Remote streams currently published for rendering, by remote connection
pub type StreamMap = BTreeMap<ConnectionId, RemoteStream>;

#[derive(Debug)]
enum LinkInput {
    StartOffer,
    Offer(SessionDescription),
    Answer(SessionDescription),
    Candidate(IceCandidate),
    Close,
}

struct LinkHandle {
    inputs: mpsc::UnboundedSender<LinkInput>,
    state: watch::Receiver<NegotiationState>,
    task: JoinHandle<()>,
}

struct PendingCandidates {
    first_seen: Instant,
    candidates: Vec<IceCandidate>,
}

pub struct PeerManager {
    config: NegotiationConfig,
    factory: Arc<dyn PeerTransportFactory>,
    local: LocalStream,
    signals: SignalSender,
    links: HashMap<ConnectionId, LinkHandle>,
    tombstones: HashSet<ConnectionId>,
    pending: HashMap<ConnectionId, PendingCandidates>,
    streams: Arc<watch::Sender<StreamMap>>,
    retired: Vec<JoinHandle<()>>,
}

impl PeerManager {
    pub fn new(
        config: NegotiationConfig,
        factory: Arc<dyn PeerTransportFactory>,
        local: LocalStream,
        signals: SignalSender,
    ) -> Self {
        let (streams, _) = watch::channel(StreamMap::new());
        Self {
            config,
            factory,
            local,
            signals,
            links: HashMap::new(),
            tombstones: HashSet::new(),
            pending: HashMap::new(),
            streams: Arc::new(streams),
            retired: Vec::new(),
        }
    }

    /// Route a signaling event to the link it concerns
    pub fn handle_event(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::UserJoined(payload) => self.on_user_joined(payload.connection_id.clone()),
            ServerEvent::UserLeft(payload) => self.on_user_left(&payload.connection_id),
            ServerEvent::Offer(relayed) => {
                self.on_offer(relayed.from.clone(), relayed.offer.clone())
            }
            ServerEvent::Answer(relayed) => {
                self.on_answer(&relayed.from, relayed.answer.clone())
            }
            ServerEvent::IceCandidate(relayed) => {
                self.on_ice_candidate(relayed.from.clone(), relayed.candidate.clone())
            }
            // Existing members call the joiner; nothing to start here.
            ServerEvent::JoinedVideoRoom(payload) => {
                tracing::debug!(
                    room = %payload.room_id,
                    participants = payload.participants.len(),
                    "Waiting for offers from existing participants"
                );
            }
            _ => {}
        }
    }

    /// A new participant appeared: we are the caller.
    ///
    /// A fresh join is authoritative, so it clears a tombstone left by an
    /// earlier departure of the same connection.
    pub fn on_user_joined(&mut self, remote: ConnectionId) {
        if self.links.contains_key(&remote) {
            tracing::debug!(peer = %remote, "Duplicate user_joined ignored");
            return;
        }
        self.tombstones.remove(&remote);
        if self.spawn_link(remote.clone(), Role::Caller) {
            self.send_input(&remote, LinkInput::StartOffer);
        }
    }

    /// An offer arrived: we are the callee, unless a link already exists.
    pub fn on_offer(&mut self, from: ConnectionId, offer: SessionDescription) {
        if self.tombstones.contains(&from) {
            tracing::debug!(peer = %from, "Offer from closed peer discarded");
            return;
        }
        if self.links.contains_key(&from) {
            tracing::debug!(peer = %from, "Duplicate offer ignored");
            return;
        }
        if !self.spawn_link(from.clone(), Role::Callee) {
            return;
        }
        self.send_input(&from, LinkInput::Offer(offer));

        if let Some(pending) = self.pending.remove(&from) {
            if pending.first_seen.elapsed() <= self.config.ice_grace_period {
                tracing::debug!(
                    peer = %from,
                    count = pending.candidates.len(),
                    "Replaying buffered ICE candidates"
                );
                for candidate in pending.candidates {
                    self.send_input(&from, LinkInput::Candidate(candidate));
                }
            }
        }
    }

    pub fn on_answer(&mut self, from: &ConnectionId, answer: SessionDescription) {
        if self.tombstones.contains(from) || !self.links.contains_key(from) {
            tracing::debug!(peer = %from, "Answer for unknown peer discarded");
            return;
        }
        self.send_input(from, LinkInput::Answer(answer));
    }

    pub fn on_ice_candidate(&mut self, from: ConnectionId, candidate: IceCandidate) {
        if self.tombstones.contains(&from) {
            tracing::debug!(peer = %from, "ICE candidate from closed peer discarded");
            return;
        }
        if self.links.contains_key(&from) {
            self.send_input(&from, LinkInput::Candidate(candidate));
            return;
        }

        let grace = self.config.ice_grace_period;
        if grace.is_zero() {
            tracing::debug!(peer = %from, "ICE candidate for unknown peer dropped");
            return;
        }
        self.pending
            .retain(|_, pending| pending.first_seen.elapsed() <= grace);
        self.pending
            .entry(from)
            .or_insert_with(|| PendingCandidates {
                first_seen: Instant::now(),
                candidates: Vec::new(),
            })
            .candidates
            .push(candidate);
    }

    /// Close the link to a departed participant and forget it for good
    pub fn on_user_left(&mut self, remote: &ConnectionId) {
        self.pending.remove(remote);
        self.tombstones.insert(remote.clone());
        if let Some(handle) = self.links.remove(remote) {
            let _ = handle.inputs.send(LinkInput::Close);
            self.retired.retain(|task| !task.is_finished());
            self.retired.push(handle.task);
            tracing::info!(peer = %remote, "Peer left");
        }
    }

    /// Close every link and wait until all of them released their transport
    pub async fn close_all(&mut self) {
        let remotes: Vec<ConnectionId> = self.links.keys().cloned().collect();
        for remote in &remotes {
            self.on_user_left(remote);
        }
        self.pending.clear();
        for task in self.retired.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!("Peer link task ended abnormally: {}", e);
            }
        }
        self.streams.send_modify(|streams| streams.clear());
    }

    pub fn state_of(&self, remote: &ConnectionId) -> Option<NegotiationState> {
        self.links.get(remote).map(|handle| *handle.state.borrow())
    }

    pub fn watch_state(&self, remote: &ConnectionId) -> Option<watch::Receiver<NegotiationState>> {
        self.links.get(remote).map(|handle| handle.state.clone())
    }

    pub fn streams(&self) -> watch::Receiver<StreamMap> {
        self.streams.subscribe()
    }

    pub fn peers(&self) -> Vec<ConnectionId> {
        self.links.keys().cloned().collect()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_tombstoned(&self, remote: &ConnectionId) -> bool {
        self.tombstones.contains(remote)
    }

    fn send_input(&self, remote: &ConnectionId, input: LinkInput) {
        if let Some(handle) = self.links.get(remote) {
            if handle.inputs.send(input).is_err() {
                tracing::warn!(peer = %remote, "Peer link task is gone");
            }
        }
    }

    fn spawn_link(&mut self, remote: ConnectionId, role: Role) -> bool {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let transport = match self.factory.create(&remote, &self.config, events_tx) {
            Ok(transport) => transport,
            Err(e) => {
                tracing::error!(peer = %remote, "Failed to create peer transport: {}", e);
                return false;
            }
        };
        let (inputs, inputs_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(NegotiationState::Idle);
        let task = tokio::spawn(run_link(
            PeerLink::new(remote.clone(), role, transport),
            self.local.clone(),
            self.signals.clone(),
            inputs_rx,
            events_rx,
            state_tx,
            Arc::clone(&self.streams),
        ));
        tracing::debug!(peer = %remote, ?role, "Peer link created");
        self.links.insert(
            remote,
            LinkHandle {
                inputs,
                state,
                task,
            },
        );
        true
    }
}

async fn run_link(
    mut link: PeerLink,
    local: LocalStream,
    signals: SignalSender,
    mut inputs: mpsc::UnboundedReceiver<LinkInput>,
    mut transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    state: watch::Sender<NegotiationState>,
    streams: Arc<watch::Sender<StreamMap>>,
) {
    let remote = link.remote().clone();
    loop {
        tokio::select! {
            input = inputs.recv() => {
                let result = match input {
                    Some(LinkInput::StartOffer) => link.start_offer(&local, &signals).await,
                    Some(LinkInput::Offer(offer)) => link.accept_offer(offer, &local, &signals).await,
                    Some(LinkInput::Answer(answer)) => link.apply_answer(answer).await,
                    Some(LinkInput::Candidate(candidate)) => {
                        link.add_remote_candidate(candidate).await
                    }
                    Some(LinkInput::Close) | None => break,
                };
                if let Err(e) = result {
                    tracing::warn!(peer = %remote, "Negotiation step failed: {}", e);
                }
            }
            Some(event) = transport_events.recv() => {
                match event {
                    TransportEvent::LocalCandidate(candidate) => {
                        if signals
                            .send(ClientEvent::ice_candidate(remote.clone(), candidate))
                            .is_err()
                        {
                            tracing::warn!(peer = %remote, "Cannot send ICE candidate: signaling closed");
                        }
                    }
                    TransportEvent::RemoteStream(stream) => {
                        if link.on_remote_stream() {
                            streams.send_modify(|published| {
                                published.insert(remote.clone(), stream);
                            });
                        }
                    }
                    TransportEvent::StateChanged(transport_state) => {
                        link.on_transport_state(transport_state)
                    }
                }
            }
        }
        state.send_replace(link.state());
    }

    link.close().await;
    state.send_replace(link.state());
    streams.send_modify(|published| {
        published.remove(&remote);
    });
}
