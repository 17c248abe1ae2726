//! One negotiated media relationship with one remote connection.
//!
//! Transitions are the only way the state changes. Each async step runs to
//! completion before the next input for the same link is looked at (the
//! link is driven by its own task, see `manager`), so an offer is always
//! created, applied, and sent before any answer for it can be handled.

use gamehub_shared::protocol::{ClientEvent, ConnectionId, IceCandidate, SessionDescription};

use crate::{connection::SignalSender, error::NegotiationError};

use super::{
    state::{NegotiationState, Role},
    transport::{LocalStream, PeerTransport, TransportState},
};

pub struct PeerLink {
    remote: ConnectionId,
    role: Role,
    state: NegotiationState,
    transport: Box<dyn PeerTransport>,
}

impl PeerLink {
    pub fn new(remote: ConnectionId, role: Role, transport: Box<dyn PeerTransport>) -> Self {
        Self {
            remote,
            role,
            state: NegotiationState::Idle,
            transport,
        }
    }

    pub fn remote(&self) -> &ConnectionId {
        &self.remote
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    fn expect(
        &self,
        role: Role,
        state: NegotiationState,
        action: &'static str,
    ) -> Result<(), NegotiationError> {
        if self.role != role || self.state != state {
            return Err(NegotiationError::InvalidTransition {
                state: self.state,
                action,
            });
        }
        Ok(())
    }

    /// Caller: attach local media, create and apply an offer, send it.
    pub async fn start_offer(
        &mut self,
        local: &LocalStream,
        signals: &SignalSender,
    ) -> Result<(), NegotiationError> {
        self.expect(Role::Caller, NegotiationState::Idle, "send offer")?;

        self.transport.attach_local_stream(local).await?;
        self.state = NegotiationState::Offering;

        let offer = self.transport.create_offer().await?;
        self.transport.set_local_description(offer.clone()).await?;
        signals
            .send(ClientEvent::offer(self.remote.clone(), offer))
            .map_err(|_| NegotiationError::SignalingClosed)?;

        tracing::debug!(peer = %self.remote, "Offer sent");
        Ok(())
    }

    /// Callee: apply the remote offer, answer it.
    pub async fn accept_offer(
        &mut self,
        offer: SessionDescription,
        local: &LocalStream,
        signals: &SignalSender,
    ) -> Result<(), NegotiationError> {
        self.expect(Role::Callee, NegotiationState::Idle, "accept offer")?;
        self.state = NegotiationState::AwaitingOffer;

        self.transport.attach_local_stream(local).await?;
        self.transport.set_remote_description(offer).await?;
        self.state = NegotiationState::DescriptionExchanged;

        let answer = self.transport.create_answer().await?;
        self.transport.set_local_description(answer.clone()).await?;
        signals
            .send(ClientEvent::answer(self.remote.clone(), answer))
            .map_err(|_| NegotiationError::SignalingClosed)?;
        self.state = NegotiationState::IceExchanging;

        tracing::debug!(peer = %self.remote, "Answer sent");
        Ok(())
    }

    /// Caller: apply the remote answer to our offer.
    pub async fn apply_answer(&mut self, answer: SessionDescription) -> Result<(), NegotiationError> {
        self.expect(Role::Caller, NegotiationState::Offering, "apply answer")?;

        self.transport.set_remote_description(answer).await?;
        self.state = NegotiationState::IceExchanging;

        tracing::debug!(peer = %self.remote, "Answer applied");
        Ok(())
    }

    /// Add a remote candidate. Accepted in any state except `Closed`.
    pub async fn add_remote_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> Result<(), NegotiationError> {
        if self.state.is_closed() {
            return Err(NegotiationError::InvalidTransition {
                state: self.state,
                action: "add candidate",
            });
        }
        self.transport.add_ice_candidate(candidate).await?;
        Ok(())
    }

    /// Remote media arrived. Returns `false` if the link is already closed.
    pub fn on_remote_stream(&mut self) -> bool {
        if self.state.is_closed() {
            return false;
        }
        if self.state != NegotiationState::Connected {
            tracing::info!(peer = %self.remote, "Peer connected");
            self.state = NegotiationState::Connected;
        }
        true
    }

    /// Engine state changes are logged only; failures are not retried.
    pub fn on_transport_state(&self, state: TransportState) {
        match state {
            TransportState::Failed | TransportState::Disconnected => {
                tracing::warn!(
                    peer = %self.remote,
                    ?state,
                    "Peer transport {:?}; leave and rejoin the call to retry",
                    state
                );
            }
            _ => tracing::debug!(peer = %self.remote, ?state, "Peer transport state"),
        }
    }

    /// Release the transport. Idempotent.
    pub async fn close(&mut self) {
        if self.state.is_closed() {
            return;
        }
        self.transport.close().await;
        self.state = NegotiationState::Closed;
        tracing::debug!(peer = %self.remote, "Peer link closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::TransportError,
        peer::transport::{MediaTrack, MockPeerTransport, TrackKind},
    };

    fn local() -> LocalStream {
        LocalStream {
            id: "local".to_string(),
            tracks: vec![MediaTrack {
                id: "cam".to_string(),
                kind: TrackKind::Video,
            }],
        }
    }

    fn happy_transport() -> MockPeerTransport {
        let mut transport = MockPeerTransport::new();
        transport.expect_attach_local_stream().returning(|_| Ok(()));
        transport
            .expect_create_offer()
            .returning(|| Ok(SessionDescription::offer("offer-sdp")));
        transport
            .expect_create_answer()
            .returning(|| Ok(SessionDescription::answer("answer-sdp")));
        transport.expect_set_local_description().returning(|_| Ok(()));
        transport.expect_set_remote_description().returning(|_| Ok(()));
        transport.expect_add_ice_candidate().returning(|_| Ok(()));
        transport.expect_close().returning(|| ());
        transport
    }

    #[tokio::test]
    async fn test_caller_sends_offer_then_applies_answer() {
        // テスト項目: caller は offer を送信して Offering になり、answer で IceExchanging になる
        // given (前提条件):
        let (signals, mut sent) = SignalSender::channel();
        let mut link = PeerLink::new(ConnectionId::new("b"), Role::Caller, Box::new(happy_transport()));

        // when (操作):
        link.start_offer(&local(), &signals).await.unwrap();
        let after_offer = link.state();
        link.apply_answer(SessionDescription::answer("answer-sdp"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(after_offer, NegotiationState::Offering);
        assert_eq!(link.state(), NegotiationState::IceExchanging);
        assert_eq!(
            sent.recv().await,
            Some(ClientEvent::offer(
                ConnectionId::new("b"),
                SessionDescription::offer("offer-sdp")
            ))
        );
    }

    #[tokio::test]
    async fn test_callee_answers_offer() {
        // テスト項目: callee は offer を受けて answer を送信し IceExchanging になる
        // given (前提条件):
        let (signals, mut sent) = SignalSender::channel();
        let mut link = PeerLink::new(ConnectionId::new("a"), Role::Callee, Box::new(happy_transport()));

        // when (操作):
        link.accept_offer(SessionDescription::offer("offer-sdp"), &local(), &signals)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(link.state(), NegotiationState::IceExchanging);
        assert_eq!(
            sent.recv().await,
            Some(ClientEvent::answer(
                ConnectionId::new("a"),
                SessionDescription::answer("answer-sdp")
            ))
        );
    }

    #[tokio::test]
    async fn test_answer_before_offer_is_rejected() {
        // テスト項目: offer を送る前の answer は InvalidTransition になり状態は変わらない
        // given (前提条件):
        let mut transport = MockPeerTransport::new();
        transport.expect_set_remote_description().never();
        let mut link = PeerLink::new(ConnectionId::new("b"), Role::Caller, Box::new(transport));

        // when (操作):
        let result = link.apply_answer(SessionDescription::answer("early")).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(NegotiationError::InvalidTransition {
                state: NegotiationState::Idle,
                action: "apply answer",
            })
        );
        assert_eq!(link.state(), NegotiationState::Idle);
    }

    #[tokio::test]
    async fn test_callee_cannot_accept_second_offer() {
        // テスト項目: 既に交渉済みの callee は 2 回目の offer を受け付けない
        // given (前提条件):
        let (signals, _sent) = SignalSender::channel();
        let mut link = PeerLink::new(ConnectionId::new("a"), Role::Callee, Box::new(happy_transport()));
        link.accept_offer(SessionDescription::offer("first"), &local(), &signals)
            .await
            .unwrap();

        // when (操作):
        let result = link
            .accept_offer(SessionDescription::offer("second"), &local(), &signals)
            .await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(NegotiationError::InvalidTransition { .. })
        ));
        assert_eq!(link.state(), NegotiationState::IceExchanging);
    }

    #[tokio::test]
    async fn test_candidate_accepted_before_descriptions() {
        // テスト項目: ICE candidate は記述交換前でも transport に渡される
        // given (前提条件):
        let mut transport = MockPeerTransport::new();
        transport
            .expect_add_ice_candidate()
            .times(1)
            .returning(|_| Ok(()));
        let mut link = PeerLink::new(ConnectionId::new("b"), Role::Caller, Box::new(transport));

        // when (操作):
        let result = link.add_remote_candidate(IceCandidate::new("candidate:1")).await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(link.state(), NegotiationState::Idle);
    }

    #[tokio::test]
    async fn test_offer_failure_is_reported() {
        // テスト項目: offer の生成に失敗するとエラーが返り、offer は送信されない
        // given (前提条件):
        let (signals, mut sent) = SignalSender::channel();
        let mut transport = MockPeerTransport::new();
        transport.expect_attach_local_stream().returning(|_| Ok(()));
        transport
            .expect_create_offer()
            .returning(|| Err(TransportError::InvalidState("no codecs".to_string())));
        let mut link = PeerLink::new(ConnectionId::new("b"), Role::Caller, Box::new(transport));

        // when (操作):
        let result = link.start_offer(&local(), &signals).await;

        // then (期待する結果):
        assert!(matches!(result, Err(NegotiationError::Transport(_))));
        drop(signals);
        assert_eq!(sent.recv().await, None);
    }

    #[tokio::test]
    async fn test_close_is_terminal_and_idempotent() {
        // テスト項目: close 後は Closed になり、remote stream や candidate で復活しない
        // given (前提条件):
        let mut transport = MockPeerTransport::new();
        transport.expect_close().times(1).returning(|| ());
        transport.expect_add_ice_candidate().never();
        let mut link = PeerLink::new(ConnectionId::new("b"), Role::Caller, Box::new(transport));

        // when (操作):
        link.close().await;
        link.close().await;
        let published = link.on_remote_stream();
        let candidate = link.add_remote_candidate(IceCandidate::new("late")).await;

        // then (期待する結果):
        assert_eq!(link.state(), NegotiationState::Closed);
        assert!(!published);
        assert!(candidate.is_err());
    }
}
