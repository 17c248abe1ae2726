//! UseCase: relay offer / answer / ICE candidate
//!
//! Forwards the payload untouched to its target, tagged with the sender's
//! connection id as `from`.

use gamehub_shared::protocol::{RelayedAnswer, RelayedIceCandidate, RelayedOffer, ServerEvent};

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, Signal};

use super::{error::SignalingError, notify::push_event};

pub struct RelaySignalUseCase<'a> {
    message_pusher: &'a dyn MessagePusher,
}

impl<'a> RelaySignalUseCase<'a> {
    pub fn new(message_pusher: &'a dyn MessagePusher) -> Self {
        Self { message_pusher }
    }

    /// Forward `signal` from `from` to `to`.
    ///
    /// A target that is no longer connected yields
    /// [`SignalingError::UnknownTarget`]; nothing else happens.
    pub fn execute(
        &self,
        from: &ConnectionId,
        to: &ConnectionId,
        signal: Signal,
    ) -> Result<(), SignalingError> {
        let kind = signal.name();
        let event = match signal {
            Signal::Offer(offer) => ServerEvent::Offer(RelayedOffer {
                from: from.clone(),
                offer,
            }),
            Signal::Answer(answer) => ServerEvent::Answer(RelayedAnswer {
                from: from.clone(),
                answer,
            }),
            Signal::IceCandidate(candidate) => ServerEvent::IceCandidate(RelayedIceCandidate {
                from: from.clone(),
                candidate,
            }),
        };

        match push_event(self.message_pusher, to, &event) {
            Ok(()) => {
                tracing::debug!(connection = %from, target = %to, event = kind, "Relayed signal");
                Ok(())
            }
            Err(MessagePushError::ClientNotFound(_)) => {
                Err(SignalingError::UnknownTarget(to.clone()))
            }
            Err(MessagePushError::PushFailed(reason)) => {
                // Target is disconnecting: same as an unknown target
                tracing::debug!(target = %to, "Relay target queue closed: {}", reason);
                Err(SignalingError::UnknownTarget(to.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{conn, connected_pusher, drain};
    use gamehub_shared::protocol::{IceCandidate, SessionDescription};

    #[test]
    fn test_offer_is_forwarded_with_sender() {
        // テスト項目: offer が送信者の connection id 付きで宛先に転送される
        // given (前提条件):
        let (pusher, mut rx) = connected_pusher(&["a", "b"]);
        let offer = SessionDescription::offer("v=0 offer-from-a");

        // when (操作):
        let result = RelaySignalUseCase::new(&pusher).execute(
            &conn("a"),
            &conn("b"),
            Signal::Offer(offer.clone()),
        );

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(
            drain(&mut rx, "b"),
            vec![ServerEvent::Offer(RelayedOffer {
                from: conn("a"),
                offer,
            })]
        );
        assert!(drain(&mut rx, "a").is_empty());
    }

    #[test]
    fn test_ice_candidate_is_forwarded_verbatim() {
        // テスト項目: ICE candidate のフィールドがそのまま転送される
        // given (前提条件):
        let (pusher, mut rx) = connected_pusher(&["a", "b"]);
        let candidate = IceCandidate {
            candidate: "candidate:842163049 1 udp 1677729535 203.0.113.7 46154 typ srflx".to_string(),
            sdp_mid: Some("0".to_string()),
            sdp_m_line_index: Some(0),
        };

        // when (操作):
        RelaySignalUseCase::new(&pusher)
            .execute(&conn("b"), &conn("a"), Signal::IceCandidate(candidate.clone()))
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            drain(&mut rx, "a"),
            vec![ServerEvent::IceCandidate(RelayedIceCandidate {
                from: conn("b"),
                candidate,
            })]
        );
    }

    #[test]
    fn test_unknown_target_is_reported() {
        // テスト項目: 接続していない宛先への中継は UnknownTarget になる
        // given (前提条件):
        let (pusher, _rx) = connected_pusher(&["a"]);

        // when (操作):
        let result = RelaySignalUseCase::new(&pusher).execute(
            &conn("a"),
            &conn("gone"),
            Signal::Answer(SessionDescription::answer("v=0")),
        );

        // then (期待する結果):
        assert_eq!(result, Err(SignalingError::UnknownTarget(conn("gone"))));
    }
}
