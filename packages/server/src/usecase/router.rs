//! Signaling router: applies one command at a time to the registry.
//!
//! The router owns the [`RoomRegistry`] and the [`MessagePusher`]. It is
//! driven by exactly one task (see [`super::dispatcher`]), so every
//! inbound event is handled to completion, including its fan-out, before
//! the next one is looked at.

use std::sync::Arc;

use gamehub_shared::{
    protocol::{ConnectedPayload, ServerEvent},
    time::Clock,
};

use crate::domain::{
    ConnectionId, DisconnectOutcome, InboundEvent, MessagePusher, PusherChannel, RegistrySnapshot,
    RoomRegistry,
};

use super::{
    broadcast_message::BroadcastMessageUseCase, channel_membership::ChannelMembershipUseCase,
    disconnect_connection::DisconnectConnectionUseCase, error::SignalingError,
    join_video_room::JoinVideoRoomUseCase, leave_video_room::LeaveVideoRoomUseCase,
    notify::push_event, relay_signal::RelaySignalUseCase,
};

pub struct SignalingRouter {
    registry: RoomRegistry,
    message_pusher: Box<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl SignalingRouter {
    pub fn new(
        registry: RoomRegistry,
        message_pusher: Box<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            message_pusher,
            clock,
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Track a new connection and tell it its id
    pub fn connect(&mut self, connection_id: ConnectionId, sender: PusherChannel) {
        let now = self.clock.now_millis();
        if !self.registry.register_connection(connection_id.clone(), now) {
            tracing::warn!(connection = %connection_id, "Connection id already registered");
        }
        self.message_pusher
            .register_client(connection_id.clone(), sender);

        let hello = ServerEvent::Connected(ConnectedPayload {
            connection_id: connection_id.clone(),
        });
        if let Err(e) = push_event(self.message_pusher.as_ref(), &connection_id, &hello) {
            tracing::warn!(connection = %connection_id, "Failed to send connected: {}", e);
        }
        tracing::info!(
            connection = %connection_id,
            connections = self.registry.connection_count(),
            "Connection registered"
        );
    }

    /// Apply one validated inbound event from `connection_id`
    pub fn dispatch(
        &mut self,
        connection_id: &ConnectionId,
        event: InboundEvent,
    ) -> Result<(), SignalingError> {
        let pusher = self.message_pusher.as_ref();
        match event {
            InboundEvent::JoinVideoRoom { room_id, user_id } => {
                JoinVideoRoomUseCase::new(&mut self.registry, pusher).execute(
                    connection_id,
                    room_id,
                    user_id,
                )?;
            }
            InboundEvent::LeaveVideoRoom { room_id } => {
                LeaveVideoRoomUseCase::new(&mut self.registry, pusher)
                    .execute(connection_id, &room_id);
            }
            InboundEvent::Signal { to, signal } => {
                RelaySignalUseCase::new(pusher).execute(connection_id, &to, signal)?;
            }
            InboundEvent::JoinChannel(key) => {
                ChannelMembershipUseCase::new(&mut self.registry).join(connection_id, key);
            }
            InboundEvent::LeaveChannel(key) => {
                ChannelMembershipUseCase::new(&mut self.registry).leave(connection_id, &key);
            }
            InboundEvent::NewMessage { room, message } => {
                BroadcastMessageUseCase::new(&self.registry, pusher).execute(
                    connection_id,
                    &room,
                    message,
                );
            }
        }
        Ok(())
    }

    /// Forget a connection and notify the video rooms it was in
    pub fn disconnect(&mut self, connection_id: &ConnectionId) -> DisconnectOutcome {
        DisconnectConnectionUseCase::new(&mut self.registry, self.message_pusher.as_mut())
            .execute(connection_id)
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.registry.snapshot()
    }
}
