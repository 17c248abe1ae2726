//! Use case layer: one handler per inbound event, driven by the router.

pub mod broadcast_message;
pub mod channel_membership;
pub mod disconnect_connection;
pub mod dispatcher;
pub mod error;
pub mod join_video_room;
pub mod leave_video_room;
mod notify;
pub mod relay_signal;
pub mod router;

#[cfg(test)]
pub(crate) mod test_support;

pub use broadcast_message::BroadcastMessageUseCase;
pub use channel_membership::ChannelMembershipUseCase;
pub use disconnect_connection::DisconnectConnectionUseCase;
pub use dispatcher::{Dispatcher, RouterCommand};
pub use error::{DispatchError, SignalingError};
pub use join_video_room::JoinVideoRoomUseCase;
pub use leave_video_room::LeaveVideoRoomUseCase;
pub use relay_signal::RelaySignalUseCase;
pub use router::SignalingRouter;
