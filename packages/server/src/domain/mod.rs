//! Domain layer: value objects, entities, and the room registry.

pub mod entity;
pub mod error;
pub mod event;
pub mod pusher;
pub mod registry;
pub mod value_object;

pub use entity::{
    ChatRoomSnapshot, Connection, DisconnectOutcome, RegistrySnapshot, RoomDeparture,
    VideoJoinOutcome, VideoRoomSnapshot,
};
pub use error::{EventValidationError, MessagePushError, RegistryError, ValueObjectError};
pub use event::{InboundEvent, Signal};
pub use pusher::{MessagePusher, PusherChannel};
pub use registry::{DEFAULT_VIDEO_ROOM_CAPACITY, RoomRegistry};
pub use value_object::{ChatRoomKey, ConnectionId, UserId, VideoRoomId};
