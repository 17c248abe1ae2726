//! Channel chat: history, live relay and de-duplicated display list.

mod bridge;
mod message_list;

pub use bridge::{ChatBridge, ChatIdentity};
pub use message_list::MessageList;
