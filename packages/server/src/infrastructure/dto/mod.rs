//! Data transfer objects.
//!
//! - `conversion`: inbound wire frames → validated [`crate::domain::InboundEvent`]
//! - `http`: JSON bodies of the read-only HTTP endpoints

pub mod conversion;
pub mod http;

pub use conversion::decode_client_frame;
