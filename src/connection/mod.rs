//! Connection setup
//!
//! Identifier tokens exchanged when a connection is established.

mod id;

pub use id::{ConnectionId, CONNECTION_ID_LENGTH};
