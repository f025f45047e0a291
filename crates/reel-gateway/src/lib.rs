//! Realtime rooms: which live connections follow which party, and fan-out
//! of party events to them.

pub mod connection;
pub mod dispatcher;

pub use dispatcher::{ConnectionId, Dispatcher, RoomPublisher};
