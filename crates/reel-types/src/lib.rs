//! Types shared between the REST surface, the party core and the realtime gateway.

pub mod api;
pub mod events;
pub mod models;
