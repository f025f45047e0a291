//! Movie parties: the party document and its mutation rules, match
//! detection, short join codes, and the service that loads, mutates,
//! persists and announces parties.

pub mod aggregate;
pub mod error;
pub mod matching;
pub mod service;
pub mod short_code;

pub use aggregate::{LeaveOutcome, Party};
pub use error::{PartyError, PartyResult};
pub use service::{LeaveResult, LikeResult, PartyService};
pub use short_code::{RandomCodes, ShortCodeSource};
