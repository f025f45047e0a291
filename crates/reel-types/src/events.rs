use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{PartyMovie, PartyView};

/// Events pushed to every connection subscribed to a party room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RoomEvent {
    /// A user joined the party
    #[serde(rename = "userJoinedPartyRealtime", rename_all = "camelCase")]
    Joined {
        user_id: Uuid,
        user_name: String,
        user_photo: Option<String>,
        party: PartyView,
    },

    /// A member left. `party` is absent when the party was deleted.
    #[serde(rename = "userLeftPartyRealtime", rename_all = "camelCase")]
    Left {
        user_id: Uuid,
        user_name: String,
        party_id: Uuid,
        party_deleted: bool,
        party: Option<PartyView>,
    },

    /// Every current member liked the same movie
    #[serde(rename = "partyMatchFound", rename_all = "camelCase")]
    MatchFound {
        message: String,
        matched_movie: PartyMovie,
        party: PartyView,
    },
}

impl RoomEvent {
    /// Wire name of the event, as seen by clients in the `type` field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Joined { .. } => "userJoinedPartyRealtime",
            Self::Left { .. } => "userLeftPartyRealtime",
            Self::MatchFound { .. } => "partyMatchFound",
        }
    }
}

/// Commands sent FROM client TO server over the realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RoomCommand {
    /// Start receiving events for a party
    #[serde(rename = "joinPartyRoom", rename_all = "camelCase")]
    JoinPartyRoom {
        #[serde(default)]
        party_id: Option<String>,
    },

    /// Stop receiving events for a party
    #[serde(rename = "leavePartyRoom", rename_all = "camelCase")]
    LeavePartyRoom {
        #[serde(default)]
        party_id: Option<String>,
    },
}
