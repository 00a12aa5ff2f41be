use serde::Deserialize;

/// Video-provider webhook payload, modeled as a tagged union over the event
/// types we act on. Anything else lands in `Unknown` and is acknowledged
/// without side effects.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum VideoEvent {
    #[serde(rename = "meeting.started", alias = "room.started")]
    MeetingStarted { payload: RoomPayload },

    #[serde(rename = "participant.joined")]
    ParticipantJoined { payload: ParticipantPayload },

    #[serde(rename = "participant.left")]
    ParticipantLeft { payload: ParticipantPayload },

    #[serde(rename = "meeting.ended", alias = "room.ended")]
    MeetingEnded { payload: RoomPayload },

    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomPayload {
    pub room: String,
    #[serde(default)]
    pub event_ts: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantPayload {
    pub room: String,
    /// The user id we embedded in the meeting token.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub event_ts: i64,
}

impl VideoEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MeetingStarted { .. } => "meeting.started",
            Self::ParticipantJoined { .. } => "participant.joined",
            Self::ParticipantLeft { .. } => "participant.left",
            Self::MeetingEnded { .. } => "meeting.ended",
            Self::Unknown => "unknown",
        }
    }

    pub fn room(&self) -> Option<&str> {
        match self {
            Self::MeetingStarted { payload } | Self::MeetingEnded { payload } => {
                Some(&payload.room)
            }
            Self::ParticipantJoined { payload } | Self::ParticipantLeft { payload } => {
                Some(&payload.room)
            }
            Self::Unknown => None,
        }
    }

    /// Which participant the event is about, for dedup scoping: two joins
    /// in the same second are distinct deliveries when the users differ.
    pub fn participant(&self) -> Option<&str> {
        match self {
            Self::ParticipantJoined { payload } | Self::ParticipantLeft { payload } => {
                payload.user_id.as_deref()
            }
            _ => None,
        }
    }

    pub fn event_ts(&self) -> i64 {
        match self {
            Self::MeetingStarted { payload } | Self::MeetingEnded { payload } => payload.event_ts,
            Self::ParticipantJoined { payload } | Self::ParticipantLeft { payload } => {
                payload.event_ts
            }
            Self::Unknown => 0,
        }
    }
}
