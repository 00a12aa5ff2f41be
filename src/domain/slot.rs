use {
    super::error::MarketError,
    chrono::{DateTime, Duration, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

/// How early the room may be created before the scheduled start.
pub const JOIN_WINDOW_LEAD: Duration = Duration::minutes(15);

/// How long past the scheduled start we wait before flagging a slot where
/// nobody ever joined.
pub const NO_SHOW_GRACE: Duration = Duration::minutes(15);

/// A call offer as listed by an influencer. Immutable through this core once
/// its auction has bids; prices are cents.
#[derive(Debug, Clone, Serialize)]
pub struct CallSlot {
    pub id: Uuid,
    pub influencer_id: Uuid,
    pub title: String,
    pub description: String,
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: i32,
    pub starting_price: i64,
    pub min_increment: i64,
    pub buy_now_price: Option<i64>,
    pub published: bool,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCallSlot {
    pub influencer_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: i32,
    pub starting_price: i64,
    pub min_increment: i64,
    pub buy_now_price: Option<i64>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl NewCallSlot {
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.title.trim().is_empty() {
            return Err(MarketError::Validation("title must not be empty".into()));
        }
        if self.duration_minutes <= 0 {
            return Err(MarketError::Validation(format!(
                "duration must be positive, got: {}",
                self.duration_minutes
            )));
        }
        if self.starting_price < 0 {
            return Err(MarketError::Validation("starting price cannot be negative".into()));
        }
        if self.min_increment <= 0 {
            return Err(MarketError::Validation(format!(
                "minimum increment must be positive, got: {}",
                self.min_increment
            )));
        }
        if let Some(buy_now) = self.buy_now_price
            && buy_now <= self.starting_price
        {
            return Err(MarketError::Validation(format!(
                "buy-now price {buy_now} must exceed starting price {}",
                self.starting_price
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Pending,
    Ready,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }

    pub fn can_transition_to(&self, new: &CallStatus) -> bool {
        matches!(
            (self, new),
            (Self::Pending, Self::Ready)
                | (Self::Pending, Self::Cancelled)
                | (Self::Pending, Self::NoShow)
                | (Self::Ready, Self::InProgress)
                | (Self::Ready, Self::Completed)
                | (Self::Ready, Self::Cancelled)
                | (Self::Ready, Self::NoShow)
                | (Self::InProgress, Self::Completed)
        )
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for CallStatus {
    type Error = MarketError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "ready" => Ok(Self::Ready),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "no_show" => Ok(Self::NoShow),
            other => Err(MarketError::Validation(format!(
                "unknown call status: {other}"
            ))),
        }
    }
}

/// The settlement record: one per auction, created when the winning hold is
/// captured. Tracks the subsequent call's lifecycle.
#[derive(Debug, Clone, Serialize)]
pub struct PurchasedSlot {
    pub id: Uuid,
    pub call_slot_id: Uuid,
    pub auction_id: Uuid,
    pub fan_id: Uuid,
    pub influencer_id: Uuid,
    pub winning_bid_amount: i64,
    pub platform_fee: i64,
    pub influencer_payout: i64,
    pub call_status: CallStatus,
    pub room_name: Option<String>,
    pub room_url: Option<String>,
    pub influencer_joined: bool,
    pub fan_joined: bool,
    pub call_started_at: Option<DateTime<Utc>>,
    pub call_ended_at: Option<DateTime<Utc>>,
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: i32,
}

impl PurchasedSlot {
    pub fn participant_role(&self, user_id: Uuid) -> Option<ParticipantRole> {
        if user_id == self.influencer_id {
            Some(ParticipantRole::Influencer)
        } else if user_id == self.fan_id {
            Some(ParticipantRole::Fan)
        } else {
            None
        }
    }

    /// Seconds until the scheduled start; negative once the call time passed.
    pub fn time_until_start(&self, now: DateTime<Utc>) -> i64 {
        (self.scheduled_start - now).num_seconds()
    }

    /// The window in which room creation and joining are permitted:
    /// 15 minutes before the scheduled start until the scheduled end.
    pub fn join_window_open(&self, now: DateTime<Utc>) -> bool {
        let opens = self.scheduled_start - JOIN_WINDOW_LEAD;
        let closes = self.scheduled_start + Duration::minutes(self.duration_minutes as i64);
        now >= opens && now <= closes
    }

    /// Actual call duration in seconds, once both ends are stamped.
    pub fn call_duration_seconds(&self) -> Option<i64> {
        match (self.call_started_at, self.call_ended_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds().max(0)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantRole {
    Influencer,
    Fan,
}
