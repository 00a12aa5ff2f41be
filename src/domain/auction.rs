use {
    super::bid::Bid,
    super::error::MarketError,
    chrono::{DateTime, Duration, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

/// Auctions close this long before the call itself, so both sides have time
/// to prepare.
pub const AUCTION_LEAD: Duration = Duration::hours(24);

/// Minimum runway an auction must have at creation. A slot scheduled closer
/// than `AUCTION_LEAD + MIN_RUNWAY` from now is rejected outright.
pub const MIN_RUNWAY: Duration = Duration::hours(1);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuctionStatus {
    Draft,
    Scheduled,
    Active,
    Ended,
    Cancelled,
}

impl AuctionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Active => "active",
            Self::Ended => "ended",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Cancelled)
    }

    pub fn can_transition_to(&self, new: &AuctionStatus) -> bool {
        matches!(
            (self, new),
            (Self::Draft, Self::Scheduled)
                | (Self::Draft, Self::Active)
                | (Self::Scheduled, Self::Active)
                | (Self::Active, Self::Ended)
                | (Self::Active, Self::Cancelled)
        )
    }
}

impl fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for AuctionStatus {
    type Error = MarketError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "draft" => Ok(Self::Draft),
            "scheduled" => Ok(Self::Scheduled),
            "active" => Ok(Self::Active),
            "ended" => Ok(Self::Ended),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(MarketError::Validation(format!(
                "unknown auction status: {other}"
            ))),
        }
    }
}

/// Auction snapshot as read from the database. The highest-bid fields here
/// are the single source of truth for "current winner": they are only ever
/// written by the conditional outbid update, never recomputed from the ledger
/// on the hot path.
#[derive(Debug, Clone, Serialize)]
pub struct Auction {
    pub id: Uuid,
    pub call_slot_id: Uuid,
    pub status: AuctionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub current_highest_bid: i64,
    pub current_winner_id: Option<Uuid>,
    pub min_increment: i64,
    pub buy_now_price: Option<i64>,
    pub bid_count: i32,
    pub unique_bidders: i32,
}

impl Auction {
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status == AuctionStatus::Active && now < self.end_time
    }
}

/// Compute the auction window for a slot scheduled at `scheduled_start`.
/// The auction runs from `now` until 24h before the call; slots scheduled
/// within 25h of now leave no usable window and are rejected.
pub fn auction_window(
    scheduled_start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), MarketError> {
    let end_time = scheduled_start - AUCTION_LEAD;
    if end_time < now + MIN_RUNWAY {
        return Err(MarketError::Validation(format!(
            "call must be scheduled at least {}h out, got start {scheduled_start}",
            (AUCTION_LEAD + MIN_RUNWAY).num_hours()
        )));
    }
    Ok((now, end_time))
}

/// How an acceptable bid will be routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidKind {
    /// Beats the current highest by at least the minimum increment.
    Regular,
    /// Meets the buy-now price: closes the auction immediately.
    BuyNow,
}

/// Pre-flight validation of a bid amount against the auction snapshot.
/// This is advisory (the authoritative check is the conditional update at
/// commit time) but it lets obviously stale bids fail before any hold is
/// created.
pub fn classify_bid(auction: &Auction, amount: i64, now: DateTime<Utc>) -> Result<BidKind, MarketError> {
    if !auction.is_open(now) {
        return Err(MarketError::AuctionNotActive);
    }
    if let Some(buy_now) = auction.buy_now_price
        && amount >= buy_now
    {
        return Ok(BidKind::BuyNow);
    }
    if amount < auction.current_highest_bid + auction.min_increment {
        return Err(MarketError::StaleBid {
            current: auction.current_highest_bid,
        });
    }
    Ok(BidKind::Regular)
}

/// Winner selection over the full ledger: highest amount, ties broken by
/// earliest placement so a later equal bid cannot displace the first one.
/// Assumes `bids` is the complete ledger for one auction.
pub fn pick_winner(bids: &[Bid]) -> Option<&Bid> {
    bids.iter()
        .max_by(|a, b| {
            a.amount
                .cmp(&b.amount)
                .then_with(|| b.created_at.cmp(&a.created_at))
        })
}
