#![allow(dead_code)]

use {
    callbid::domain::error::MarketError,
    callbid::domain::id::{HoldId, RoomName},
    callbid::domain::provider::{
        CapturedHold, Notifier, PayerProfile, PaymentGateway, Room, VideoProvider,
    },
    callbid::domain::slot::NewCallSlot,
    callbid::services::listing,
    chrono::{DateTime, Duration, Utc},
    sqlx::PgPool,
    std::{
        collections::HashMap,
        future::Future,
        pin::Pin,
        sync::{
            Mutex,
            atomic::{AtomicBool, AtomicU64, Ordering},
        },
    },
    uuid::Uuid,
};

/// Connect to the integration database, running migrations on first use.
/// Tests share one database and isolate by fresh UUIDs, so no truncation is
/// needed. Returns `None` (and the test skips) when `TEST_DATABASE_URL` is
/// not configured.
pub async fn try_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping database test");
        return None;
    };
    let pool = PgPool::connect(&url)
        .await
        .expect("failed to connect to test db");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");
    Some(pool)
}

pub async fn insert_user(pool: &PgPool) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        r#"
        INSERT INTO users (id, display_name, stripe_customer_id, stripe_payment_method_id)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(format!("user-{id}"))
    .bind(format!("cus_{}", id.simple()))
    .bind(format!("pm_{}", id.simple()))
    .execute(pool)
    .await
    .expect("insert user");
    id
}

pub async fn insert_user_without_card(pool: &PgPool) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO users (id, display_name) VALUES ($1, $2)")
        .bind(id)
        .bind(format!("user-{id}"))
        .execute(pool)
        .await
        .expect("insert user");
    id
}

pub struct Fixture {
    pub auction_id: Uuid,
    pub call_slot_id: Uuid,
    pub influencer_id: Uuid,
}

/// A published slot 30h out (comfortably past the 25h floor) with an active
/// auction.
pub async fn create_auction(
    pool: &PgPool,
    starting_price: i64,
    min_increment: i64,
    buy_now_price: Option<i64>,
) -> Fixture {
    let influencer_id = insert_user(pool).await;
    let (slot, auction) = listing::create_call_slot(
        pool,
        NewCallSlot {
            influencer_id,
            title: "test call".into(),
            description: String::new(),
            scheduled_start: Utc::now() + Duration::hours(30),
            duration_minutes: 30,
            starting_price,
            min_increment,
            buy_now_price,
            thumbnail_url: None,
        },
    )
    .await
    .expect("create call slot");

    Fixture {
        auction_id: auction.id,
        call_slot_id: slot.id,
        influencer_id,
    }
}

/// Pull the scheduled start into the present so the join window is open.
pub async fn open_join_window(pool: &PgPool, call_slot_id: Uuid) {
    sqlx::query("UPDATE call_slots SET scheduled_start = now() WHERE id = $1")
        .bind(call_slot_id)
        .execute(pool)
        .await
        .expect("move scheduled start");
}

// ── Fake providers ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldState {
    Held,
    Captured,
    Cancelled,
}

/// In-memory payment gateway with the same idempotency contract as the
/// Stripe adapter.
#[derive(Default)]
pub struct FakeGateway {
    holds: Mutex<HashMap<String, (HoldState, i64)>>,
    /// Number of Held to Captured transitions, the "money actually moved"
    /// counter that must never exceed 1 per auction.
    capture_transitions: AtomicU64,
    pub decline_authorize: AtomicBool,
    pub fail_captures: AtomicBool,
}

impl FakeGateway {
    pub fn hold_state(&self, hold: &str) -> Option<HoldState> {
        self.holds
            .lock()
            .unwrap()
            .get(hold)
            .map(|(state, _)| state.clone())
    }

    pub fn states(&self) -> Vec<HoldState> {
        self.holds
            .lock()
            .unwrap()
            .values()
            .map(|(state, _)| state.clone())
            .collect()
    }

    pub fn capture_transitions(&self) -> u64 {
        self.capture_transitions.load(Ordering::SeqCst)
    }

    pub fn hold_count(&self) -> usize {
        self.holds.lock().unwrap().len()
    }
}

impl PaymentGateway for FakeGateway {
    fn authorize(
        &self,
        _payer: &PayerProfile,
        amount_cents: i64,
    ) -> Pin<Box<dyn Future<Output = Result<HoldId, MarketError>> + Send + '_>> {
        Box::pin(async move {
            if self.decline_authorize.load(Ordering::SeqCst) {
                return Err(MarketError::ProviderDeclined("card declined".into()));
            }
            // Globally unique: bids.hold_id is UNIQUE and suites may share
            // one database.
            let id = format!("pi_fake_{}", Uuid::now_v7().simple());
            self.holds
                .lock()
                .unwrap()
                .insert(id.clone(), (HoldState::Held, amount_cents));
            HoldId::new(id)
        })
    }

    fn capture(
        &self,
        hold: &HoldId,
    ) -> Pin<Box<dyn Future<Output = Result<CapturedHold, MarketError>> + Send + '_>> {
        let hold = hold.clone();
        Box::pin(async move {
            if self.fail_captures.load(Ordering::SeqCst) {
                return Err(MarketError::CaptureFailed("provider unavailable".into()));
            }
            let mut holds = self.holds.lock().unwrap();
            let Some((state, amount)) = holds.get_mut(hold.as_str()) else {
                return Err(MarketError::CaptureFailed(format!("unknown hold {hold}")));
            };
            match state {
                HoldState::Held => {
                    *state = HoldState::Captured;
                    self.capture_transitions.fetch_add(1, Ordering::SeqCst);
                    Ok(CapturedHold {
                        hold_id: hold.clone(),
                        captured_amount: *amount,
                        already_captured: false,
                    })
                }
                HoldState::Captured => Ok(CapturedHold {
                    hold_id: hold.clone(),
                    captured_amount: *amount,
                    already_captured: true,
                }),
                HoldState::Cancelled => {
                    Err(MarketError::CaptureFailed(format!("hold {hold} cancelled")))
                }
            }
        })
    }

    fn cancel(
        &self,
        hold: &HoldId,
    ) -> Pin<Box<dyn Future<Output = Result<(), MarketError>> + Send + '_>> {
        let hold = hold.clone();
        Box::pin(async move {
            let mut holds = self.holds.lock().unwrap();
            match holds.get_mut(hold.as_str()) {
                // Cancelling a captured hold is tolerated, like the real
                // adapter: logged, not raised.
                Some((state @ HoldState::Held, _)) => {
                    *state = HoldState::Cancelled;
                    Ok(())
                }
                Some(_) => Ok(()),
                None => Err(MarketError::Provider(format!("unknown hold {hold}"))),
            }
        })
    }
}

#[derive(Default)]
pub struct FakeVideo {
    pub rooms: Mutex<HashMap<String, String>>,
}

impl VideoProvider for FakeVideo {
    fn create_room(
        &self,
        name: &RoomName,
        _expires_at: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<Room, MarketError>> + Send + '_>> {
        let name = name.clone();
        Box::pin(async move {
            let url = format!("https://video.test/{name}");
            self.rooms
                .lock()
                .unwrap()
                .insert(name.as_str().to_string(), url.clone());
            Ok(Room { name, url })
        })
    }

    fn delete_room(
        &self,
        name: &RoomName,
    ) -> Pin<Box<dyn Future<Output = Result<(), MarketError>> + Send + '_>> {
        let name = name.clone();
        Box::pin(async move {
            self.rooms.lock().unwrap().remove(name.as_str());
            Ok(())
        })
    }

    fn meeting_token(
        &self,
        name: &RoomName,
        user_id: Uuid,
        is_owner: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String, MarketError>> + Send + '_>> {
        let name = name.clone();
        Box::pin(async move { Ok(format!("tok-{name}-{user_id}-{is_owner}")) })
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    pub sent: Mutex<Vec<(Uuid, Uuid)>>,
}

impl Notifier for FakeNotifier {
    fn auction_won(
        &self,
        user_id: Uuid,
        purchased_slot_id: Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<(), MarketError>> + Send + '_>> {
        Box::pin(async move {
            self.sent.lock().unwrap().push((user_id, purchased_slot_id));
            Ok(())
        })
    }
}

// ── Query helpers ──────────────────────────────────────────────────────────

pub async fn auction_status(pool: &PgPool, auction_id: Uuid) -> String {
    sqlx::query_scalar("SELECT status FROM auctions WHERE id = $1")
        .bind(auction_id)
        .fetch_one(pool)
        .await
        .expect("auction status")
}

pub async fn count_bids(pool: &PgPool, auction_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM bids WHERE auction_id = $1")
        .bind(auction_id)
        .fetch_one(pool)
        .await
        .expect("count bids")
}

pub async fn count_purchased(pool: &PgPool, auction_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM purchased_slots WHERE auction_id = $1")
        .bind(auction_id)
        .fetch_one(pool)
        .await
        .expect("count purchased")
}

pub struct PurchasedRow {
    pub id: Uuid,
    pub fan_id: Uuid,
    pub winning_bid_amount: i64,
    pub platform_fee: i64,
    pub influencer_payout: i64,
    pub call_status: String,
}

pub async fn get_purchased(pool: &PgPool, auction_id: Uuid) -> Option<PurchasedRow> {
    sqlx::query_as::<_, (Uuid, Uuid, i64, i64, i64, String)>(
        r#"
        SELECT id, fan_id, winning_bid_amount, platform_fee, influencer_payout, call_status
        FROM purchased_slots WHERE auction_id = $1
        "#,
    )
    .bind(auction_id)
    .fetch_optional(pool)
    .await
    .expect("get purchased")
    .map(
        |(id, fan_id, winning_bid_amount, platform_fee, influencer_payout, call_status)| {
            PurchasedRow {
                id,
                fan_id,
                winning_bid_amount,
                platform_fee,
                influencer_payout,
                call_status,
            }
        },
    )
}
