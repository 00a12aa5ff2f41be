use {
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{get, post},
    },
    callbid::{
        AppState,
        adapters::{api, daily::DailyClient, notify::LogNotifier, stripe_gateway::StripeGateway,
                   video_webhook},
        domain::money::{Currency, FeePolicy},
        services::sweeper,
    },
    sqlx::postgres::PgPoolOptions,
    std::{env, sync::Arc, time::Duration},
    tokio::{signal, sync::watch},
    tower_http::timeout::TimeoutLayer,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let stripe_secret_key =
        env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY must be set");
    let daily_api_key = env::var("DAILY_API_KEY").expect("DAILY_API_KEY must be set");
    let daily_api_url =
        env::var("DAILY_API_URL").unwrap_or_else(|_| "https://api.daily.co/v1".to_string());
    let fee = match env::var("PLATFORM_FEE_BPS") {
        Ok(raw) => FeePolicy::new(raw.parse().expect("PLATFORM_FEE_BPS must be an integer"))
            .expect("PLATFORM_FEE_BPS out of range"),
        Err(_) => FeePolicy::default(),
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&database_url)
        .await
        .expect("failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    let state = AppState {
        pool: pool.clone(),
        gateway: Arc::new(StripeGateway::new(&stripe_secret_key, &Currency::Usd)),
        video: Arc::new(
            DailyClient::new(&daily_api_url, &daily_api_key)
                .expect("failed to build video client"),
        ),
        notifier: Arc::new(LogNotifier),
        fee,
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(sweeper::run_closer(
        pool.clone(),
        Arc::clone(&state.gateway),
        Arc::clone(&state.notifier),
        fee,
        shutdown_rx.clone(),
    ));
    tokio::spawn(sweeper::run_no_show_sweep(pool.clone(), shutdown_rx));

    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/slots", post(api::create_slot))
        .route("/auctions/{id}", get(api::get_auction))
        .route("/auctions/{id}/bids", post(api::place_bid))
        .route("/auctions/{id}/close", post(api::close_auction))
        .route("/auctions/{id}/buy-now", post(api::buy_now))
        .route("/calls/create-room", post(api::create_room))
        .route("/calls/join-room", post(api::join_room))
        .route("/calls/end-call", post(api::end_call))
        .route("/calls/status/{id}", get(api::call_status))
        .route(
            "/webhooks/video-provider",
            post(video_webhook::video_webhook_handler),
        )
        .layer(DefaultBodyLimit::max(64 * 1024)) // 64 KB, provider events are small
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    tracing::info!("listening on 0.0.0.0:3000");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    let _ = shutdown_tx.send(true);
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
