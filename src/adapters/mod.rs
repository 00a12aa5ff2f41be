pub mod api;
pub mod api_errors;
pub mod daily;
pub mod notify;
pub mod stripe_gateway;
pub mod video_webhook;
