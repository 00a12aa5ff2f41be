pub mod bidding;
pub mod call_session;
pub mod listing;
pub mod settlement;
pub mod sweeper;
