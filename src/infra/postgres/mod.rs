pub mod auction_repo;
pub mod audit_repo;
pub mod bid_repo;
pub mod event_repo;
pub mod slot_repo;
pub mod user_repo;
