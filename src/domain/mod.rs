pub mod audit;
pub mod auction;
pub mod bid;
pub mod error;
pub mod event;
pub mod id;
pub mod money;
pub mod provider;
pub mod slot;
