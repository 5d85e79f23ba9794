pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod order;
pub mod score;
pub mod session;
pub mod storage;
pub mod store;
