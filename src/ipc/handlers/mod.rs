pub mod attendance;
pub mod auth;
pub mod core;
pub mod exchange;
pub mod reports;
