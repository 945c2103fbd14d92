pub mod auth;
pub mod bans;
pub mod config;
pub mod content;
pub mod counters;
pub mod error;
pub mod models;
pub mod moderation;
pub mod notes;
pub mod openapi;
pub mod password;
pub mod repo;
pub mod reports;
pub mod routes;
pub mod stats;
pub mod visibility;

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
