pub mod config;
pub mod db;
pub mod engine;
pub mod feed;
pub mod instruments;
pub mod metrics;
pub mod query;
pub mod store;

pub mod error;
pub mod logger;
pub mod time;
