pub mod client;
pub mod errors;
pub mod parser;

pub use client::FeedClient;
pub use errors::FeedError;
pub use parser::{Quote, parse_feed};
