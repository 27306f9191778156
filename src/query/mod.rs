pub mod service;

pub use service::{HistoryResponse, ReadService};
