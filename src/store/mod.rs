pub mod model;
pub mod repository;
pub mod repository_sqlx;

pub use model::{HistoryRow, LatestState};
pub use repository::QuoteRepository;
pub use repository_sqlx::SqlxQuoteRepository;
