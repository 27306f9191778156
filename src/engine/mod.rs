pub mod collector;
pub mod decision;
pub mod fingerprint;
pub mod history;
pub mod refresh;

pub use collector::{Collector, CycleStats};
pub use decision::Decision;
