mod store;

pub use store::{HistoryPoint, HistorySample, HistoryStore, RETENTION_WINDOW};
