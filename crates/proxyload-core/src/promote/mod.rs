//! Release promotion: which release is current per target and environment.

mod store;
mod types;

pub use store::PromotionStore;
pub use types::{
    CurrentDocument, CurrentEntry, EnvironmentHistory, HISTORY_LIMIT, HistoryDocument,
    HistoryEntry, Journal, Promotion, Target, Targets,
};
