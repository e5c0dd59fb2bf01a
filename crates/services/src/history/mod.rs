mod ledger;
mod view;

pub use ledger::HistoryLedger;
pub use view::{HistoryListItem, HistoryOverview};
