//! JSON file adapters for cards and session history.

mod card_file;
mod history_file;
mod io;

pub use card_file::JsonCardFile;
pub use history_file::JsonHistoryFile;
