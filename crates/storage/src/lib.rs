#![forbid(unsafe_code)]

pub mod json;
pub mod repository;

pub use repository::{
    CardRecord, CardRepository, DeckSource, HistoryStore, InMemoryRepository, Storage,
    StorageError,
};
