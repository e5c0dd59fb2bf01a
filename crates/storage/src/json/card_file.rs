use eco_core::model::{Card, CardId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::io::{read_json, write_json};
use crate::repository::{CardRecord, CardRepository, DeckSource, StorageError};

/// On-disk layouts accepted for the card file.
///
/// Written files always use the wrapped form.
#[derive(Deserialize)]
#[serde(untagged)]
enum CardFileContents {
    Wrapped { cards: Vec<CardRecord> },
    Bare(Vec<CardRecord>),
}

#[derive(Serialize)]
struct CardFileRef<'a> {
    cards: &'a [CardRecord],
}

/// Card catalogue stored as a JSON file.
///
/// A missing file behaves like an empty catalogue.
#[derive(Debug, Clone)]
pub struct JsonCardFile {
    path: PathBuf,
}

impl JsonCardFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_records(&self) -> Result<Vec<CardRecord>, StorageError> {
        let contents = read_json::<CardFileContents>(&self.path)?;
        Ok(match contents {
            None => Vec::new(),
            Some(CardFileContents::Wrapped { cards } | CardFileContents::Bare(cards)) => cards,
        })
    }

    fn save_records(&self, records: &[CardRecord]) -> Result<(), StorageError> {
        write_json(&self.path, &CardFileRef { cards: records })
    }
}

impl DeckSource for JsonCardFile {
    fn all_cards(&self) -> Result<Vec<Card>, StorageError> {
        let mut records = self.load_records()?;
        records.sort_by_key(|record| record.id);
        records
            .into_iter()
            .map(|record| {
                let id = record.id;
                record
                    .into_card()
                    .map_err(|e| StorageError::Serialization(format!("card {id}: {e}")))
            })
            .collect()
    }
}

impl CardRepository for JsonCardFile {
    fn upsert_card(&self, card: &Card) -> Result<(), StorageError> {
        let mut by_id: BTreeMap<CardId, CardRecord> = self
            .load_records()?
            .into_iter()
            .map(|record| (record.id, record))
            .collect();
        by_id.insert(card.id(), CardRecord::from_card(card));

        let records: Vec<CardRecord> = by_id.into_values().collect();
        self.save_records(&records)?;
        log::debug!("upserted card {} into {}", card.id(), self.path.display());
        Ok(())
    }
}
