use eco_core::model::SessionRecord;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::io::{read_json, write_json};
use crate::repository::{HistoryStore, StorageError};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryFileContents {
    #[serde(default)]
    game_sessions: Vec<SessionRecord>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryFileRef<'a> {
    game_sessions: &'a [SessionRecord],
}

/// Session history stored as `{"gameSessions": [...]}` in a JSON file.
#[derive(Debug, Clone)]
pub struct JsonHistoryFile {
    path: PathBuf,
}

impl JsonHistoryFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for JsonHistoryFile {
    fn load(&self) -> Result<Vec<SessionRecord>, StorageError> {
        let contents = read_json::<HistoryFileContents>(&self.path)?.unwrap_or_default();
        Ok(contents.game_sessions)
    }

    fn save(&self, records: &[SessionRecord]) -> Result<(), StorageError> {
        write_json(
            &self.path,
            &HistoryFileRef {
                game_sessions: records,
            },
        )
    }
}
