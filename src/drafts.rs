use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DraftError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftId(Uuid);

impl DraftId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DraftId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for DraftId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftStatus {
    #[default]
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Feedback Ready")]
    FeedbackReady,
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftStatus::InProgress => f.write_str("In Progress"),
            DraftStatus::FeedbackReady => f.write_str("Feedback Ready"),
        }
    }
}

/// What the piece of writing is for.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Foundation {
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub audience: String,
    #[serde(default)]
    pub topic: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub id: DraftId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub foundation: Foundation,
    #[serde(default)]
    pub status: DraftStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
pub struct NewDraft {
    /// Defaults to `Untitled - <date>` when absent or blank.
    pub title: Option<String>,
    pub content: String,
    pub foundation: Foundation,
}

/// Fields to change; `None` leaves a field as it is.
#[derive(Clone, Debug, Default)]
pub struct DraftUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub foundation: Option<Foundation>,
    pub status: Option<DraftStatus>,
}

impl DraftUpdate {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn status(status: DraftStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

pub fn default_title(now: DateTime<Utc>) -> String {
    format!("Untitled - {}", now.format("%-m/%-d/%Y"))
}

/// Record store for drafts. `list` returns the most recently updated
/// draft first.
pub trait DraftStore {
    fn create(&self, draft: NewDraft) -> Result<Draft, DraftError>;
    fn get(&self, id: DraftId) -> Result<Draft, DraftError>;
    fn update(&self, id: DraftId, update: DraftUpdate) -> Result<Draft, DraftError>;
    fn delete(&self, id: DraftId) -> Result<(), DraftError>;
    fn list(&self) -> Result<Vec<Draft>, DraftError>;
}

/// Keeps every draft as `<id>.json` in one directory.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, DraftError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| io_error(&dir, source))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: DraftId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn read(&self, id: DraftId) -> Result<Draft, DraftError> {
        let path = self.path_for(id);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(DraftError::NotFound(id));
            }
            Err(source) => return Err(io_error(&path, source)),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    fn write(&self, draft: &Draft) -> Result<(), DraftError> {
        let path = self.path_for(draft.id);
        let tmp = path.with_extension("json.tmp");
        let raw = serde_json::to_string_pretty(draft)?;
        fs::write(&tmp, raw).map_err(|source| io_error(&tmp, source))?;
        fs::rename(&tmp, &path).map_err(|source| io_error(&path, source))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> DraftError {
    DraftError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl DraftStore for FileDraftStore {
    fn create(&self, draft: NewDraft) -> Result<Draft, DraftError> {
        let now = Utc::now();
        let title = draft
            .title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| default_title(now));
        let draft = Draft {
            id: DraftId::new(),
            title,
            content: draft.content,
            foundation: draft.foundation,
            status: DraftStatus::InProgress,
            created_at: now,
            updated_at: now,
        };
        self.write(&draft)?;
        info!(id = %draft.id, title = %draft.title, "created draft");
        Ok(draft)
    }

    fn get(&self, id: DraftId) -> Result<Draft, DraftError> {
        self.read(id)
    }

    fn update(&self, id: DraftId, update: DraftUpdate) -> Result<Draft, DraftError> {
        let mut draft = self.read(id)?;
        if let Some(title) = update.title {
            draft.title = title;
        }
        if let Some(content) = update.content {
            draft.content = content;
        }
        if let Some(foundation) = update.foundation {
            draft.foundation = foundation;
        }
        if let Some(status) = update.status {
            draft.status = status;
        }
        // Keep updates strictly ordered even when the clock is coarse.
        let now = Utc::now();
        draft.updated_at = if now > draft.updated_at {
            now
        } else {
            draft.updated_at + Duration::microseconds(1)
        };
        self.write(&draft)?;
        debug!(id = %id, "updated draft");
        Ok(draft)
    }

    fn delete(&self, id: DraftId) -> Result<(), DraftError> {
        let path = self.path_for(id);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(id = %id, "deleted draft");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(DraftError::NotFound(id)),
            Err(source) => Err(io_error(&path, source)),
        }
    }

    fn list(&self) -> Result<Vec<Draft>, DraftError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| io_error(&self.dir, source))?;
        let mut drafts = Vec::new();
        for entry in entries {
            let path = entry.map_err(|source| io_error(&self.dir, source))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .map_err(|source| io_error(&path, source))
                .and_then(|raw| serde_json::from_str::<Draft>(&raw).map_err(DraftError::from));
            match parsed {
                Ok(draft) => drafts.push(draft),
                Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable draft"),
            }
        }
        drafts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(drafts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store() -> (tempfile::TempDir, FileDraftStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDraftStore::open(dir.path().join("drafts")).unwrap();
        (dir, store)
    }

    #[test]
    fn create_uses_default_title() {
        let (_dir, store) = store();
        let draft = store.create(NewDraft::default()).unwrap();
        assert!(draft.title.starts_with("Untitled - "));
        assert_eq!(draft.status, DraftStatus::InProgress);
        assert_eq!(store.get(draft.id).unwrap(), draft);
    }

    #[test]
    fn default_title_formats_date() {
        let date = Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();
        assert_eq!(default_title(date), "Untitled - 3/7/2024");
    }

    #[test]
    fn update_changes_fields_and_timestamp() {
        let (_dir, store) = store();
        let draft = store
            .create(NewDraft {
                title: Some("Essay".to_string()),
                ..NewDraft::default()
            })
            .unwrap();
        let updated = store
            .update(draft.id, DraftUpdate::content("The cat is goes."))
            .unwrap();
        assert_eq!(updated.title, "Essay");
        assert_eq!(updated.content, "The cat is goes.");
        assert!(updated.updated_at > draft.updated_at);
        assert_eq!(updated.created_at, draft.created_at);

        let ready = store
            .update(draft.id, DraftUpdate::status(DraftStatus::FeedbackReady))
            .unwrap();
        assert_eq!(ready.status, DraftStatus::FeedbackReady);
        assert_eq!(ready.content, "The cat is goes.");
    }

    #[test]
    fn list_orders_by_last_update() {
        let (_dir, store) = store();
        let first = store.create(NewDraft::default()).unwrap();
        let second = store.create(NewDraft::default()).unwrap();
        store.update(first.id, DraftUpdate::content("newer")).unwrap();

        let ids: Vec<_> = store.list().unwrap().iter().map(|draft| draft.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[test]
    fn delete_and_missing_drafts() {
        let (_dir, store) = store();
        let draft = store.create(NewDraft::default()).unwrap();
        store.delete(draft.id).unwrap();
        assert!(matches!(store.get(draft.id), Err(DraftError::NotFound(_))));
        assert!(matches!(store.delete(draft.id), Err(DraftError::NotFound(_))));
        assert!(matches!(
            store.update(draft.id, DraftUpdate::default()),
            Err(DraftError::NotFound(_))
        ));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn status_uses_display_names_on_disk() {
        let (_dir, store) = store();
        let draft = store.create(NewDraft::default()).unwrap();
        let raw = fs::read_to_string(store.dir().join(format!("{}.json", draft.id))).unwrap();
        assert!(raw.contains("\"In Progress\""));
        assert_eq!(draft.id.to_string().parse::<DraftId>().unwrap(), draft.id);
    }
}
