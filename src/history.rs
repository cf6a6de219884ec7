//! Append-only history of processed uploads.
//!
//! The log is a single JSON array on disk. Appends are read-modify-write:
//! read the whole array, push one record, write the whole array back. The
//! full cycle runs under an async mutex, so concurrent requests in one
//! process never lose each other's records. Separate processes sharing the
//! same file are not coordinated.
//!
//! Reads are lenient and writes are strict: a missing or corrupt file reads as
//! an empty history so it never blocks new ingestions, while a failed write is
//! always reported to the caller.

use crate::error::HistoryError;
use crate::record::ResultRecord;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// The durable history log.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    /// Open the store at `path`, creating the parent directory and an empty
    /// `[]` file if none exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| HistoryError::Write {
                    path: path.clone(),
                    source: e,
                })?;
        }

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            write_atomic(&path, &[]).await?;
            info!("Initialised empty history at {}", path.display());
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record, in arrival order. Never fails.
    pub async fn read_all(&self) -> Vec<ResultRecord> {
        read_lenient(&self.path).await
    }

    /// Durably append one record.
    pub async fn append_record(&self, record: &ResultRecord) -> Result<(), HistoryError> {
        let _guard = self.write_lock.lock().await;

        let mut history = read_lenient(&self.path).await;
        history.push(record.clone());
        write_atomic(&self.path, &history).await?;

        debug!(
            "Appended '{}' to history ({} records)",
            record.filename,
            history.len()
        );
        Ok(())
    }
}

async fn read_lenient(path: &Path) -> Vec<ResultRecord> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("History at {} unreadable, treating as empty: {}", path.display(), e);
            }
            return Vec::new();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(records) => records,
        Err(e) => {
            warn!("History at {} unparsable, treating as empty: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Write to a sibling temp file, then rename over `path`.
async fn write_atomic(path: &Path, records: &[ResultRecord]) -> Result<(), HistoryError> {
    let json = serde_json::to_vec(records)?;
    let tmp_path = path.with_extension("json.tmp");
    let write_err = |source| HistoryError::Write {
        path: path.to_path_buf(),
        source,
    };

    tokio::fs::write(&tmp_path, &json).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(name: &str) -> ResultRecord {
        ResultRecord {
            success: true,
            filename: name.to_string(),
            damage_type: "Fire Damage".into(),
            image_caption: "scorched wall".into(),
            loss_description: "Soot and charring on the kitchen wall.".into(),
            image_data: "AAAA".into(),
            timestamp: "2024-05-06 07:08:09".into(),
        }
    }

    #[tokio::test]
    async fn open_creates_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data/history.json");
        let store = HistoryStore::open(&path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        assert!(store.read_all().await.is_empty());
    }

    #[tokio::test]
    async fn open_keeps_existing_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, serde_json::to_vec(&[record("a.png")]).unwrap()).unwrap();

        let store = HistoryStore::open(&path).await.unwrap();
        assert_eq!(store.read_all().await.len(), 1);
    }

    #[tokio::test]
    async fn append_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(dir.path().join("h.json")).await.unwrap();
        for name in ["1.png", "2.png", "3.png"] {
            store.append_record(&record(name)).await.unwrap();
        }
        let names: Vec<_> = store
            .read_all()
            .await
            .into_iter()
            .map(|r| r.filename)
            .collect();
        assert_eq!(names, ["1.png", "2.png", "3.png"]);
        assert!(!dir.path().join("h.json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_history_reads_empty_and_append_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = HistoryStore::open(&path).await.unwrap();
        assert!(store.read_all().await.is_empty());

        store.append_record(&record("new.jpg")).await.unwrap();
        assert_eq!(store.read_all().await, vec![record("new.jpg")]);
    }

    #[tokio::test]
    async fn append_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.json");
        let store = HistoryStore::open(&path).await.unwrap();

        // Replace the file with a directory: reads degrade, writes must fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(store.read_all().await.is_empty());
        let err = store.append_record(&record("x.png")).await.unwrap_err();
        assert!(matches!(err, HistoryError::Write { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn concurrent_appends_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(HistoryStore::open(dir.path().join("h.json")).await.unwrap());

        let tasks: Vec<_> = (0..25)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.append_record(&record(&format!("{i}.png"))).await })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().unwrap();
        }

        assert_eq!(store.read_all().await.len(), 25);
    }
}
