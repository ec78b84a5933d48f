//! Shared disposition service used across clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{Database, DispositionStore, LibSqlDispositionStore};
use crate::models::DispositionRecord;
use crate::Result;

/// Thread-safe service owning the local store, the remote endpoint, and the
/// reachability probe.
///
/// Submission lives in [`crate::sync`]; this type handles opening the store
/// and the read paths.
pub struct DispositionService<R, P> {
    pub(crate) db: Arc<Mutex<Database>>,
    pub(crate) remote: Arc<R>,
    pub(crate) probe: Arc<P>,
    pub(crate) reconcile_lock: Arc<Mutex<()>>,
}

impl<R, P> Clone for DispositionService<R, P> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            remote: Arc::clone(&self.remote),
            probe: Arc::clone(&self.probe),
            reconcile_lock: Arc::clone(&self.reconcile_lock),
        }
    }
}

impl<R, P> DispositionService<R, P> {
    fn from_database(db: Database, remote: R, probe: P) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            remote: Arc::new(remote),
            probe: Arc::new(probe),
            reconcile_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Open a service backed by the database file at `db_path`.
    ///
    /// A file that is not a database is moved aside and a fresh store is
    /// created in its place.
    pub async fn open_path(db_path: impl Into<PathBuf>, remote: R, probe: P) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = match Database::open(&db_path).await {
            Ok(db) => db,
            Err(error) if Self::is_corrupted_db_error(&error) => {
                tracing::warn!(
                    "Disposition store at {} is unreadable: {}. Moving it aside and starting fresh.",
                    db_path.display(),
                    error
                );
                Self::quarantine_corrupted_db_files(&db_path)?;
                Database::open(&db_path).await?
            }
            Err(error) => return Err(error),
        };

        Ok(Self::from_database(db, remote, probe))
    }

    /// Open an in-memory service (primarily for tests).
    pub async fn open_in_memory(remote: R, probe: P) -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self::from_database(db, remote, probe))
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    fn is_corrupted_db_error(error: &crate::Error) -> bool {
        let message = error.to_string().to_ascii_lowercase();
        message.contains("file is not a database") || message.contains("malformed")
    }

    fn quarantine_corrupted_db_files(db_path: &Path) -> Result<()> {
        if db_path.exists() {
            let timestamp = chrono::Utc::now().timestamp_millis();
            let base_name = db_path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("dispo.db");
            let backup_path = db_path.with_file_name(format!("{base_name}.corrupt-{timestamp}"));

            std::fs::rename(db_path, &backup_path)?;
            tracing::warn!(
                "Moved corrupted disposition store from {} to {}",
                db_path.display(),
                backup_path.display()
            );
        }

        let Some(parent) = db_path.parent() else {
            return Ok(());
        };
        let Some(base_name) = db_path.file_name().and_then(|name| name.to_str()) else {
            return Ok(());
        };
        let sidecar_prefix = format!("{base_name}-");

        for entry in std::fs::read_dir(parent)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if file_name.starts_with(&sidecar_prefix) {
                let path = entry.path();
                std::fs::remove_file(&path)?;
                tracing::warn!("Removed stale store sidecar {}", path.display());
            }
        }

        Ok(())
    }

    /// Pending records. Storage faults are logged and read as empty.
    pub async fn get_pending_dispositions(&self) -> Vec<DispositionRecord> {
        let db = self.db.lock().await;
        let store = LibSqlDispositionStore::new(db.connection());
        store.pending().await.unwrap_or_else(|error| {
            tracing::warn!("Failed to read pending dispositions: {}", error);
            Vec::new()
        })
    }

    /// Synced records. Storage faults are logged and read as empty.
    pub async fn get_synced_dispositions(&self) -> Vec<DispositionRecord> {
        let db = self.db.lock().await;
        let store = LibSqlDispositionStore::new(db.connection());
        store.synced().await.unwrap_or_else(|error| {
            tracing::warn!("Failed to read synced dispositions: {}", error);
            Vec::new()
        })
    }

    /// Both slots, newest first. Storage faults are logged and read as empty.
    pub async fn get_all_dispositions(&self) -> Vec<DispositionRecord> {
        let db = self.db.lock().await;
        let store = LibSqlDispositionStore::new(db.connection());
        store.all().await.unwrap_or_else(|error| {
            tracing::warn!("Failed to read dispositions: {}", error);
            Vec::new()
        })
    }

    /// Wipe both slots.
    pub async fn clear(&self) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlDispositionStore::new(db.connection()).clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Slot;
    use crate::models::DispositionDraft;
    use crate::reachability::ManualReachability;
    use crate::remote::SimulatedRemote;

    type TestService = DispositionService<SimulatedRemote, ManualReachability>;

    async fn setup() -> TestService {
        DispositionService::open_in_memory(SimulatedRemote::default(), ManualReachability::offline())
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn in_memory_reads_start_empty() {
        let service = setup().await;
        assert!(service.get_pending_dispositions().await.is_empty());
        assert!(service.get_synced_dispositions().await.is_empty());
        assert!(service.get_all_dispositions().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn clear_wipes_both_slots() {
        let service = setup().await;
        {
            let db = service.db.lock().await;
            let store = LibSqlDispositionStore::new(db.connection());
            store
                .append(Slot::Pending, &DispositionDraft::default().into_record())
                .await
                .unwrap();
        }

        service.clear().await.unwrap();
        assert!(service.get_all_dispositions().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn open_path_recovers_from_non_database_file() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("dispo.db");
        std::fs::write(&db_path, vec![b'x'; 4096]).unwrap();

        let service = TestService::open_path(
            &db_path,
            SimulatedRemote::default(),
            ManualReachability::offline(),
        )
        .await
        .unwrap();
        assert!(service.get_all_dispositions().await.is_empty());

        let backups = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(std::result::Result::ok)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("dispo.db.corrupt-")
            })
            .count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn detects_corrupted_db_errors() {
        assert!(TestService::is_corrupted_db_error(&crate::Error::Database(
            "SQLite failure: file is not a database".to_string()
        )));
        assert!(!TestService::is_corrupted_db_error(
            &crate::Error::InvalidInput("disposition id must not be empty".to_string())
        ));
    }

    #[test]
    fn quarantine_moves_db_and_removes_sidecars() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("dispo.db");
        let wal_path = tmp.path().join("dispo.db-wal");
        let shm_path = tmp.path().join("dispo.db-shm");

        std::fs::write(&db_path, b"bad-db").unwrap();
        std::fs::write(&wal_path, b"wal").unwrap();
        std::fs::write(&shm_path, b"shm").unwrap();

        TestService::quarantine_corrupted_db_files(&db_path).unwrap();

        assert!(!db_path.exists());
        assert!(!wal_path.exists());
        assert!(!shm_path.exists());
    }
}
