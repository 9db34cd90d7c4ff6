// ============================
// crates/backend-lib/src/store/flat_file.rs
// ============================
//! Flat-file implementation of the Store trait.
//!
//! Layout under the root directory:
//!
//! ```text
//! users/<id>.json          UserRecord
//! sessions/<id>.json       Session
//! verifications/<id>.json  Verification
//! ```
use async_trait::async_trait;
use authgate_common::{Session, SessionWithUser, User};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::{fs as tokio_fs, sync::Mutex};

use super::{Store, StoreError, UserRecord, Verification};

const USERS: &str = "users";
const SESSIONS: &str = "sessions";
const VERIFICATIONS: &str = "verifications";

/// JSON-document store rooted at a directory
#[derive(Clone)]
pub struct FlatFileStore {
    root: PathBuf,
    /// Serializes writes that must check-then-act (unique emails, single-use tokens)
    write_lock: Arc<Mutex<()>>,
    closed: Arc<AtomicBool>,
}

impl FlatFileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(USERS))?;
        fs::create_dir_all(root.join(SESSIONS))?;
        fs::create_dir_all(root.join(VERIFICATIONS))?;
        Ok(Self {
            root,
            write_lock: Arc::new(Mutex::new(())),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Path of a record, or `None` when the key cannot name a file safely
    fn record_path(&self, collection: &str, key: &str) -> Option<PathBuf> {
        if !is_safe_key(key) {
            return None;
        }
        Some(self.root.join(collection).join(format!("{key}.json")))
    }

    async fn read_record<T: DeserializeOwned>(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<T>, StoreError> {
        let Some(path) = self.record_path(collection, key) else {
            return Ok(None);
        };

        match tokio_fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_record<T: Serialize>(
        &self,
        collection: &str,
        key: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let path = self
            .record_path(collection, key)
            .ok_or_else(|| StoreError::driver(format!("invalid record key {key:?}")))?;

        // Write then rename so readers never see a half-written document
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(value)?;
        tokio_fs::write(&tmp, json).await?;
        tokio_fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove_record(&self, collection: &str, key: &str) -> Result<bool, StoreError> {
        let Some(path) = self.record_path(collection, key) else {
            return Ok(false);
        };

        match tokio_fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn read_all<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, StoreError> {
        let mut entries = tokio_fs::read_dir(self.root.join(collection)).await?;
        let mut records = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match tokio_fs::read_to_string(&path).await {
                Ok(content) => records.push(serde_json::from_str(&content)?),
                // Removed between listing and reading
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(records)
    }
}

/// Record keys are generated ids or URL-safe tokens; anything else never names a file
fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 128
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait]
impl Store for FlatFileStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.ensure_open()?;
        tokio_fs::metadata(self.root.join(USERS)).await?;
        Ok(())
    }

    async fn insert_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        self.ensure_open()?;
        let _guard = self.write_lock.lock().await;

        if self.find_user_by_email(&record.user.email).await?.is_some() {
            return Err(StoreError::Conflict(format!(
                "user with email {}",
                record.user.email
            )));
        }

        self.write_record(USERS, &record.user.id, record).await
    }

    async fn find_user(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        self.ensure_open()?;
        self.read_record(USERS, id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.ensure_open()?;
        let users: Vec<UserRecord> = self.read_all(USERS).await?;
        Ok(users.into_iter().find(|r| r.user.email == email))
    }

    async fn update_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        self.ensure_open()?;
        let _guard = self.write_lock.lock().await;

        let Some(existing) = self.read_record::<UserRecord>(USERS, &record.user.id).await? else {
            return Err(StoreError::NotFound(format!("user {}", record.user.id)));
        };

        if existing.user.email != record.user.email {
            if let Some(other) = self.find_user_by_email(&record.user.email).await? {
                if other.user.id != record.user.id {
                    return Err(StoreError::Conflict(format!(
                        "user with email {}",
                        record.user.email
                    )));
                }
            }
        }

        self.write_record(USERS, &record.user.id, record).await
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.ensure_open()?;
        let records: Vec<UserRecord> = self.read_all(USERS).await?;
        let mut users: Vec<User> = records.into_iter().map(|r| r.user).collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.write_record(SESSIONS, &session.id, session).await
    }

    async fn find_session(&self, id: &str) -> Result<Option<SessionWithUser>, StoreError> {
        self.ensure_open()?;
        let Some(session) = self.read_record::<Session>(SESSIONS, id).await? else {
            return Ok(None);
        };
        let user = self.read_record::<UserRecord>(USERS, &session.user_id).await?;
        Ok(user.map(|record| SessionWithUser {
            session,
            user: record.user,
        }))
    }

    async fn delete_session(&self, id: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.remove_record(SESSIONS, id).await?;
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: &str) -> Result<usize, StoreError> {
        self.ensure_open()?;
        let sessions: Vec<Session> = self.read_all(SESSIONS).await?;
        let mut removed = 0;
        for session in sessions.iter().filter(|s| s.user_id == user_id) {
            if self.remove_record(SESSIONS, &session.id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn delete_user_sessions_except(
        &self,
        user_id: &str,
        keep_id: &str,
    ) -> Result<usize, StoreError> {
        self.ensure_open()?;
        let sessions: Vec<Session> = self.read_all(SESSIONS).await?;
        let mut removed = 0;
        for session in sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.id != keep_id)
        {
            if self.remove_record(SESSIONS, &session.id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn insert_verification(&self, verification: &Verification) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.write_record(VERIFICATIONS, &verification.id, verification)
            .await
    }

    async fn take_verification(&self, id: &str) -> Result<Option<Verification>, StoreError> {
        self.ensure_open()?;
        let _guard = self.write_lock.lock().await;

        let verification = self.read_record::<Verification>(VERIFICATIONS, id).await?;
        if verification.is_some() {
            self.remove_record(VERIFICATIONS, id).await?;
        }
        Ok(verification)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
