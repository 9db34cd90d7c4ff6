// ============================
// crates/backend-lib/src/store/memory.rs
// ============================
//! In-memory store backed by concurrent maps.
use async_trait::async_trait;
use authgate_common::{Session, SessionWithUser, User};
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use super::{Store, StoreError, UserRecord, Verification};

/// Process-local implementation of the Store trait
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<DashMap<String, UserRecord>>,
    /// email -> user id
    emails: Arc<DashMap<String, String>>,
    sessions: Arc<DashMap<String, Session>>,
    verifications: Arc<DashMap<String, Verification>>,
    closed: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.ensure_open()
    }

    async fn insert_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        self.ensure_open()?;
        match self.emails.entry(record.user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "user with email {}",
                record.user.email
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record.user.id.clone());
                self.users.insert(record.user.id.clone(), record.clone());
                Ok(())
            },
        }
    }

    async fn find_user(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        self.ensure_open()?;
        Ok(self.users.get(id).map(|r| r.value().clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.ensure_open()?;
        let Some(id) = self.emails.get(email).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|r| r.value().clone()))
    }

    async fn update_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        self.ensure_open()?;
        let id = &record.user.id;
        // Never hold a `users` guard while touching `emails`; insert_user locks emails first
        let current_email = self
            .users
            .get(id)
            .map(|r| r.user.email.clone())
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;

        if current_email != record.user.email {
            match self.emails.entry(record.user.email.clone()) {
                Entry::Occupied(_) => {
                    return Err(StoreError::Conflict(format!(
                        "user with email {}",
                        record.user.email
                    )));
                },
                Entry::Vacant(slot) => {
                    slot.insert(id.clone());
                },
            }
            self.emails.remove(&current_email);
        }

        match self.users.get_mut(id) {
            Some(mut existing) => {
                *existing = record.clone();
                Ok(())
            },
            None => Err(StoreError::NotFound(format!("user {id}"))),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.ensure_open()?;
        let mut users: Vec<User> = self.users.iter().map(|r| r.value().user.clone()).collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, id: &str) -> Result<Option<SessionWithUser>, StoreError> {
        self.ensure_open()?;
        let Some(session) = self.sessions.get(id).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        let user = self.users.get(&session.user_id).map(|r| r.value().user.clone());
        Ok(user.map(|user| SessionWithUser { session, user }))
    }

    async fn delete_session(&self, id: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.sessions.remove(id);
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: &str) -> Result<usize, StoreError> {
        self.ensure_open()?;
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.user_id != user_id);
        Ok(before.saturating_sub(self.sessions.len()))
    }

    async fn delete_user_sessions_except(
        &self,
        user_id: &str,
        keep_id: &str,
    ) -> Result<usize, StoreError> {
        self.ensure_open()?;
        let before = self.sessions.len();
        self.sessions
            .retain(|id, session| session.user_id != user_id || id == keep_id);
        Ok(before.saturating_sub(self.sessions.len()))
    }

    async fn insert_verification(&self, verification: &Verification) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.verifications
            .insert(verification.id.clone(), verification.clone());
        Ok(())
    }

    async fn take_verification(&self, id: &str) -> Result<Option<Verification>, StoreError> {
        self.ensure_open()?;
        Ok(self.verifications.remove(id).map(|(_, v)| v))
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
