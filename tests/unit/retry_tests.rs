// =========================
// tests/unit/retry_tests.rs
// =========================
//! Retrying lookups against a store whose connection misbehaves
use async_trait::async_trait;
use authgate_common::{Session, SessionWithUser, User};
use backend_lib::auth::issue_session;
use backend_lib::store::{
    find_session_with_retry, find_user_with_retry, MemoryStore, RetryPolicy, Store, StoreError,
    UserRecord, Verification,
};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Fails the first `failures` lookups with the error built by `fail`
struct FlakyStore {
    inner: MemoryStore,
    failures: u32,
    calls: AtomicU32,
    fail: fn(u32) -> StoreError,
}

impl FlakyStore {
    fn new(failures: u32, fail: fn(u32) -> StoreError) -> Self {
        Self {
            inner: MemoryStore::new(),
            failures,
            calls: AtomicU32::new(0),
            fail,
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn trip(&self) -> Result<(), StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err((self.fail)(call));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
    async fn insert_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        self.inner.insert_user(record).await
    }
    async fn find_user(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        self.trip()?;
        self.inner.find_user(id).await
    }
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.inner.find_user_by_email(email).await
    }
    async fn update_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        self.inner.update_user(record).await
    }
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.inner.list_users().await
    }
    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        self.inner.insert_session(session).await
    }
    async fn find_session(&self, id: &str) -> Result<Option<SessionWithUser>, StoreError> {
        self.trip()?;
        self.inner.find_session(id).await
    }
    async fn delete_session(&self, id: &str) -> Result<(), StoreError> {
        self.inner.delete_session(id).await
    }
    async fn delete_user_sessions(&self, user_id: &str) -> Result<usize, StoreError> {
        self.inner.delete_user_sessions(user_id).await
    }
    async fn delete_user_sessions_except(
        &self,
        user_id: &str,
        keep_id: &str,
    ) -> Result<usize, StoreError> {
        self.inner.delete_user_sessions_except(user_id, keep_id).await
    }
    async fn insert_verification(&self, verification: &Verification) -> Result<(), StoreError> {
        self.inner.insert_verification(verification).await
    }
    async fn take_verification(&self, id: &str) -> Result<Option<Verification>, StoreError> {
        self.inner.take_verification(id).await
    }
    async fn close(&self) -> Result<(), StoreError> {
        self.inner.close().await
    }
}

fn pool_exhausted(call: u32) -> StoreError {
    StoreError::driver(format!(
        "Timed out fetching a new connection from the connection pool (attempt {call})"
    ))
}

fn unique_violation(_: u32) -> StoreError {
    StoreError::driver("Unique constraint failed on the fields: (`email`)")
}

async fn seed(store: &FlakyStore) -> (String, String) {
    let now = Utc::now();
    let record = UserRecord {
        user: User {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            email_verified: true,
            role: None,
            image: None,
            created_at: now,
            updated_at: now,
        },
        password_hash: None,
    };
    store.insert_user(&record).await.unwrap();
    let session = issue_session("u1", ChronoDuration::hours(1), None);
    store.insert_session(&session).await.unwrap();
    ("u1".to_string(), session.id)
}

#[tokio::test(start_paused = true)]
async fn test_session_lookup_rides_out_pool_exhaustion() {
    let store = FlakyStore::new(2, pool_exhausted);
    let (_, session_id) = seed(&store).await;
    let policy = RetryPolicy::default();

    let start = Instant::now();
    let found = find_session_with_retry(&store, &policy, &session_id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(found.user.id, "u1");
    assert_eq!(store.calls(), 3);
    // 1s after the first failure, 2s after the second
    assert!(start.elapsed() >= Duration::from_millis(3000));
}

#[tokio::test(start_paused = true)]
async fn test_user_lookup_gives_up_after_max_retries() {
    let store = FlakyStore::new(u32::MAX, pool_exhausted);
    seed(&store).await;
    let policy = RetryPolicy::new(3, Duration::from_millis(100));

    let err = find_user_with_retry(&store, &policy, "u1").await.unwrap_err();
    assert!(err.is_transient());
    assert!(err.to_string().contains("attempt 3"));
    assert_eq!(store.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_errors_are_not_retried() -> anyhow::Result<()> {
    let store = FlakyStore::new(1, unique_violation);
    seed(&store).await;

    let start = Instant::now();
    let err = find_user_with_retry(&store, &RetryPolicy::default(), "u1")
        .await
        .unwrap_err();

    assert!(!err.is_transient());
    assert_eq!(store.calls(), 1);
    assert!(start.elapsed() < Duration::from_millis(1));

    // The next lookup goes through untouched
    let found = find_user_with_retry(&store, &RetryPolicy::default(), "u1").await?;
    assert_eq!(found.map(|r| r.user.id), Some("u1".to_string()));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_missing_records_are_not_errors() {
    let store = FlakyStore::new(0, pool_exhausted);
    let policy = RetryPolicy::default();
    assert!(find_session_with_retry(&store, &policy, "nope")
        .await
        .unwrap()
        .is_none());
    assert_eq!(store.calls(), 1);
}
