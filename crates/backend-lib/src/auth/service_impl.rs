// ============================
// crates/backend-lib/src/auth/service_impl.rs
// ============================
use async_trait::async_trait;
use authgate_common::{
    AuthResponse, ChangeEmailRequest, ChangePasswordRequest, PasswordResetRequest,
    ResetPasswordRequest, Session, SessionWithUser, SignInRequest, SignUpRequest,
    UpdateUserRequest, User, VerifyEmailChangeRequest,
};
use chrono::{Duration, Utc};
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;
use zeroize::Zeroize;

use super::password::{verify_password, PasswordHasherConfig};
use super::session::{issue_session, session_ttl_for};
use super::token::generate_token;
use super::AuthService;
use crate::config::Settings;
use crate::error::AppError;
use crate::mailer::{change_email_verification_email, reset_password_email, EmailMessage, Mailer};
use crate::metrics::{
    EMAIL_CHANGED, EMAIL_CHANGE_REQUESTED, PASSWORD_RESET_REQUESTED, SIGN_IN, SIGN_IN_FAILED,
    SIGN_UP,
};
use crate::store::{
    find_session_with_retry, find_user_with_retry, RetryPolicy, Store, StoreError, UserRecord,
    Verification,
};
use crate::validation::{normalize_email, Schemas};

const RESET_PASSWORD_PREFIX: &str = "reset-password:";
const CHANGE_EMAIL_PREFIX: &str = "change-email:";
const CHANGE_EMAIL_PAGE: &str = "/email-change";
const INVALID_TOKEN: &str = "Invalid or expired token";
const USER_EXISTS: &str = "User already exists";

/// Email and password accounts kept in a [`Store`]
pub struct LocalAuth<S: Store> {
    store: Arc<S>,
    schemas: Schemas,
    retry: RetryPolicy,
    hasher: PasswordHasherConfig,
    mailer: Arc<dyn Mailer>,
    base_url: String,
    session_ttl: Duration,
    reset_token_ttl: Duration,
}

impl<S: Store + 'static> LocalAuth<S> {
    pub fn new(store: Arc<S>, settings: &Settings, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        Ok(Self {
            store,
            schemas: settings.schemas(),
            retry: settings.retry_policy(),
            hasher: PasswordHasherConfig::new(settings.auth.scrypt_log_n)?,
            mailer,
            base_url: settings.auth.base_url.trim_end_matches('/').to_string(),
            session_ttl: Duration::from_std(settings.session_ttl())?,
            reset_token_ttl: Duration::from_std(settings.reset_token_ttl())?,
        })
    }

    /// Hash on the blocking pool; the plaintext is wiped afterwards
    async fn hash(&self, mut password: String) -> Result<String, AppError> {
        let hasher = self.hasher;
        let hash = tokio::task::spawn_blocking(move || hasher.hash_secure(&mut password)).await?;
        hash.map_err(|e| AppError::Internal(e.to_string()))
    }

    async fn verify(&self, hash: String, mut password: String) -> Result<bool, AppError> {
        let ok = tokio::task::spawn_blocking(move || {
            let ok = verify_password(&hash, &password);
            password.zeroize();
            ok
        })
        .await?;
        Ok(ok)
    }

    async fn open_session(
        &self,
        user_id: &str,
        ttl: Duration,
        user_agent: Option<String>,
    ) -> Result<Session, AppError> {
        let session = issue_session(user_id, ttl, user_agent);
        self.store.insert_session(&session).await?;
        Ok(session)
    }

    async fn require_session(&self, token: &str) -> Result<SessionWithUser, AppError> {
        self.get_session(token)
            .await?
            .ok_or_else(|| AppError::Auth("invalid or expired session".to_string()))
    }

    async fn require_user(&self, user_id: &str) -> Result<UserRecord, AppError> {
        find_user_with_retry(&*self.store, &self.retry, user_id)
            .await?
            .ok_or_else(|| AppError::Auth(format!("user {user_id} no longer exists")))
    }

    /// Store a single-use token for `identifier` and return its id
    async fn issue_verification(&self, identifier: String) -> Result<String, AppError> {
        let now = Utc::now();
        let verification = Verification {
            id: generate_token(),
            identifier,
            expires_at: now + self.reset_token_ttl,
            created_at: now,
        };
        self.store.insert_verification(&verification).await?;
        Ok(verification.id)
    }

    /// Consume a token issued for `prefix`, returning the rest of its identifier.
    /// Tokens of another flow are put back untouched.
    async fn consume_verification(&self, token: &str, prefix: &str) -> Result<String, AppError> {
        let invalid = || AppError::InvalidInput(INVALID_TOKEN.to_string());

        let verification = self.store.take_verification(token).await?.ok_or_else(invalid)?;
        let Some(subject) = verification.identifier.strip_prefix(prefix).map(str::to_owned) else {
            self.store.insert_verification(&verification).await?;
            return Err(invalid());
        };
        if !verification.is_active_at(Utc::now()) {
            return Err(invalid());
        }
        Ok(subject)
    }

    async fn deliver(&self, message: &EmailMessage, user_id: &str) -> Result<(), AppError> {
        if let Err(err) = self.mailer.send(message).await {
            error!(user_id, subject = %message.subject, error = %err, "failed to send email");
            return Err(AppError::Internal(format!("failed to send email: {err}")));
        }
        Ok(())
    }

    /// Absolute link to a client page; anything but a local path falls back to `default_page`
    fn client_link(&self, page: Option<&str>, default_page: &str, token: &str) -> String {
        let page = page
            .filter(|p| p.starts_with('/') && !p.starts_with("//"))
            .unwrap_or(default_page);
        format!("{}{page}?token={token}", self.base_url)
    }
}

#[async_trait]
impl<S: Store + 'static> AuthService for LocalAuth<S> {
    #[instrument(skip_all)]
    async fn sign_up(
        &self,
        req: SignUpRequest,
        user_agent: Option<String>,
    ) -> Result<AuthResponse, AppError> {
        let name = req.name.trim().to_string();
        let email = normalize_email(&req.email);
        self.schemas.name.check(&name)?;
        self.schemas.email.check(&email)?;
        self.schemas.password.check(&req.password)?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(USER_EXISTS.to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            email_verified: false,
            role: None,
            image: req.image,
            created_at: now,
            updated_at: now,
        };
        let record = UserRecord {
            user: user.clone(),
            password_hash: Some(self.hash(req.password).await?),
        };
        match self.store.insert_user(&record).await {
            Ok(()) => {},
            // Lost a race with a concurrent sign-up for the same address
            Err(StoreError::Conflict(_)) => {
                return Err(AppError::Conflict(USER_EXISTS.to_string()));
            },
            Err(err) => return Err(err.into()),
        }

        let session = self.open_session(&user.id, self.session_ttl, user_agent).await?;
        counter!(SIGN_UP).increment(1);
        info!(user_id = %user.id, "user signed up");

        Ok(AuthResponse {
            token: session.id,
            user,
        })
    }

    #[instrument(skip_all)]
    async fn sign_in(
        &self,
        req: SignInRequest,
        user_agent: Option<String>,
    ) -> Result<AuthResponse, AppError> {
        let email = normalize_email(&req.email);
        let record = self.store.find_user_by_email(&email).await?;

        let Some(UserRecord {
            user,
            password_hash: Some(hash),
        }) = record
        else {
            counter!(SIGN_IN_FAILED).increment(1);
            return Err(AppError::InvalidCredentials);
        };

        if !self.verify(hash, req.password).await? {
            counter!(SIGN_IN_FAILED).increment(1);
            debug!(user_id = %user.id, "wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let ttl = session_ttl_for(self.session_ttl, req.remember_me);
        let session = self.open_session(&user.id, ttl, user_agent).await?;
        counter!(SIGN_IN).increment(1);
        info!(user_id = %user.id, "user signed in");

        Ok(AuthResponse {
            token: session.id,
            user,
        })
    }

    async fn sign_out(&self, token: &str) -> Result<(), AppError> {
        self.store.delete_session(token).await?;
        Ok(())
    }

    async fn get_session(&self, token: &str) -> Result<Option<SessionWithUser>, AppError> {
        let Some(found) = find_session_with_retry(&*self.store, &self.retry, token).await? else {
            return Ok(None);
        };
        if !found.session.is_active_at(Utc::now()) {
            debug!(user_id = %found.user.id, "session expired");
            self.store.delete_session(token).await?;
            return Ok(None);
        }
        Ok(Some(found))
    }

    #[instrument(skip_all)]
    async fn request_password_reset(&self, req: PasswordResetRequest) -> Result<(), AppError> {
        let email = normalize_email(&req.email);
        let Some(record) = self.store.find_user_by_email(&email).await? else {
            debug!("password reset requested for unknown email");
            return Ok(());
        };

        let token = self
            .issue_verification(format!("{RESET_PASSWORD_PREFIX}{}", record.user.id))
            .await?;
        let url = format!("{}/reset-password?token={token}", self.base_url);
        let message = reset_password_email(&record.user.email, &record.user.name, &url);
        self.deliver(&message, &record.user.id).await?;

        counter!(PASSWORD_RESET_REQUESTED).increment(1);
        info!(user_id = %record.user.id, "password reset requested");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn reset_password(&self, req: ResetPasswordRequest) -> Result<(), AppError> {
        // A rejected password must leave the token usable
        self.schemas.password.check(&req.new_password)?;

        let user_id = self
            .consume_verification(&req.token, RESET_PASSWORD_PREFIX)
            .await?;
        let mut record = self
            .store
            .find_user(&user_id)
            .await?
            .ok_or_else(|| AppError::InvalidInput(INVALID_TOKEN.to_string()))?;

        record.password_hash = Some(self.hash(req.new_password).await?);
        record.user.updated_at = Utc::now();
        self.store.update_user(&record).await?;

        let revoked = self.store.delete_user_sessions(&user_id).await?;
        info!(user_id = %user_id, revoked, "password reset");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn change_password(
        &self,
        token: &str,
        req: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        self.schemas.password.check(&req.new_password)?;
        let current = self.require_session(token).await?;
        let mut record = self.require_user(&current.user.id).await?;

        let hash = record
            .password_hash
            .clone()
            .ok_or_else(|| AppError::InvalidInput("Invalid password".to_string()))?;
        if !self.verify(hash, req.current_password).await? {
            return Err(AppError::InvalidInput("Invalid password".to_string()));
        }

        record.password_hash = Some(self.hash(req.new_password).await?);
        record.user.updated_at = Utc::now();
        self.store.update_user(&record).await?;

        if req.revoke_other_sessions {
            let revoked = self
                .store
                .delete_user_sessions_except(&record.user.id, &current.session.id)
                .await?;
            debug!(user_id = %record.user.id, revoked, "other sessions revoked");
        }
        info!(user_id = %record.user.id, "password changed");
        Ok(())
    }

    async fn update_user(&self, token: &str, req: UpdateUserRequest) -> Result<User, AppError> {
        let current = self.require_session(token).await?;
        let mut record = self.require_user(&current.user.id).await?;

        if let Some(name) = req.name {
            let name = name.trim().to_string();
            self.schemas.name.check(&name)?;
            record.user.name = name;
        }
        if let Some(image) = req.image {
            record.user.image = Some(image);
        }
        record.user.updated_at = Utc::now();
        self.store.update_user(&record).await?;

        Ok(record.user)
    }

    #[instrument(skip_all)]
    async fn change_email(&self, token: &str, req: ChangeEmailRequest) -> Result<(), AppError> {
        let new_email = normalize_email(&req.new_email);
        self.schemas.email.check(&new_email)?;

        let current = self.require_session(token).await?;
        if new_email == current.user.email {
            return Err(AppError::InvalidInput(
                "Email is the same as the current email".to_string(),
            ));
        }
        if self.store.find_user_by_email(&new_email).await?.is_some() {
            return Err(AppError::Conflict(USER_EXISTS.to_string()));
        }

        let user = &current.user;
        let token = self
            .issue_verification(format!("{CHANGE_EMAIL_PREFIX}{}:{new_email}", user.id))
            .await?;
        let url = self.client_link(req.callback_url.as_deref(), CHANGE_EMAIL_PAGE, &token);
        // Confirmed from the current address
        let message = change_email_verification_email(&user.email, &user.name, &url);
        self.deliver(&message, &user.id).await?;

        counter!(EMAIL_CHANGE_REQUESTED).increment(1);
        info!(user_id = %user.id, "email change requested");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn verify_email_change(&self, req: VerifyEmailChangeRequest) -> Result<User, AppError> {
        let invalid = || AppError::InvalidInput(INVALID_TOKEN.to_string());

        let subject = self
            .consume_verification(&req.token, CHANGE_EMAIL_PREFIX)
            .await?;
        let (user_id, new_email) = subject.split_once(':').ok_or_else(invalid)?;
        let mut record = self.store.find_user(user_id).await?.ok_or_else(invalid)?;

        record.user.email = new_email.to_string();
        record.user.email_verified = false;
        record.user.updated_at = Utc::now();
        match self.store.update_user(&record).await {
            Ok(()) => {},
            // Claimed by another account since the request
            Err(StoreError::Conflict(_)) => return Err(AppError::Conflict(USER_EXISTS.to_string())),
            Err(err) => return Err(err.into()),
        }

        counter!(EMAIL_CHANGED).increment(1);
        info!(user_id, "email changed");
        Ok(record.user)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.store.list_users().await?)
    }
}
