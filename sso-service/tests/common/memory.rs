//! In-memory `SessionStore` and `UnitOfWork` with optimistic, commit-time
//! conflict detection.
//!
//! A transaction records the version of every refresh-token row it read and
//! stages its writes. Commit re-checks those versions under one lock, so two
//! transactions that both saw a token as active cannot both revoke it: the
//! second commit fails with `Conflict`. Dropping a transaction discards its
//! staged writes.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sso_service::session::errors::StoreError;
use sso_service::session::models::Application;
use sso_service::session::models::ApplicationId;
use sso_service::session::models::EmailAddress;
use sso_service::session::models::NewRefreshToken;
use sso_service::session::models::RefreshToken;
use sso_service::session::models::RefreshTokenId;
use sso_service::session::models::User;
use sso_service::session::models::UserId;
use sso_service::session::ports::SessionStore;
use sso_service::session::ports::UnitOfWork;
use tokio::sync::Barrier;

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    apps: HashMap<ApplicationId, Application>,
    tokens: HashMap<RefreshTokenId, VersionedToken>,
}

struct VersionedToken {
    token: RefreshToken,
    version: u64,
}

impl State {
    fn token_by_value(&self, value: &str) -> Option<&VersionedToken> {
        self.tokens.values().find(|row| row.token.value == value)
    }

    fn value_taken(&self, value: &str) -> bool {
        self.token_by_value(value).is_some()
    }
}

/// Staged work of one transaction.
#[derive(Default)]
pub struct MemoryTx {
    read_versions: HashMap<RefreshTokenId, u64>,
    revoked: HashSet<RefreshTokenId>,
    inserted: Vec<RefreshToken>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_transactional_saves: AtomicBool,
    stall_transactional_saves: AtomicBool,
    stalled_saves: AtomicUsize,
    lookup_barrier: Mutex<Option<Arc<Barrier>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_application(&self, app: Application) {
        self.state.lock().unwrap().apps.insert(app.id, app);
    }

    /// Make every `save_refresh_token_tx` fail with a database error.
    pub fn fail_transactional_saves(&self, fail: bool) {
        self.fail_transactional_saves.store(fail, Ordering::SeqCst);
    }

    /// Make every `save_refresh_token_tx` hang forever, so the caller's
    /// transaction stays open until its future is dropped.
    pub fn stall_transactional_saves(&self, stall: bool) {
        self.stall_transactional_saves.store(stall, Ordering::SeqCst);
    }

    /// Number of saves that reached the stall.
    pub fn stalled_saves(&self) -> usize {
        self.stalled_saves.load(Ordering::SeqCst)
    }

    /// Hold each transactional token lookup until `parties` lookups have
    /// happened, so that concurrent rotations all read before any writes.
    pub fn rendezvous_after_lookup(&self, parties: usize) {
        *self.lookup_barrier.lock().unwrap() = Some(Arc::new(Barrier::new(parties)));
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().unwrap().users.len()
    }

    pub fn refresh_token_count(&self) -> usize {
        self.state.lock().unwrap().tokens.len()
    }

    pub fn refresh_token(&self, value: &str) -> Option<RefreshToken> {
        self.state
            .lock()
            .unwrap()
            .token_by_value(value)
            .map(|row| row.token.clone())
    }

    /// Overwrite a committed token's expiry.
    pub fn set_refresh_token_expiry(&self, value: &str, expires_at: chrono::DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        if let Some(row) = state
            .tokens
            .values_mut()
            .find(|row| row.token.value == value)
        {
            row.token.expires_at = expires_at;
        }
    }

    fn insert_committed(state: &mut State, token: RefreshToken) {
        state
            .tokens
            .insert(token.id, VersionedToken { token, version: 0 });
    }

    fn new_row(token: &NewRefreshToken) -> RefreshToken {
        RefreshToken {
            id: RefreshTokenId::new(),
            user_id: token.user_id,
            app_id: token.app_id,
            value: token.value.clone(),
            created_at: Utc::now(),
            expires_at: token.expires_at,
            revoked: false,
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    type Tx = MemoryTx;

    async fn create_user(
        &self,
        email: &EmailAddress,
        password_hash: &str,
    ) -> Result<UserId, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.users.values().any(|user| &user.email == email) {
            return Err(StoreError::AlreadyExists("users_email_key".to_string()));
        }

        let id = UserId::new();
        state.users.insert(
            id,
            User {
                id,
                email: email.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(id)
    }

    async fn get_user_by_email(&self, email: &EmailAddress) -> Result<User, StoreError> {
        self.state
            .lock()
            .unwrap()
            .users
            .values()
            .find(|user| &user.email == email)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("user".to_string()))
    }

    async fn get_user_by_id_tx(
        &self,
        _tx: &mut MemoryTx,
        id: &UserId,
    ) -> Result<User, StoreError> {
        self.state
            .lock()
            .unwrap()
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))
    }

    async fn get_application(&self, id: ApplicationId) -> Result<Application, StoreError> {
        self.state
            .lock()
            .unwrap()
            .apps
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("application {}", id)))
    }

    async fn get_application_tx(
        &self,
        _tx: &mut MemoryTx,
        id: ApplicationId,
    ) -> Result<Application, StoreError> {
        self.get_application(id).await
    }

    async fn save_refresh_token(
        &self,
        token: &NewRefreshToken,
    ) -> Result<RefreshTokenId, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.value_taken(&token.value) {
            return Err(StoreError::AlreadyExists("refresh_tokens_value_key".to_string()));
        }

        let row = Self::new_row(token);
        let id = row.id;
        Self::insert_committed(&mut state, row);
        Ok(id)
    }

    async fn save_refresh_token_tx(
        &self,
        tx: &mut MemoryTx,
        token: &NewRefreshToken,
    ) -> Result<RefreshTokenId, StoreError> {
        if self.fail_transactional_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Database("injected write failure".to_string()));
        }
        if self.stall_transactional_saves.load(Ordering::SeqCst) {
            self.stalled_saves.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<()>().await;
        }

        let taken = self.state.lock().unwrap().value_taken(&token.value)
            || tx.inserted.iter().any(|row| row.value == token.value);
        if taken {
            return Err(StoreError::AlreadyExists("refresh_tokens_value_key".to_string()));
        }

        let row = Self::new_row(token);
        let id = row.id;
        tx.inserted.push(row);
        Ok(id)
    }

    async fn revoke_refresh_token_tx(
        &self,
        tx: &mut MemoryTx,
        id: &RefreshTokenId,
    ) -> Result<(), StoreError> {
        if tx.revoked.contains(id) {
            return Err(StoreError::Conflict(format!("refresh token {} already revoked", id)));
        }

        let state = self.state.lock().unwrap();
        let row = state
            .tokens
            .get(id)
            .ok_or_else(|| StoreError::NotFound(format!("refresh token {}", id)))?;
        if row.token.revoked {
            return Err(StoreError::Conflict(format!("refresh token {} already revoked", id)));
        }

        tx.read_versions.entry(*id).or_insert(row.version);
        tx.revoked.insert(*id);
        Ok(())
    }

    async fn get_refresh_token_by_value(&self, value: &str) -> Result<RefreshToken, StoreError> {
        self.refresh_token(value)
            .ok_or_else(|| StoreError::NotFound("refresh token".to_string()))
    }

    async fn get_refresh_token_by_value_tx(
        &self,
        tx: &mut MemoryTx,
        value: &str,
    ) -> Result<RefreshToken, StoreError> {
        let found = match tx.inserted.iter().find(|row| row.value == value) {
            Some(row) => Some(row.clone()),
            None => {
                let state = self.state.lock().unwrap();
                state.token_by_value(value).map(|row| {
                    tx.read_versions.entry(row.token.id).or_insert(row.version);
                    let mut token = row.token.clone();
                    token.revoked = token.revoked || tx.revoked.contains(&token.id);
                    token
                })
            }
        };

        let barrier = self.lookup_barrier.lock().unwrap().clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }

        found.ok_or_else(|| StoreError::NotFound("refresh token".to_string()))
    }
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        Ok(MemoryTx::default())
    }

    async fn commit(&self, tx: MemoryTx) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();

        for (id, seen) in &tx.read_versions {
            let current = state.tokens.get(id).map(|row| row.version);
            if current != Some(*seen) {
                return Err(StoreError::Conflict(
                    "could not serialize access due to concurrent update".to_string(),
                ));
            }
        }

        if tx.inserted.iter().any(|row| state.value_taken(&row.value)) {
            return Err(StoreError::AlreadyExists("refresh_tokens_value_key".to_string()));
        }

        for id in &tx.revoked {
            if let Some(row) = state.tokens.get_mut(id) {
                row.token.revoked = true;
                row.version += 1;
            }
        }
        for row in tx.inserted {
            Self::insert_committed(&mut state, row);
        }

        Ok(())
    }

    async fn rollback(&self, _tx: MemoryTx) -> Result<(), StoreError> {
        Ok(())
    }
}
