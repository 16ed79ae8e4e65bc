// permx/src/store.rs
//! Holds the current user's grants and serialises identity changes.
//!
//! Every identity change takes a new generation. A derivation only lands if its
//! generation is still the latest when it completes, so a slow load for an old
//! identity can never overwrite a newer one.

use crate::error::PermxError;
use crate::utils::auth::extract_grants;
use crate::utils::structs::{CurrentUser, PermissionGrants, StoreState};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Resolves the full user payload (the object the permissions are looked up in).
#[async_trait]
pub trait PermissionSource: Send + Sync {
    async fn load(&self, user: &CurrentUser) -> Result<Value, PermxError>;
}

/// Uses the session's user object as-is, without any I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionSource;

#[async_trait]
impl PermissionSource for SessionSource {
    async fn load(&self, user: &CurrentUser) -> Result<Value, PermxError> {
        Ok(user.0.clone())
    }
}

/// Proof that a derivation was started for a given identity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
pub struct PermissionStore {
    state: RwLock<StoreState>,
    generation: AtomicU64,
}

impl PermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> StoreState {
        self.read().clone()
    }

    /// Run `f` against the current state without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        f(&self.read())
    }

    pub fn is_loading(&self) -> bool {
        self.read().is_loading
    }

    /// Start a derivation for a newly known identity. Grants are cleared so nothing
    /// from the previous identity is visible while loading.
    pub fn begin(&self) -> Ticket {
        let mut state = self.write();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *state = StoreState {
            is_loading: true,
            ..StoreState::default()
        };
        debug!("permission derivation #{} started", generation);
        Ticket(generation)
    }

    /// Land a derivation result. Returns false when the ticket is stale and the
    /// result was discarded.
    pub fn complete(&self, ticket: Ticket, result: Result<PermissionGrants, PermxError>) -> bool {
        let mut state = self.write();
        if self.generation.load(Ordering::SeqCst) != ticket.0 {
            debug!("discarding stale permission derivation #{}", ticket.0);
            return false;
        }

        match result {
            Ok(grants) => {
                info!(
                    "permissions loaded (derivation #{}, {} resources)",
                    ticket.0,
                    grants.resources().count()
                );
                *state = StoreState {
                    grants,
                    is_loading: false,
                    error: None,
                    loaded_at: Some(chrono::Utc::now()),
                };
            }
            Err(err) => {
                warn!("permission derivation #{} failed: {}", ticket.0, err);
                *state = StoreState {
                    error: Some(err.to_string()),
                    ..StoreState::default()
                };
            }
        }
        true
    }

    /// Logout: drop everything and invalidate in-flight derivations.
    pub fn clear(&self) {
        let mut state = self.write();
        self.generation.fetch_add(1, Ordering::SeqCst);
        *state = StoreState::default();
        debug!("permission store cleared");
    }

    /// React to an identity change. `None` means logged out.
    pub async fn refresh<S>(&self, user: Option<CurrentUser>, source: &S)
    where
        S: PermissionSource + ?Sized,
    {
        let user = match user {
            Some(user) => user,
            None => {
                self.clear();
                return;
            }
        };

        let ticket = self.begin();
        let result = match source.load(&user).await {
            Ok(payload) => extract_grants(&CurrentUser::new(payload)).map_err(PermxError::from),
            Err(err) => Err(err),
        };
        self.complete(ticket, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    /// Source whose loads block until the test releases them, per user email.
    struct GatedSource {
        gates: Mutex<HashMap<String, oneshot::Receiver<Value>>>,
    }

    #[async_trait]
    impl PermissionSource for GatedSource {
        async fn load(&self, user: &CurrentUser) -> Result<Value, PermxError> {
            let gate = self.gates.lock().unwrap().remove(&user.label());
            match gate {
                Some(rx) => rx
                    .await
                    .map_err(|_| PermxError::SourceFailed("gate dropped".into())),
                None => Err(PermxError::SourceFailed("no gate".into())),
            }
        }
    }

    struct FailingSource;

    #[async_trait]
    impl PermissionSource for FailingSource {
        async fn load(&self, _user: &CurrentUser) -> Result<Value, PermxError> {
            Err(PermxError::SourceFailed("verify endpoint unreachable".into()))
        }
    }

    fn user(email: &str, permissions: Value) -> CurrentUser {
        CurrentUser::new(json!({ "email": email, "permissions": permissions }))
    }

    #[test]
    fn test_initial_state_is_empty() {
        let store = PermissionStore::new();
        let state = store.snapshot();
        assert!(state.grants.is_empty());
        assert!(!state.is_loading);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_begin_clears_previous_grants() {
        let store = PermissionStore::new();
        let ticket = store.begin();
        store.complete(ticket, Ok(PermissionGrants::new().grant("providers", "menu")));
        assert!(!store.snapshot().grants.is_empty());

        store.begin();
        let state = store.snapshot();
        assert!(state.is_loading);
        assert!(state.grants.is_empty());
    }

    #[test]
    fn test_stale_ticket_is_discarded() {
        let store = PermissionStore::new();
        let first = store.begin();
        let second = store.begin();

        assert!(store.complete(second, Ok(PermissionGrants::new().grant("users", "menu"))));
        assert!(!store.complete(first, Ok(PermissionGrants::new().grant("providers", "menu"))));

        let state = store.snapshot();
        assert!(state.grants.is_granted("users", "menu"));
        assert!(!state.grants.is_granted("providers", "menu"));
    }

    #[test]
    fn test_clear_invalidates_in_flight() {
        let store = PermissionStore::new();
        let ticket = store.begin();
        store.clear();
        assert!(!store.complete(ticket, Ok(PermissionGrants::new().grant("users", "menu"))));
        assert!(store.snapshot().grants.is_empty());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_refresh_from_session() {
        let store = PermissionStore::new();
        store
            .refresh(Some(user("a@x.io", json!({ "providers": { "menu": 1 } }))), &SessionSource)
            .await;

        let state = store.snapshot();
        assert!(!state.is_loading);
        assert!(state.loaded_at.is_some());
        assert!(state.grants.is_granted("providers", "menu"));
    }

    #[tokio::test]
    async fn test_refresh_with_none_resets() {
        let store = PermissionStore::new();
        store
            .refresh(Some(user("a@x.io", json!({ "providers": { "menu": 1 } }))), &SessionSource)
            .await;
        store.refresh(None, &SessionSource).await;
        assert_eq!(store.snapshot(), StoreState::default());
    }

    #[tokio::test]
    async fn test_malformed_payload_records_error() {
        let store = PermissionStore::new();
        store
            .refresh(Some(user("a@x.io", json!("everything"))), &SessionSource)
            .await;

        let state = store.snapshot();
        assert!(state.grants.is_empty());
        assert!(!state.is_loading);
        assert!(state.error.unwrap().contains("user.permissions"));
    }

    #[tokio::test]
    async fn test_source_failure_records_error() {
        let store = PermissionStore::new();
        store
            .refresh(Some(user("a@x.io", json!({}))), &FailingSource)
            .await;

        let state = store.snapshot();
        assert!(state.grants.is_empty());
        assert_eq!(
            state.error.as_deref(),
            Some("Permission source failed: verify endpoint unreachable")
        );
    }

    #[tokio::test]
    async fn test_latest_identity_wins_when_earlier_load_finishes_last() {
        let store = PermissionStore::new();
        let (a_tx, a_rx) = oneshot::channel();
        let (b_tx, b_rx) = oneshot::channel();
        let source = GatedSource {
            gates: Mutex::new(HashMap::from([
                ("a@x.io".to_string(), a_rx),
                ("b@x.io".to_string(), b_rx),
            ])),
        };

        let user_a = CurrentUser::new(json!({ "email": "a@x.io" }));
        let user_b = CurrentUser::new(json!({ "email": "b@x.io" }));

        tokio::join!(
            store.refresh(Some(user_a), &source),
            store.refresh(Some(user_b), &source),
            async {
                b_tx.send(json!({ "permissions": { "users": { "menu": 1 } } }))
                    .unwrap();
                tokio::task::yield_now().await;
                a_tx.send(json!({ "permissions": { "providers": { "menu": 1 } } }))
                    .unwrap();
            }
        );

        let state = store.snapshot();
        assert!(!state.is_loading);
        assert!(state.grants.is_granted("users", "menu"));
        assert!(!state.grants.is_granted("providers", "menu"));
    }

    #[tokio::test]
    async fn test_hung_load_stays_loading_and_empty() {
        let store = PermissionStore::new();
        let (_tx, rx) = oneshot::channel::<Value>();
        let source = GatedSource {
            gates: Mutex::new(HashMap::from([("slow@x.io".to_string(), rx)])),
        };

        let refresh = store.refresh(Some(CurrentUser::new(json!({ "email": "slow@x.io" }))), &source);
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(20), refresh).await;

        assert!(timed_out.is_err());
        let state = store.snapshot();
        assert!(state.is_loading);
        assert!(state.grants.is_empty());
    }
}
