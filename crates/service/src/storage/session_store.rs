//! Client-side session storage.
//!
//! Process-wide holder of the current [`Session`], mirrored to a JSON file under
//! the keys `auth.token` and `auth.user`. The only writers are [`SessionStore::set`]
//! / [`SessionStore::set_when`] and [`SessionStore::clear`]; a session read back
//! by [`SessionStore::init`] stays *pending* until its token is re-validated.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use models::{Role, Session};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::json_map_store::JsonMapStore;
use crate::errors::ServiceError;

pub const TOKEN_KEY: &str = "auth.token";
pub const USER_KEY: &str = "auth.user";

#[derive(Debug, Serialize, Deserialize)]
struct StoredUser {
    id: String,
    role: Role,
    display_name: String,
    issued_at: DateTime<Utc>,
}

pub struct SessionStore {
    file: Arc<JsonMapStore<String, Value>>,
    current: ArcSwapOption<Session>,
    pending: ArcSwapOption<Session>,
    writes: Mutex<()>,
}

impl SessionStore {
    /// Read the storage file on app start.
    pub async fn init<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let file = JsonMapStore::<String, Value>::open(path).await?;
        let pending = decode(&file).await;
        if let Some(s) = &pending {
            debug!(role = %s.role, user_id = %s.user_id, "stored session awaiting validation");
        }
        Ok(Arc::new(Self {
            file,
            current: ArcSwapOption::empty(),
            pending: ArcSwapOption::new(pending.map(Arc::new)),
            writes: Mutex::new(()),
        }))
    }

    /// The active, verified session.
    pub fn current(&self) -> Option<Arc<Session>> {
        self.current.load_full()
    }

    /// Session restored from disk that has not been re-validated yet.
    pub fn pending(&self) -> Option<Arc<Session>> {
        self.pending.load_full()
    }

    /// Promote the pending session to current if it is still `expected`.
    pub async fn activate_pending(&self, expected: &Session) -> Option<Arc<Session>> {
        let _guard = self.writes.lock().await;
        let pending = self.pending.load_full()?;
        if pending.as_ref() != expected {
            return None;
        }
        self.pending.store(None);
        self.current.store(Some(Arc::clone(&pending)));
        Some(pending)
    }

    /// Remove the pending session from memory and disk if it is still
    /// `expected`. Returns `Ok(false)` when a newer session replaced it.
    pub async fn discard_pending(&self, expected: &Session) -> Result<bool, ServiceError> {
        let _guard = self.writes.lock().await;
        match self.pending.load_full() {
            Some(pending) if pending.as_ref() == expected => {}
            _ => return Ok(false),
        }
        self.file.clear().await?;
        self.pending.store(None);
        info!(role = %expected.role, user_id = %expected.user_id, "stored session discarded");
        Ok(true)
    }

    pub async fn set(&self, session: Session, remember: bool) -> Result<(), ServiceError> {
        self.set_when(session, remember, || true).await.map(|_| ())
    }

    /// Replace the stored session if `still_valid()` holds once the write lock
    /// is taken. Returns `Ok(false)` when the write was skipped.
    ///
    /// With `remember == false` the session lives in memory only and any
    /// persisted entry is removed.
    pub async fn set_when<F>(&self, session: Session, remember: bool, still_valid: F) -> Result<bool, ServiceError>
    where
        F: FnOnce() -> bool,
    {
        let _guard = self.writes.lock().await;
        if !still_valid() {
            return Ok(false);
        }
        if remember {
            self.file.replace_all(encode(&session)?).await?;
        } else {
            self.file.clear().await?;
        }
        info!(role = %session.role, user_id = %session.user_id, remember, "session stored");
        self.pending.store(None);
        self.current.store(Some(Arc::new(session)));
        Ok(true)
    }

    /// Drop the session everywhere (logout or token invalidation).
    pub async fn clear(&self) -> Result<(), ServiceError> {
        let _guard = self.writes.lock().await;
        self.file.clear().await?;
        self.pending.store(None);
        self.current.store(None);
        info!("session cleared");
        Ok(())
    }

    /// Whether a session is written to disk.
    pub async fn is_persisted(&self) -> bool {
        self.file.get(&TOKEN_KEY.to_string()).await.is_some()
    }
}

fn encode(session: &Session) -> Result<HashMap<String, Value>, ServiceError> {
    let user = StoredUser {
        id: session.user_id.clone(),
        role: session.role,
        display_name: session.display_name.clone(),
        issued_at: session.issued_at,
    };
    let mut entries = HashMap::new();
    entries.insert(TOKEN_KEY.to_string(), Value::String(session.token.clone()));
    entries.insert(USER_KEY.to_string(), serde_json::to_value(user).map_err(ServiceError::storage)?);
    Ok(entries)
}

async fn decode(file: &JsonMapStore<String, Value>) -> Option<Session> {
    let token = file.get(&TOKEN_KEY.to_string()).await?;
    let user = file.get(&USER_KEY.to_string()).await?;
    let token = token.as_str()?.to_string();
    match serde_json::from_value::<StoredUser>(user) {
        Ok(u) => Some(Session { user_id: u.id, role: u.role, display_name: u.display_name, token, issued_at: u.issued_at }),
        Err(e) => {
            warn!(error = %e, "ignoring malformed stored user");
            None
        }
    }
}
