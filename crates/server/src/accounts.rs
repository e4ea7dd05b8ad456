use std::path::PathBuf;
use std::sync::Arc;

use argon2::{password_hash::{PasswordHasher, PasswordVerifier, SaltString}, Argon2, PasswordHash};
use models::Role;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use service::errors::ServiceError;
use service::storage::JsonMapStore;
use tracing::{debug, info};

/// Stored account (hashed password).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub identifier: String,
    pub role: Role,
    pub display_name: String,
    pub password_hash: String,
    pub password_algorithm: String,
}

/// File-backed account directory keyed by lowercase identifier.
pub struct AccountDirectory {
    store: Arc<JsonMapStore<String, Account>>,
}

pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

impl AccountDirectory {
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let store = JsonMapStore::open(path).await?;
        Ok(Arc::new(Self { store }))
    }

    pub async fn len(&self) -> usize {
        self.store.list().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Hash `password` and insert or replace the account for `identifier`.
    pub async fn seed_account(&self, identifier: &str, password: &str, role: Role, display_name: &str) -> Result<Account, ServiceError> {
        if password.len() < 8 {
            return Err(ServiceError::Validation("password too short (>=8)".into()));
        }
        let key = normalize_identifier(identifier);
        if key.is_empty() {
            return Err(ServiceError::Validation("identifier required".into()));
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| ServiceError::Validation(e.to_string()))?
            .to_string();
        let id = match self.store.get(&key).await {
            Some(existing) => existing.id,
            None => uuid::Uuid::new_v4().to_string(),
        };
        let account = Account {
            id,
            identifier: key.clone(),
            role,
            display_name: display_name.to_string(),
            password_hash: hash,
            password_algorithm: "argon2".into(),
        };
        self.store.insert(key, account.clone()).await?;
        info!(account_id = %account.id, %role, "account seeded");
        Ok(account)
    }

    pub async fn find(&self, identifier: &str) -> Option<Account> {
        self.store.get(&normalize_identifier(identifier)).await
    }

    /// `Some(account)` only when the password matches.
    pub async fn verify(&self, identifier: &str, password: &str) -> Result<Option<Account>, ServiceError> {
        let Some(account) = self.find(identifier).await else {
            debug!("unknown identifier");
            return Ok(None);
        };
        let parsed = PasswordHash::new(&account.password_hash).map_err(|e| ServiceError::Storage(e.to_string()))?;
        if Argon2::default().verify_password(password.as_bytes(), &parsed).is_err() {
            return Ok(None);
        }
        Ok(Some(account))
    }

    pub async fn remove(&self, identifier: &str) -> Result<bool, ServiceError> {
        self.store.remove(&normalize_identifier(identifier)).await
    }
}

/// One account per role for local development.
pub async fn seed_demo_accounts(dir: &AccountDirectory, password: &str) -> Result<(), ServiceError> {
    for role in Role::ALL {
        let identifier = match role {
            Role::Staff => "STAFF-0001".to_string(),
            r => format!("{}@demo.health", r.as_str()),
        };
        let name = format!("Demo {}", role.as_str());
        dir.seed_account(&identifier, password, role, &name).await?;
    }
    Ok(())
}
