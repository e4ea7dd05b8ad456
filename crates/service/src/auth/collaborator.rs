use async_trait::async_trait;

use super::domain::{LoginRequest, LoginResponse, RemoteUser};
use super::errors::CollaboratorError;

/// External authentication capability the resolver delegates to.
#[async_trait]
pub trait AuthCollaborator: Send + Sync {
    /// Verify `identifier`/`secret` and return the identity with a token.
    async fn verify(&self, request: &LoginRequest) -> Result<LoginResponse, CollaboratorError>;

    /// Check that a previously issued token is still valid.
    async fn validate_token(&self, token: &str) -> Result<RemoteUser, CollaboratorError>;
}

/// In-memory collaborator for tests, benches and offline demos.
///
/// It only stands in for the remote service: the resolver still applies the
/// role-match rule to whatever it returns.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, MutexGuard, PoisonError};
    use std::time::Duration;

    use models::Role;

    struct MockAccount {
        secret: String,
        user: RemoteUser,
    }

    #[derive(Default)]
    pub struct MockAuthCollaborator {
        accounts: Mutex<HashMap<String, MockAccount>>, // key: lowercase identifier
        tokens: Mutex<HashMap<String, RemoteUser>>,    // key: issued token
        latency: Mutex<Option<Duration>>,
        failure: Mutex<Option<CollaboratorError>>,
        verify_calls: AtomicUsize,
        validate_calls: AtomicUsize,
    }

    fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
        m.lock().unwrap_or_else(PoisonError::into_inner)
    }

    impl MockAuthCollaborator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_account(self, identifier: &str, secret: &str, role: Role, display_name: &str) -> Self {
            self.add_account(identifier, secret, role.as_str(), display_name);
            self
        }

        /// Register an account; `role` is free text as on the real wire.
        pub fn add_account(&self, identifier: &str, secret: &str, role: &str, display_name: &str) {
            let key = identifier.trim().to_lowercase();
            let user = RemoteUser { id: format!("user-{}", uuid::Uuid::new_v4()), role: role.to_string(), display_name: display_name.to_string() };
            lock(&self.accounts).insert(key, MockAccount { secret: secret.to_string(), user });
        }

        /// Delay every answer, e.g. to keep a submit in flight.
        pub fn set_latency(&self, latency: Option<Duration>) {
            *lock(&self.latency) = latency;
        }

        /// Make every call fail with `error` until reset with `None`.
        pub fn fail_with(&self, error: Option<CollaboratorError>) {
            *lock(&self.failure) = error;
        }

        /// Invalidate every token issued so far.
        pub fn revoke_tokens(&self) {
            lock(&self.tokens).clear();
        }

        pub fn verify_calls(&self) -> usize {
            self.verify_calls.load(Ordering::SeqCst)
        }

        pub fn validate_calls(&self) -> usize {
            self.validate_calls.load(Ordering::SeqCst)
        }

        async fn simulate(&self) -> Result<(), CollaboratorError> {
            let latency = *lock(&self.latency);
            if let Some(d) = latency {
                tokio::time::sleep(d).await;
            }
            match lock(&self.failure).clone() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl AuthCollaborator for MockAuthCollaborator {
        async fn verify(&self, request: &LoginRequest) -> Result<LoginResponse, CollaboratorError> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            self.simulate().await?;
            let key = request.identifier.trim().to_lowercase();
            let user = {
                let accounts = lock(&self.accounts);
                match accounts.get(&key) {
                    Some(a) if a.secret == request.secret => a.user.clone(),
                    _ => return Err(CollaboratorError::Rejected("invalid credentials".into())),
                }
            };
            let token = format!("mock-{}", uuid::Uuid::new_v4());
            lock(&self.tokens).insert(token.clone(), user.clone());
            Ok(LoginResponse { token, user })
        }

        async fn validate_token(&self, token: &str) -> Result<RemoteUser, CollaboratorError> {
            self.validate_calls.fetch_add(1, Ordering::SeqCst);
            self.simulate().await?;
            lock(&self.tokens)
                .get(token)
                .cloned()
                .ok_or_else(|| CollaboratorError::Rejected("token expired or revoked".into()))
        }
    }

}
