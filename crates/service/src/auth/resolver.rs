//! Session resolution for the portal login forms.
//!
//! One [`SessionResolver`] backs one login form. It moves through
//! `Idle -> Submitting -> {Resolved, Failed}`; a submit while `Submitting` is
//! ignored, and [`SessionResolver::abandon`] makes any in-flight attempt stale
//! so its result is never applied.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use models::{AuthResult, Credential, FailureReason, Role, RouteTable, Session};
use tracing::{debug, error, info, instrument, warn};

use super::collaborator::AuthCollaborator;
use super::domain::{LoginRequest, LoginResponse, RemoteUser};
use super::errors::CollaboratorError;
use crate::errors::ServiceError;
use crate::observability::{
    ABANDONED_TOTAL, COLLABORATOR_DURATION, IGNORED_SUBMITS_TOTAL, LOGIN_ATTEMPTS_TOTAL, LOGIN_FAILURES_TOTAL,
    LOGIN_SUCCESS_TOTAL,
};
use crate::retry::{retry_with_policy, RetryPolicy};
use crate::storage::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Idle,
    Submitting,
    Resolved,
    Failed,
}

/// What a call to [`SessionResolver::resolve`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The attempt ran to completion.
    Settled(AuthResult),
    /// Another submit was already in flight; nothing was done.
    InProgress,
    /// The view abandoned the attempt before it settled; the result was dropped.
    Abandoned,
}

impl Resolution {
    pub fn result(&self) -> Option<&AuthResult> {
        match self {
            Resolution::Settled(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_result(self) -> Option<AuthResult> {
        match self {
            Resolution::Settled(r) => Some(r),
            _ => None,
        }
    }
}

/// Result of re-validating the session found in storage at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored { session: Arc<Session>, landing_route: String },
    /// Nothing stored.
    Empty,
    /// The stored token is no longer valid; storage was cleared.
    Invalidated,
    /// The service could not be reached; the stored entry is kept but not used.
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Upper bound on one collaborator call.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(10), retry: RetryPolicy::disabled() }
    }
}

impl ResolverConfig {
    pub fn from_app_config(cfg: &configs::AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(cfg.auth.timeout_secs),
            retry: RetryPolicy::from_config(&cfg.retry),
        }
    }
}

struct Attempt {
    state: ResolverState,
    generation: u64,
}

pub struct SessionResolver<C: AuthCollaborator> {
    collaborator: Arc<C>,
    store: Arc<SessionStore>,
    routes: Arc<RouteTable>,
    cfg: ResolverConfig,
    attempt: Mutex<Attempt>,
}

impl<C: AuthCollaborator> SessionResolver<C> {
    pub fn new(collaborator: Arc<C>, store: Arc<SessionStore>, routes: Arc<RouteTable>, cfg: ResolverConfig) -> Self {
        Self {
            collaborator,
            store,
            routes,
            cfg,
            attempt: Mutex::new(Attempt { state: ResolverState::Idle, generation: 0 }),
        }
    }

    pub fn state(&self) -> ResolverState {
        self.attempt().state
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Resolve a login submitted through the form for `credential.role_claim`.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use models::{Credential, Role, RouteTable};
    /// use service::auth::collaborator::mock::MockAuthCollaborator;
    /// use service::auth::{Resolution, ResolverConfig, SessionResolver};
    /// use service::storage::SessionStore;
    ///
    /// let path = std::env::temp_dir().join(format!("doc_session_{}.json", std::process::id()));
    /// let store = tokio_test::block_on(SessionStore::init(&path)).unwrap();
    /// let mock = Arc::new(MockAuthCollaborator::new().with_account("dr@h.com", "x", Role::Doctor, "Dr. Who"));
    /// let resolver = SessionResolver::new(mock, store, Arc::new(RouteTable::default()), ResolverConfig::default());
    ///
    /// let res = tokio_test::block_on(resolver.resolve(Credential::new(Role::Doctor, "dr@h.com", "x")));
    /// let Resolution::Settled(result) = res else { panic!("not settled") };
    /// assert_eq!(result.session().unwrap().role, Role::Doctor);
    /// ```
    #[instrument(skip(self, credential), fields(role = %credential.role_claim, identifier = %credential.identifier))]
    pub async fn resolve(&self, credential: Credential) -> Resolution {
        let Some(generation) = self.begin() else {
            debug!("submit ignored: attempt already in flight");
            IGNORED_SUBMITS_TOTAL.inc();
            return Resolution::InProgress;
        };
        LOGIN_ATTEMPTS_TOTAL.with_label_values(&[credential.role_claim.as_str()]).inc();

        let outcome = self.run(&credential, generation).await;
        self.settle(generation, outcome)
    }

    /// Turn the outcome of attempt `generation` into what the caller sees. A
    /// success was already committed while the store's write lock was held,
    /// so an `abandon` arriving after that point no longer undoes it.
    fn settle(&self, generation: u64, outcome: Option<AuthResult>) -> Resolution {
        let Some(result) = outcome else {
            return self.abandoned();
        };
        if !result.is_success() && !self.fail(generation) {
            return self.abandoned();
        }

        match &result {
            AuthResult::Success { session, landing_route } => {
                LOGIN_SUCCESS_TOTAL.with_label_values(&[session.role.as_str()]).inc();
                info!(user_id = %session.user_id, %landing_route, "login resolved");
            }
            AuthResult::Failure { reason } => {
                LOGIN_FAILURES_TOTAL.with_label_values(&[reason.as_str()]).inc();
                info!(%reason, "login failed");
            }
        }
        Resolution::Settled(result)
    }

    /// Forget any in-flight attempt. Its result is not applied unless it was
    /// already being written to the store.
    pub fn abandon(&self) {
        let mut attempt = self.attempt();
        attempt.generation += 1;
        attempt.state = ResolverState::Idle;
    }

    /// Abandon any in-flight attempt and clear stored session data.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ServiceError> {
        self.abandon();
        self.store.clear().await?;
        info!("logged out");
        Ok(())
    }

    /// Re-validate the session read from storage by [`SessionStore::init`] and
    /// activate it only if the service still vouches for it.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<RestoreOutcome, ServiceError> {
        let Some(stored) = self.store.pending() else {
            return Ok(RestoreOutcome::Empty);
        };

        let token = stored.token.as_str();
        let validated = self.call(|c| async move { c.validate_token(token).await }).await;
        match validated {
            Ok(user) if same_identity(&user, &stored) => match self.store.activate_pending(&stored).await {
                Some(session) => {
                    let landing_route = self.routes.landing_route(session.role).to_string();
                    info!(role = %session.role, user_id = %session.user_id, "stored session restored");
                    Ok(RestoreOutcome::Restored { session, landing_route })
                }
                None => Ok(RestoreOutcome::Empty),
            },
            Ok(user) => {
                warn!(stored_role = %stored.role, reported_role = %user.role, "stored session identity changed");
                self.discard(&stored).await
            }
            Err(e) if e.is_transient() => {
                warn!(error = %e, "cannot validate stored session yet");
                Ok(RestoreOutcome::Unavailable)
            }
            Err(e) => {
                info!(error = %e, "stored session no longer valid");
                self.discard(&stored).await
            }
        }
    }

    /// Drop the stored session unless a login replaced it meanwhile.
    async fn discard(&self, stored: &Session) -> Result<RestoreOutcome, ServiceError> {
        if self.store.discard_pending(stored).await? {
            Ok(RestoreOutcome::Invalidated)
        } else {
            debug!("stored session superseded by a newer login");
            Ok(RestoreOutcome::Empty)
        }
    }

    /// `None` when the attempt went stale before it could settle.
    async fn run(&self, credential: &Credential, generation: u64) -> Option<AuthResult> {
        if !credential.is_complete() {
            debug!("blank {} or secret", credential.role_claim.identifier_label());
            return Some(AuthResult::failure(FailureReason::InvalidInput));
        }

        let request = LoginRequest { identifier: credential.identifier.trim().to_string(), secret: credential.secret.clone() };
        let verified = self.call(|c| {
            let request = &request;
            async move { c.verify(request).await }
        })
        .await;
        if !self.is_current(generation) {
            return None;
        }

        let LoginResponse { token, user } = match verified {
            Ok(resp) => resp,
            Err(e) => {
                warn!(code = e.code(), error = %e, "authentication collaborator failed");
                return Some(AuthResult::failure(e.failure_reason()));
            }
        };

        let claimed = credential.role_claim;
        match user.role.parse::<Role>() {
            Ok(actual) if actual == claimed => {}
            _ => {
                info!(%claimed, actual = %user.role, "identity belongs to another portal");
                return Some(AuthResult::failure(FailureReason::RoleMismatch));
            }
        }

        let session = Session::new(user.id, claimed, user.display_name, token);
        let landing_route = self.routes.landing_route(claimed).to_string();
        match self
            .store
            .set_when(session.clone(), credential.remember_me, || self.commit(generation))
            .await
        {
            Ok(true) => Some(AuthResult::Success { session, landing_route }),
            Ok(false) => None,
            Err(e) => {
                error!(error = %e, "cannot store session");
                Some(AuthResult::failure(FailureReason::ServiceUnavailable))
            }
        }
    }

    /// One bounded collaborator call, retried per policy.
    async fn call<'a, T, F, Fut>(&'a self, op: F) -> Result<T, CollaboratorError>
    where
        F: Fn(&'a C) -> Fut,
        Fut: std::future::Future<Output = Result<T, CollaboratorError>>,
    {
        let collaborator = self.collaborator.as_ref();
        let limit = self.cfg.timeout;
        let op = &op;
        let started = Instant::now();
        let res = retry_with_policy(&self.cfg.retry, || async move {
            match tokio::time::timeout(limit, op(collaborator)).await {
                Ok(r) => r,
                Err(_) => Err(CollaboratorError::Timeout(limit)),
            }
        })
        .await;
        COLLABORATOR_DURATION.observe(started.elapsed().as_secs_f64());
        res
    }

    fn attempt(&self) -> MutexGuard<'_, Attempt> {
        self.attempt.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Option<u64> {
        let mut attempt = self.attempt();
        if attempt.state == ResolverState::Submitting {
            return None;
        }
        attempt.generation += 1;
        attempt.state = ResolverState::Submitting;
        Some(attempt.generation)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.attempt().generation == generation
    }

    fn commit(&self, generation: u64) -> bool {
        self.transition(generation, ResolverState::Resolved)
    }

    fn fail(&self, generation: u64) -> bool {
        self.transition(generation, ResolverState::Failed)
    }

    fn transition(&self, generation: u64, state: ResolverState) -> bool {
        let mut attempt = self.attempt();
        if attempt.generation != generation {
            return false;
        }
        attempt.state = state;
        true
    }

    fn abandoned(&self) -> Resolution {
        debug!("resolution abandoned");
        ABANDONED_TOTAL.inc();
        Resolution::Abandoned
    }
}

fn same_identity(user: &RemoteUser, stored: &Session) -> bool {
    user.id == stored.user_id && user.role.parse::<Role>().map_or(false, |r| r == stored.role)
}
