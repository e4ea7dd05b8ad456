//! Service layer for the portal session core.
//! - `auth`: collaborators, the session resolver and the navigation guard.
//! - `storage`: file-backed client storage for the current session.
//! - `retry` and `observability`: hardening and metrics around collaborator calls.

pub mod auth;
pub mod errors;
pub mod observability;
pub mod retry;
pub mod storage;
