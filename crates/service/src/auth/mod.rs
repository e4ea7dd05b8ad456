//! Auth module: collaborator seam, session resolution and navigation guarding.
//!
//! The authentication service itself is external; this module only verifies
//! credentials through an [`AuthCollaborator`] and turns the answer into a
//! role-checked session.

pub mod collaborator;
pub mod domain;
pub mod errors;
pub mod guard;
pub mod http;
pub mod resolver;

pub use collaborator::AuthCollaborator;
pub use guard::{GuardDenial, NavigationGuard};
pub use http::HttpAuthCollaborator;
pub use resolver::{Resolution, ResolverConfig, ResolverState, RestoreOutcome, SessionResolver};
