//! Portal domain types shared by the resolver, the demo server and the CLI.

pub mod auth_result;
pub mod credential;
pub mod errors;
pub mod role;
pub mod route;
pub mod session;

pub use auth_result::{AuthResult, FailureReason};
pub use credential::Credential;
pub use role::Role;
pub use route::RouteTable;
pub use session::Session;
