//! Shared runtime helpers for the portal binaries: logging setup, data
//! directory checks and the admin HTTP listener.

pub mod admin_http;
pub mod env;
pub mod types;
pub mod utils;
