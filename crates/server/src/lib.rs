//! Demo authentication service speaking the portal collaborator contract.
//!
//! Not part of the portal core: it lets the HTTP collaborator be exercised
//! against a real listener during development and in tests.

pub mod accounts;
pub mod errors;
pub mod routes;
pub mod startup;
pub mod tokens;

pub use startup::run;
