//! Storage for the service layer
//!
//! `JsonMapStore` persists a small map as one JSON file; `SessionStore` builds
//! the portal's client-side session storage on top of it.

pub mod json_map_store;
pub mod session_store;

pub use json_map_store::JsonMapStore;
pub use session_store::SessionStore;
