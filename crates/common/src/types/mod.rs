use serde::Serialize;

/// Body returned by health endpoints.
#[derive(Serialize, Debug, Clone, Copy)]
pub struct Health {
    pub status: &'static str,
    pub service: &'static str,
}
