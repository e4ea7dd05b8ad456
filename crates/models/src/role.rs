use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Access category a session grants. The set is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Staff,
    Laboratory,
    Admin,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::Patient, Role::Doctor, Role::Staff, Role::Laboratory, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Staff => "staff",
            Role::Laboratory => "laboratory",
            Role::Admin => "admin",
        }
    }

    /// Staff log in with a staff ID; everyone else uses an email address.
    pub fn identifier_label(&self) -> &'static str {
        match self {
            Role::Staff => "staff ID",
            _ => "email",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ModelError::UnknownRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Doctor".parse::<Role>().unwrap(), Role::Doctor);
        assert_eq!(" laboratory ".parse::<Role>().unwrap(), Role::Laboratory);
        assert_eq!("nurse".parse::<Role>(), Err(ModelError::UnknownRole("nurse".into())));
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let r: Role = serde_json::from_str("\"staff\"").unwrap();
        assert_eq!(r, Role::Staff);
        assert!(serde_json::from_str::<Role>("\"Staff\"").is_err());
    }
}
