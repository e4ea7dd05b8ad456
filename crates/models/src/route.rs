use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::errors::ModelError;
use crate::role::Role;

/// Landing route and owned area for one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub landing: String,
    pub area: String,
}

/// Immutable role -> route configuration. Adding a role is a data change here,
/// not a branch in every view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    entries: BTreeMap<Role, RouteEntry>,
}

static DEFAULT_TABLE: Lazy<RouteTable> = Lazy::new(|| {
    let entries = Role::ALL
        .into_iter()
        .map(|role| {
            let area = format!("/{}", role.as_str());
            (role, RouteEntry { landing: format!("{area}/dashboard"), area })
        })
        .collect();
    RouteTable { entries }
});

impl Default for RouteTable {
    fn default() -> Self {
        DEFAULT_TABLE.clone()
    }
}

impl RouteTable {
    /// Default table with landing routes replaced by `overrides` (`role name -> path`).
    /// A landing override must stay inside the role's own area.
    pub fn with_overrides<'a, I>(overrides: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut table = Self::default();
        for (name, route) in overrides {
            let role: Role = name.parse()?;
            let route = route.trim();
            let entry = table.entries.get_mut(&role).ok_or_else(|| ModelError::UnknownRole(name.clone()))?;
            if !route.starts_with('/') || !path_in_area(route, &entry.area) {
                return Err(ModelError::InvalidRoute { role: role.to_string(), route: route.to_string() });
            }
            entry.landing = route.to_string();
        }
        Ok(table)
    }

    pub fn from_config(cfg: &configs::AppConfig) -> Result<Self, ModelError> {
        Self::with_overrides(&cfg.routes)
    }

    pub fn landing_route(&self, role: Role) -> &str {
        // every role is present: tables are only built from DEFAULT_TABLE
        self.entries.get(&role).map(|e| e.landing.as_str()).unwrap_or("/")
    }

    pub fn login_route(&self, role: Role) -> String {
        format!("/login/{}", role.as_str())
    }

    /// Role owning `path`, or `None` for public pages. The path is
    /// canonicalised first, so `/Doctor/x` and `/patient/../doctor/x` both
    /// belong to the doctor area.
    pub fn area_of(&self, path: &str) -> Option<Role> {
        let path = canonical_path(path);
        self.entries
            .iter()
            .find(|(_, e)| path_in_area(&path, &e.area))
            .map(|(role, _)| *role)
    }
}

/// Lowercased path without query or fragment, with empty, `.` and `..`
/// segments resolved.
fn canonical_path(path: &str) -> String {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let mut segments: Vec<&str> = Vec::new();
    for segment in path[..end].split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/")).to_lowercase()
}

fn path_in_area(path: &str, area: &str) -> bool {
    match path.strip_prefix(area) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_routes() {
        let t = RouteTable::default();
        assert_eq!(t.landing_route(Role::Doctor), "/doctor/dashboard");
        assert_eq!(t.landing_route(Role::Laboratory), "/laboratory/dashboard");
        assert_eq!(t.area_of("/admin"), Some(Role::Admin));
        assert_eq!(t.login_route(Role::Staff), "/login/staff");
    }

    #[test]
    fn area_matching_is_segment_aware() {
        let t = RouteTable::default();
        assert_eq!(t.area_of("/doctor"), Some(Role::Doctor));
        assert_eq!(t.area_of("/doctor/patients/42?tab=notes"), Some(Role::Doctor));
        assert_eq!(t.area_of("/doctors-directory"), None);
        assert_eq!(t.area_of("/"), None);
        assert_eq!(t.area_of("/login/doctor"), None);
    }

    #[test]
    fn area_matching_ignores_case_and_dot_segments() {
        let t = RouteTable::default();
        assert_eq!(t.area_of("/Doctor/dashboard"), Some(Role::Doctor));
        assert_eq!(t.area_of("/patient/../doctor/x"), Some(Role::Doctor));
        assert_eq!(t.area_of("//admin/./users"), Some(Role::Admin));
        assert_eq!(t.area_of("/doctor/../privacy-policy"), None);
        assert_eq!(t.area_of("/../../staff"), Some(Role::Staff));
    }

    #[test]
    fn overrides_replace_landing_only() {
        let mut o = BTreeMap::new();
        o.insert("Doctor".to_string(), "/doctor/today".to_string());
        let t = RouteTable::with_overrides(&o).unwrap();
        assert_eq!(t.landing_route(Role::Doctor), "/doctor/today");
        assert_eq!(t.area_of("/doctor/today"), Some(Role::Doctor));
        assert_eq!(t.landing_route(Role::Patient), "/patient/dashboard");
    }

    #[test]
    fn overrides_are_validated() {
        let mut o = BTreeMap::new();
        o.insert("nurse".to_string(), "/nurse".to_string());
        assert_eq!(RouteTable::with_overrides(&o), Err(ModelError::UnknownRole("nurse".into())));

        let mut o = BTreeMap::new();
        o.insert("patient".to_string(), "/admin/dashboard".to_string());
        assert!(matches!(RouteTable::with_overrides(&o), Err(ModelError::InvalidRoute { .. })));
    }
}
