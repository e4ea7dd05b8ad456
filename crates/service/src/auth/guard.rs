use std::sync::Arc;

use models::{Role, RouteTable, Session};
use thiserror::Error;
use tracing::debug;

/// Why a navigation was refused, with where to send the user instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardDenial {
    #[error("sign-in required for the {area} area")]
    Unauthenticated { area: Role, login_route: String },
    #[error("a {role} session cannot open the {area} area")]
    WrongArea { role: Role, area: Role, landing_route: String },
}

impl GuardDenial {
    pub fn redirect(&self) -> &str {
        match self {
            GuardDenial::Unauthenticated { login_route, .. } => login_route,
            GuardDenial::WrongArea { landing_route, .. } => landing_route,
        }
    }
}

/// Keeps every session inside its own role's area.
#[derive(Clone)]
pub struct NavigationGuard {
    routes: Arc<RouteTable>,
}

impl NavigationGuard {
    pub fn new(routes: Arc<RouteTable>) -> Self {
        Self { routes }
    }

    /// Public paths are always allowed; area paths need a session of that role.
    pub fn authorize(&self, session: Option<&Session>, target: &str) -> Result<(), GuardDenial> {
        let Some(area) = self.routes.area_of(target) else {
            return Ok(());
        };
        match session {
            None => Err(GuardDenial::Unauthenticated { area, login_route: self.routes.login_route(area) }),
            Some(s) if s.role == area => Ok(()),
            Some(s) => {
                debug!(role = %s.role, %area, %target, "cross-area navigation refused");
                Err(GuardDenial::WrongArea {
                    role: s.role,
                    area,
                    landing_route: self.routes.landing_route(s.role).to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> NavigationGuard {
        NavigationGuard::new(Arc::new(RouteTable::default()))
    }

    #[test]
    fn public_pages_need_no_session() {
        assert_eq!(guard().authorize(None, "/"), Ok(()));
        assert_eq!(guard().authorize(None, "/privacy-policy"), Ok(()));
        assert_eq!(guard().authorize(None, "/login/doctor"), Ok(()));
    }

    #[test]
    fn area_requires_session() {
        let err = guard().authorize(None, "/doctor/appointments").unwrap_err();
        assert_eq!(err.redirect(), "/login/doctor");
    }

    #[test]
    fn non_canonical_area_paths_still_need_a_session() {
        for target in ["/Doctor/dashboard", "/patient/../doctor/x", "/DOCTOR"] {
            let err = guard().authorize(None, target).unwrap_err();
            assert_eq!(err.redirect(), "/login/doctor", "{target}");
        }
        let patient = Session::new("u1", Role::Patient, "Pat", "t");
        assert!(guard().authorize(Some(&patient), "/patient/../doctor/x").is_err());
    }

    #[test]
    fn session_stays_in_its_area() {
        let patient = Session::new("u1", Role::Patient, "Pat", "t");
        assert_eq!(guard().authorize(Some(&patient), "/patient/records"), Ok(()));

        let err = guard().authorize(Some(&patient), "/doctor/dashboard").unwrap_err();
        assert_eq!(
            err,
            GuardDenial::WrongArea { role: Role::Patient, area: Role::Doctor, landing_route: "/patient/dashboard".into() }
        );
        assert_eq!(err.redirect(), "/patient/dashboard");
    }

    #[test]
    fn every_role_is_locked_out_of_every_other_area() {
        let table = RouteTable::default();
        for role in Role::ALL {
            let s = Session::new("u", role, "n", "t");
            for other in Role::ALL {
                let res = guard().authorize(Some(&s), table.landing_route(other));
                assert_eq!(res.is_ok(), role == other, "{role} -> {other}");
            }
        }
    }
}
