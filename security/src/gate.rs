// security/src/gate.rs
//! Role and permission checks applied to a request before its handler runs.
//!
//! Every check resolves to one of three outcomes. An unauthenticated caller is
//! always rejected with [`Decision::Unauthenticated`] before roles are looked
//! at. The super role only bypasses permission checks; role checks compare
//! names literally.


use models::medical::{Role, User};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::roles::{ADMIN_ROLE, SUPER_ADMIN_ROLE};

/// The caller a request is evaluated for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Principal {
    pub authenticated: bool,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Principal {
            authenticated: false,
            user_id: None,
            username: None,
            roles: Vec::new(),
        }
    }

    /// An authenticated principal for `user`, holding the resolved role records.
    pub fn for_user(user: &User, roles: Vec<Role>) -> Self {
        Principal {
            authenticated: true,
            user_id: Some(user.id),
            username: Some(user.username.clone()),
            roles,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|role| role.name == name)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.roles.iter().any(|role| role.grants(permission))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Unauthenticated,
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Insufficient role or permission")]
    Forbidden,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    pub fn into_result(self) -> Result<(), GateError> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Unauthenticated => Err(GateError::Unauthenticated),
            Decision::Forbidden => Err(GateError::Forbidden),
        }
    }
}

/// What a route asks of its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// At least one of the named roles.
    AnyRole(Vec<String>),
    /// Every listed permission, unless the caller holds the super role.
    AllPermissions(Vec<String>),
    /// The admin role or the super role.
    Admin,
    /// The super role.
    SuperAdmin,
}

impl Requirement {
    pub fn any_role<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Requirement::AnyRole(names.into_iter().map(Into::into).collect())
    }

    pub fn all_permissions<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Requirement::AllPermissions(permissions.into_iter().map(Into::into).collect())
    }

    pub fn check(&self, principal: &Principal) -> Decision {
        match self {
            Requirement::AnyRole(names) => require_any_role(principal, names),
            Requirement::AllPermissions(permissions) => require_all_permissions(principal, permissions),
            Requirement::Admin => require_admin(principal),
            Requirement::SuperAdmin => require_super_admin(principal),
        }
    }
}

pub fn require_any_role<S: AsRef<str>>(principal: &Principal, names: &[S]) -> Decision {
    if !principal.is_authenticated() {
        return Decision::Unauthenticated;
    }
    if names.iter().any(|name| principal.has_role(name.as_ref())) {
        Decision::Allowed
    } else {
        Decision::Forbidden
    }
}

pub fn require_all_permissions<S: AsRef<str>>(principal: &Principal, permissions: &[S]) -> Decision {
    if !principal.is_authenticated() {
        return Decision::Unauthenticated;
    }
    if principal.has_role(SUPER_ADMIN_ROLE) {
        return Decision::Allowed;
    }
    if permissions.iter().all(|perm| principal.has_permission(perm.as_ref())) {
        Decision::Allowed
    } else {
        Decision::Forbidden
    }
}

pub fn require_admin(principal: &Principal) -> Decision {
    if !principal.is_authenticated() {
        return Decision::Unauthenticated;
    }
    if principal.has_role(ADMIN_ROLE) || principal.has_role(SUPER_ADMIN_ROLE) {
        Decision::Allowed
    } else {
        Decision::Forbidden
    }
}

pub fn require_super_admin(principal: &Principal) -> Decision {
    if !principal.is_authenticated() {
        return Decision::Unauthenticated;
    }
    if principal.has_role(SUPER_ADMIN_ROLE) {
        Decision::Allowed
    } else {
        Decision::Forbidden
    }
}

/// Applies several requirements in order; the first rejection wins.
pub fn authorize(principal: &Principal, requirements: &[Requirement]) -> Decision {
    requirements
        .iter()
        .map(|requirement| requirement.check(principal))
        .find(|decision| !decision.is_allowed())
        .unwrap_or(Decision::Allowed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(name: &str, permissions: &[&str]) -> Role {
        Role::new(name, "", permissions.iter().map(|p| p.to_string()).collect())
    }

    fn principal(roles: Vec<Role>) -> Principal {
        Principal {
            authenticated: true,
            user_id: Some(Uuid::new_v4()),
            username: Some("tester".into()),
            roles,
        }
    }

    #[test]
    fn anonymous_is_unauthenticated_for_every_check() {
        let anon = Principal::anonymous();
        assert_eq!(require_any_role(&anon, &["admin"]), Decision::Unauthenticated);
        assert_eq!(require_all_permissions(&anon, &["manage_users"]), Decision::Unauthenticated);
        assert_eq!(require_admin(&anon), Decision::Unauthenticated);
        assert_eq!(require_super_admin(&anon), Decision::Unauthenticated);
    }

    #[test]
    fn unauthenticated_flag_wins_over_roles() {
        let mut p = principal(vec![role("super_admin", &[])]);
        p.authenticated = false;
        assert_eq!(require_super_admin(&p), Decision::Unauthenticated);
    }

    #[test]
    fn super_admin_bypasses_permission_checks() {
        let p = principal(vec![role("super_admin", &[])]);
        assert_eq!(require_all_permissions(&p, &["manage_users"]), Decision::Allowed);
    }

    #[test]
    fn admin_without_permission_is_forbidden() {
        let p = principal(vec![role("admin", &["view_analytics"])]);
        assert_eq!(require_all_permissions(&p, &["manage_users"]), Decision::Forbidden);
    }

    #[test]
    fn permissions_union_across_roles() {
        let p = principal(vec![
            role("doctor", &["view_patients"]),
            role("staff", &["view_appointments"]),
        ]);
        assert_eq!(
            require_all_permissions(&p, &["view_patients", "view_appointments"]),
            Decision::Allowed
        );
        assert_eq!(
            require_all_permissions(&p, &["view_patients", "manage_users"]),
            Decision::Forbidden
        );
    }

    #[test]
    fn empty_permission_list_allows_any_authenticated_caller() {
        let p = principal(Vec::new());
        let none: [&str; 0] = [];
        assert_eq!(require_all_permissions(&p, &none), Decision::Allowed);
    }

    #[test]
    fn require_admin_accepts_admin_and_super_admin() {
        assert_eq!(require_admin(&principal(vec![role("admin", &[])])), Decision::Allowed);
        assert_eq!(require_admin(&principal(vec![role("super_admin", &[])])), Decision::Allowed);
        assert_eq!(require_admin(&principal(vec![role("doctor", &[])])), Decision::Forbidden);
    }

    #[test]
    fn require_super_admin_rejects_admin() {
        assert_eq!(require_super_admin(&principal(vec![role("admin", &[])])), Decision::Forbidden);
    }

    #[test]
    fn any_role_has_no_super_admin_override() {
        let p = principal(vec![role("super_admin", &["all"])]);
        assert_eq!(require_any_role(&p, &["doctor"]), Decision::Forbidden);
        assert_eq!(require_any_role(&p, &["doctor", "super_admin"]), Decision::Allowed);
    }

    #[test]
    fn authorize_reports_first_rejection() {
        let p = principal(vec![role("doctor", &["manage_appointments"])]);
        let requirements = [
            Requirement::all_permissions(["manage_appointments"]),
            Requirement::Admin,
        ];
        assert_eq!(authorize(&p, &requirements), Decision::Forbidden);
        assert_eq!(authorize(&p, &requirements[..1]), Decision::Allowed);
        assert_eq!(
            authorize(&Principal::anonymous(), &requirements),
            Decision::Unauthenticated
        );
    }

    #[test]
    fn decision_maps_to_gate_error() {
        assert_eq!(Decision::Allowed.into_result(), Ok(()));
        assert_eq!(Decision::Forbidden.into_result(), Err(GateError::Forbidden));
        assert_eq!(Decision::Unauthenticated.into_result(), Err(GateError::Unauthenticated));
    }
}
