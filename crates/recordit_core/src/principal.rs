use std::collections::BTreeSet;

use crate::error::RecordError;
use crate::roles::{Permission, Role};
use crate::types::User;

pub const NEEDS_FRESH_MESSAGE: &str =
    "In order to protect your account security, please log in again.";

/// The authenticated caller of a service operation.
///
/// Built by the server middleware from a verified token: the user is
/// reloaded from the store and the permission set is the role's current
/// grant set. Core logic never reads raw tokens.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: User,
    pub permissions: BTreeSet<Permission>,
    /// Set only for tokens issued by a password check in this session.
    pub fresh: bool,
    pub remote_addr: Option<String>,
}

impl Principal {
    pub fn new(user: User, permissions: impl IntoIterator<Item = Permission>, fresh: bool) -> Self {
        Self {
            user,
            permissions: permissions.into_iter().collect(),
            fresh,
            remote_addr: None,
        }
    }

    pub fn with_remote_addr(mut self, addr: Option<String>) -> Self {
        self.remote_addr = addr;
        self
    }

    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn whoami(&self, role: Role) -> bool {
        self.user.whoami(role)
    }

    pub fn require(&self, permission: Permission) -> Result<(), RecordError> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(RecordError::Forbidden(format!(
                "{} lacks {}",
                self.user.number, permission
            )))
        }
    }

    pub fn require_any_role(&self, roles: &[Role]) -> Result<(), RecordError> {
        if roles.iter().any(|r| self.whoami(*r)) {
            Ok(())
        } else {
            Err(RecordError::Forbidden(format!(
                "{} is a {}",
                self.user.number, self.user.role
            )))
        }
    }

    pub fn require_fresh(&self) -> Result<(), RecordError> {
        if self.fresh {
            Ok(())
        } else {
            Err(RecordError::NeedsFresh(NEEDS_FRESH_MESSAGE.into()))
        }
    }

    /// Teachers may only touch objects under courses they teach.
    pub fn require_owner(&self, teacher_id: i64) -> Result<(), RecordError> {
        if self.user.is_teacher() && teacher_id != self.user.id {
            return Err(RecordError::forbidden());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_LOCALE;

    fn principal(role: Role, fresh: bool) -> Principal {
        let user = User {
            id: 7,
            number: "1000".into(),
            name: "t".into(),
            password_hash: String::new(),
            remark: None,
            locale: DEFAULT_LOCALE.into(),
            role,
        };
        Principal::new(user, role.default_permissions().iter().copied(), fresh)
    }

    #[test]
    fn can_follows_grant_set() {
        let p = principal(Role::Teacher, true);
        assert!(p.can(Permission::ModeratorCourse));
        assert!(!p.can(Permission::Administer));
    }

    #[test]
    fn empty_grant_set_denies_everything() {
        let p = Principal::new(principal(Role::Administrator, true).user, [], true);
        assert!(matches!(
            p.require(Permission::Administer),
            Err(RecordError::Forbidden(_))
        ));
    }

    #[test]
    fn require_any_role() {
        let p = principal(Role::Student, true);
        assert!(p.require_any_role(&[Role::Student]).is_ok());
        assert!(p
            .require_any_role(&[Role::Teacher, Role::Administrator])
            .is_err());
    }

    #[test]
    fn stale_token_needs_fresh_login() {
        let p = principal(Role::Student, false);
        assert!(matches!(p.require_fresh(), Err(RecordError::NeedsFresh(_))));
        assert!(principal(Role::Student, true).require_fresh().is_ok());
    }

    #[test]
    fn ownership_applies_to_teachers_only() {
        let teacher = principal(Role::Teacher, true);
        assert!(teacher.require_owner(7).is_ok());
        assert!(teacher.require_owner(8).is_err());
        let admin = principal(Role::Administrator, true);
        assert!(admin.require_owner(8).is_ok());
    }
}
