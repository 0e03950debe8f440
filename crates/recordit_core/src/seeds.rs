//! Bootstrap data: the default administrator and forged students.

use fake::faker::name::raw::Name;
use fake::locales::ZH_CN;
use fake::Fake;
use rand::Rng;

use crate::error::Result;
use crate::password::hash_password;
use crate::roles::Role;
use crate::types::NewUser;

pub const DEFAULT_PASSWORD: &str = "recordit";
pub const DEFAULT_ADMIN_NAME: &str = "Zero";
pub const FORGED_GRADE: &str = "2016";

pub fn default_admin(admin_number: &str) -> Result<NewUser> {
    Ok(NewUser {
        number: admin_number.into(),
        name: DEFAULT_ADMIN_NAME.into(),
        password_hash: hash_password(DEFAULT_PASSWORD)?,
        remark: None,
        role: Role::Administrator,
    })
}

/// A random student of the forged grade: `2016` plus eight digits, with a
/// zh_CN name.
pub fn fake_student(rng: &mut impl Rng) -> Result<NewUser> {
    let tail: u32 = rng.gen_range(0..100_000_000);
    let name: String = Name(ZH_CN).fake_with_rng(rng);
    Ok(NewUser {
        number: format!("{FORGED_GRADE}{tail:08}"),
        name,
        password_hash: hash_password(DEFAULT_PASSWORD)?,
        remark: None,
        role: Role::Student,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::verify_password;
    use crate::validation::{validate_name, validate_number};

    #[test]
    fn fake_students_pass_validation() {
        let mut rng = rand::thread_rng();
        for _ in 0..5 {
            let s = fake_student(&mut rng).unwrap();
            assert!(s.number.starts_with(FORGED_GRADE));
            validate_number(Role::Student, &s.number).unwrap();
            validate_name(&s.name).unwrap();
            assert!(!s.name.is_ascii(), "{}", s.name);
        }
    }

    #[test]
    fn default_admin_uses_default_password() {
        let admin = default_admin("007").unwrap();
        assert_eq!(admin.role, Role::Administrator);
        assert!(verify_password(&admin.password_hash, DEFAULT_PASSWORD));
    }
}
