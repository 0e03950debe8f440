//! Fixed roles and permissions.
//!
//! Roles and permissions are persisted as a many-to-many grant table, but the
//! set of names and the default grant map live here and are not editable at
//! runtime. `sync_role_permissions` on the user store rewrites the table from
//! [`Role::default_permissions`].

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
pub enum Role {
    Student,
    Teacher,
    Administrator,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    Record,
    Upload,
    ModeratorCourse,
    ModeratorReport,
    ModeratorRecordTable,
    ModeratorLog,
    Administer,
}

impl Role {
    pub fn default_permissions(self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Role::Student => &[Record, Upload],
            Role::Teacher => &[
                Record,
                Upload,
                ModeratorCourse,
                ModeratorReport,
                ModeratorRecordTable,
            ],
            Role::Administrator => &[
                Record,
                Upload,
                ModeratorCourse,
                ModeratorReport,
                ModeratorRecordTable,
                ModeratorLog,
                Administer,
            ],
        }
    }

    /// Full grant map, in role order. Input to `sync_role_permissions`.
    pub fn grant_map() -> Vec<(Role, &'static [Permission])> {
        Role::iter().map(|r| (r, r.default_permissions())).collect()
    }

    /// Role assigned to a user created without an explicit role.
    pub fn for_new_user(number: &str, admin_number: &str) -> Role {
        if number == admin_number {
            Role::Administrator
        } else {
            Role::Student
        }
    }

    /// Staff roles may enter the admin area.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Teacher | Role::Administrator)
    }
}

/// `?filter=` values accepted by the user listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserFilter {
    #[default]
    All,
    Student,
    Teacher,
    Administrator,
}

impl UserFilter {
    pub fn role(self) -> Option<Role> {
        match self {
            UserFilter::All => None,
            UserFilter::Student => Some(Role::Student),
            UserFilter::Teacher => Some(Role::Teacher),
            UserFilter::Administrator => Some(Role::Administrator),
        }
    }
}
