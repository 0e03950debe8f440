//! User management (ADMINISTER).

use std::str::FromStr;

use serde::Deserialize;

use super::RecordService;
use crate::audit::AuditEvent;
use crate::error::{RecordError, Result};
use crate::pagination::{paginate, Page};
use crate::password::hash_password;
use crate::principal::Principal;
use crate::roles::{Permission, Role, UserFilter};
use crate::spreadsheet::{cell, normalize_number, Sheet, USER_COLUMNS};
use crate::types::{BatchOutcome, NewUser, User};
use crate::validation::{normalize_remark, validate_name, validate_new_password, validate_number};

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileForm {
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordForm {
    pub password: String,
    pub password2: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub name: String,
    pub password: String,
    pub password2: String,
    #[serde(default)]
    pub remark: Option<String>,
}

fn already_existed(number: &str) -> RecordError {
    RecordError::Conflict(format!("{number} is already existed."))
}

impl RecordService {
    fn require_administer(principal: &Principal) -> Result<()> {
        Self::require_admin_area(principal, Some(Permission::Administer))
    }

    async fn target_user(&self, id: i64) -> Result<User> {
        self.stores
            .users
            .get_user(id)
            .await?
            .ok_or_else(|| RecordError::NotFound(format!("user {id}")))
    }

    pub async fn list_users(
        &self,
        principal: &Principal,
        filter: UserFilter,
        page: i64,
    ) -> Result<Page<User>> {
        Self::require_administer(principal)?;
        let role = filter.role();
        let total = self.stores.users.count_users(role).await?;
        let window = paginate(page, self.settings.users_per_page, total)?;
        self.log_action(principal, AuditEvent::ManageUsers).await?;
        let users = self
            .stores
            .users
            .list_users(role, window.limit(), window.offset())
            .await?;
        Ok(window.into_page(users))
    }

    pub async fn delete_user(&self, principal: &Principal, id: i64) -> Result<()> {
        Self::require_administer(principal)?;
        let target = self.target_user(id).await?;
        if target.id == principal.id() {
            return Err(RecordError::Conflict("You cannot delete yourself.".into()));
        }
        self.log_action(
            principal,
            AuditEvent::DeleteUser {
                number: target.number.clone(),
                name: target.name.clone(),
            },
        )
        .await?;
        let files = self
            .stores
            .records
            .user_attachment_files(target.id)
            .await?;
        self.stores.users.delete_user(target.id).await?;
        for file in files {
            self.attachments.remove(&file).await?;
        }
        tracing::info!(number = %target.number, "user deleted");
        Ok(())
    }

    pub async fn get_profile(&self, principal: &Principal, id: i64) -> Result<User> {
        Self::require_administer(principal)?;
        self.target_user(id).await
    }

    pub async fn edit_profile(&self, principal: &Principal, id: i64, form: ProfileForm) -> Result<User> {
        Self::require_administer(principal)?;
        let target = self.target_user(id).await?;
        let number = form.username.trim().to_string();
        let name = form.name.trim().to_string();
        validate_number(target.role, &number)?;
        validate_name(&name)?;
        if let Some(other) = self.stores.users.find_user_by_number(&number).await? {
            if other.id != target.id {
                return Err(already_existed(&number));
            }
        }
        let remark = normalize_remark(form.remark);

        self.log_action(
            principal,
            AuditEvent::EditProfile {
                number_old: target.number.clone(),
                name_old: target.name.clone(),
                number_new: number.clone(),
                name_new: name.clone(),
            },
        )
        .await?;
        self.stores
            .users
            .update_user_profile(target.id, &number, &name, remark.as_deref())
            .await?;
        Ok(User {
            number,
            name,
            remark,
            ..target
        })
    }

    /// Set a user's password without knowing the old one.
    pub async fn reset_password(&self, principal: &Principal, id: i64, form: PasswordForm) -> Result<()> {
        Self::require_administer(principal)?;
        let target = self.target_user(id).await?;
        validate_new_password(&form.password, &form.password2)?;
        self.log_action(
            principal,
            AuditEvent::ResetPassword {
                number: target.number.clone(),
                name: target.name.clone(),
            },
        )
        .await?;
        self.stores
            .users
            .set_password_hash(target.id, &hash_password(&form.password)?)
            .await
    }

    pub async fn register_user(&self, principal: &Principal, role: Role, form: RegisterForm) -> Result<User> {
        Self::require_administer(principal)?;
        let number = form.username.trim().to_string();
        let name = form.name.trim().to_string();
        validate_number(role, &number)?;
        validate_name(&name)?;
        validate_new_password(&form.password, &form.password2)?;
        if self.stores.users.find_user_by_number(&number).await?.is_some() {
            return Err(already_existed(&number));
        }
        self.log_register(principal, &number, &name).await?;
        self.create_user(role, number, name, &form.password, form.remark)
            .await
    }

    /// Register every row of a user sheet. Every row is logged; rows that
    /// fail are reported and skipped, the rest are created.
    pub async fn register_batch(&self, principal: &Principal, sheet: &[u8]) -> Result<BatchOutcome> {
        Self::require_administer(principal)?;
        let sheet = Sheet::parse(sheet, USER_COLUMNS)?;
        let mut outcome = BatchOutcome::default();

        for row in &sheet.rows {
            let number = normalize_number(cell(row, "number"));
            let name = cell(row, "name").to_string();
            let password = cell(row, "password");
            self.log_register(principal, &number, &name).await?;

            if self.stores.users.find_user_by_number(&number).await?.is_some() {
                outcome.errors.push(format!("{number} is already existed."));
                continue;
            }
            let role = match Role::from_str(cell(row, "role")) {
                Ok(role @ (Role::Student | Role::Teacher)) => role,
                _ => {
                    outcome
                        .errors
                        .push(format!("{number} role should be 'Student' or 'Teacher'."));
                    continue;
                }
            };
            let checked = validate_number(role, &number)
                .and_then(|_| validate_name(&name))
                .and_then(|_| validate_new_password(password, password));
            if let Err(e) = checked {
                outcome.errors.push(format!("{number}: {}", e.message()));
                continue;
            }

            let remark = Some(cell(row, "remark").to_string());
            match self
                .create_user(role, number.clone(), name, password, remark)
                .await
            {
                Ok(user) => outcome.created.push(user.number),
                Err(RecordError::Conflict(msg)) => outcome.errors.push(msg),
                Err(e) => return Err(e),
            }
        }
        tracing::info!(
            created = outcome.created.len(),
            failed = outcome.errors.len(),
            "batch user registration"
        );
        Ok(outcome)
    }

    async fn log_register(&self, principal: &Principal, number: &str, name: &str) -> Result<()> {
        self.log_action(
            principal,
            AuditEvent::RegisterUser {
                number: number.into(),
                name: name.into(),
            },
        )
        .await
    }

    async fn create_user(
        &self,
        role: Role,
        number: String,
        name: String,
        password: &str,
        remark: Option<String>,
    ) -> Result<User> {
        self.stores
            .users
            .insert_user(NewUser {
                number,
                name,
                password_hash: hash_password(password)?,
                remark: normalize_remark(remark),
                role,
            })
            .await
    }
}
