//! Login checks, principal loading and the user's own settings.

use serde::Deserialize;

use super::{RecordService, LOGIN_REQUIRED};
use crate::audit::AuditEvent;
use crate::error::{RecordError, Result};
use crate::password::{hash_password, verify_password};
use crate::principal::Principal;
use crate::types::User;
use crate::validation::{field_error, normalize_remark, validate_new_password};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

impl RecordService {
    /// Check a username/password pair.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let user = self
            .stores
            .users
            .find_user_by_number(username.trim())
            .await?
            .ok_or_else(|| field_error("Username", "The username is not existed"))?;
        if !verify_password(&user.password_hash, password) {
            tracing::info!(number = %user.number, "rejected login");
            return Err(RecordError::Unauthorized("Invalid username or password.".into()));
        }
        Ok(user)
    }

    /// Confirm the password of an already-authenticated principal.
    pub async fn re_authenticate(&self, principal: &Principal, password: &str) -> Result<()> {
        if !verify_password(&principal.user.password_hash, password) {
            return Err(RecordError::Unauthorized("Invalid password.".into()));
        }
        Ok(())
    }

    /// Load the user behind a verified token together with its role's
    /// current grant set.
    pub async fn principal_for(&self, user_id: i64, fresh: bool) -> Result<Principal> {
        let user = self
            .stores
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| RecordError::Unauthorized(LOGIN_REQUIRED.into()))?;
        let permissions = self.stores.users.role_permissions(user.role).await?;
        Ok(Principal::new(user, permissions, fresh))
    }

    pub async fn profile(&self, principal: &Principal) -> Result<User> {
        principal.require_fresh()?;
        Ok(principal.user.clone())
    }

    pub async fn edit_settings(&self, principal: &Principal, form: SettingsForm) -> Result<User> {
        principal.require_fresh()?;
        let locale = form.locale.unwrap_or_else(|| principal.user.locale.clone());
        if !self.settings.supports_locale(&locale) {
            return Err(field_error("Language", "Not a valid choice"));
        }
        let remark = normalize_remark(form.remark);

        self.log_action(principal, AuditEvent::EditOwnProfile).await?;
        self.stores
            .users
            .update_user_settings(principal.id(), remark.as_deref(), &locale)
            .await?;

        let mut user = principal.user.clone();
        user.remark = remark;
        user.locale = locale;
        Ok(user)
    }

    pub async fn change_password(
        &self,
        principal: &Principal,
        old_password: &str,
        password: &str,
        password2: &str,
    ) -> Result<()> {
        principal.require_fresh()?;
        if !verify_password(&principal.user.password_hash, old_password) {
            return Err(RecordError::InvalidInput("Old password is incorrect.".into()));
        }
        validate_new_password(password, password2)?;

        self.log_action(principal, AuditEvent::ChangeOwnPassword).await?;
        self.stores
            .users
            .set_password_hash(principal.id(), &hash_password(password)?)
            .await
    }
}
