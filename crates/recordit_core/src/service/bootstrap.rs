use super::RecordService;
use crate::error::{RecordError, Result};
use crate::roles::Role;
use crate::seeds;
use crate::types::User;

impl RecordService {
    /// Create the fixed roles and permissions and reset every grant set.
    pub async fn init_roles(&self) -> Result<()> {
        self.stores
            .users
            .sync_role_permissions(&Role::grant_map())
            .await
    }

    /// Create the default administrator unless the admin number is taken.
    /// Returns the created user.
    pub async fn ensure_admin(&self) -> Result<Option<User>> {
        let number = &self.settings.admin_number;
        if self.stores.users.find_user_by_number(number).await?.is_some() {
            return Ok(None);
        }
        let admin = self
            .stores
            .users
            .insert_user(seeds::default_admin(number)?)
            .await?;
        tracing::info!(number = %admin.number, "default administrator created");
        Ok(Some(admin))
    }

    /// Insert `count` random students. Numbers that collide are skipped;
    /// returns how many were created.
    pub async fn forge_students(&self, count: usize) -> Result<usize> {
        let mut created = 0;
        for _ in 0..count {
            let student = seeds::fake_student(&mut rand::thread_rng())?;
            match self.stores.users.insert_user(student).await {
                Ok(_) => created += 1,
                Err(RecordError::Conflict(msg)) => tracing::debug!(%msg, "skipping forged student"),
                Err(e) => return Err(e),
            }
        }
        tracing::info!(created, requested = count, "forged students");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::ports::UserStore;
    use crate::roles::{Permission, Role};

    #[tokio::test]
    async fn init_roles_grants_default_permissions() {
        let fx = Fixture::new().await;
        let perms = fx.store.role_permissions(Role::Teacher).await.unwrap();
        assert!(perms.contains(&Permission::ModeratorCourse));
        assert!(!perms.contains(&Permission::Administer));
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let fx = Fixture::new().await;
        let admin = fx.service.ensure_admin().await.unwrap().unwrap();
        assert_eq!(admin.number, "007");
        assert_eq!(admin.name, "Zero");
        assert!(admin.is_admin());
        assert!(fx.service.ensure_admin().await.unwrap().is_none());
        assert_eq!(fx.store.count_users(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn forge_creates_students() {
        let fx = Fixture::new().await;
        let created = fx.service.forge_students(5).await.unwrap();
        assert!(created <= 5);
        assert_eq!(
            fx.store.count_users(Some(Role::Student)).await.unwrap(),
            created as i64
        );
    }
}
