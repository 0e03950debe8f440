//! RecordService: every operation of the public, user and admin areas.
//!
//! Handlers resolve a [`Principal`] and call in here; this layer owns
//! permission, freshness and ownership checks, writes the audit log and
//! drives the storage ports.

mod account;
mod bootstrap;
mod courses;
mod logs;
mod overview;
mod records;
mod reports;
mod users;

use crate::attachments::AttachmentStore;
use crate::audit::AuditEvent;
use crate::bundle::Bundle;
use crate::error::{RecordError, Result};
use crate::ports::Stores;
use crate::principal::Principal;
use crate::roles::{Permission, Role};
use crate::settings::ServiceSettings;
use crate::types::{NewLogEntry, RecordExportRow};

pub use account::SettingsForm;
pub use courses::CourseForm;
pub use overview::Feed;
pub use records::ReviewForm;
pub use records::ReviewPage;
pub use reports::ReportForm;
pub use users::{PasswordForm, ProfileForm, RegisterForm};

pub const LOGIN_REQUIRED: &str = "Please log in to access this page.";

const STAFF: &[Role] = &[Role::Teacher, Role::Administrator];

/// A file handed back to the client.
#[derive(Debug, Clone)]
pub struct Download {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Download {
    pub fn zip(filename: &str, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: "application/zip",
            bytes,
        }
    }
}

fn content_type_for(filename: &str) -> &'static str {
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or("application/octet-stream")
}

pub struct RecordService {
    stores: Stores,
    settings: ServiceSettings,
    attachments: AttachmentStore,
}

impl RecordService {
    pub fn new(stores: Stores, settings: ServiceSettings, attachments: AttachmentStore) -> Self {
        Self {
            stores,
            settings,
            attachments,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn attachments(&self) -> &AttachmentStore {
        &self.attachments
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Append one audit row for `principal`.
    pub async fn log_action(&self, principal: &Principal, event: AuditEvent) -> Result<()> {
        let content = event.to_string();
        tracing::info!(user = %principal.user.number, action = %content, "audit");
        self.stores
            .audit
            .append_log(NewLogEntry {
                user_id: principal.id(),
                ip: principal.remote_addr.clone(),
                content,
            })
            .await?;
        Ok(())
    }

    /// Admin-area gate: staff role, fresh login and `permission`.
    fn require_admin_area(principal: &Principal, permission: Option<Permission>) -> Result<()> {
        principal.require_fresh()?;
        principal.require_any_role(STAFF)?;
        if let Some(permission) = permission {
            principal.require(permission)?;
        }
        Ok(())
    }

    /// Zip `rows` as `<csv_name>` plus every attachment they reference.
    /// Attachments missing on disk are skipped.
    async fn bundle_records(&self, csv_name: &str, rows: &[RecordExportRow]) -> Result<Vec<u8>> {
        let mut bundle = Bundle::new();
        bundle.add_bytes(csv_name, &crate::spreadsheet::write_rows(rows)?)?;
        let dir = self.attachments.dir_name();
        for file in rows.iter().filter_map(|r| r.file.as_deref()) {
            let path = self.attachments.path_for(file)?;
            match bundle.add_file(&path, &format!("{dir}/{file}")).await {
                Ok(()) => {}
                Err(RecordError::NotFound(_)) => {
                    tracing::warn!(file, "attachment missing from upload directory");
                }
                Err(e) => return Err(e),
            }
        }
        bundle.finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use super::*;
    use crate::attachments::DEFAULT_EXTENSIONS;
    use crate::memory::MemoryStore;
    use crate::password::hash_password;
    use crate::ports::{CourseStore, ReportStore, UserStore};
    use crate::types::*;

    pub const PASSWORD: &str = "recordit";

    pub struct Fixture {
        pub store: Arc<MemoryStore>,
        pub service: RecordService,
        pub tmp: tempfile::TempDir,
    }

    impl Fixture {
        pub async fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let store = Arc::new(MemoryStore::new());
            let settings = ServiceSettings {
                log_dir: tmp.path().join("logs"),
                ..ServiceSettings::default()
            };
            let attachments =
                AttachmentStore::new(tmp.path().join("uploads"), DEFAULT_EXTENSIONS.iter().copied());
            let service =
                RecordService::new(Stores::from_single(store.clone()), settings, attachments);
            service.init_roles().await.unwrap();
            Self { store, service, tmp }
        }

        pub async fn user(&self, number: &str, role: Role) -> User {
            self.store
                .insert_user(NewUser {
                    number: number.into(),
                    name: format!("N{}", &number[number.len().saturating_sub(4)..]),
                    password_hash: hash_password(PASSWORD).unwrap(),
                    remark: None,
                    role,
                })
                .await
                .unwrap()
        }

        pub async fn principal(&self, user: &User) -> Principal {
            self.service.principal_for(user.id, true).await.unwrap()
        }

        pub async fn course(&self, teacher: &User, grade: i32) -> CourseView {
            self.store
                .insert_course(NewCourse {
                    teacher_id: teacher.id,
                    name: "Seminar".into(),
                    grade,
                    remark: None,
                })
                .await
                .unwrap()
        }

        pub async fn report(&self, course: &CourseView, reporter: &User, name: &str) -> ReportView {
            self.store
                .insert_report(NewReport {
                    course_id: course.course.id,
                    reporter_id: reporter.id,
                    name: name.into(),
                    remark: None,
                })
                .await
                .unwrap()
        }
    }
}
