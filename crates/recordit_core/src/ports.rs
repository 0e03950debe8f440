//! Storage port traits. Implemented by recordit_postgres (and by
//! [`crate::memory::MemoryStore`] for tests); service logic depends only on
//! these traits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RecordError;
use crate::roles::{Permission, Role};
use crate::types::*;

pub type Result<T> = std::result::Result<T, RecordError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: i64) -> Result<Option<User>>;

    async fn find_user_by_number(&self, number: &str) -> Result<Option<User>>;

    /// Insert a user. A taken number is a `Conflict`.
    async fn insert_user(&self, user: NewUser) -> Result<User>;

    /// Admin-side profile edit. A taken number is a `Conflict`.
    async fn update_user_profile(
        &self,
        id: i64,
        number: &str,
        name: &str,
        remark: Option<&str>,
    ) -> Result<()>;

    async fn update_user_settings(&self, id: i64, remark: Option<&str>, locale: &str) -> Result<()>;

    async fn set_password_hash(&self, id: i64, password_hash: &str) -> Result<()>;

    /// Delete a user together with the courses they teach, the reports they
    /// gave and the reviews they wrote. Their log rows are kept, detached.
    async fn delete_user(&self, id: i64) -> Result<()>;

    async fn count_users(&self, role: Option<Role>) -> Result<i64>;

    /// Users ordered by number, descending.
    async fn list_users(&self, role: Option<Role>, limit: i64, offset: i64) -> Result<Vec<User>>;

    /// Distinct grades among student accounts, ascending.
    async fn student_grades(&self) -> Result<Vec<i32>>;

    /// Create missing roles and permissions and reset each role's grants.
    async fn sync_role_permissions(&self, grants: &[(Role, &'static [Permission])]) -> Result<()>;

    async fn role_permissions(&self, role: Role) -> Result<Vec<Permission>>;
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn get_course(&self, id: i64) -> Result<Option<CourseView>>;

    async fn insert_course(&self, course: NewCourse) -> Result<CourseView>;

    /// Courses ordered by date descending, optionally restricted to a teacher.
    async fn list_courses(
        &self,
        teacher_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CourseView>>;

    async fn count_courses(&self, teacher_id: Option<i64>) -> Result<i64>;

    /// Set the course's active flag and the flag of every report under it,
    /// atomically. Returns the number of reports touched.
    async fn set_course_active(&self, id: i64, active: bool) -> Result<u64>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn get_report(&self, id: i64) -> Result<Option<ReportView>>;

    async fn insert_report(&self, report: NewReport) -> Result<ReportView>;

    /// Reports of one course ordered by date descending.
    async fn list_course_reports(&self, course_id: i64, limit: i64, offset: i64) -> Result<Vec<ReportView>>;

    async fn count_course_reports(&self, course_id: i64) -> Result<i64>;

    /// Active reports under active courses within `scope`, ordered by date
    /// ascending.
    async fn list_visible_reports(
        &self,
        scope: &ReportScope,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReportView>>;

    async fn count_visible_reports(&self, scope: &ReportScope) -> Result<i64>;

    async fn set_report_active(&self, id: i64, active: bool) -> Result<()>;

    /// Delete a report and its reviews.
    async fn delete_report(&self, id: i64) -> Result<()>;

    async fn count_reports(&self) -> Result<i64>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_record(&self, id: i64) -> Result<Option<RecordView>>;

    async fn find_record(&self, report_id: i64, user_id: i64) -> Result<Option<RecordTable>>;

    async fn find_record_by_file(&self, file: &str) -> Result<Option<RecordView>>;

    /// Insert or update the single review of `user_id` on `report_id`.
    async fn upsert_record(
        &self,
        report_id: i64,
        user_id: i64,
        score: i32,
        remark: Option<&str>,
    ) -> Result<RecordTable>;

    async fn set_record_file(&self, id: i64, file: Option<&str>) -> Result<()>;

    async fn delete_record(&self, id: i64) -> Result<()>;

    /// Reviews of one report ordered by time descending.
    async fn list_report_records(&self, report_id: i64, limit: i64, offset: i64) -> Result<Vec<RecordView>>;

    async fn count_report_records(&self, report_id: i64) -> Result<i64>;

    async fn export_report_records(&self, report_id: i64) -> Result<Vec<RecordExportRow>>;

    async fn export_course_records(&self, course_id: i64) -> Result<Vec<RecordExportRow>>;

    /// Attachment names of every review that goes away with the user: their
    /// own reviews, reviews of their reports and reviews in their courses.
    async fn user_attachment_files(&self, user_id: i64) -> Result<Vec<String>>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_log(&self, entry: NewLogEntry) -> Result<LogEntry>;

    async fn count_logs(&self) -> Result<i64>;

    /// Every log row joined with the acting user's number and role, oldest
    /// first.
    async fn export_logs(&self) -> Result<Vec<LogExportRow>>;
}

/// The full set of ports the service needs.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub courses: Arc<dyn CourseStore>,
    pub reports: Arc<dyn ReportStore>,
    pub records: Arc<dyn RecordStore>,
    pub audit: Arc<dyn AuditStore>,
}

impl Stores {
    /// Use one object for every port.
    pub fn from_single<S>(store: Arc<S>) -> Self
    where
        S: UserStore + CourseStore + ReportStore + RecordStore + AuditStore + 'static,
    {
        Self {
            users: store.clone(),
            courses: store.clone(),
            reports: store.clone(),
            records: store.clone(),
            audit: store,
        }
    }
}
