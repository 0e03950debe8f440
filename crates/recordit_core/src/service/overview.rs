//! Read-only summaries: the public about page, the admin dashboard and the
//! user-area report feed.

use serde::Serialize;

use super::RecordService;
use crate::audit::AuditEvent;
use crate::error::Result;
use crate::pagination::{paginate, Page};
use crate::principal::Principal;
use crate::roles::Role;
use crate::types::{AboutCounts, DashboardCounts, ReportScope, ReportView};

#[derive(Debug, Clone, Serialize)]
pub struct Feed {
    pub greeting: String,
    pub reports: Page<ReportView>,
}

impl RecordService {
    pub async fn about(&self) -> Result<AboutCounts> {
        Ok(AboutCounts {
            teacher_count: self.stores.users.count_users(Some(Role::Teacher)).await?,
            student_count: self.stores.users.count_users(Some(Role::Student)).await?,
            course_count: self.stores.courses.count_courses(None).await?,
            report_count: self.stores.reports.count_reports().await?,
        })
    }

    pub async fn dashboard(&self, principal: &Principal) -> Result<DashboardCounts> {
        Self::require_admin_area(principal, None)?;
        self.log_action(principal, AuditEvent::ViewDashboard).await?;
        let users = &self.stores.users;
        Ok(DashboardCounts {
            user_count: users.count_users(None).await?,
            admin_count: users.count_users(Some(Role::Administrator)).await?,
            teacher_count: users.count_users(Some(Role::Teacher)).await?,
            student_count: users.count_users(Some(Role::Student)).await?,
            course_count: self
                .stores
                .courses
                .count_courses(Self::course_scope(principal))
                .await?,
            log_count: self.stores.audit.count_logs().await?,
        })
    }

    /// Reports open for review by the principal, oldest first.
    pub async fn feed(&self, principal: &Principal, page: i64) -> Result<Feed> {
        let user = &principal.user;
        let scope = match user.role {
            Role::Administrator => ReportScope::All,
            Role::Teacher => ReportScope::Teacher(user.id),
            Role::Student => ReportScope::Student {
                grade: user.grade().unwrap_or_default(),
                reporter_id: user.id,
            },
        };
        let total = self.stores.reports.count_visible_reports(&scope).await?;
        let window = paginate(page, self.settings.feed_per_page, total)?;
        let reports = self
            .stores
            .reports
            .list_visible_reports(&scope, window.limit(), window.offset())
            .await?;
        Ok(Feed {
            greeting: format!("Welcome~ {}", user.name),
            reports: window.into_page(reports),
        })
    }
}
