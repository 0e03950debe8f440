//! Report management (MODERATOR_REPORT), scoped by course ownership.

use serde::Deserialize;

use super::{Download, RecordService};
use crate::audit::AuditEvent;
use crate::error::{RecordError, Result};
use crate::pagination::{paginate, Page};
use crate::principal::Principal;
use crate::roles::Permission;
use crate::spreadsheet::{cell, normalize_number, Sheet, REPORT_COLUMNS};
use crate::types::{BatchOutcome, CourseView, NewReport, ReportView};
use crate::validation::{normalize_remark, validate_title};

pub const COURSE_RECORDS_CSV: &str = "reports.csv";
pub const COURSE_RECORDS_ZIP: &str = "reports.zip";

#[derive(Debug, Clone, Deserialize)]
pub struct ReportForm {
    /// Number of the student giving the report.
    pub number: String,
    pub name: String,
    #[serde(default)]
    pub remark: Option<String>,
}

impl RecordService {
    fn require_report_moderator(principal: &Principal) -> Result<()> {
        Self::require_admin_area(principal, Some(Permission::ModeratorReport))
    }

    /// Load a report whose course the principal may moderate.
    pub(super) async fn owned_report(&self, principal: &Principal, id: i64) -> Result<ReportView> {
        let report = self
            .stores
            .reports
            .get_report(id)
            .await?
            .ok_or_else(|| RecordError::NotFound(format!("report {id}")))?;
        principal.require_owner(report.teacher_id)?;
        Ok(report)
    }

    pub async fn list_reports(
        &self,
        principal: &Principal,
        course_id: i64,
        page: i64,
    ) -> Result<Page<ReportView>> {
        Self::require_report_moderator(principal)?;
        let course = self.owned_course(principal, course_id).await?;
        let total = self.stores.reports.count_course_reports(course_id).await?;
        let window = paginate(page, self.settings.reports_per_page, total)?;
        self.log_action(
            principal,
            AuditEvent::ManageReports {
                course: course.course.name,
            },
        )
        .await?;
        let reports = self
            .stores
            .reports
            .list_course_reports(course_id, window.limit(), window.offset())
            .await?;
        Ok(window.into_page(reports))
    }

    pub async fn add_report(
        &self,
        principal: &Principal,
        course_id: i64,
        form: ReportForm,
    ) -> Result<ReportView> {
        Self::require_report_moderator(principal)?;
        let course = self.owned_course(principal, course_id).await?;
        self.create_report(principal, &course, form).await
    }

    /// Add every row of a report sheet to the course. Rows that fail are
    /// reported and skipped.
    pub async fn add_report_batch(
        &self,
        principal: &Principal,
        course_id: i64,
        sheet: &[u8],
    ) -> Result<BatchOutcome> {
        Self::require_report_moderator(principal)?;
        let course = self.owned_course(principal, course_id).await?;
        let sheet = Sheet::parse(sheet, REPORT_COLUMNS)?;
        let mut outcome = BatchOutcome::default();

        for row in &sheet.rows {
            let form = ReportForm {
                number: normalize_number(cell(row, "number")),
                name: cell(row, "name").to_string(),
                remark: Some(cell(row, "remark").to_string()),
            };
            let label = format!("{} {}", form.number, form.name);
            match self.create_report(principal, &course, form).await {
                Ok(_) => outcome.created.push(label),
                Err(e @ RecordError::Internal(_)) => return Err(e),
                Err(e) => outcome.errors.push(format!("{label}: {}", e.message())),
            }
        }
        tracing::info!(
            course = course_id,
            created = outcome.created.len(),
            failed = outcome.errors.len(),
            "batch report creation"
        );
        Ok(outcome)
    }

    async fn create_report(
        &self,
        principal: &Principal,
        course: &CourseView,
        form: ReportForm,
    ) -> Result<ReportView> {
        let number = form.number.trim().to_string();
        let name = form.name.trim().to_string();
        validate_title(&name)?;
        let reporter = self
            .stores
            .users
            .find_user_by_number(&number)
            .await?
            .ok_or_else(|| RecordError::InvalidInput(format!("{number} is not existed.")))?;
        if reporter.grade() != Some(course.course.grade) {
            return Err(RecordError::InvalidInput(
                "The reporter does not belong to this course.".into(),
            ));
        }

        self.log_action(
            principal,
            AuditEvent::AddReport {
                grade: course.course.grade,
                course: course.course.name.clone(),
                number: reporter.number.clone(),
                name: reporter.name.clone(),
                report: name.clone(),
            },
        )
        .await?;
        self.stores
            .reports
            .insert_report(NewReport {
                course_id: course.course.id,
                reporter_id: reporter.id,
                name,
                remark: normalize_remark(form.remark),
            })
            .await
    }

    pub async fn switch_report_state(&self, principal: &Principal, id: i64) -> Result<ReportView> {
        Self::require_report_moderator(principal)?;
        let mut report = self.owned_report(principal, id).await?;
        self.log_action(
            principal,
            AuditEvent::SwitchReportState {
                grade: report.grade,
                course: report.course_name.clone(),
                report: report.report.name.clone(),
            },
        )
        .await?;
        report.report.active = !report.report.active;
        self.stores
            .reports
            .set_report_active(id, report.report.active)
            .await?;
        Ok(report)
    }

    /// Delete a report, its reviews and their attachments.
    pub async fn delete_report(&self, principal: &Principal, id: i64) -> Result<()> {
        Self::require_report_moderator(principal)?;
        let report = self.owned_report(principal, id).await?;
        self.log_action(
            principal,
            AuditEvent::DeleteReport {
                grade: report.grade,
                course: report.course_name.clone(),
                report: report.report.name.clone(),
            },
        )
        .await?;
        let files: Vec<String> = self
            .stores
            .records
            .export_report_records(id)
            .await?
            .into_iter()
            .filter_map(|r| r.file)
            .collect();
        self.stores.reports.delete_report(id).await?;
        for file in files {
            self.attachments.remove(&file).await?;
        }
        Ok(())
    }

    /// Every review of every report of the course, with attachments.
    pub async fn download_course_records(&self, principal: &Principal, course_id: i64) -> Result<Download> {
        Self::require_report_moderator(principal)?;
        let course = self.owned_course(principal, course_id).await?;
        self.log_action(
            principal,
            AuditEvent::DownloadCourseRecords {
                course: course.course.name,
            },
        )
        .await?;
        let rows = self.stores.records.export_course_records(course_id).await?;
        let bytes = self.bundle_records(COURSE_RECORDS_CSV, &rows).await?;
        Ok(Download::zip(COURSE_RECORDS_ZIP, bytes))
    }
}
