//! Reviews: writing them from the user area, moderating them from the
//! admin area (MODERATOR_RECORD_TABLE).

use serde::{Deserialize, Serialize};

use super::{content_type_for, Download, RecordService};
use crate::audit::AuditEvent;
use crate::error::{RecordError, Result};
use crate::pagination::{paginate, Page};
use crate::principal::Principal;
use crate::roles::Permission;
use crate::types::{RecordTable, RecordView, ReportView};
use crate::validation::normalize_remark;

pub const REPORT_RECORDS_CSV: &str = "records.csv";
pub const REPORT_RECORDS_ZIP: &str = "records.zip";

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewForm {
    pub score: i32,
    #[serde(default)]
    pub remark: Option<String>,
}

/// The review page: the report, the caller's existing review and the
/// accepted score range.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewPage {
    pub report: ReportView,
    pub record: Option<RecordTable>,
    pub score_lower: i32,
    pub score_upper: i32,
}

impl RecordService {
    fn require_record_moderator(principal: &Principal) -> Result<()> {
        Self::require_admin_area(principal, Some(Permission::ModeratorRecordTable))
    }

    /// Load a report the principal is allowed to review.
    async fn reviewable_report(&self, principal: &Principal, report_id: i64) -> Result<ReportView> {
        let report = self
            .stores
            .reports
            .get_report(report_id)
            .await?
            .ok_or_else(|| RecordError::NotFound(format!("report {report_id}")))?;
        if !report.is_active() {
            return Err(RecordError::Forbidden("The report is closed.".into()));
        }
        let user = &principal.user;
        if user.is_student() && report.report.reporter_id == user.id {
            return Err(RecordError::forbidden());
        }
        principal.require_owner(report.teacher_id)?;
        Ok(report)
    }

    // ── User area ────────────────────────────────────────────────

    pub async fn get_review(&self, principal: &Principal, report_id: i64) -> Result<ReviewPage> {
        principal.require(Permission::Record)?;
        principal.require_fresh()?;
        let report = self.reviewable_report(principal, report_id).await?;
        let record = self
            .stores
            .records
            .find_record(report_id, principal.id())
            .await?;
        Ok(ReviewPage {
            report,
            record,
            score_lower: self.settings.score_lower,
            score_upper: self.settings.score_upper,
        })
    }

    /// Create or update the caller's review of a report.
    pub async fn review(&self, principal: &Principal, report_id: i64, form: ReviewForm) -> Result<RecordTable> {
        principal.require(Permission::Record)?;
        principal.require_fresh()?;
        let report = self.reviewable_report(principal, report_id).await?;
        if !self.settings.score_in_range(form.score) {
            return Err(RecordError::InvalidInput(format!(
                "The score out of range from {} to {}.",
                self.settings.score_lower, self.settings.score_upper
            )));
        }
        let remark = normalize_remark(form.remark);

        self.log_action(
            principal,
            AuditEvent::Review {
                course: report.course_name.clone(),
                number: report.reporter_number.clone(),
                name: report.reporter_name.clone(),
                report: report.report.name.clone(),
            },
        )
        .await?;
        self.stores
            .records
            .upsert_record(report_id, principal.id(), form.score, remark.as_deref())
            .await
    }

    /// Attach a file to the caller's existing review, replacing any
    /// previous attachment.
    pub async fn upload_attachment(
        &self,
        principal: &Principal,
        report_id: i64,
        filename: &str,
        bytes: &[u8],
    ) -> Result<RecordTable> {
        principal.require(Permission::Upload)?;
        principal.require_fresh()?;
        let report = self.reviewable_report(principal, report_id).await?;
        let mut record = self
            .stores
            .records
            .find_record(report_id, principal.id())
            .await?
            .ok_or_else(|| {
                RecordError::InvalidInput("Please review the report before uploading.".into())
            })?;
        if !self.attachments.allowed_file(filename) {
            return Err(RecordError::InvalidInput(format!(
                "Error in the File field - file type not allowed: {filename}."
            )));
        }

        self.log_action(
            principal,
            AuditEvent::UploadAttachment {
                report: report.report.name.clone(),
                file: filename.to_string(),
            },
        )
        .await?;
        let stored = self.attachments.save(filename, bytes).await?;
        if let Err(e) = self
            .stores
            .records
            .set_record_file(record.id, Some(&stored))
            .await
        {
            if let Err(cleanup) = self.attachments.remove(&stored).await {
                tracing::warn!(file = %stored, error = %cleanup, "orphaned attachment left on disk");
            }
            return Err(e);
        }
        if let Some(previous) = record.file.replace(stored) {
            self.attachments.remove(&previous).await?;
        }
        Ok(record)
    }

    // ── Admin area ───────────────────────────────────────────────

    pub async fn list_records(
        &self,
        principal: &Principal,
        report_id: i64,
        page: i64,
    ) -> Result<Page<RecordView>> {
        Self::require_record_moderator(principal)?;
        let report = self.owned_report(principal, report_id).await?;
        let total = self.stores.records.count_report_records(report_id).await?;
        let window = paginate(page, self.settings.records_per_page, total)?;
        self.log_action(
            principal,
            AuditEvent::ManageRecords {
                report: report.report.name,
            },
        )
        .await?;
        let records = self
            .stores
            .records
            .list_report_records(report_id, window.limit(), window.offset())
            .await?;
        Ok(window.into_page(records))
    }

    pub async fn delete_record(&self, principal: &Principal, id: i64) -> Result<()> {
        Self::require_record_moderator(principal)?;
        let record = self
            .stores
            .records
            .get_record(id)
            .await?
            .ok_or_else(|| RecordError::NotFound(format!("record {id}")))?;
        principal.require_owner(record.teacher_id)?;
        self.log_action(
            principal,
            AuditEvent::DeleteRecord {
                number: record.reviewer_number.clone(),
                name: record.reviewer_name.clone(),
                report: record.report_name.clone(),
            },
        )
        .await?;
        self.stores.records.delete_record(id).await?;
        if let Some(file) = &record.record.file {
            self.attachments.remove(file).await?;
        }
        Ok(())
    }

    /// Every review of a report, with attachments.
    pub async fn download_report_records(&self, principal: &Principal, report_id: i64) -> Result<Download> {
        Self::require_record_moderator(principal)?;
        let report = self.owned_report(principal, report_id).await?;
        self.log_action(
            principal,
            AuditEvent::DownloadReportRecords {
                report: report.report.name,
                number: report.reporter_number,
            },
        )
        .await?;
        let rows = self.stores.records.export_report_records(report_id).await?;
        let bytes = self.bundle_records(REPORT_RECORDS_CSV, &rows).await?;
        Ok(Download::zip(REPORT_RECORDS_ZIP, bytes))
    }

    /// A single stored attachment. The file must belong to a review the
    /// principal may moderate.
    pub async fn download_attachment(&self, principal: &Principal, file: &str) -> Result<Download> {
        Self::require_record_moderator(principal)?;
        let record = self
            .stores
            .records
            .find_record_by_file(file)
            .await?
            .ok_or_else(|| RecordError::NotFound(format!("file {file}")))?;
        principal.require_owner(record.teacher_id)?;
        self.log_action(
            principal,
            AuditEvent::DownloadAttachment {
                file: file.to_string(),
            },
        )
        .await?;
        let bytes = self.attachments.read(file).await?;
        Ok(Download {
            filename: file.to_string(),
            content_type: content_type_for(file),
            bytes,
        })
    }
}
