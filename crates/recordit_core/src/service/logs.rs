//! Log downloads (MODERATOR_LOG).

use super::{Download, RecordService};
use crate::audit::AuditEvent;
use crate::bundle::Bundle;
use crate::error::Result;
use crate::principal::Principal;
use crate::roles::Permission;
use crate::spreadsheet::write_rows;

pub const SYSTEM_LOGS_ZIP: &str = "system logs.zip";
pub const USER_LOGS_CSV: &str = "user_logs.csv";
pub const USER_LOGS_ZIP: &str = "user logs.zip";

impl RecordService {
    /// The server's own log directory, zipped.
    pub async fn system_logs(&self, principal: &Principal) -> Result<Download> {
        Self::require_admin_area(principal, Some(Permission::ModeratorLog))?;
        self.log_action(principal, AuditEvent::DownloadSystemLogs).await?;
        let mut bundle = Bundle::new();
        bundle.add_dir(&self.settings.log_dir).await?;
        Ok(Download::zip(SYSTEM_LOGS_ZIP, bundle.finish()?))
    }

    /// The audit log as a spreadsheet, zipped.
    pub async fn user_logs(&self, principal: &Principal) -> Result<Download> {
        Self::require_admin_area(principal, Some(Permission::ModeratorLog))?;
        self.log_action(principal, AuditEvent::DownloadUserLogs).await?;
        let rows = self.stores.audit.export_logs().await?;
        let mut bundle = Bundle::new();
        bundle.add_bytes(USER_LOGS_CSV, &write_rows(&rows)?)?;
        Ok(Download::zip(USER_LOGS_ZIP, bundle.finish()?))
    }
}
