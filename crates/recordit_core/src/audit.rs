//! Audit events. Each sensitive action renders one of these into the
//! `content` column of the log table.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    ViewDashboard,
    ManageUsers,
    DeleteUser { number: String, name: String },
    EditProfile { number_old: String, name_old: String, number_new: String, name_new: String },
    ResetPassword { number: String, name: String },
    RegisterUser { number: String, name: String },
    ManageCourses,
    SwitchCourseState { grade: i32, name: String },
    AddCourse { grade: i32, name: String },
    ManageReports { course: String },
    DownloadCourseRecords { course: String },
    SwitchReportState { grade: i32, course: String, report: String },
    AddReport { grade: i32, course: String, number: String, name: String, report: String },
    DeleteReport { grade: i32, course: String, report: String },
    ManageRecords { report: String },
    DownloadAttachment { file: String },
    DownloadReportRecords { report: String, number: String },
    DeleteRecord { number: String, name: String, report: String },
    DownloadSystemLogs,
    DownloadUserLogs,
    Review { course: String, number: String, name: String, report: String },
    UploadAttachment { report: String, file: String },
    EditOwnProfile,
    ChangeOwnPassword,
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use AuditEvent::*;
        match self {
            ViewDashboard => write!(f, "Visit the admin dashboard."),
            ManageUsers => write!(f, "Visit user management."),
            DeleteUser { number, name } => write!(f, "Delete user {number} ({name})."),
            EditProfile { number_old, name_old, number_new, name_new } => write!(
                f,
                "Edit profile {number_old} ({name_old}) -> {number_new} ({name_new})."
            ),
            ResetPassword { number, name } => {
                write!(f, "Change password of {number} ({name}).")
            }
            RegisterUser { number, name } => write!(f, "Register user {number} ({name})."),
            ManageCourses => write!(f, "Visit course management."),
            SwitchCourseState { grade, name } => {
                write!(f, "Switch state of course {grade} {name}.")
            }
            AddCourse { grade, name } => write!(f, "Add course {grade} {name}."),
            ManageReports { course } => write!(f, "Visit reports of course {course}."),
            DownloadCourseRecords { course } => {
                write!(f, "Download records of course {course}.")
            }
            SwitchReportState { grade, course, report } => {
                write!(f, "Switch state of report {report} in {grade} {course}.")
            }
            AddReport { grade, course, number, name, report } => write!(
                f,
                "Add report {report} by {number} ({name}) to {grade} {course}."
            ),
            DeleteReport { grade, course, report } => {
                write!(f, "Delete report {report} in {grade} {course}.")
            }
            ManageRecords { report } => write!(f, "Visit records of report {report}."),
            DownloadAttachment { file } => write!(f, "Download attachment {file}."),
            DownloadReportRecords { report, number } => {
                write!(f, "Download records of report {report} by {number}.")
            }
            DeleteRecord { number, name, report } => {
                write!(f, "Delete record of {number} ({name}) on report {report}.")
            }
            DownloadSystemLogs => write!(f, "Download system logs."),
            DownloadUserLogs => write!(f, "Download user logs."),
            Review { course, number, name, report } => write!(
                f,
                "Review report {report} by {number} ({name}) in {course}."
            ),
            UploadAttachment { report, file } => {
                write!(f, "Upload attachment {file} for report {report}.")
            }
            EditOwnProfile => write!(f, "Edit own profile."),
            ChangeOwnPassword => write!(f, "Change own password."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_identifying_fields() {
        let e = AuditEvent::DeleteUser {
            number: "201600000001".into(),
            name: "Li".into(),
        };
        assert_eq!(e.to_string(), "Delete user 201600000001 (Li).");
    }

    #[test]
    fn renders_course_context() {
        let e = AuditEvent::SwitchReportState {
            grade: 2016,
            course: "Seminar".into(),
            report: "Week 1".into(),
        };
        assert_eq!(
            e.to_string(),
            "Switch state of report Week 1 in 2016 Seminar."
        );
    }
}
