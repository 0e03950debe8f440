//! In-memory implementation of every storage port.
//!
//! Mirrors the Postgres adapter's ordering and cascade rules so service and
//! HTTP tests run without a database.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::error::RecordError;
use crate::ports::{AuditStore, CourseStore, RecordStore, ReportStore, Result, UserStore};
use crate::roles::{Permission, Role};
use crate::types::*;

#[derive(Default)]
struct State {
    users: BTreeMap<i64, User>,
    courses: BTreeMap<i64, Course>,
    reports: BTreeMap<i64, Report>,
    records: BTreeMap<i64, RecordTable>,
    logs: Vec<LogEntry>,
    grants: HashMap<Role, Vec<Permission>>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn number_taken(&self, number: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.number == number && Some(u.id) != except)
    }

    fn course_view(&self, course: &Course) -> Option<CourseView> {
        let teacher = self.users.get(&course.teacher_id)?;
        Some(CourseView {
            course: course.clone(),
            teacher_name: teacher.name.clone(),
            teacher_number: teacher.number.clone(),
        })
    }

    fn report_view(&self, report: &Report) -> Option<ReportView> {
        let course = self.courses.get(&report.course_id)?;
        let teacher = self.users.get(&course.teacher_id)?;
        let reporter = self.users.get(&report.reporter_id)?;
        Some(ReportView {
            report: report.clone(),
            course_name: course.name.clone(),
            course_active: course.active,
            grade: course.grade,
            teacher_id: teacher.id,
            teacher_name: teacher.name.clone(),
            teacher_number: teacher.number.clone(),
            reporter_name: reporter.name.clone(),
            reporter_number: reporter.number.clone(),
        })
    }

    fn record_view(&self, record: &RecordTable) -> Option<RecordView> {
        let report = self.report_view(self.reports.get(&record.report_id)?)?;
        let reviewer = self.users.get(&record.user_id)?;
        Some(RecordView {
            record: record.clone(),
            report_name: report.report.name.clone(),
            report_active: report.is_active(),
            course_id: report.report.course_id,
            teacher_id: report.teacher_id,
            reviewer_name: reviewer.name.clone(),
            reviewer_number: reviewer.number.clone(),
        })
    }

    fn export_row(&self, record: &RecordTable) -> Option<RecordExportRow> {
        let report = self.report_view(self.reports.get(&record.report_id)?)?;
        let reviewer = self.users.get(&record.user_id)?;
        Some(RecordExportRow {
            score: record.score,
            time: record.time,
            remark: record.remark.clone(),
            file: record.file.clone(),
            grade: report.grade,
            course_name: report.course_name,
            report_name: report.report.name,
            reporter_name: report.reporter_name,
            reporter_number: report.reporter_number,
            reviewer_name: reviewer.name.clone(),
            reviewer_number: reviewer.number.clone(),
            teacher_name: report.teacher_name,
            teacher_number: report.teacher_number,
        })
    }

    fn visible(&self, scope: &ReportScope) -> Vec<ReportView> {
        let mut views: Vec<ReportView> = self
            .reports
            .values()
            .filter_map(|r| self.report_view(r))
            .filter(|v| v.is_active())
            .filter(|v| match scope {
                ReportScope::All => true,
                ReportScope::Teacher(teacher_id) => v.teacher_id == *teacher_id,
                ReportScope::Student { grade, reporter_id } => {
                    v.grade == *grade && v.report.reporter_id != *reporter_id
                }
            })
            .collect();
        views.sort_by_key(|v| (v.report.date, v.report.id));
        views
    }

    fn remove_report(&mut self, id: i64) {
        self.reports.remove(&id);
        self.records.retain(|_, r| r.report_id != id);
    }

    fn remove_course(&mut self, id: i64) {
        self.courses.remove(&id);
        let reports: Vec<i64> = self
            .reports
            .values()
            .filter(|r| r.course_id == id)
            .map(|r| r.id)
            .collect();
        for report in reports {
            self.remove_report(report);
        }
    }
}

fn page<T>(items: impl Iterator<Item = T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock only happens in a failing test.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Backdate a course; listing order depends on dates.
    pub fn set_course_date(&self, id: i64, date: NaiveDate) {
        if let Some(c) = self.lock().courses.get_mut(&id) {
            c.date = date;
        }
    }

    /// Backdate a report; listing order depends on dates.
    pub fn set_report_date(&self, id: i64, date: NaiveDate) {
        if let Some(r) = self.lock().reports.get_mut(&id) {
            r.date = date;
        }
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.lock().logs.clone()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_user_by_number(&self, number: &str) -> Result<Option<User>> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.number == number)
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut state = self.lock();
        if state.number_taken(&user.number, None) {
            return Err(RecordError::Conflict(format!(
                "{} is already existed.",
                user.number
            )));
        }
        let id = state.next_id();
        let user = User {
            id,
            number: user.number,
            name: user.name,
            password_hash: user.password_hash,
            remark: user.remark,
            locale: DEFAULT_LOCALE.into(),
            role: user.role,
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn update_user_profile(
        &self,
        id: i64,
        number: &str,
        name: &str,
        remark: Option<&str>,
    ) -> Result<()> {
        let mut state = self.lock();
        if state.number_taken(number, Some(id)) {
            return Err(RecordError::Conflict(format!("{number} is already existed.")));
        }
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| RecordError::NotFound(format!("user {id}")))?;
        user.number = number.into();
        user.name = name.into();
        user.remark = remark.map(str::to_string);
        Ok(())
    }

    async fn update_user_settings(&self, id: i64, remark: Option<&str>, locale: &str) -> Result<()> {
        let mut state = self.lock();
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| RecordError::NotFound(format!("user {id}")))?;
        user.remark = remark.map(str::to_string);
        user.locale = locale.into();
        Ok(())
    }

    async fn set_password_hash(&self, id: i64, password_hash: &str) -> Result<()> {
        let mut state = self.lock();
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| RecordError::NotFound(format!("user {id}")))?;
        user.password_hash = password_hash.into();
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<()> {
        let mut state = self.lock();
        if state.users.remove(&id).is_none() {
            return Err(RecordError::NotFound(format!("user {id}")));
        }
        let courses: Vec<i64> = state
            .courses
            .values()
            .filter(|c| c.teacher_id == id)
            .map(|c| c.id)
            .collect();
        for course in courses {
            state.remove_course(course);
        }
        let reports: Vec<i64> = state
            .reports
            .values()
            .filter(|r| r.reporter_id == id)
            .map(|r| r.id)
            .collect();
        for report in reports {
            state.remove_report(report);
        }
        state.records.retain(|_, r| r.user_id != id);
        for log in state.logs.iter_mut().filter(|l| l.user_id == Some(id)) {
            log.user_id = None;
        }
        Ok(())
    }

    async fn count_users(&self, role: Option<Role>) -> Result<i64> {
        Ok(self
            .lock()
            .users
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .count() as i64)
    }

    async fn list_users(&self, role: Option<Role>, limit: i64, offset: i64) -> Result<Vec<User>> {
        let state = self.lock();
        let mut users: Vec<&User> = state
            .users
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .collect();
        users.sort_by(|a, b| b.number.cmp(&a.number));
        Ok(page(users.into_iter().cloned(), limit, offset))
    }

    async fn student_grades(&self) -> Result<Vec<i32>> {
        let mut grades: Vec<i32> = self
            .lock()
            .users
            .values()
            .filter_map(User::grade)
            .collect();
        grades.sort_unstable();
        grades.dedup();
        Ok(grades)
    }

    async fn sync_role_permissions(&self, grants: &[(Role, &'static [Permission])]) -> Result<()> {
        let mut state = self.lock();
        for (role, permissions) in grants {
            state.grants.insert(*role, permissions.to_vec());
        }
        Ok(())
    }

    async fn role_permissions(&self, role: Role) -> Result<Vec<Permission>> {
        Ok(self.lock().grants.get(&role).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn get_course(&self, id: i64) -> Result<Option<CourseView>> {
        let state = self.lock();
        Ok(state.courses.get(&id).and_then(|c| state.course_view(c)))
    }

    async fn insert_course(&self, course: NewCourse) -> Result<CourseView> {
        let mut state = self.lock();
        if !state.users.contains_key(&course.teacher_id) {
            return Err(RecordError::NotFound(format!("user {}", course.teacher_id)));
        }
        let id = state.next_id();
        let course = Course {
            id,
            teacher_id: course.teacher_id,
            name: course.name,
            grade: course.grade,
            active: true,
            date: today(),
            remark: course.remark,
        };
        state.courses.insert(id, course.clone());
        state
            .course_view(&course)
            .ok_or_else(|| RecordError::Internal(anyhow::anyhow!("course {id} vanished")))
    }

    async fn list_courses(
        &self,
        teacher_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CourseView>> {
        let state = self.lock();
        let mut courses: Vec<&Course> = state
            .courses
            .values()
            .filter(|c| teacher_id.map_or(true, |t| c.teacher_id == t))
            .collect();
        courses.sort_by(|a, b| (b.date, b.id).cmp(&(a.date, a.id)));
        Ok(page(
            courses.into_iter().filter_map(|c| state.course_view(c)),
            limit,
            offset,
        ))
    }

    async fn count_courses(&self, teacher_id: Option<i64>) -> Result<i64> {
        Ok(self
            .lock()
            .courses
            .values()
            .filter(|c| teacher_id.map_or(true, |t| c.teacher_id == t))
            .count() as i64)
    }

    async fn set_course_active(&self, id: i64, active: bool) -> Result<u64> {
        let mut state = self.lock();
        let course = state
            .courses
            .get_mut(&id)
            .ok_or_else(|| RecordError::NotFound(format!("course {id}")))?;
        course.active = active;
        let mut touched = 0;
        for report in state.reports.values_mut().filter(|r| r.course_id == id) {
            report.active = active;
            touched += 1;
        }
        Ok(touched)
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn get_report(&self, id: i64) -> Result<Option<ReportView>> {
        let state = self.lock();
        Ok(state.reports.get(&id).and_then(|r| state.report_view(r)))
    }

    async fn insert_report(&self, report: NewReport) -> Result<ReportView> {
        let mut state = self.lock();
        if !state.courses.contains_key(&report.course_id) {
            return Err(RecordError::NotFound(format!("course {}", report.course_id)));
        }
        if !state.users.contains_key(&report.reporter_id) {
            return Err(RecordError::NotFound(format!("user {}", report.reporter_id)));
        }
        let id = state.next_id();
        let report = Report {
            id,
            course_id: report.course_id,
            reporter_id: report.reporter_id,
            name: report.name,
            score: None,
            active: true,
            date: today(),
            remark: report.remark,
        };
        state.reports.insert(id, report.clone());
        state
            .report_view(&report)
            .ok_or_else(|| RecordError::Internal(anyhow::anyhow!("report {id} vanished")))
    }

    async fn list_course_reports(&self, course_id: i64, limit: i64, offset: i64) -> Result<Vec<ReportView>> {
        let state = self.lock();
        let mut reports: Vec<&Report> = state
            .reports
            .values()
            .filter(|r| r.course_id == course_id)
            .collect();
        reports.sort_by(|a, b| (b.date, b.id).cmp(&(a.date, a.id)));
        Ok(page(
            reports.into_iter().filter_map(|r| state.report_view(r)),
            limit,
            offset,
        ))
    }

    async fn count_course_reports(&self, course_id: i64) -> Result<i64> {
        Ok(self
            .lock()
            .reports
            .values()
            .filter(|r| r.course_id == course_id)
            .count() as i64)
    }

    async fn list_visible_reports(
        &self,
        scope: &ReportScope,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReportView>> {
        Ok(page(self.lock().visible(scope).into_iter(), limit, offset))
    }

    async fn count_visible_reports(&self, scope: &ReportScope) -> Result<i64> {
        Ok(self.lock().visible(scope).len() as i64)
    }

    async fn set_report_active(&self, id: i64, active: bool) -> Result<()> {
        let mut state = self.lock();
        let report = state
            .reports
            .get_mut(&id)
            .ok_or_else(|| RecordError::NotFound(format!("report {id}")))?;
        report.active = active;
        Ok(())
    }

    async fn delete_report(&self, id: i64) -> Result<()> {
        let mut state = self.lock();
        if !state.reports.contains_key(&id) {
            return Err(RecordError::NotFound(format!("report {id}")));
        }
        state.remove_report(id);
        Ok(())
    }

    async fn count_reports(&self) -> Result<i64> {
        Ok(self.lock().reports.len() as i64)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_record(&self, id: i64) -> Result<Option<RecordView>> {
        let state = self.lock();
        Ok(state.records.get(&id).and_then(|r| state.record_view(r)))
    }

    async fn find_record(&self, report_id: i64, user_id: i64) -> Result<Option<RecordTable>> {
        Ok(self
            .lock()
            .records
            .values()
            .find(|r| r.report_id == report_id && r.user_id == user_id)
            .cloned())
    }

    async fn find_record_by_file(&self, file: &str) -> Result<Option<RecordView>> {
        let state = self.lock();
        Ok(state
            .records
            .values()
            .find(|r| r.file.as_deref() == Some(file))
            .and_then(|r| state.record_view(r)))
    }

    async fn upsert_record(
        &self,
        report_id: i64,
        user_id: i64,
        score: i32,
        remark: Option<&str>,
    ) -> Result<RecordTable> {
        let mut state = self.lock();
        if !state.reports.contains_key(&report_id) {
            return Err(RecordError::NotFound(format!("report {report_id}")));
        }
        let existing = state
            .records
            .values()
            .find(|r| r.report_id == report_id && r.user_id == user_id)
            .map(|r| r.id);
        let id = match existing {
            Some(id) => id,
            None => state.next_id(),
        };
        let file = existing.and_then(|id| state.records[&id].file.clone());
        let record = RecordTable {
            id,
            report_id,
            user_id,
            score,
            time: Utc::now(),
            remark: remark.map(str::to_string),
            file,
        };
        state.records.insert(id, record.clone());
        Ok(record)
    }

    async fn set_record_file(&self, id: i64, file: Option<&str>) -> Result<()> {
        let mut state = self.lock();
        let record = state
            .records
            .get_mut(&id)
            .ok_or_else(|| RecordError::NotFound(format!("record {id}")))?;
        record.file = file.map(str::to_string);
        Ok(())
    }

    async fn delete_record(&self, id: i64) -> Result<()> {
        self.lock()
            .records
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RecordError::NotFound(format!("record {id}")))
    }

    async fn list_report_records(&self, report_id: i64, limit: i64, offset: i64) -> Result<Vec<RecordView>> {
        let state = self.lock();
        let mut records: Vec<&RecordTable> = state
            .records
            .values()
            .filter(|r| r.report_id == report_id)
            .collect();
        records.sort_by(|a, b| (b.time, b.id).cmp(&(a.time, a.id)));
        Ok(page(
            records.into_iter().filter_map(|r| state.record_view(r)),
            limit,
            offset,
        ))
    }

    async fn count_report_records(&self, report_id: i64) -> Result<i64> {
        Ok(self
            .lock()
            .records
            .values()
            .filter(|r| r.report_id == report_id)
            .count() as i64)
    }

    async fn export_report_records(&self, report_id: i64) -> Result<Vec<RecordExportRow>> {
        let state = self.lock();
        Ok(state
            .records
            .values()
            .filter(|r| r.report_id == report_id)
            .filter_map(|r| state.export_row(r))
            .collect())
    }

    async fn export_course_records(&self, course_id: i64) -> Result<Vec<RecordExportRow>> {
        let state = self.lock();
        Ok(state
            .records
            .values()
            .filter(|r| {
                state
                    .reports
                    .get(&r.report_id)
                    .is_some_and(|rep| rep.course_id == course_id)
            })
            .filter_map(|r| state.export_row(r))
            .collect())
    }

    async fn user_attachment_files(&self, user_id: i64) -> Result<Vec<String>> {
        let state = self.lock();
        let goes_with_user = |r: &RecordTable| {
            r.user_id == user_id
                || state.reports.get(&r.report_id).is_some_and(|rep| {
                    rep.reporter_id == user_id
                        || state
                            .courses
                            .get(&rep.course_id)
                            .is_some_and(|c| c.teacher_id == user_id)
                })
        };
        Ok(state
            .records
            .values()
            .filter(|r| goes_with_user(r))
            .filter_map(|r| r.file.clone())
            .collect())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append_log(&self, entry: NewLogEntry) -> Result<LogEntry> {
        let mut state = self.lock();
        let id = state.next_id();
        let log = LogEntry {
            id,
            user_id: Some(entry.user_id),
            ip: entry.ip,
            time: Utc::now(),
            content: entry.content,
        };
        state.logs.push(log.clone());
        Ok(log)
    }

    async fn count_logs(&self) -> Result<i64> {
        Ok(self.lock().logs.len() as i64)
    }

    async fn export_logs(&self) -> Result<Vec<LogExportRow>> {
        let state = self.lock();
        Ok(state
            .logs
            .iter()
            .map(|l| {
                let user = l.user_id.and_then(|id| state.users.get(&id));
                LogExportRow {
                    ip: l.ip.clone(),
                    time: l.time,
                    content: l.content.clone(),
                    number: user.map(|u| u.number.clone()),
                    role: user.map(|u| u.role.to_string()),
                }
            })
            .collect())
    }
}
