//! Course management (MODERATOR_COURSE).

use serde::Deserialize;

use super::RecordService;
use crate::audit::AuditEvent;
use crate::error::{RecordError, Result};
use crate::pagination::{paginate, Page};
use crate::principal::Principal;
use crate::roles::Permission;
use crate::types::{CourseView, NewCourse};
use crate::validation::{field_error, normalize_remark, validate_grade, validate_title};

#[derive(Debug, Clone, Deserialize)]
pub struct CourseForm {
    pub name: String,
    pub grade: i32,
    #[serde(default)]
    pub remark: Option<String>,
    /// Number of the teacher who owns the course. Ignored for teachers,
    /// who always own what they add.
    #[serde(default)]
    pub teacher: Option<String>,
}

impl RecordService {
    /// Load a course the principal may moderate.
    pub(super) async fn owned_course(&self, principal: &Principal, id: i64) -> Result<CourseView> {
        let course = self
            .stores
            .courses
            .get_course(id)
            .await?
            .ok_or_else(|| RecordError::NotFound(format!("course {id}")))?;
        principal.require_owner(course.course.teacher_id)?;
        Ok(course)
    }

    /// Teachers see the courses they teach; administrators see every course.
    pub(super) fn course_scope(principal: &Principal) -> Option<i64> {
        principal.user.is_teacher().then(|| principal.id())
    }

    pub async fn list_courses(&self, principal: &Principal, page: i64) -> Result<Page<CourseView>> {
        Self::require_admin_area(principal, Some(Permission::ModeratorCourse))?;
        let scope = Self::course_scope(principal);
        let total = self.stores.courses.count_courses(scope).await?;
        let window = paginate(page, self.settings.courses_per_page, total)?;
        self.log_action(principal, AuditEvent::ManageCourses).await?;
        let courses = self
            .stores
            .courses
            .list_courses(scope, window.limit(), window.offset())
            .await?;
        Ok(window.into_page(courses))
    }

    /// Flip a course's active flag. Every report of the course takes the
    /// new value.
    pub async fn switch_course_state(&self, principal: &Principal, id: i64) -> Result<CourseView> {
        Self::require_admin_area(principal, Some(Permission::ModeratorCourse))?;
        let mut course = self.owned_course(principal, id).await?;
        self.log_action(
            principal,
            AuditEvent::SwitchCourseState {
                grade: course.course.grade,
                name: course.course.name.clone(),
            },
        )
        .await?;
        let active = !course.course.active;
        let reports = self.stores.courses.set_course_active(id, active).await?;
        tracing::debug!(course = id, active, reports, "course state switched");
        course.course.active = active;
        Ok(course)
    }

    /// Grades a new course can be opened for: those with enrolled students.
    pub async fn course_grades(&self, principal: &Principal) -> Result<Vec<i32>> {
        Self::require_admin_area(principal, Some(Permission::ModeratorCourse))?;
        self.stores.users.student_grades().await
    }

    pub async fn add_course(&self, principal: &Principal, form: CourseForm) -> Result<CourseView> {
        Self::require_admin_area(principal, Some(Permission::ModeratorCourse))?;
        let name = form.name.trim().to_string();
        validate_title(&name)?;
        validate_grade(form.grade)?;

        let teacher_id = if principal.user.is_teacher() {
            principal.id()
        } else {
            let number = form
                .teacher
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| field_error("Teacher", "This field is required"))?;
            let teacher = self
                .stores
                .users
                .find_user_by_number(number)
                .await?
                .ok_or_else(|| RecordError::InvalidInput(format!("{number} is not existed.")))?;
            if !teacher.is_teacher() {
                return Err(RecordError::InvalidInput(format!("{number} is not a teacher.")));
            }
            teacher.id
        };

        self.log_action(
            principal,
            AuditEvent::AddCourse {
                grade: form.grade,
                name: name.clone(),
            },
        )
        .await?;
        self.stores
            .courses
            .insert_course(NewCourse {
                teacher_id,
                name,
                grade: form.grade,
                remark: normalize_remark(form.remark),
            })
            .await
    }
}
