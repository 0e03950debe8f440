//! Field rules for user, course and report input.

use crate::error::RecordError;
use crate::roles::Role;

pub const NAME_MAX: usize = 20;
pub const TITLE_MAX: usize = 30;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 128;

pub fn field_error(field: &str, error: impl std::fmt::Display) -> RecordError {
    RecordError::InvalidInput(format!("Error in the {field} field - {error}."))
}

/// Username (number) rules depend on the role the account has or will have.
pub fn validate_number(role: Role, number: &str) -> Result<(), RecordError> {
    let len = number.chars().count();
    match role {
        Role::Student => {
            if len != 12 {
                return Err(field_error("Username", "Field must be exactly 12 characters long"));
            }
            if !number.chars().all(|c| c.is_ascii_digit()) {
                return Err(field_error("Username", "The username should only contain 0-9"));
            }
        }
        Role::Teacher => {
            if !(4..=12).contains(&len) {
                return Err(field_error(
                    "Username",
                    "Field must be between 4 and 12 characters long",
                ));
            }
            if !number.chars().all(|c| c.is_ascii_digit()) {
                return Err(field_error("Username", "The username should only contain 0-9"));
            }
        }
        Role::Administrator => {
            if !(1..=12).contains(&len) {
                return Err(field_error(
                    "Username",
                    "Field must be between 1 and 12 characters long",
                ));
            }
            if !number.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(field_error(
                    "Username",
                    "The username should only contain a-z, A-Z and 0-9",
                ));
            }
        }
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), RecordError> {
    check_length("Name", name, 1, NAME_MAX)
}

pub fn validate_title(name: &str) -> Result<(), RecordError> {
    check_length("Name", name, 1, TITLE_MAX)
}

pub fn validate_new_password(password: &str, confirm: &str) -> Result<(), RecordError> {
    check_length("Password", password, PASSWORD_MIN, PASSWORD_MAX)?;
    if password != confirm {
        return Err(field_error("Password", "Field must be equal to password2"));
    }
    Ok(())
}

pub fn validate_grade(grade: i32) -> Result<(), RecordError> {
    if !(1000..=9999).contains(&grade) {
        return Err(field_error("Grade", "Grade must be a four-digit year"));
    }
    Ok(())
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), RecordError> {
    let len = value.trim().chars().count();
    if len < min || value.chars().count() > max {
        return Err(field_error(
            field,
            format!("Field must be between {min} and {max} characters long"),
        ));
    }
    Ok(())
}

/// Empty remarks are stored as NULL.
pub fn normalize_remark(remark: Option<String>) -> Option<String> {
    remark.and_then(|r| {
        let trimmed = r.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_numbers_are_twelve_digits() {
        assert!(validate_number(Role::Student, "201612345678").is_ok());
        assert!(validate_number(Role::Student, "20161234567").is_err());
        assert!(validate_number(Role::Student, "2016123456a8").is_err());
    }

    #[test]
    fn teacher_numbers_are_four_to_twelve_digits() {
        assert!(validate_number(Role::Teacher, "1000").is_ok());
        assert!(validate_number(Role::Teacher, "100").is_err());
        assert!(validate_number(Role::Teacher, "10a0").is_err());
    }

    #[test]
    fn administrator_numbers_allow_letters() {
        assert!(validate_number(Role::Administrator, "007").is_ok());
        assert!(validate_number(Role::Administrator, "root42").is_ok());
        assert!(validate_number(Role::Administrator, "").is_err());
        assert!(validate_number(Role::Administrator, "a-b").is_err());
    }

    #[test]
    fn error_text_names_the_field() {
        let err = validate_name("").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid input: Error in the Name field - Field must be between 1 and 20 characters long."
        );
    }

    #[test]
    fn names_count_characters_not_bytes() {
        assert!(validate_name("张三").is_ok());
        assert!(validate_name(&"名".repeat(20)).is_ok());
        assert!(validate_name(&"名".repeat(21)).is_err());
    }

    #[test]
    fn password_rules() {
        assert!(validate_new_password("12345678", "12345678").is_ok());
        assert!(validate_new_password("1234567", "1234567").is_err());
        assert!(validate_new_password("12345678", "12345679").is_err());
    }

    #[test]
    fn remark_blank_becomes_none() {
        assert_eq!(normalize_remark(Some("  ".into())), None);
        assert_eq!(normalize_remark(Some(" hi ".into())), Some("hi".into()));
        assert_eq!(normalize_remark(None), None);
    }

    #[test]
    fn grade_is_a_year() {
        assert!(validate_grade(2016).is_ok());
        assert!(validate_grade(16).is_err());
    }
}
