//! Input validation module

use crate::models::{
    ApplicationPatch, CreateApplication, CreateTuition, NewTuition, TuitionPatch, TuitionStatus,
    UpdateApplication, UpdateTuition, UpdateUserAdmin, UpsertUser, UserLogin, UserRole,
};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Longest accepted free-text field
const MAX_TEXT_LEN: usize = 2000;

/// Longest accepted short field (subject, location, names)
const MAX_SHORT_LEN: usize = 255;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' is too long (max {max} characters)")]
    TooLong { field: String, max: usize },

    #[error("Field '{field}' must be a number")]
    InvalidNumber { field: String },

    #[error("Field '{field}' must not be negative")]
    Negative { field: String },

    #[error("Field '{field}' must be greater than zero")]
    NotPositive { field: String },

    #[error("Field '{field}' is out of range")]
    OutOfRange { field: String },

    #[error("Field '{field}' is not a valid identifier")]
    InvalidId { field: String },

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Invalid status '{value}' (expected pending, approved or rejected)")]
    InvalidStatus { value: String },

    #[error("Role '{role}' cannot be self-assigned")]
    RoleNotAllowed { role: String },

    #[error("At least one field must be provided")]
    EmptyUpdate,
}

/// Tutor-supplied part of an application, before the tuition snapshot is taken.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationSubmission {
    pub tuition_id: Uuid,
    pub tutor_email: String,
    pub tutor_name: String,
    pub tutor_photo: Option<String>,
    pub qualifications: String,
    pub experience: String,
    pub expected_salary: f64,
}

// =============================================================================
// Tuition
// =============================================================================

/// Validate a tuition creation request
pub fn validate_create_tuition(input: &CreateTuition) -> Result<NewTuition, ValidationError> {
    let subject = required_text("subject", input.subject.as_deref(), MAX_SHORT_LEN)?;
    let class_level = required_text("classLevel", input.class_level.as_deref(), MAX_SHORT_LEN)?;
    let location = required_text("location", input.location.as_deref(), MAX_SHORT_LEN)?;
    let schedule = required_text("schedule", input.schedule.as_deref(), MAX_SHORT_LEN)?;

    if is_blank_value(input.budget.as_ref()) {
        return Err(required("budget"));
    }
    let budget = non_negative("budget", coerce_number("budget", input.budget.as_ref())?)?;

    let student_email =
        required_text("studentEmail", input.student_email.as_deref(), MAX_SHORT_LEN)?
            .to_lowercase();
    if !is_valid_email(&student_email) {
        return Err(ValidationError::InvalidEmail);
    }

    let days_per_week = whole_days(non_negative(
        "daysPerWeek",
        coerce_number("daysPerWeek", input.days_per_week.as_ref())?,
    )?)?;

    Ok(NewTuition {
        subject,
        class_level,
        location,
        schedule,
        days_per_week,
        budget,
        preferred_tutor_gender: input.preferred_tutor_gender.unwrap_or_default(),
        note: optional_text("note", input.note.as_deref(), MAX_TEXT_LEN)?,
        student_name: input.student_name.as_deref().unwrap_or("").trim().to_string(),
        student_email,
        student_photo: non_empty(input.student_photo.as_deref()),
    })
}

/// Validate a partial tuition update. Supplied text fields must stay non-empty.
pub fn validate_update_tuition(input: &UpdateTuition) -> Result<TuitionPatch, ValidationError> {
    let text = |field: &str, value: Option<&str>| -> Result<Option<String>, ValidationError> {
        value
            .map(|v| required_text(field, Some(v), MAX_SHORT_LEN))
            .transpose()
    };

    let days_per_week = match input.days_per_week.as_ref() {
        Some(value) => Some(whole_days(non_negative(
            "daysPerWeek",
            coerce_number("daysPerWeek", Some(value))?,
        )?)?),
        None => None,
    };
    let budget = match input.budget.as_ref() {
        Some(value) => Some(non_negative("budget", coerce_number("budget", Some(value))?)?),
        None => None,
    };

    Ok(TuitionPatch {
        subject: text("subject", input.subject.as_deref())?,
        class_level: text("classLevel", input.class_level.as_deref())?,
        location: text("location", input.location.as_deref())?,
        schedule: text("schedule", input.schedule.as_deref())?,
        days_per_week,
        budget,
        preferred_tutor_gender: input.preferred_tutor_gender,
        note: optional_text("note", input.note.as_deref(), MAX_TEXT_LEN)?,
    })
}

/// Parse a moderation status; anything outside pending/approved/rejected is refused.
pub fn parse_moderation_status(value: &str) -> Result<TuitionStatus, ValidationError> {
    match value.trim() {
        "pending" => Ok(TuitionStatus::Pending),
        "approved" => Ok(TuitionStatus::Approved),
        "rejected" => Ok(TuitionStatus::Rejected),
        other => Err(ValidationError::InvalidStatus {
            value: other.to_string(),
        }),
    }
}

// =============================================================================
// Application
// =============================================================================

/// Validate a tutor's application payload
pub fn validate_create_application(
    input: &CreateApplication,
    tutor_email: &str,
    fallback_name: &str,
) -> Result<ApplicationSubmission, ValidationError> {
    let tuition_id = required_text("tuitionId", input.tuition_id.as_deref(), MAX_SHORT_LEN)?;
    let tuition_id = parse_id("tuitionId", &tuition_id)?;

    let tutor_email = required_text("tutorEmail", Some(tutor_email), MAX_SHORT_LEN)?.to_lowercase();
    if !is_valid_email(&tutor_email) {
        return Err(ValidationError::InvalidEmail);
    }

    let tutor_name = match non_empty(input.tutor_name.as_deref()) {
        Some(name) => name,
        None => required_text("tutorName", Some(fallback_name), MAX_SHORT_LEN)?,
    };

    let qualifications = required_text(
        "qualifications",
        input.qualifications.as_deref(),
        MAX_TEXT_LEN,
    )?;
    let experience = required_text("experience", input.experience.as_deref(), MAX_TEXT_LEN)?;

    if is_blank_value(input.expected_salary.as_ref()) {
        return Err(required("expectedSalary"));
    }
    let expected_salary = positive(
        "expectedSalary",
        coerce_number("expectedSalary", input.expected_salary.as_ref())?,
    )?;

    Ok(ApplicationSubmission {
        tuition_id,
        tutor_email,
        tutor_name,
        tutor_photo: non_empty(input.tutor_photo.as_deref()),
        qualifications,
        experience,
        expected_salary,
    })
}

/// Validate an application edit; only the supplied fields are returned.
pub fn validate_update_application(
    input: &UpdateApplication,
) -> Result<ApplicationPatch, ValidationError> {
    let qualifications = input
        .qualifications
        .as_deref()
        .map(|v| required_text("qualifications", Some(v), MAX_TEXT_LEN))
        .transpose()?;
    let experience = input
        .experience
        .as_deref()
        .map(|v| required_text("experience", Some(v), MAX_TEXT_LEN))
        .transpose()?;
    let expected_salary = match input.expected_salary.as_ref() {
        Some(value) => Some(positive(
            "expectedSalary",
            coerce_number("expectedSalary", Some(value))?,
        )?),
        None => None,
    };

    Ok(ApplicationPatch {
        qualifications,
        experience,
        expected_salary,
    })
}

/// Convert a salary in major units into the provider's smallest currency unit.
pub fn amount_in_minor_units(expected_salary: f64) -> Result<i64, ValidationError> {
    let amount = (expected_salary * 100.0).round();
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ValidationError::NotPositive {
            field: "expectedSalary".to_string(),
        });
    }
    // i64::MAX as f64 is exactly 2^63, one past the largest representable amount
    if amount >= i64::MAX as f64 {
        return Err(ValidationError::OutOfRange {
            field: "expectedSalary".to_string(),
        });
    }
    Ok(amount as i64)
}

/// Round a non-negative day count, refusing values that do not fit the column.
fn whole_days(days: f64) -> Result<i32, ValidationError> {
    let days = days.round();
    if days > f64::from(i32::MAX) {
        return Err(ValidationError::OutOfRange {
            field: "daysPerWeek".to_string(),
        });
    }
    Ok(days as i32)
}

// =============================================================================
// User
// =============================================================================

/// Validate a login upsert. The email always comes from the verified identity.
pub fn validate_user_login(
    input: &UpsertUser,
    verified_email: &str,
) -> Result<UserLogin, ValidationError> {
    let email = required_text("email", Some(verified_email), MAX_SHORT_LEN)?.to_lowercase();
    if !is_valid_email(&email) {
        return Err(ValidationError::InvalidEmail);
    }

    let role = match input.role {
        None => UserRole::Student,
        Some(UserRole::Admin) => {
            return Err(ValidationError::RoleNotAllowed {
                role: "admin".to_string(),
            })
        }
        Some(role) => role,
    };

    let trimmed = |field: &str, value: Option<&str>| -> Result<String, ValidationError> {
        let value = value.unwrap_or("").trim();
        if value.len() > MAX_SHORT_LEN {
            return Err(ValidationError::TooLong {
                field: field.to_string(),
                max: MAX_SHORT_LEN,
            });
        }
        Ok(value.to_string())
    };

    Ok(UserLogin {
        email,
        name: trimmed("name", input.name.as_deref())?,
        phone: trimmed("phone", input.phone.as_deref())?,
        photo_url: trimmed("photoURL", input.photo_url.as_deref())?,
        role,
    })
}

/// Validate an administrator's user update
pub fn validate_admin_user_update(input: &UpdateUserAdmin) -> Result<(), ValidationError> {
    if input.role.is_none() && input.status.is_none() && input.is_verified.is_none() {
        return Err(ValidationError::EmptyUpdate);
    }
    Ok(())
}

/// Parse a path or body identifier
pub fn parse_id(field: &str, value: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(value.trim()).map_err(|_| ValidationError::InvalidId {
        field: field.to_string(),
    })
}

// =============================================================================
// Helpers
// =============================================================================

fn required(field: &str) -> ValidationError {
    ValidationError::Required {
        field: field.to_string(),
    }
}

fn required_text(field: &str, value: Option<&str>, max: usize) -> Result<String, ValidationError> {
    let value = value.map(str::trim).unwrap_or("");
    if value.is_empty() {
        return Err(required(field));
    }
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(value.to_string())
}

fn optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value {
        Some(v) if v.len() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        Some(v) => Ok(Some(v.trim().to_string())),
        None => Ok(None),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn is_blank_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Numbers may arrive as JSON numbers or numeric strings; absence coerces to 0.
fn coerce_number(field: &str, value: Option<&Value>) -> Result<f64, ValidationError> {
    let invalid = || ValidationError::InvalidNumber {
        field: field.to_string(),
    };

    let number = match value {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n.as_f64().ok_or_else(invalid)?,
        Some(Value::String(s)) if s.trim().is_empty() => 0.0,
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| invalid())?,
        Some(_) => return Err(invalid()),
    };

    if !number.is_finite() {
        return Err(invalid());
    }
    Ok(number)
}

fn non_negative(field: &str, value: f64) -> Result<f64, ValidationError> {
    if value < 0.0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(value)
}

fn positive(field: &str, value: f64) -> Result<f64, ValidationError> {
    if value <= 0.0 {
        return Err(ValidationError::NotPositive {
            field: field.to_string(),
        });
    }
    Ok(value)
}

fn is_valid_email(email: &str) -> bool {
    validator::validate_email(email)
}
