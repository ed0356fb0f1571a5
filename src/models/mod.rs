//! Data models for the application

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tuition_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TuitionStatus {
    Pending,
    Approved,
    Rejected,
}

impl TuitionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            TuitionStatus::Pending => "pending",
            TuitionStatus::Approved => "approved",
            TuitionStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "application_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tutor_gender", rename_all = "lowercase")]
pub enum TutorGender {
    #[default]
    Any,
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Tutor,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Blocked,
}

// =============================================================================
// Tuition
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tuition {
    pub id: Uuid,
    pub subject: String,
    pub class_level: String,
    pub location: String,
    pub schedule: String,
    pub days_per_week: i32,
    pub budget: f64,
    pub preferred_tutor_gender: TutorGender,
    pub note: Option<String>,
    pub student_name: String,
    pub student_email: String,
    pub student_photo: Option<String>,
    pub status: TuitionStatus,
    pub assigned_tutor_email: Option<String>,
    pub assigned_tutor_name: Option<String>,
    pub assigned_tutor_photo: Option<String>,
    pub ongoing: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

impl Tuition {
    /// Whether tutors may currently apply to this tuition.
    pub fn is_open_for_applications(&self) -> bool {
        self.status == TuitionStatus::Approved && !self.ongoing
    }
}

/// Raw tuition payload. Numeric fields arrive as numbers or numeric strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTuition {
    pub subject: Option<String>,
    pub class_level: Option<String>,
    pub location: Option<String>,
    pub schedule: Option<String>,
    pub days_per_week: Option<serde_json::Value>,
    pub budget: Option<serde_json::Value>,
    pub preferred_tutor_gender: Option<TutorGender>,
    pub note: Option<String>,
    pub student_name: Option<String>,
    pub student_email: Option<String>,
    pub student_photo: Option<String>,
}

/// Validated tuition fields ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTuition {
    pub subject: String,
    pub class_level: String,
    pub location: String,
    pub schedule: String,
    pub days_per_week: i32,
    pub budget: f64,
    pub preferred_tutor_gender: TutorGender,
    pub note: Option<String>,
    pub student_name: String,
    pub student_email: String,
    pub student_photo: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTuition {
    pub subject: Option<String>,
    pub class_level: Option<String>,
    pub location: Option<String>,
    pub schedule: Option<String>,
    pub days_per_week: Option<serde_json::Value>,
    pub budget: Option<serde_json::Value>,
    pub preferred_tutor_gender: Option<TutorGender>,
    pub note: Option<String>,
}

/// Validated partial tuition update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TuitionPatch {
    pub subject: Option<String>,
    pub class_level: Option<String>,
    pub location: Option<String>,
    pub schedule: Option<String>,
    pub days_per_week: Option<i32>,
    pub budget: Option<f64>,
    pub preferred_tutor_gender: Option<TutorGender>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuitionFilter {
    pub status: Option<TuitionStatus>,
    pub student_email: Option<String>,
}

// =============================================================================
// Application
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    pub tuition_id: Uuid,
    pub subject: String,
    pub class_level: String,
    pub location: String,
    pub schedule: String,
    pub budget: f64,
    pub student_name: String,
    pub student_email: String,
    pub student_photo: Option<String>,
    pub tutor_email: String,
    pub tutor_name: String,
    pub tutor_photo: Option<String>,
    pub qualifications: String,
    pub experience: String,
    pub expected_salary: f64,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplication {
    pub tuition_id: Option<String>,
    pub tutor_name: Option<String>,
    pub tutor_photo: Option<String>,
    pub qualifications: Option<String>,
    pub experience: Option<String>,
    pub expected_salary: Option<serde_json::Value>,
}

/// Everything needed to persist an application: tutor input plus the
/// tuition snapshot taken at submission time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub tuition_id: Uuid,
    pub subject: String,
    pub class_level: String,
    pub location: String,
    pub schedule: String,
    pub budget: f64,
    pub student_name: String,
    pub student_email: String,
    pub student_photo: Option<String>,
    pub tutor_email: String,
    pub tutor_name: String,
    pub tutor_photo: Option<String>,
    pub qualifications: String,
    pub experience: String,
    pub expected_salary: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplication {
    pub qualifications: Option<String>,
    pub experience: Option<String>,
    pub expected_salary: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationPatch {
    pub qualifications: Option<String>,
    pub experience: Option<String>,
    pub expected_salary: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationFilter {
    pub tuition_id: Option<Uuid>,
    pub tutor_email: Option<String>,
    pub student_email: Option<String>,
    pub status: Option<ApplicationStatus>,
}

// =============================================================================
// Payment
// =============================================================================

/// Append-only ledger row written once per settled application.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub application_id: Uuid,
    pub tuition_id: Uuid,
    pub student_email: String,
    pub tutor_email: String,
    /// Smallest currency unit
    pub amount: i64,
    pub currency: String,
    pub session_id: String,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub application_id: Uuid,
    pub tuition_id: Uuid,
    pub student_email: String,
    pub tutor_email: String,
    pub amount: i64,
    pub currency: String,
    pub session_id: String,
    pub payment_status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFilter {
    pub student_email: Option<String>,
    pub tutor_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub application_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub url: String,
    pub session_id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub session_id: String,
}

// =============================================================================
// User
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: String,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertUser {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub role: Option<UserRole>,
}

/// Login refresh: profile columns are overwritten, `role` only applies on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct UserLogin {
    pub email: String,
    pub name: String,
    pub phone: String,
    pub photo_url: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserAdmin {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub is_verified: Option<bool>,
}

// =============================================================================
// API Responses
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}
