//! Entity store contract consumed by the services

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Application, ApplicationFilter, ApplicationPatch, ApplicationStatus, NewApplication,
    NewPayment, NewTuition, Payment, PaymentFilter, Tuition, TuitionFilter, TuitionPatch,
    TuitionStatus, UpdateUserAdmin, User, UserLogin,
};

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                let constraint = db_err.constraint().unwrap_or("unique").to_string();
                return StoreError::Conflict(constraint);
            }
        }
        StoreError::Database(err)
    }
}

/// Result of the approve-and-cross-reject unit.
#[derive(Debug, Clone)]
pub enum ApprovalOutcome {
    /// The application moved pending -> approved and its pending siblings were rejected.
    Approved {
        application: Application,
        rejected_siblings: u64,
    },
    /// The compare-and-swap found the application no longer pending.
    Unchanged(ApplicationStatus),
    /// Another application of the same tuition already holds the approval.
    TuitionAssigned,
}

/// Result of the settlement unit (approval, cross-rejection, assignment, ledger row).
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    Settled {
        application: Application,
        payment: Payment,
        rejected_siblings: u64,
    },
    Unchanged(ApplicationStatus),
    TuitionAssigned,
}

/// Storage abstraction over the four collections.
///
/// Every multi-record operation (`approve_application`, `settle_application`)
/// must be applied atomically: either all writes land or none do. Status
/// transitions are conditional on the expected prior status.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // Tuitions
    async fn insert_tuition(
        &self,
        tuition: NewTuition,
        now: DateTime<Utc>,
    ) -> Result<Tuition, StoreError>;
    async fn find_tuition(&self, id: Uuid) -> Result<Option<Tuition>, StoreError>;
    async fn list_tuitions(&self, filter: &TuitionFilter) -> Result<Vec<Tuition>, StoreError>;
    async fn update_tuition(
        &self,
        id: Uuid,
        patch: &TuitionPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Tuition>, StoreError>;
    async fn set_tuition_status(
        &self,
        id: Uuid,
        status: TuitionStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Tuition>, StoreError>;
    async fn delete_tuition(&self, id: Uuid) -> Result<bool, StoreError>;

    // Applications
    /// Fails with `StoreError::Conflict` when (tuition_id, tutor_email) already exists.
    async fn insert_application(
        &self,
        application: NewApplication,
        now: DateTime<Utc>,
    ) -> Result<Application, StoreError>;
    async fn find_application(&self, id: Uuid) -> Result<Option<Application>, StoreError>;
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, StoreError>;
    /// Applies the patch only while the application is pending.
    async fn update_pending_application(
        &self,
        id: Uuid,
        patch: &ApplicationPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Application>, StoreError>;
    async fn delete_pending_application(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn reject_pending_application(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Application>, StoreError>;
    async fn approve_application(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ApprovalOutcome, StoreError>;
    async fn settle_application(
        &self,
        payment: NewPayment,
        now: DateTime<Utc>,
    ) -> Result<SettlementOutcome, StoreError>;

    // Payments
    async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, StoreError>;
    async fn find_payment_by_application(
        &self,
        application_id: Uuid,
    ) -> Result<Option<Payment>, StoreError>;

    // Users
    async fn upsert_user(&self, login: UserLogin, now: DateTime<Utc>)
        -> Result<User, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    async fn update_user_admin(
        &self,
        email: &str,
        update: &UpdateUserAdmin,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;
    async fn delete_user(&self, email: &str) -> Result<bool, StoreError>;
}
