//! Core operations: tuition moderation, the application lifecycle, payment
//! settlement and the user directory.
//!
//! Handlers resolve and authorize the caller first, then pass the resulting
//! [`User`](crate::models::User) into these services. Services never read
//! identity from request bodies.

mod application;
mod payment;
mod tuition;
mod user;

pub use application::ApplicationService;
pub use payment::{CheckoutSettings, FinalizeOutcome, PaymentService};
pub use tuition::TuitionService;
pub use user::UserService;

use uuid::Uuid;

use crate::db::{EntityStore, StoreError};
use crate::models::{ApplicationFilter, ApplicationStatus};

/// Whether some application of the tuition already holds the approval.
async fn tuition_assigned(store: &dyn EntityStore, tuition_id: Uuid) -> Result<bool, StoreError> {
    let approved = store
        .list_applications(&ApplicationFilter {
            tuition_id: Some(tuition_id),
            status: Some(ApplicationStatus::Approved),
            ..Default::default()
        })
        .await?;
    Ok(!approved.is_empty())
}
