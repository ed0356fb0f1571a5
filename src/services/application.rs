//! Tutor applications: submission, edits while pending, admin decisions

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::db::{ApprovalOutcome, EntityStore, StoreError};
use crate::error::AppError;
use crate::models::{
    Application, ApplicationFilter, ApplicationStatus, CreateApplication, NewApplication,
    UpdateApplication, User, UserRole,
};
use crate::validation::{validate_create_application, validate_update_application};

use super::tuition_assigned;

const DUPLICATE_APPLICATION: &str = "you have already applied to this tuition";

#[derive(Clone)]
pub struct ApplicationService {
    store: Arc<dyn EntityStore>,
}

impl ApplicationService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Apply to an open tuition. The stored application carries a snapshot of
    /// the tuition as it was at submission time.
    pub async fn submit(
        &self,
        tutor: &User,
        input: CreateApplication,
    ) -> Result<Application, AppError> {
        let submission = validate_create_application(&input, &tutor.email, &tutor.name)?;

        let tuition = self
            .store
            .find_tuition(submission.tuition_id)
            .await?
            .ok_or(AppError::NotFound("Tuition"))?;

        // An admin approval assigns the tutor before the tuition turns ongoing
        if !tuition.is_open_for_applications()
            || tuition_assigned(self.store.as_ref(), tuition.id).await?
        {
            return Err(AppError::Forbidden(
                "tuition is not open for applications".to_string(),
            ));
        }

        let tutor_photo = submission
            .tutor_photo
            .or_else(|| Some(tutor.photo_url.clone()).filter(|p| !p.is_empty()));

        let new = NewApplication {
            tuition_id: tuition.id,
            subject: tuition.subject,
            class_level: tuition.class_level,
            location: tuition.location,
            schedule: tuition.schedule,
            budget: tuition.budget,
            student_name: tuition.student_name,
            student_email: tuition.student_email,
            student_photo: tuition.student_photo,
            tutor_email: submission.tutor_email,
            tutor_name: submission.tutor_name,
            tutor_photo,
            qualifications: submission.qualifications,
            experience: submission.experience,
            expected_salary: submission.expected_salary,
        };

        // (tuition_id, tutor_email) is unique in the store
        let application = match self.store.insert_application(new, Utc::now()).await {
            Ok(application) => application,
            Err(StoreError::Conflict(_)) => {
                return Err(AppError::Conflict(DUPLICATE_APPLICATION.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            "Tutor {} applied to tuition {} (application {})",
            application.tutor_email,
            application.tuition_id,
            application.id
        );
        Ok(application)
    }

    pub async fn edit(
        &self,
        tutor: &User,
        id: Uuid,
        input: UpdateApplication,
    ) -> Result<Application, AppError> {
        self.pending_owned_by(tutor, id).await?;
        let patch = validate_update_application(&input)?;

        let application = self
            .store
            .update_pending_application(id, &patch, Utc::now())
            .await?
            .ok_or_else(not_pending)?;

        tracing::info!("Tutor {} edited application {}", tutor.email, id);
        Ok(application)
    }

    pub async fn withdraw(&self, tutor: &User, id: Uuid) -> Result<(), AppError> {
        self.pending_owned_by(tutor, id).await?;
        if !self.store.delete_pending_application(id).await? {
            return Err(not_pending());
        }

        tracing::info!("Tutor {} withdrew application {}", tutor.email, id);
        Ok(())
    }

    pub async fn reject(&self, admin: &User, id: Uuid) -> Result<Application, AppError> {
        self.pending(id).await?;
        let application = self
            .store
            .reject_pending_application(id, Utc::now())
            .await?
            .ok_or_else(not_pending)?;

        tracing::info!("Admin {} rejected application {}", admin.email, id);
        Ok(application)
    }

    /// Approve one application and reject its pending siblings in the same unit.
    ///
    /// Losing a race against a concurrent approval of the same application is
    /// reported as success with the already-approved record.
    pub async fn approve(&self, admin: &User, id: Uuid) -> Result<Application, AppError> {
        self.pending(id).await?;

        match self.store.approve_application(id, Utc::now()).await? {
            ApprovalOutcome::Approved {
                application,
                rejected_siblings,
            } => {
                tracing::info!(
                    "Admin {} approved application {} for tuition {}; {} sibling(s) rejected",
                    admin.email,
                    id,
                    application.tuition_id,
                    rejected_siblings
                );
                Ok(application)
            }
            ApprovalOutcome::Unchanged(ApplicationStatus::Approved) => {
                tracing::info!("Application {} was already approved", id);
                self.store
                    .find_application(id)
                    .await?
                    .ok_or(AppError::NotFound("Application"))
            }
            ApprovalOutcome::Unchanged(_) => Err(not_pending()),
            ApprovalOutcome::TuitionAssigned => Err(AppError::Conflict(
                "another application for this tuition is already approved".to_string(),
            )),
        }
    }

    /// Visible to the applying tutor, the tuition's student and admins.
    pub async fn get(&self, viewer: &User, id: Uuid) -> Result<Application, AppError> {
        let application = self.find(id).await?;
        let visible = viewer.role == UserRole::Admin
            || viewer.email == application.tutor_email
            || viewer.email == application.student_email;
        if !visible {
            return Err(AppError::Forbidden(
                "not a party to this application".to_string(),
            ));
        }
        Ok(application)
    }

    pub async fn list(
        &self,
        viewer: &User,
        mut filter: ApplicationFilter,
    ) -> Result<Vec<Application>, AppError> {
        match viewer.role {
            UserRole::Admin => {}
            UserRole::Tutor => filter.tutor_email = Some(viewer.email.clone()),
            UserRole::Student => filter.student_email = Some(viewer.email.clone()),
        }
        Ok(self.store.list_applications(&filter).await?)
    }

    async fn find(&self, id: Uuid) -> Result<Application, AppError> {
        self.store
            .find_application(id)
            .await?
            .ok_or(AppError::NotFound("Application"))
    }

    async fn pending(&self, id: Uuid) -> Result<Application, AppError> {
        let application = self.find(id).await?;
        if application.status != ApplicationStatus::Pending {
            return Err(not_pending());
        }
        Ok(application)
    }

    async fn pending_owned_by(&self, tutor: &User, id: Uuid) -> Result<Application, AppError> {
        let application = self.pending(id).await?;
        if application.tutor_email != tutor.email {
            return Err(AppError::Forbidden(
                "only the applying tutor may change this application".to_string(),
            ));
        }
        Ok(application)
    }
}

fn not_pending() -> AppError {
    AppError::Forbidden("application is no longer pending".to_string())
}
