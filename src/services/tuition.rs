//! Tuition requests and their moderation

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::db::EntityStore;
use crate::error::AppError;
use crate::models::{
    CreateTuition, Tuition, TuitionFilter, TuitionStatus, UpdateTuition, User, UserRole,
};
use crate::validation::{parse_moderation_status, validate_create_tuition, validate_update_tuition};

#[derive(Clone)]
pub struct TuitionService {
    store: Arc<dyn EntityStore>,
}

impl TuitionService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Post a new tuition request. Students always post under their own
    /// identity; an admin may post on a student's behalf.
    pub async fn create(&self, actor: &User, mut input: CreateTuition) -> Result<Tuition, AppError> {
        match actor.role {
            UserRole::Tutor => {
                return Err(AppError::Forbidden(
                    "tutors cannot post tuition requests".to_string(),
                ))
            }
            UserRole::Student => {
                input.student_email = Some(actor.email.clone());
                if input.student_name.as_deref().map_or(true, |n| n.trim().is_empty()) {
                    input.student_name = Some(actor.name.clone());
                }
                if input.student_photo.is_none() && !actor.photo_url.is_empty() {
                    input.student_photo = Some(actor.photo_url.clone());
                }
            }
            UserRole::Admin => {}
        }

        let new = validate_create_tuition(&input)?;
        let tuition = self.store.insert_tuition(new, Utc::now()).await?;

        tracing::info!(
            "Tuition {} posted by {} ({})",
            tuition.id,
            tuition.student_email,
            tuition.subject
        );
        Ok(tuition)
    }

    /// Admin moderation: move a tuition to pending, approved or rejected.
    pub async fn set_moderation_status(
        &self,
        admin: &User,
        id: Uuid,
        status: &str,
    ) -> Result<Tuition, AppError> {
        let status = parse_moderation_status(status)?;
        let tuition = self
            .store
            .set_tuition_status(id, status, Utc::now())
            .await?
            .ok_or(AppError::NotFound("Tuition"))?;

        tracing::info!(
            "Admin {} set tuition {} to {}",
            admin.email,
            id,
            status.as_str()
        );
        Ok(tuition)
    }

    pub async fn edit(
        &self,
        actor: &User,
        id: Uuid,
        input: UpdateTuition,
    ) -> Result<Tuition, AppError> {
        let tuition = self.owned(actor, id).await?;
        let patch = validate_update_tuition(&input)?;

        let updated = self
            .store
            .update_tuition(tuition.id, &patch, Utc::now())
            .await?
            .ok_or(AppError::NotFound("Tuition"))?;

        tracing::info!("Tuition {} edited by {}", id, actor.email);
        Ok(updated)
    }

    pub async fn delete(&self, actor: &User, id: Uuid) -> Result<(), AppError> {
        let tuition = self.owned(actor, id).await?;
        if !self.store.delete_tuition(tuition.id).await? {
            return Err(AppError::NotFound("Tuition"));
        }

        tracing::info!("Tuition {} deleted by {}", id, actor.email);
        Ok(())
    }

    /// Approved tuitions are public; others are visible to their owner and admins.
    pub async fn get(&self, viewer: Option<&User>, id: Uuid) -> Result<Tuition, AppError> {
        let tuition = self
            .store
            .find_tuition(id)
            .await?
            .ok_or(AppError::NotFound("Tuition"))?;

        let visible = tuition.status == TuitionStatus::Approved
            || viewer.is_some_and(|user| can_manage(user, &tuition));
        if !visible {
            return Err(AppError::NotFound("Tuition"));
        }
        Ok(tuition)
    }

    pub async fn list(
        &self,
        viewer: Option<&User>,
        mut filter: TuitionFilter,
    ) -> Result<Vec<Tuition>, AppError> {
        let sees_all = match viewer {
            Some(user) if user.role == UserRole::Admin => true,
            Some(user) => filter.student_email.as_deref() == Some(user.email.as_str()),
            None => false,
        };
        if !sees_all {
            filter.status = Some(TuitionStatus::Approved);
        }

        Ok(self.store.list_tuitions(&filter).await?)
    }

    async fn owned(&self, actor: &User, id: Uuid) -> Result<Tuition, AppError> {
        let tuition = self
            .store
            .find_tuition(id)
            .await?
            .ok_or(AppError::NotFound("Tuition"))?;

        if !can_manage(actor, &tuition) {
            return Err(AppError::Forbidden(
                "only the posting student or an admin may change this tuition".to_string(),
            ));
        }
        Ok(tuition)
    }
}

fn can_manage(user: &User, tuition: &Tuition) -> bool {
    user.role == UserRole::Admin || user.email == tuition.student_email
}
