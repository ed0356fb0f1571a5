//! User directory: login upsert and admin account management

use std::sync::Arc;

use chrono::Utc;

use crate::db::EntityStore;
use crate::error::AppError;
use crate::identity::VerifiedIdentity;
use crate::models::{UpdateUserAdmin, UpsertUser, User, UserRole, UserStatus};
use crate::validation::{validate_admin_user_update, validate_user_login};

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn EntityStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Create or refresh the caller's record. The requested role only counts
    /// on first login; afterwards it is an admin-managed field.
    pub async fn login(
        &self,
        identity: &VerifiedIdentity,
        mut input: UpsertUser,
    ) -> Result<User, AppError> {
        if self
            .store
            .find_user_by_email(&identity.email)
            .await?
            .is_some()
        {
            input.role = None;
        }

        let login = validate_user_login(&input, &identity.email)?;
        let user = self.store.upsert_user(login, Utc::now()).await?;

        tracing::info!("User {} signed in as {:?}", user.email, user.role);
        Ok(user)
    }

    pub async fn current(&self, identity: &VerifiedIdentity) -> Result<User, AppError> {
        self.store
            .find_user_by_email(&identity.email)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    pub async fn list(&self) -> Result<Vec<User>, AppError> {
        Ok(self.store.list_users().await?)
    }

    pub async fn update_admin_fields(
        &self,
        admin: &User,
        email: &str,
        update: UpdateUserAdmin,
    ) -> Result<User, AppError> {
        validate_admin_user_update(&update)?;
        let email = email.trim().to_lowercase();

        if email == admin.email {
            let demotes = update.role.is_some_and(|role| role != UserRole::Admin);
            let blocks = update.status == Some(UserStatus::Blocked);
            if demotes || blocks {
                return Err(AppError::Forbidden(
                    "administrators cannot demote or block themselves".to_string(),
                ));
            }
        }

        let user = self
            .store
            .update_user_admin(&email, &update, Utc::now())
            .await?
            .ok_or(AppError::NotFound("User"))?;

        tracing::info!(
            "Admin {} updated user {}: role={:?} status={:?} verified={}",
            admin.email,
            user.email,
            user.role,
            user.status,
            user.is_verified
        );
        Ok(user)
    }

    pub async fn delete(&self, admin: &User, email: &str) -> Result<(), AppError> {
        let email = email.trim().to_lowercase();
        if email == admin.email {
            return Err(AppError::Forbidden(
                "administrators cannot delete themselves".to_string(),
            ));
        }
        if !self.store.delete_user(&email).await? {
            return Err(AppError::NotFound("User"));
        }

        tracing::info!("Admin {} deleted user {}", admin.email, email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::services::fixtures;
    use crate::validation::ValidationError;

    fn identity(email: &str) -> VerifiedIdentity {
        VerifiedIdentity {
            subject: format!("uid-{email}"),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_creates_then_refreshes() {
        let store = Arc::new(MemoryStore::new());
        let service = UserService::new(store);
        let me = identity("tutor@example.com");

        let created = service
            .login(
                &me,
                UpsertUser {
                    name: Some("Tutor".to_string()),
                    role: Some(UserRole::Tutor),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(created.role, UserRole::Tutor);
        assert_eq!(created.status, UserStatus::Active);
        assert!(!created.is_verified);

        // Role in later logins is ignored, profile fields refresh
        let refreshed = service
            .login(
                &me,
                UpsertUser {
                    name: Some("Tutor Renamed".to_string()),
                    role: Some(UserRole::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(refreshed.role, UserRole::Tutor);
        assert_eq!(refreshed.name, "Tutor Renamed");
        assert_eq!(refreshed.id, created.id);
    }

    #[tokio::test]
    async fn test_admin_role_cannot_be_self_assigned() {
        let service = UserService::new(Arc::new(MemoryStore::new()));
        let result = service
            .login(
                &identity("new@example.com"),
                UpsertUser {
                    role: Some(UserRole::Admin),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(
            result,
            Err(AppError::Validation(ValidationError::RoleNotAllowed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_admin_updates_and_self_protection() {
        let store = Arc::new(MemoryStore::new());
        let service = UserService::new(store.clone());
        let admin = fixtures::user("admin@example.com", UserRole::Admin);
        store.put_user(admin.clone());
        store.put_user(fixtures::user("student@example.com", UserRole::Student));

        let updated = service
            .update_admin_fields(
                &admin,
                "Student@Example.com",
                UpdateUserAdmin {
                    role: Some(UserRole::Tutor),
                    is_verified: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.role, UserRole::Tutor);
        assert!(!updated.is_verified);

        assert!(matches!(
            service
                .update_admin_fields(&admin, "student@example.com", UpdateUserAdmin::default())
                .await,
            Err(AppError::Validation(ValidationError::EmptyUpdate))
        ));
        assert!(matches!(
            service
                .update_admin_fields(
                    &admin,
                    "admin@example.com",
                    UpdateUserAdmin {
                        role: Some(UserRole::Student),
                        ..Default::default()
                    },
                )
                .await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.delete(&admin, "admin@example.com").await,
            Err(AppError::Forbidden(_))
        ));

        tokio_test::assert_ok!(service.delete(&admin, "student@example.com").await);
        assert!(matches!(
            service.delete(&admin, "student@example.com").await,
            Err(AppError::NotFound("User"))
        ));
        assert_eq!(service.list().await.unwrap().len(), 1);
    }
}
