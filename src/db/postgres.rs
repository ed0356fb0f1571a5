//! PostgreSQL implementation of the entity store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::store::{ApprovalOutcome, EntityStore, SettlementOutcome, StoreError};
use crate::models::{
    Application, ApplicationFilter, ApplicationPatch, ApplicationStatus, NewApplication,
    NewPayment, NewTuition, Payment, PaymentFilter, Tuition, TuitionFilter, TuitionPatch,
    TuitionStatus, UpdateUserAdmin, User, UserLogin,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Outcome of the approval claim shared by admin approval and settlement.
enum Claim {
    Claimed {
        application: Application,
        rejected_siblings: u64,
    },
    Unchanged(ApplicationStatus),
    TuitionAssigned,
}

/// Lock the tuition, then move the application pending -> approved and reject
/// its pending siblings. Must run inside a transaction.
async fn claim_approval(
    conn: &mut PgConnection,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<Claim, StoreError> {
    let tuition_id: Uuid = sqlx::query_scalar("SELECT tuition_id FROM applications WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(StoreError::NotFound)?;

    // Serializes concurrent approvals for the same tuition
    sqlx::query("SELECT id FROM tuitions WHERE id = $1 FOR UPDATE")
        .bind(tuition_id)
        .execute(&mut *conn)
        .await?;

    let sibling_approved: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM applications
            WHERE tuition_id = $1 AND id <> $2 AND status = 'approved'
        )
        "#,
    )
    .bind(tuition_id)
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    if sibling_approved {
        return Ok(Claim::TuitionAssigned);
    }

    let approved = sqlx::query_as::<_, Application>(
        r#"
        UPDATE applications
        SET status = 'approved', approved_at = $2, updated_at = $2
        WHERE id = $1 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    let application = match approved {
        Some(application) => application,
        None => {
            let current: ApplicationStatus =
                sqlx::query_scalar("SELECT status FROM applications WHERE id = $1")
                    .bind(id)
                    .fetch_one(&mut *conn)
                    .await?;
            return Ok(Claim::Unchanged(current));
        }
    };

    let rejected = sqlx::query(
        r#"
        UPDATE applications
        SET status = 'rejected', updated_at = $3
        WHERE tuition_id = $1 AND id <> $2 AND status = 'pending'
        "#,
    )
    .bind(tuition_id)
    .bind(id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(Claim::Claimed {
        application,
        rejected_siblings: rejected.rows_affected(),
    })
}

#[async_trait]
impl EntityStore for PgStore {
    // =========================================================================
    // Tuitions
    // =========================================================================

    async fn insert_tuition(
        &self,
        tuition: NewTuition,
        now: DateTime<Utc>,
    ) -> Result<Tuition, StoreError> {
        let row = sqlx::query_as::<_, Tuition>(
            r#"
            INSERT INTO tuitions (
                id, subject, class_level, location, schedule, days_per_week, budget,
                preferred_tutor_gender, note, student_name, student_email, student_photo,
                status, ongoing, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'pending', false, $13, $13)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&tuition.subject)
        .bind(&tuition.class_level)
        .bind(&tuition.location)
        .bind(&tuition.schedule)
        .bind(tuition.days_per_week)
        .bind(tuition.budget)
        .bind(tuition.preferred_tutor_gender)
        .bind(&tuition.note)
        .bind(&tuition.student_name)
        .bind(&tuition.student_email)
        .bind(&tuition.student_photo)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_tuition(&self, id: Uuid) -> Result<Option<Tuition>, StoreError> {
        let row = sqlx::query_as::<_, Tuition>("SELECT * FROM tuitions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_tuitions(&self, filter: &TuitionFilter) -> Result<Vec<Tuition>, StoreError> {
        let rows = sqlx::query_as::<_, Tuition>(
            r#"
            SELECT * FROM tuitions
            WHERE ($1::tuition_status IS NULL OR status = $1)
              AND ($2::text IS NULL OR student_email = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.status)
        .bind(&filter.student_email)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_tuition(
        &self,
        id: Uuid,
        patch: &TuitionPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Tuition>, StoreError> {
        let row = sqlx::query_as::<_, Tuition>(
            r#"
            UPDATE tuitions
            SET subject = COALESCE($2, subject),
                class_level = COALESCE($3, class_level),
                location = COALESCE($4, location),
                schedule = COALESCE($5, schedule),
                days_per_week = COALESCE($6, days_per_week),
                budget = COALESCE($7, budget),
                preferred_tutor_gender = COALESCE($8, preferred_tutor_gender),
                note = COALESCE($9, note),
                updated_at = $10
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.subject)
        .bind(&patch.class_level)
        .bind(&patch.location)
        .bind(&patch.schedule)
        .bind(patch.days_per_week)
        .bind(patch.budget)
        .bind(patch.preferred_tutor_gender)
        .bind(&patch.note)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set_tuition_status(
        &self,
        id: Uuid,
        status: TuitionStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Tuition>, StoreError> {
        let row = sqlx::query_as::<_, Tuition>(
            r#"
            UPDATE tuitions
            SET status = $2,
                updated_at = $3,
                approved_at = CASE WHEN $2 = 'approved'::tuition_status THEN $3 ELSE approved_at END,
                rejected_at = CASE WHEN $2 = 'rejected'::tuition_status THEN $3 ELSE rejected_at END
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_tuition(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tuitions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Applications
    // =========================================================================

    async fn insert_application(
        &self,
        application: NewApplication,
        now: DateTime<Utc>,
    ) -> Result<Application, StoreError> {
        let row = sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications (
                id, tuition_id, subject, class_level, location, schedule, budget,
                student_name, student_email, student_photo,
                tutor_email, tutor_name, tutor_photo,
                qualifications, experience, expected_salary,
                status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    'pending', $17, $17)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(application.tuition_id)
        .bind(&application.subject)
        .bind(&application.class_level)
        .bind(&application.location)
        .bind(&application.schedule)
        .bind(application.budget)
        .bind(&application.student_name)
        .bind(&application.student_email)
        .bind(&application.student_photo)
        .bind(&application.tutor_email)
        .bind(&application.tutor_name)
        .bind(&application.tutor_photo)
        .bind(&application.qualifications)
        .bind(&application.experience)
        .bind(application.expected_salary)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_application(&self, id: Uuid) -> Result<Option<Application>, StoreError> {
        let row = sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, StoreError> {
        let rows = sqlx::query_as::<_, Application>(
            r#"
            SELECT * FROM applications
            WHERE ($1::uuid IS NULL OR tuition_id = $1)
              AND ($2::text IS NULL OR tutor_email = $2)
              AND ($3::text IS NULL OR student_email = $3)
              AND ($4::application_status IS NULL OR status = $4)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.tuition_id)
        .bind(&filter.tutor_email)
        .bind(&filter.student_email)
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_pending_application(
        &self,
        id: Uuid,
        patch: &ApplicationPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Application>, StoreError> {
        let row = sqlx::query_as::<_, Application>(
            r#"
            UPDATE applications
            SET qualifications = COALESCE($2, qualifications),
                experience = COALESCE($3, experience),
                expected_salary = COALESCE($4, expected_salary),
                updated_at = $5
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.qualifications)
        .bind(&patch.experience)
        .bind(patch.expected_salary)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_pending_application(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1 AND status = 'pending'")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reject_pending_application(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Application>, StoreError> {
        let row = sqlx::query_as::<_, Application>(
            r#"
            UPDATE applications
            SET status = 'rejected', updated_at = $2
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn approve_application(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ApprovalOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let outcome = match claim_approval(&mut *tx, id, now).await? {
            Claim::Claimed {
                application,
                rejected_siblings,
            } => ApprovalOutcome::Approved {
                application,
                rejected_siblings,
            },
            Claim::Unchanged(status) => return Ok(ApprovalOutcome::Unchanged(status)),
            Claim::TuitionAssigned => return Ok(ApprovalOutcome::TuitionAssigned),
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn settle_application(
        &self,
        payment: NewPayment,
        now: DateTime<Utc>,
    ) -> Result<SettlementOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let (application, rejected_siblings) =
            match claim_approval(&mut *tx, payment.application_id, now).await? {
                Claim::Claimed {
                    application,
                    rejected_siblings,
                } => (application, rejected_siblings),
                Claim::Unchanged(status) => return Ok(SettlementOutcome::Unchanged(status)),
                Claim::TuitionAssigned => return Ok(SettlementOutcome::TuitionAssigned),
            };

        sqlx::query(
            r#"
            UPDATE tuitions
            SET assigned_tutor_email = $2,
                assigned_tutor_name = $3,
                assigned_tutor_photo = $4,
                ongoing = true,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(application.tuition_id)
        .bind(&application.tutor_email)
        .bind(&application.tutor_name)
        .bind(&application.tutor_photo)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // Ledger row last: it is the record that money was received
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                id, application_id, tuition_id, student_email, tutor_email,
                amount, currency, session_id, payment_status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(payment.application_id)
        .bind(application.tuition_id)
        .bind(&payment.student_email)
        .bind(&payment.tutor_email)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(&payment.session_id)
        .bind(&payment.payment_status)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SettlementOutcome::Settled {
            application,
            payment,
            rejected_siblings,
        })
    }

    // =========================================================================
    // Payments
    // =========================================================================

    async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, StoreError> {
        let rows = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE ($1::text IS NULL OR student_email = $1)
              AND ($2::text IS NULL OR tutor_email = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(&filter.student_email)
        .bind(&filter.tutor_email)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_payment_by_application(
        &self,
        application_id: Uuid,
    ) -> Result<Option<Payment>, StoreError> {
        let row = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE application_id = $1")
            .bind(application_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    // =========================================================================
    // Users
    // =========================================================================

    async fn upsert_user(&self, login: UserLogin, now: DateTime<Utc>) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                id, email, name, phone, photo_url, role, status, is_verified,
                created_at, updated_at, last_login_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'active', false, $7, $7, $7)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name,
                phone = EXCLUDED.phone,
                photo_url = EXCLUDED.photo_url,
                last_login_at = EXCLUDED.last_login_at,
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&login.email)
        .bind(&login.name)
        .bind(&login.phone)
        .bind(&login.photo_url)
        .bind(login.role)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update_user_admin(
        &self,
        email: &str,
        update: &UpdateUserAdmin,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET role = COALESCE($2, role),
                status = COALESCE($3, status),
                is_verified = COALESCE($4, is_verified),
                updated_at = $5
            WHERE email = $1
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(update.role)
        .bind(update.status)
        .bind(update.is_verified)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_user(&self, email: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
