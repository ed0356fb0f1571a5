//! In-memory entity store used by tests. A single lock makes every operation atomic.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::store::{ApprovalOutcome, EntityStore, SettlementOutcome, StoreError};
use crate::models::{
    Application, ApplicationFilter, ApplicationPatch, ApplicationStatus, NewApplication,
    NewPayment, NewTuition, Payment, PaymentFilter, Tuition, TuitionFilter, TuitionPatch,
    TuitionStatus, UpdateUserAdmin, User, UserLogin, UserStatus,
};

#[derive(Default)]
struct State {
    tuitions: HashMap<Uuid, Tuition>,
    applications: HashMap<Uuid, Application>,
    payments: Vec<Payment>,
    users: HashMap<String, User>,
}

enum Claim {
    Claimed(Application, u64),
    Unchanged(ApplicationStatus),
    TuitionAssigned,
}

impl State {
    fn claim_approval(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<Claim, StoreError> {
        let current = self.applications.get(&id).ok_or(StoreError::NotFound)?;
        let tuition_id = current.tuition_id;

        let sibling_approved = self.applications.values().any(|a| {
            a.tuition_id == tuition_id && a.id != id && a.status == ApplicationStatus::Approved
        });
        if sibling_approved {
            return Ok(Claim::TuitionAssigned);
        }
        if current.status != ApplicationStatus::Pending {
            return Ok(Claim::Unchanged(current.status));
        }

        let mut rejected = 0;
        for application in self.applications.values_mut() {
            if application.id == id {
                application.status = ApplicationStatus::Approved;
                application.approved_at = Some(now);
                application.updated_at = now;
            } else if application.tuition_id == tuition_id
                && application.status == ApplicationStatus::Pending
            {
                application.status = ApplicationStatus::Rejected;
                application.updated_at = now;
                rejected += 1;
            }
        }

        Ok(Claim::Claimed(self.applications[&id].clone(), rejected))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory store poisoned")
    }

    /// Insert or replace a user record directly, bypassing login rules.
    pub fn put_user(&self, user: User) {
        self.state().users.insert(user.email.clone(), user);
    }

    pub fn payment_count(&self) -> usize {
        self.state().payments.len()
    }
}

fn newest_first<T, F>(mut rows: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    rows
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn insert_tuition(
        &self,
        tuition: NewTuition,
        now: DateTime<Utc>,
    ) -> Result<Tuition, StoreError> {
        let row = Tuition {
            id: Uuid::new_v4(),
            subject: tuition.subject,
            class_level: tuition.class_level,
            location: tuition.location,
            schedule: tuition.schedule,
            days_per_week: tuition.days_per_week,
            budget: tuition.budget,
            preferred_tutor_gender: tuition.preferred_tutor_gender,
            note: tuition.note,
            student_name: tuition.student_name,
            student_email: tuition.student_email,
            student_photo: tuition.student_photo,
            status: TuitionStatus::Pending,
            assigned_tutor_email: None,
            assigned_tutor_name: None,
            assigned_tutor_photo: None,
            ongoing: false,
            created_at: now,
            updated_at: now,
            approved_at: None,
            rejected_at: None,
        };
        self.state().tuitions.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_tuition(&self, id: Uuid) -> Result<Option<Tuition>, StoreError> {
        Ok(self.state().tuitions.get(&id).cloned())
    }

    async fn list_tuitions(&self, filter: &TuitionFilter) -> Result<Vec<Tuition>, StoreError> {
        let rows = self
            .state()
            .tuitions
            .values()
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .filter(|t| {
                filter
                    .student_email
                    .as_ref()
                    .map_or(true, |e| &t.student_email == e)
            })
            .cloned()
            .collect();
        Ok(newest_first(rows, |t: &Tuition| t.created_at))
    }

    async fn update_tuition(
        &self,
        id: Uuid,
        patch: &TuitionPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Tuition>, StoreError> {
        let mut state = self.state();
        let Some(tuition) = state.tuitions.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = &patch.subject {
            tuition.subject = v.clone();
        }
        if let Some(v) = &patch.class_level {
            tuition.class_level = v.clone();
        }
        if let Some(v) = &patch.location {
            tuition.location = v.clone();
        }
        if let Some(v) = &patch.schedule {
            tuition.schedule = v.clone();
        }
        if let Some(v) = patch.days_per_week {
            tuition.days_per_week = v;
        }
        if let Some(v) = patch.budget {
            tuition.budget = v;
        }
        if let Some(v) = patch.preferred_tutor_gender {
            tuition.preferred_tutor_gender = v;
        }
        if let Some(v) = &patch.note {
            tuition.note = Some(v.clone());
        }
        tuition.updated_at = now;
        Ok(Some(tuition.clone()))
    }

    async fn set_tuition_status(
        &self,
        id: Uuid,
        status: TuitionStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Tuition>, StoreError> {
        let mut state = self.state();
        let Some(tuition) = state.tuitions.get_mut(&id) else {
            return Ok(None);
        };
        tuition.status = status;
        tuition.updated_at = now;
        match status {
            TuitionStatus::Approved => tuition.approved_at = Some(now),
            TuitionStatus::Rejected => tuition.rejected_at = Some(now),
            TuitionStatus::Pending => {}
        }
        Ok(Some(tuition.clone()))
    }

    async fn delete_tuition(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.state().tuitions.remove(&id).is_some())
    }

    async fn insert_application(
        &self,
        application: NewApplication,
        now: DateTime<Utc>,
    ) -> Result<Application, StoreError> {
        let mut state = self.state();
        let duplicate = state.applications.values().any(|a| {
            a.tuition_id == application.tuition_id && a.tutor_email == application.tutor_email
        });
        if duplicate {
            return Err(StoreError::Conflict(
                "applications_tuition_tutor_key".to_string(),
            ));
        }

        let row = Application {
            id: Uuid::new_v4(),
            tuition_id: application.tuition_id,
            subject: application.subject,
            class_level: application.class_level,
            location: application.location,
            schedule: application.schedule,
            budget: application.budget,
            student_name: application.student_name,
            student_email: application.student_email,
            student_photo: application.student_photo,
            tutor_email: application.tutor_email,
            tutor_name: application.tutor_name,
            tutor_photo: application.tutor_photo,
            qualifications: application.qualifications,
            experience: application.experience,
            expected_salary: application.expected_salary,
            status: ApplicationStatus::Pending,
            created_at: now,
            updated_at: now,
            approved_at: None,
        };
        state.applications.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_application(&self, id: Uuid) -> Result<Option<Application>, StoreError> {
        Ok(self.state().applications.get(&id).cloned())
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, StoreError> {
        let rows = self
            .state()
            .applications
            .values()
            .filter(|a| filter.tuition_id.map_or(true, |id| a.tuition_id == id))
            .filter(|a| filter.tutor_email.as_ref().map_or(true, |e| &a.tutor_email == e))
            .filter(|a| {
                filter
                    .student_email
                    .as_ref()
                    .map_or(true, |e| &a.student_email == e)
            })
            .filter(|a| filter.status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        Ok(newest_first(rows, |a: &Application| a.created_at))
    }

    async fn update_pending_application(
        &self,
        id: Uuid,
        patch: &ApplicationPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Application>, StoreError> {
        let mut state = self.state();
        let Some(application) = state
            .applications
            .get_mut(&id)
            .filter(|a| a.status == ApplicationStatus::Pending)
        else {
            return Ok(None);
        };
        if let Some(v) = &patch.qualifications {
            application.qualifications = v.clone();
        }
        if let Some(v) = &patch.experience {
            application.experience = v.clone();
        }
        if let Some(v) = patch.expected_salary {
            application.expected_salary = v;
        }
        application.updated_at = now;
        Ok(Some(application.clone()))
    }

    async fn delete_pending_application(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state();
        let pending = state
            .applications
            .get(&id)
            .is_some_and(|a| a.status == ApplicationStatus::Pending);
        if pending {
            state.applications.remove(&id);
        }
        Ok(pending)
    }

    async fn reject_pending_application(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Application>, StoreError> {
        let mut state = self.state();
        let Some(application) = state
            .applications
            .get_mut(&id)
            .filter(|a| a.status == ApplicationStatus::Pending)
        else {
            return Ok(None);
        };
        application.status = ApplicationStatus::Rejected;
        application.updated_at = now;
        Ok(Some(application.clone()))
    }

    async fn approve_application(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ApprovalOutcome, StoreError> {
        let outcome = match self.state().claim_approval(id, now)? {
            Claim::Claimed(application, rejected_siblings) => ApprovalOutcome::Approved {
                application,
                rejected_siblings,
            },
            Claim::Unchanged(status) => ApprovalOutcome::Unchanged(status),
            Claim::TuitionAssigned => ApprovalOutcome::TuitionAssigned,
        };
        Ok(outcome)
    }

    async fn settle_application(
        &self,
        payment: NewPayment,
        now: DateTime<Utc>,
    ) -> Result<SettlementOutcome, StoreError> {
        let mut state = self.state();

        let pending = state
            .applications
            .get(&payment.application_id)
            .is_some_and(|a| a.status == ApplicationStatus::Pending);
        let duplicate = state.payments.iter().any(|p| {
            p.application_id == payment.application_id || p.session_id == payment.session_id
        });
        if pending && duplicate {
            return Err(StoreError::Conflict("payments_session_id_key".to_string()));
        }

        let (application, rejected_siblings) =
            match state.claim_approval(payment.application_id, now)? {
                Claim::Claimed(application, rejected) => (application, rejected),
                Claim::Unchanged(status) => return Ok(SettlementOutcome::Unchanged(status)),
                Claim::TuitionAssigned => return Ok(SettlementOutcome::TuitionAssigned),
            };

        if let Some(tuition) = state.tuitions.get_mut(&application.tuition_id) {
            tuition.assigned_tutor_email = Some(application.tutor_email.clone());
            tuition.assigned_tutor_name = Some(application.tutor_name.clone());
            tuition.assigned_tutor_photo = application.tutor_photo.clone();
            tuition.ongoing = true;
            tuition.updated_at = now;
        }

        let row = Payment {
            id: Uuid::new_v4(),
            application_id: payment.application_id,
            tuition_id: application.tuition_id,
            student_email: payment.student_email,
            tutor_email: payment.tutor_email,
            amount: payment.amount,
            currency: payment.currency,
            session_id: payment.session_id,
            payment_status: payment.payment_status,
            created_at: now,
        };
        state.payments.push(row.clone());

        Ok(SettlementOutcome::Settled {
            application,
            payment: row,
            rejected_siblings,
        })
    }

    async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, StoreError> {
        let rows = self
            .state()
            .payments
            .iter()
            .filter(|p| {
                filter
                    .student_email
                    .as_ref()
                    .map_or(true, |e| &p.student_email == e)
            })
            .filter(|p| filter.tutor_email.as_ref().map_or(true, |e| &p.tutor_email == e))
            .cloned()
            .collect();
        Ok(newest_first(rows, |p: &Payment| p.created_at))
    }

    async fn find_payment_by_application(
        &self,
        application_id: Uuid,
    ) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .state()
            .payments
            .iter()
            .find(|p| p.application_id == application_id)
            .cloned())
    }

    async fn upsert_user(&self, login: UserLogin, now: DateTime<Utc>) -> Result<User, StoreError> {
        let mut state = self.state();
        let user = state
            .users
            .entry(login.email.clone())
            .and_modify(|user| {
                user.name = login.name.clone();
                user.phone = login.phone.clone();
                user.photo_url = login.photo_url.clone();
                user.last_login_at = Some(now);
                user.updated_at = now;
            })
            .or_insert_with(|| User {
                id: Uuid::new_v4(),
                email: login.email.clone(),
                name: login.name.clone(),
                phone: login.phone.clone(),
                photo_url: login.photo_url.clone(),
                role: login.role,
                status: UserStatus::Active,
                is_verified: false,
                created_at: now,
                updated_at: now,
                last_login_at: Some(now),
            });
        Ok(user.clone())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.state().users.get(email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = self.state().users.values().cloned().collect();
        Ok(newest_first(rows, |u: &User| u.created_at))
    }

    async fn update_user_admin(
        &self,
        email: &str,
        update: &UpdateUserAdmin,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let mut state = self.state();
        let Some(user) = state.users.get_mut(email) else {
            return Ok(None);
        };
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(status) = update.status {
            user.status = status;
        }
        if let Some(verified) = update.is_verified {
            user.is_verified = verified;
        }
        user.updated_at = now;
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.state().users.remove(email).is_some())
    }
}
