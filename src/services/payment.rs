//! Checkout creation and settlement of paid applications
//!
//! Settlement has two entry points: the provider's signed webhook and a
//! client-driven confirm call that re-reads the session from the provider.
//! Both funnel into [`PaymentService::finalize`], which is idempotent per
//! application so redelivered events and a confirm after the webhook are safe.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{EntityStore, SettlementOutcome, StoreError};
use crate::error::AppError;
use crate::models::{
    Application, ApplicationStatus, CheckoutResponse, NewPayment, Payment, PaymentFilter, User,
    UserRole,
};
use crate::payments::{
    is_checkout_session_id, CheckoutParams, PaymentProvider, SessionDetails, CHECKOUT_COMPLETED,
    META_APPLICATION_ID, META_STUDENT_EMAIL, META_TUITION_ID, META_TUTOR_EMAIL,
};
use crate::validation::{amount_in_minor_units, ValidationError};

use super::tuition_assigned;

/// Where the provider sends the student after checkout, and in which currency.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutSettings {
    pub fn new(client_url: &str, currency: &str) -> Self {
        let client_url = client_url.trim_end_matches('/');
        Self {
            currency: currency.to_lowercase(),
            success_url: format!("{client_url}/payment-success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{client_url}/payment-cancelled"),
        }
    }
}

/// Result of a finalization attempt that did not fail.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum FinalizeOutcome {
    #[serde(rename_all = "camelCase")]
    Settled {
        application: Application,
        payment: Payment,
    },
    #[serde(rename_all = "camelCase")]
    AlreadyApproved { application_id: Uuid },
    /// The event does not concern a known application.
    Ignored { reason: &'static str },
}

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn EntityStore>,
    provider: Arc<dyn PaymentProvider>,
    settings: CheckoutSettings,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        provider: Arc<dyn PaymentProvider>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            store,
            provider,
            settings,
        }
    }

    /// Open a provider checkout for a pending application. Nothing is written
    /// locally until the payment is confirmed.
    pub async fn create_checkout_session(
        &self,
        student: &User,
        application_id: Uuid,
    ) -> Result<CheckoutResponse, AppError> {
        let application = self
            .store
            .find_application(application_id)
            .await?
            .ok_or(AppError::NotFound("Application"))?;

        if application.student_email != student.email {
            return Err(AppError::Forbidden(
                "only the tuition's student may pay for this application".to_string(),
            ));
        }
        if application.status != ApplicationStatus::Pending {
            return Err(AppError::NotPayable(application.status.as_str()));
        }
        // A sibling approved by an admin leaves this one pending until swept
        if tuition_assigned(self.store.as_ref(), application.tuition_id).await? {
            return Err(AppError::NotPayable("superseded"));
        }

        let amount = amount_in_minor_units(application.expected_salary)?;
        let metadata = HashMap::from([
            (META_APPLICATION_ID.to_string(), application.id.to_string()),
            (META_TUITION_ID.to_string(), application.tuition_id.to_string()),
            (META_STUDENT_EMAIL.to_string(), application.student_email.clone()),
            (META_TUTOR_EMAIL.to_string(), application.tutor_email.clone()),
        ]);

        let session = self
            .provider
            .create_checkout_session(CheckoutParams {
                amount,
                currency: self.settings.currency.clone(),
                product_name: format!(
                    "Tuition: {} ({}) with {}",
                    application.subject, application.class_level, application.tutor_name
                ),
                customer_email: student.email.clone(),
                metadata,
                success_url: self.settings.success_url.clone(),
                cancel_url: self.settings.cancel_url.clone(),
            })
            .await?;

        tracing::info!(
            "Checkout session {} created for application {} ({} {})",
            session.id,
            application.id,
            amount,
            self.settings.currency
        );

        Ok(CheckoutResponse {
            url: session.url,
            session_id: session.id,
            amount,
            currency: self.settings.currency.clone(),
        })
    }

    /// Client-driven confirmation. The session is re-read from the provider;
    /// nothing in the request is trusted beyond the session id.
    pub async fn confirm_payment(
        &self,
        student: &User,
        session_id: &str,
    ) -> Result<FinalizeOutcome, AppError> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(ValidationError::Required {
                field: "sessionId".to_string(),
            }
            .into());
        }
        if !is_checkout_session_id(session_id) {
            return Err(ValidationError::InvalidId {
                field: "sessionId".to_string(),
            }
            .into());
        }

        let session = self.provider.retrieve_session(session_id).await?;
        if !session.is_paid() {
            return Err(AppError::PaymentIncomplete(session.payment_status));
        }

        let payer = session
            .metadata_value(META_STUDENT_EMAIL)
            .map(str::to_lowercase);
        if payer.as_deref() != Some(student.email.as_str()) {
            return Err(AppError::Forbidden(
                "checkout session belongs to another student".to_string(),
            ));
        }

        self.finalize(&session).await
    }

    /// Handle a provider webhook delivery. Unrelated or unpaid events are
    /// acknowledged and ignored.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<FinalizeOutcome, AppError> {
        let event = self.provider.verify_webhook(payload, signature)?;

        if event.event_type != CHECKOUT_COMPLETED {
            tracing::debug!("Ignoring webhook event {} ({})", event.id, event.event_type);
            return Ok(FinalizeOutcome::Ignored {
                reason: "unhandled event type",
            });
        }
        let Some(session) = event.session else {
            tracing::warn!("Webhook event {} carries no checkout session", event.id);
            return Ok(FinalizeOutcome::Ignored {
                reason: "no checkout session",
            });
        };
        if !session.is_paid() {
            tracing::warn!(
                "Webhook event {}: session {} completed but not paid ({})",
                event.id,
                session.id,
                session.payment_status
            );
            return Ok(FinalizeOutcome::Ignored {
                reason: "session not paid",
            });
        }

        self.finalize(&session).await
    }

    /// Settle the application named in a verified, paid session: approve it,
    /// reject its pending siblings, assign the tuition and append the ledger row.
    pub async fn finalize(&self, session: &SessionDetails) -> Result<FinalizeOutcome, AppError> {
        let Some(application_id) = session
            .metadata_value(META_APPLICATION_ID)
            .and_then(|id| Uuid::parse_str(id).ok())
        else {
            tracing::warn!("Session {} has no usable applicationId", session.id);
            return Ok(FinalizeOutcome::Ignored {
                reason: "missing or malformed applicationId",
            });
        };

        let Some(application) = self.store.find_application(application_id).await? else {
            tracing::warn!(
                "Session {} references unknown application {}",
                session.id,
                application_id
            );
            return Ok(FinalizeOutcome::Ignored {
                reason: "application not found",
            });
        };

        match application.status {
            ApplicationStatus::Approved => {
                if self
                    .store
                    .find_payment_by_application(application_id)
                    .await?
                    .is_none()
                {
                    tracing::warn!(
                        "Session {} paid for application {} approved without a ledger row",
                        session.id,
                        application_id
                    );
                }
                return Ok(FinalizeOutcome::AlreadyApproved { application_id });
            }
            ApplicationStatus::Rejected => {
                return Err(settlement_failure(
                    session,
                    application_id,
                    "application was rejected before payment settled",
                ))
            }
            ApplicationStatus::Pending => {}
        }

        let amount = match session.amount_total {
            Some(amount) => amount,
            None => amount_in_minor_units(application.expected_salary)?,
        };
        let payment = NewPayment {
            application_id,
            tuition_id: application.tuition_id,
            student_email: application.student_email.clone(),
            tutor_email: application.tutor_email.clone(),
            amount,
            currency: session
                .currency
                .clone()
                .unwrap_or_else(|| self.settings.currency.clone()),
            session_id: session.id.clone(),
            payment_status: session.payment_status.clone(),
        };

        match self.store.settle_application(payment, Utc::now()).await {
            Ok(SettlementOutcome::Settled {
                application,
                payment,
                rejected_siblings,
            }) => {
                tracing::info!(
                    "Application {} settled by session {}: tutor {} assigned to tuition {}; {} sibling(s) rejected",
                    application.id,
                    payment.session_id,
                    application.tutor_email,
                    application.tuition_id,
                    rejected_siblings
                );
                Ok(FinalizeOutcome::Settled {
                    application,
                    payment,
                })
            }
            Ok(SettlementOutcome::Unchanged(ApplicationStatus::Approved)) => {
                Ok(FinalizeOutcome::AlreadyApproved { application_id })
            }
            Ok(SettlementOutcome::Unchanged(status)) => Err(settlement_failure(
                session,
                application_id,
                &format!("application became {} during settlement", status.as_str()),
            )),
            Ok(SettlementOutcome::TuitionAssigned) => Err(settlement_failure(
                session,
                application_id,
                "tuition already assigned to another application",
            )),
            Err(StoreError::Conflict(constraint)) => Err(settlement_failure(
                session,
                application_id,
                &format!("ledger already holds this payment ({constraint})"),
            )),
            Err(e) => {
                tracing::error!(
                    "Settlement of application {} (session {}) failed in store: {}",
                    application_id,
                    session.id,
                    e
                );
                Err(e.into())
            }
        }
    }

    /// Ledger rows visible to the caller: admins see all, others their own.
    pub async fn list_payments(
        &self,
        viewer: &User,
        mut filter: PaymentFilter,
    ) -> Result<Vec<Payment>, AppError> {
        match viewer.role {
            UserRole::Admin => {}
            UserRole::Student => filter.student_email = Some(viewer.email.clone()),
            UserRole::Tutor => filter.tutor_email = Some(viewer.email.clone()),
        }
        Ok(self.store.list_payments(&filter).await?)
    }
}

fn settlement_failure(session: &SessionDetails, application_id: Uuid, reason: &str) -> AppError {
    tracing::error!(
        "Payment received but not settled: application {}, session {}: {}",
        application_id,
        session.id,
        reason
    );
    AppError::Settlement(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::models::{CreateApplication, Tuition, TuitionStatus};
    use crate::payments::testing::{FakeProvider, VALID_SIGNATURE};
    use crate::payments::PAID;
    use crate::services::{fixtures, ApplicationService};

    struct Harness {
        store: Arc<MemoryStore>,
        provider: Arc<FakeProvider>,
        payments: PaymentService,
        applications: ApplicationService,
        student: User,
        admin: User,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(FakeProvider::new());
        Harness {
            payments: PaymentService::new(
                store.clone(),
                provider.clone(),
                CheckoutSettings::new("http://localhost:5173/", "BDT"),
            ),
            applications: ApplicationService::new(store.clone()),
            store,
            provider,
            student: fixtures::user("student@example.com", UserRole::Student),
            admin: fixtures::user("admin@example.com", UserRole::Admin),
        }
    }

    impl Harness {
        async fn tuition(&self) -> Tuition {
            fixtures::tuition(self.store.as_ref(), &self.student.email, TuitionStatus::Approved)
                .await
        }

        async fn apply(&self, tuition: &Tuition, tutor_email: &str, salary: f64) -> Application {
            let tutor = fixtures::user(tutor_email, UserRole::Tutor);
            self.applications
                .submit(
                    &tutor,
                    CreateApplication {
                        tuition_id: Some(tuition.id.to_string()),
                        qualifications: Some("BSc".to_string()),
                        experience: Some("2 years".to_string()),
                        expected_salary: Some(serde_json::json!(salary)),
                        ..Default::default()
                    },
                )
                .await
                .unwrap()
        }

        fn webhook_body(&self, session_id: &str) -> Vec<u8> {
            let session = self.provider.session(session_id).unwrap();
            serde_json::json!({
                "id": "evt_1",
                "type": CHECKOUT_COMPLETED,
                "data": { "object": {
                    "id": session.id,
                    "payment_status": session.payment_status,
                    "amount_total": session.amount_total,
                    "currency": session.currency,
                    "metadata": session.metadata,
                }}
            })
            .to_string()
            .into_bytes()
        }
    }

    #[tokio::test]
    async fn test_checkout_then_confirm_settles_application() {
        let h = harness();
        let tuition = h.tuition().await;
        let application = h.apply(&tuition, "a@example.com", 4000.0).await;

        let checkout = h
            .payments
            .create_checkout_session(&h.student, application.id)
            .await
            .unwrap();
        assert_eq!(checkout.amount, 400000);
        assert_eq!(checkout.currency, "bdt");

        let created = h.provider.created();
        let params = &created[0];
        assert_eq!(params.amount, 400000);
        assert_eq!(
            params.metadata.get(META_APPLICATION_ID),
            Some(&application.id.to_string())
        );
        assert_eq!(
            params.success_url,
            "http://localhost:5173/payment-success?session_id={CHECKOUT_SESSION_ID}"
        );
        // Nothing persisted before payment
        assert_eq!(h.store.payment_count(), 0);

        h.provider.mark_paid(&checkout.session_id);
        let outcome = h
            .payments
            .confirm_payment(&h.student, &checkout.session_id)
            .await
            .unwrap();
        let FinalizeOutcome::Settled {
            application: settled,
            payment,
        } = outcome
        else {
            panic!("expected settlement, got {outcome:?}");
        };
        assert_eq!(settled.status, ApplicationStatus::Approved);
        assert_eq!(payment.amount, 400000);
        assert_eq!(payment.currency, "bdt");
        assert_eq!(payment.session_id, checkout.session_id);

        let tuition = h.store.find_tuition(tuition.id).await.unwrap().unwrap();
        assert!(tuition.ongoing);
        assert_eq!(tuition.assigned_tutor_email.as_deref(), Some("a@example.com"));
        assert_eq!(h.store.payment_count(), 1);
    }

    #[tokio::test]
    async fn test_confirm_unpaid_session_writes_nothing() {
        let h = harness();
        let tuition = h.tuition().await;
        let application = h.apply(&tuition, "a@example.com", 4000.0).await;
        let checkout = h
            .payments
            .create_checkout_session(&h.student, application.id)
            .await
            .unwrap();

        let result = h
            .payments
            .confirm_payment(&h.student, &checkout.session_id)
            .await;
        assert!(matches!(result, Err(AppError::PaymentIncomplete(status)) if status == "unpaid"));

        let application = h.store.find_application(application.id).await.unwrap().unwrap();
        assert_eq!(application.status, ApplicationStatus::Pending);
        let tuition = h.store.find_tuition(tuition.id).await.unwrap().unwrap();
        assert!(!tuition.ongoing);
        assert_eq!(h.store.payment_count(), 0);
    }

    #[tokio::test]
    async fn test_settlement_rejects_siblings_and_closes_tuition() {
        let h = harness();
        let tuition = h.tuition().await;
        let a = h.apply(&tuition, "a@example.com", 4000.0).await;
        let b = h.apply(&tuition, "b@example.com", 3000.0).await;

        let checkout = h
            .payments
            .create_checkout_session(&h.student, a.id)
            .await
            .unwrap();
        h.provider.mark_paid(&checkout.session_id);
        h.payments
            .confirm_payment(&h.student, &checkout.session_id)
            .await
            .unwrap();

        let siblings = h
            .store
            .list_applications(&crate::models::ApplicationFilter {
                tuition_id: Some(tuition.id),
                status: Some(ApplicationStatus::Pending),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(siblings.is_empty());
        let b = h.store.find_application(b.id).await.unwrap().unwrap();
        assert_eq!(b.status, ApplicationStatus::Rejected);

        // b can no longer be paid for
        assert!(matches!(
            h.payments.create_checkout_session(&h.student, b.id).await,
            Err(AppError::NotPayable("rejected"))
        ));
    }

    #[tokio::test]
    async fn test_checkout_refused_once_sibling_approved() {
        let h = harness();
        let tuition = h.tuition().await;
        let a = h.apply(&tuition, "a@example.com", 4000.0).await;
        h.applications.approve(&h.admin, a.id).await.unwrap();

        // Slipped in after the approval swept the pending siblings
        let late = h
            .store
            .insert_application(
                fixtures::application_row(&tuition, "late@example.com", 3000.0),
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(late.status, ApplicationStatus::Pending);

        assert!(matches!(
            h.payments.create_checkout_session(&h.student, late.id).await,
            Err(AppError::NotPayable("superseded"))
        ));
        assert!(h.provider.created().is_empty());
        assert_eq!(h.store.payment_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_sibling_settlements_record_one_payment() {
        let h = harness();
        let tuition = h.tuition().await;
        let a = h.apply(&tuition, "a@example.com", 4000.0).await;
        let b = h.apply(&tuition, "b@example.com", 3000.0).await;

        let mut sessions = Vec::new();
        for application in [&a, &b] {
            let checkout = h
                .payments
                .create_checkout_session(&h.student, application.id)
                .await
                .unwrap();
            h.provider.mark_paid(&checkout.session_id);
            sessions.push(checkout.session_id);
        }

        let confirm = |session_id: String| {
            let payments = h.payments.clone();
            let student = h.student.clone();
            tokio::spawn(async move { payments.confirm_payment(&student, &session_id).await })
        };
        let (first, second) = tokio::join!(
            confirm(sessions[0].clone()),
            confirm(sessions[1].clone())
        );
        let results = [first.unwrap(), second.unwrap()];

        let winners: Vec<_> = results
            .iter()
            .filter_map(|r| match r {
                Ok(FinalizeOutcome::Settled { application, .. }) => Some(application.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(winners.len(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::Settlement(_)))));
        assert_eq!(h.store.payment_count(), 1);

        let tuition = h.store.find_tuition(tuition.id).await.unwrap().unwrap();
        assert!(tuition.ongoing);
        assert_eq!(
            tuition.assigned_tutor_email.as_deref(),
            Some(winners[0].tutor_email.as_str())
        );
        let loser = if winners[0].id == a.id { b.id } else { a.id };
        let loser = h.store.find_application(loser).await.unwrap().unwrap();
        assert_eq!(loser.status, ApplicationStatus::Rejected);
    }

    #[tokio::test]
    async fn test_finalize_is_idempotent() {
        let h = harness();
        let tuition = h.tuition().await;
        let application = h.apply(&tuition, "a@example.com", 4000.0).await;
        let checkout = h
            .payments
            .create_checkout_session(&h.student, application.id)
            .await
            .unwrap();
        h.provider.mark_paid(&checkout.session_id);

        let body = h.webhook_body(&checkout.session_id);
        let first = h
            .payments
            .handle_webhook(&body, VALID_SIGNATURE)
            .await
            .unwrap();
        assert!(matches!(first, FinalizeOutcome::Settled { .. }));

        // Redelivery, then the client's confirm
        let second = h
            .payments
            .handle_webhook(&body, VALID_SIGNATURE)
            .await
            .unwrap();
        assert!(matches!(second, FinalizeOutcome::AlreadyApproved { .. }));
        let third = h
            .payments
            .confirm_payment(&h.student, &checkout.session_id)
            .await
            .unwrap();
        assert!(matches!(third, FinalizeOutcome::AlreadyApproved { .. }));

        assert_eq!(h.store.payment_count(), 1);
    }

    #[tokio::test]
    async fn test_webhook_signature_is_required() {
        let h = harness();
        let result = h.payments.handle_webhook(b"{}", "t=1,v1=forged").await;
        assert!(matches!(result, Err(AppError::Auth(_))));
    }

    #[tokio::test]
    async fn test_irrelevant_sessions_are_ignored() {
        let h = harness();
        let session = |metadata: HashMap<String, String>| SessionDetails {
            id: "cs_external".to_string(),
            payment_status: PAID.to_string(),
            amount_total: Some(1000),
            currency: Some("bdt".to_string()),
            metadata,
        };

        let outcome = h.payments.finalize(&session(HashMap::new())).await.unwrap();
        assert!(matches!(outcome, FinalizeOutcome::Ignored { .. }));

        let malformed = HashMap::from([(META_APPLICATION_ID.to_string(), "not-a-uuid".to_string())]);
        let outcome = h.payments.finalize(&session(malformed)).await.unwrap();
        assert!(matches!(outcome, FinalizeOutcome::Ignored { .. }));

        let unknown = HashMap::from([(META_APPLICATION_ID.to_string(), Uuid::new_v4().to_string())]);
        let outcome = h.payments.finalize(&session(unknown)).await.unwrap();
        assert!(matches!(outcome, FinalizeOutcome::Ignored { .. }));

        let body = serde_json::json!({
            "id": "evt_2",
            "type": "customer.created",
            "data": { "object": { "id": "cus_1" } }
        })
        .to_string();
        let outcome = h
            .payments
            .handle_webhook(body.as_bytes(), VALID_SIGNATURE)
            .await
            .unwrap();
        assert!(matches!(outcome, FinalizeOutcome::Ignored { .. }));
        assert_eq!(h.store.payment_count(), 0);
    }

    #[tokio::test]
    async fn test_checkout_guards() {
        let h = harness();
        let tuition = h.tuition().await;
        let application = h.apply(&tuition, "a@example.com", 4000.0).await;
        let intruder = fixtures::user("intruder@example.com", UserRole::Student);

        assert!(matches!(
            h.payments
                .create_checkout_session(&intruder, application.id)
                .await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            h.payments
                .create_checkout_session(&h.student, Uuid::new_v4())
                .await,
            Err(AppError::NotFound("Application"))
        ));
        assert!(h.provider.created().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_requires_paying_student() {
        let h = harness();
        let tuition = h.tuition().await;
        let application = h.apply(&tuition, "a@example.com", 4000.0).await;
        let checkout = h
            .payments
            .create_checkout_session(&h.student, application.id)
            .await
            .unwrap();
        h.provider.mark_paid(&checkout.session_id);

        let intruder = fixtures::user("intruder@example.com", UserRole::Student);
        assert!(matches!(
            h.payments
                .confirm_payment(&intruder, &checkout.session_id)
                .await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            h.payments
                .confirm_payment(&h.student, "cs_test_1/../../charges")
                .await,
            Err(AppError::Validation(ValidationError::InvalidId { .. }))
        ));
        assert_eq!(h.store.payment_count(), 0);
    }

    #[tokio::test]
    async fn test_payment_for_rejected_application_is_a_settlement_error() {
        let h = harness();
        let tuition = h.tuition().await;
        let application = h.apply(&tuition, "a@example.com", 4000.0).await;
        let checkout = h
            .payments
            .create_checkout_session(&h.student, application.id)
            .await
            .unwrap();
        h.applications
            .reject(&h.admin, application.id)
            .await
            .unwrap();
        h.provider.mark_paid(&checkout.session_id);

        let result = h
            .payments
            .confirm_payment(&h.student, &checkout.session_id)
            .await;
        assert!(matches!(result, Err(AppError::Settlement(_))));
        assert_eq!(h.store.payment_count(), 0);
    }

    #[tokio::test]
    async fn test_payments_listing_is_scoped() {
        let h = harness();
        let tuition = h.tuition().await;
        let application = h.apply(&tuition, "a@example.com", 4000.0).await;
        let checkout = h
            .payments
            .create_checkout_session(&h.student, application.id)
            .await
            .unwrap();
        h.provider.mark_paid(&checkout.session_id);
        h.payments
            .confirm_payment(&h.student, &checkout.session_id)
            .await
            .unwrap();

        let tutor = fixtures::user("a@example.com", UserRole::Tutor);
        let other = fixtures::user("other@example.com", UserRole::Tutor);
        assert_eq!(
            h.payments
                .list_payments(&tutor, PaymentFilter::default())
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(h
            .payments
            .list_payments(&other, PaymentFilter::default())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            h.payments
                .list_payments(&h.admin, PaymentFilter::default())
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
