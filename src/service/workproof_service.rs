// service/workproof_service.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    db::{workproofdb::WorkProofExt, LedgerStore},
    models::{
        walletmodels::{LedgerEntry, PaymentOrder},
        workproofmodel::{
            ApprovalType, JobTerms, NewWorkProof, ProofArtifacts, WorkProof, WorkProofChange,
            WorkProofPatch, WorkProofStatus, WorkerResponse,
        },
    },
    service::{
        error::ServiceError,
        settings_service::SettingsService,
        wallet_service::WalletService,
        workproof_state::{transition, Effect, WorkProofEvent},
    },
    utils::clock::Clock,
};

pub const WORK_PROOF_PAYMENT_REFERENCE: &str = "work_proof_payment";
pub const AUTO_APPROVAL_NOTE: &str = "Automatically approved due to deadline expiration";

#[derive(Debug, Clone)]
pub struct WorkProofService {
    store: Arc<dyn LedgerStore>,
    settings: Arc<SettingsService>,
    clock: Arc<dyn Clock>,
}

impl WorkProofService {
    pub fn new(store: Arc<dyn LedgerStore>, settings: Arc<SettingsService>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            settings,
            clock,
        }
    }

    pub async fn job_terms(&self, job_id: Uuid) -> Result<JobTerms, ServiceError> {
        self.store
            .get_job_terms(job_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Job"))
    }

    pub async fn get_work_proof(&self, proof_id: Uuid) -> Result<WorkProof, ServiceError> {
        self.store
            .get_work_proof(proof_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Work proof"))
    }

    pub async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<WorkProof>, ServiceError> {
        self.store.get_work_proofs_by_job(job_id).await
    }

    /// Create a submitted proof. On instant-approval jobs the proof is
    /// auto-approved and paid in the same storage transaction; if the
    /// payment fails nothing is created.
    pub async fn submit(&self, new: NewWorkProof) -> Result<WorkProof, ServiceError> {
        if new.payment_amount <= 0 {
            return Err(ServiceError::Validation(
                "Payment amount must be greater than zero".to_string(),
            ));
        }
        if new.worker_id == new.employer_id {
            return Err(ServiceError::Validation(
                "You cannot submit work on your own job".to_string(),
            ));
        }

        let terms = self.job_terms(new.job_id).await?;
        if terms.employer_id != new.employer_id {
            return Err(ServiceError::Validation(
                "Employer does not own this job".to_string(),
            ));
        }

        let settings = self.settings.snapshot().await?;
        let approval_type = terms
            .approval_type
            .unwrap_or(settings.approval.default_approval_type);

        let now = self.clock.now();
        let mut proof = WorkProof::submitted(new, now);

        let settlement = if approval_type == ApprovalType::Instant {
            let t = transition(proof.status, WorkProofEvent::AutoApprove)
                .map_err(|e| e.into_service_error(proof.id))?;
            proof.status = t.to;
            proof.reviewed_at = Some(now);
            self.effect_entries(&proof, &t.effects)?
        } else {
            Vec::new()
        };

        let proof = self.store.insert_work_proof(&proof, &settlement).await?;

        tracing::info!(
            "Work proof {} submitted for job {} ({})",
            proof.id,
            proof.job_id,
            proof.status.to_str()
        );

        Ok(proof)
    }

    pub async fn approve(
        &self,
        proof_id: Uuid,
        review_notes: Option<String>,
    ) -> Result<WorkProof, ServiceError> {
        self.apply(
            proof_id,
            WorkProofEvent::Approve,
            WorkProofPatch::Review {
                feedback: review_notes,
            },
            self.clock.now(),
        )
        .await
    }

    pub async fn reject(
        &self,
        proof_id: Uuid,
        reason: String,
        timeout_hours: Option<i64>,
    ) -> Result<WorkProof, ServiceError> {
        let settings = self.settings.snapshot().await?;
        let hours = positive_hours(timeout_hours, settings.revision.rejection_timeout_hours)?;
        let now = self.clock.now();
        let deadline = deadline_after(now, hours)?;

        self.apply(
            proof_id,
            WorkProofEvent::Reject,
            WorkProofPatch::Rejection {
                reason,
                deadline,
            },
            now,
        )
        .await
    }

    pub async fn request_revision(
        &self,
        proof_id: Uuid,
        notes: String,
        timeout_hours: Option<i64>,
    ) -> Result<WorkProof, ServiceError> {
        let settings = self.settings.snapshot().await?;
        let hours = positive_hours(timeout_hours, settings.revision.revision_timeout_hours)?;

        let proof = self.get_work_proof(proof_id).await?;
        if proof.status == WorkProofStatus::Submitted
            && proof.revision_count >= settings.revision.max_revision_requests
        {
            return Err(ServiceError::InvalidState(format!(
                "maximum of {} revision requests reached",
                settings.revision.max_revision_requests
            )));
        }

        let now = self.clock.now();
        let deadline = deadline_after(now, hours)?;
        self.apply(
            proof_id,
            WorkProofEvent::RequestRevision,
            WorkProofPatch::Revision {
                notes,
                deadline,
            },
            now,
        )
        .await
    }

    pub async fn resubmit(
        &self,
        proof_id: Uuid,
        description: String,
        artifacts: ProofArtifacts,
    ) -> Result<WorkProof, ServiceError> {
        self.apply(
            proof_id,
            WorkProofEvent::Resubmit,
            WorkProofPatch::Resubmission {
                description,
                artifacts,
            },
            self.clock.now(),
        )
        .await
    }

    pub async fn accept_rejection(&self, proof_id: Uuid) -> Result<WorkProof, ServiceError> {
        self.apply(
            proof_id,
            WorkProofEvent::AcceptRejection,
            WorkProofPatch::WorkerResponse {
                response: WorkerResponse::Accepted,
            },
            self.clock.now(),
        )
        .await
    }

    pub async fn cancel_after_revision(&self, proof_id: Uuid) -> Result<WorkProof, ServiceError> {
        self.apply(
            proof_id,
            WorkProofEvent::CancelRevision,
            WorkProofPatch::WorkerResponse {
                response: WorkerResponse::Cancelled,
            },
            self.clock.now(),
        )
        .await
    }

    /// Drive every proof past its deadline. Overdue manual reviews are
    /// auto-approved and elapsed worker response windows are closed, each
    /// proof through `apply` like any other event; a proof that changed
    /// underneath us is skipped. Returns how many proofs moved.
    pub async fn sweep_deadlines(&self, now: DateTime<Utc>) -> Result<u64, ServiceError> {
        let settings = self.settings.snapshot().await?;
        let mut transitioned = 0;

        let overdue = self
            .store
            .find_overdue_manual_proofs(
                now,
                settings.approval.default_approval_type,
                settings.approval.manual_approval_days,
            )
            .await?;

        for proof_id in overdue {
            let result = self
                .apply(
                    proof_id,
                    WorkProofEvent::AutoApprove,
                    WorkProofPatch::Review {
                        feedback: Some(AUTO_APPROVAL_NOTE.to_string()),
                    },
                    now,
                )
                .await;

            match result {
                Ok(_) => transitioned += 1,
                Err(e) if e.is_lost_race() => {
                    tracing::debug!("Work proof {} already moved on: {}", proof_id, e)
                }
                Err(e) => tracing::warn!("Failed to auto-approve work proof {}: {}", proof_id, e),
            }
        }

        let windows = [
            (
                WorkProofStatus::Rejected,
                WorkProofEvent::RejectionWindowElapsed,
                WorkerResponse::Accepted,
            ),
            (
                WorkProofStatus::RevisionRequested,
                WorkProofEvent::RevisionWindowElapsed,
                WorkerResponse::Cancelled,
            ),
        ];

        for (status, event, response) in windows {
            let elapsed = match self.store.find_elapsed_windows(status, now).await {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::warn!("Failed to load elapsed {} windows: {}", status.to_str(), e);
                    continue;
                }
            };

            for proof_id in elapsed {
                let result = self
                    .apply(proof_id, event, WorkProofPatch::WorkerResponse { response }, now)
                    .await;

                match result {
                    Ok(_) => transitioned += 1,
                    Err(e) if e.is_lost_race() => {
                        tracing::debug!("Work proof {} already moved on: {}", proof_id, e)
                    }
                    Err(e) => tracing::warn!(
                        "Failed to close {} window of work proof {}: {}",
                        status.to_str(),
                        proof_id,
                        e
                    ),
                }
            }
        }

        Ok(transitioned)
    }

    /// Run one event against the stored proof as a conditional write. When
    /// the write loses a race the current status decides the error.
    async fn apply(
        &self,
        proof_id: Uuid,
        event: WorkProofEvent,
        patch: WorkProofPatch,
        at: DateTime<Utc>,
    ) -> Result<WorkProof, ServiceError> {
        let proof = self.get_work_proof(proof_id).await?;
        let t = transition(proof.status, event).map_err(|e| e.into_service_error(proof_id))?;
        let settlement = self.effect_entries(&proof, &t.effects)?;

        let change = WorkProofChange {
            proof_id,
            from: t.from,
            to: t.to,
            at,
            patch,
        };

        if let Some(updated) = self.store.apply_work_proof_change(&change, &settlement).await? {
            tracing::info!(
                "Work proof {} moved {} -> {}",
                proof_id,
                t.from.to_str(),
                t.to.to_str()
            );
            return Ok(updated);
        }

        let current = self.get_work_proof(proof_id).await?;
        Err(match transition(current.status, event) {
            Err(e) => e.into_service_error(proof_id),
            Ok(_) => ServiceError::InvalidState(format!(
                "work proof {} changed while it was being updated",
                proof_id
            )),
        })
    }

    fn effect_entries(
        &self,
        proof: &WorkProof,
        effects: &[Effect],
    ) -> Result<Vec<LedgerEntry>, ServiceError> {
        let mut entries = Vec::new();

        for effect in effects {
            match effect {
                Effect::SettlePayment => {
                    entries.extend(WalletService::payment_entries(&PaymentOrder {
                        payer_id: proof.employer_id,
                        payee_id: proof.worker_id,
                        amount: proof.payment_amount,
                        description: format!("Payment for approved work: {}", proof.title),
                        reference_id: proof.id,
                        reference_type: WORK_PROOF_PAYMENT_REFERENCE.to_string(),
                    })?);
                }
            }
        }

        Ok(entries)
    }
}

fn positive_hours(requested: Option<i64>, default_hours: i64) -> Result<i64, ServiceError> {
    match requested {
        None => Ok(default_hours),
        Some(hours) if hours > 0 => Ok(hours),
        Some(_) => Err(ServiceError::Validation(
            "Timeout must be a positive number of hours".to_string(),
        )),
    }
}

fn deadline_after(now: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>, ServiceError> {
    Duration::try_hours(hours)
        .and_then(|window| now.checked_add_signed(window))
        .ok_or_else(|| ServiceError::Validation("Timeout is too far in the future".to_string()))
}
