// models/workproofmodel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "work_proof_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkProofStatus {
    Submitted,
    Approved,
    AutoApproved,
    Rejected,
    RejectedAccepted,
    RevisionRequested,
    CancelledByWorker,
}

impl WorkProofStatus {
    pub fn to_str(&self) -> &str {
        match self {
            WorkProofStatus::Submitted => "submitted",
            WorkProofStatus::Approved => "approved",
            WorkProofStatus::AutoApproved => "auto_approved",
            WorkProofStatus::Rejected => "rejected",
            WorkProofStatus::RejectedAccepted => "rejected_accepted",
            WorkProofStatus::RevisionRequested => "revision_requested",
            WorkProofStatus::CancelledByWorker => "cancelled_by_worker",
        }
    }

    /// Payment has been made for this proof
    pub fn is_settled(&self) -> bool {
        matches!(self, WorkProofStatus::Approved | WorkProofStatus::AutoApproved)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "approval_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalType {
    Instant,
    Manual,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "worker_response", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkerResponse {
    Accepted,
    Cancelled,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProofArtifacts {
    pub files: Vec<String>,
    pub links: Vec<String>,
    pub screenshots: Vec<String>,
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkProof {
    pub id: Uuid,
    pub job_id: Uuid,
    pub application_id: Uuid,
    pub worker_id: Uuid,
    pub employer_id: Uuid,
    pub title: String,
    pub description: String,
    pub artifacts: Json<ProofArtifacts>,
    pub status: WorkProofStatus,
    pub payment_amount: i64, // minor units, fixed at submission
    pub submission_number: i32,
    pub revision_count: i32,
    pub revision_deadline: Option<DateTime<Utc>>,
    pub rejection_deadline: Option<DateTime<Utc>>,
    pub review_feedback: Option<String>,
    pub worker_response: Option<WorkerResponse>,
    pub worker_response_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWorkProof {
    pub job_id: Uuid,
    pub application_id: Uuid,
    pub worker_id: Uuid,
    pub employer_id: Uuid,
    pub title: String,
    pub description: String,
    pub artifacts: ProofArtifacts,
    pub payment_amount: i64,
}

impl WorkProof {
    pub fn submitted(new: NewWorkProof, now: DateTime<Utc>) -> Self {
        WorkProof {
            id: Uuid::new_v4(),
            job_id: new.job_id,
            application_id: new.application_id,
            worker_id: new.worker_id,
            employer_id: new.employer_id,
            title: new.title,
            description: new.description,
            artifacts: Json(new.artifacts),
            status: WorkProofStatus::Submitted,
            payment_amount: new.payment_amount,
            submission_number: 1,
            revision_count: 0,
            revision_deadline: None,
            rejection_deadline: None,
            review_feedback: None,
            worker_response: None,
            worker_response_at: None,
            submitted_at: now,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Approval policy of the job a proof belongs to, read from `jobs`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobTerms {
    pub job_id: Uuid,
    pub employer_id: Uuid,
    pub title: String,
    pub approval_type: Option<ApprovalType>,
    pub manual_approval_days: Option<i32>,
}

/// Field updates that accompany a status change
#[derive(Debug, Clone, PartialEq)]
pub enum WorkProofPatch {
    Review { feedback: Option<String> },
    Rejection { reason: String, deadline: DateTime<Utc> },
    Revision { notes: String, deadline: DateTime<Utc> },
    WorkerResponse { response: WorkerResponse },
    Resubmission { description: String, artifacts: ProofArtifacts },
}

/// A conditional status change: it only applies while the stored proof is
/// still in `from`.
#[derive(Debug, Clone)]
pub struct WorkProofChange {
    pub proof_id: Uuid,
    pub from: WorkProofStatus,
    pub to: WorkProofStatus,
    pub at: DateTime<Utc>,
    pub patch: WorkProofPatch,
}

impl WorkProofChange {
    pub fn apply_to(&self, proof: &mut WorkProof) {
        proof.status = self.to;
        proof.updated_at = self.at;

        match &self.patch {
            WorkProofPatch::Review { feedback } => {
                proof.reviewed_at = Some(self.at);
                if feedback.is_some() {
                    proof.review_feedback = feedback.clone();
                }
            }
            WorkProofPatch::Rejection { reason, deadline } => {
                proof.reviewed_at = Some(self.at);
                proof.review_feedback = Some(reason.clone());
                proof.rejection_deadline = Some(*deadline);
            }
            WorkProofPatch::Revision { notes, deadline } => {
                proof.reviewed_at = Some(self.at);
                proof.review_feedback = Some(notes.clone());
                proof.revision_deadline = Some(*deadline);
                proof.revision_count += 1;
            }
            WorkProofPatch::WorkerResponse { response } => {
                proof.worker_response = Some(*response);
                proof.worker_response_at = Some(self.at);
            }
            WorkProofPatch::Resubmission {
                description,
                artifacts,
            } => {
                proof.description = description.clone();
                proof.artifacts = Json(artifacts.clone());
                proof.submission_number += 1;
                proof.submitted_at = self.at;
                proof.revision_deadline = None;
                proof.reviewed_at = None;
            }
        }
    }
}
