// dtos/workproofdtos.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::workproofmodel::{ProofArtifacts, WorkProof, WorkProofStatus, WorkerResponse},
    utils::currency::from_minor_units,
};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SubmitWorkProofDto {
    pub job_id: Uuid,
    pub application_id: Uuid,

    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    #[validate(length(min = 10, max = 5000, message = "Description must be between 10 and 5000 characters"))]
    pub description: String,

    #[serde(default)]
    pub artifacts: ProofArtifacts,

    #[validate(range(min = 0.01, message = "Payment amount must be at least 0.01"))]
    pub payment_amount: f64,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ApproveWorkProofDto {
    #[validate(length(max = 2000, message = "Review notes cannot exceed 2000 characters"))]
    pub review_notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RejectWorkProofDto {
    #[validate(length(min = 1, max = 2000, message = "Rejection reason is required"))]
    pub reason: String,

    #[validate(range(min = 1, max = 720, message = "Timeout must be between 1 and 720 hours"))]
    pub timeout_hours: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RequestRevisionDto {
    #[validate(length(min = 1, max = 2000, message = "Revision notes are required"))]
    pub notes: String,

    #[validate(range(min = 1, max = 720, message = "Timeout must be between 1 and 720 hours"))]
    pub timeout_hours: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ResubmitWorkProofDto {
    #[validate(length(min = 10, max = 5000, message = "Description must be between 10 and 5000 characters"))]
    pub description: String,

    #[serde(default)]
    pub artifacts: ProofArtifacts,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkProofResponseDto {
    pub id: Uuid,
    pub job_id: Uuid,
    pub application_id: Uuid,
    pub worker_id: Uuid,
    pub employer_id: Uuid,
    pub title: String,
    pub description: String,
    pub artifacts: ProofArtifacts,
    pub status: WorkProofStatus,
    pub payment_amount: f64,
    pub submission_number: i32,
    pub revision_count: i32,
    pub revision_deadline: Option<DateTime<Utc>>,
    pub rejection_deadline: Option<DateTime<Utc>>,
    pub review_feedback: Option<String>,
    pub worker_response: Option<WorkerResponse>,
    pub worker_response_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<WorkProof> for WorkProofResponseDto {
    fn from(proof: WorkProof) -> Self {
        Self {
            id: proof.id,
            job_id: proof.job_id,
            application_id: proof.application_id,
            worker_id: proof.worker_id,
            employer_id: proof.employer_id,
            title: proof.title,
            description: proof.description,
            artifacts: proof.artifacts.0,
            status: proof.status,
            payment_amount: from_minor_units(proof.payment_amount),
            submission_number: proof.submission_number,
            revision_count: proof.revision_count,
            revision_deadline: proof.revision_deadline,
            rejection_deadline: proof.rejection_deadline,
            review_feedback: proof.review_feedback,
            worker_response: proof.worker_response,
            worker_response_at: proof.worker_response_at,
            submitted_at: proof.submitted_at,
            reviewed_at: proof.reviewed_at,
            updated_at: proof.updated_at,
        }
    }
}
