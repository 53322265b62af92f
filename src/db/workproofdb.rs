// db/workproofdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use super::{db::DBClient, walletdb::post_entries_on};
use crate::{
    models::{
        walletmodels::LedgerEntry,
        workproofmodel::{
            ApprovalType, JobTerms, WorkProof, WorkProofChange, WorkProofStatus,
        },
    },
    service::error::ServiceError,
};

#[async_trait]
pub trait WorkProofExt: Send + Sync {
    async fn get_work_proof(&self, proof_id: Uuid) -> Result<Option<WorkProof>, ServiceError>;

    async fn get_work_proofs_by_job(&self, job_id: Uuid) -> Result<Vec<WorkProof>, ServiceError>;

    async fn get_job_terms(&self, job_id: Uuid) -> Result<Option<JobTerms>, ServiceError>;

    /// Insert the proof and post `settlement` in the same transaction
    async fn insert_work_proof(
        &self,
        proof: &WorkProof,
        settlement: &[LedgerEntry],
    ) -> Result<WorkProof, ServiceError>;

    /// Apply `change` only if the proof is still in `change.from`, posting
    /// `settlement` in the same transaction. `None` means the proof was not
    /// in the expected state and nothing was written.
    async fn apply_work_proof_change(
        &self,
        change: &WorkProofChange,
        settlement: &[LedgerEntry],
    ) -> Result<Option<WorkProof>, ServiceError>;

    /// Submitted proofs on manual-approval jobs whose review window has
    /// elapsed: `submitted_at + approval days < now`.
    async fn find_overdue_manual_proofs(
        &self,
        now: DateTime<Utc>,
        default_approval_type: ApprovalType,
        default_approval_days: i64,
    ) -> Result<Vec<Uuid>, ServiceError>;

    /// Proofs in `status` whose worker response deadline is before `now`
    async fn find_elapsed_windows(
        &self,
        status: WorkProofStatus,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, ServiceError>;
}

const WORK_PROOF_COLUMNS: &str = r#"
    id, job_id, application_id, worker_id, employer_id, title, description, artifacts,
    status, payment_amount, submission_number, revision_count, revision_deadline,
    rejection_deadline, review_feedback, worker_response, worker_response_at,
    submitted_at, reviewed_at, created_at, updated_at
"#;

async fn write_work_proof(conn: &mut PgConnection, proof: &WorkProof) -> Result<WorkProof, ServiceError> {
    let written = sqlx::query_as::<_, WorkProof>(&format!(
        r#"
        INSERT INTO work_proofs ({columns})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
        ON CONFLICT (id) DO UPDATE SET
            description = EXCLUDED.description,
            artifacts = EXCLUDED.artifacts,
            status = EXCLUDED.status,
            submission_number = EXCLUDED.submission_number,
            revision_count = EXCLUDED.revision_count,
            revision_deadline = EXCLUDED.revision_deadline,
            rejection_deadline = EXCLUDED.rejection_deadline,
            review_feedback = EXCLUDED.review_feedback,
            worker_response = EXCLUDED.worker_response,
            worker_response_at = EXCLUDED.worker_response_at,
            submitted_at = EXCLUDED.submitted_at,
            reviewed_at = EXCLUDED.reviewed_at,
            updated_at = EXCLUDED.updated_at
        RETURNING {columns}
        "#,
        columns = WORK_PROOF_COLUMNS
    ))
    .bind(proof.id)
    .bind(proof.job_id)
    .bind(proof.application_id)
    .bind(proof.worker_id)
    .bind(proof.employer_id)
    .bind(&proof.title)
    .bind(&proof.description)
    .bind(&proof.artifacts)
    .bind(proof.status)
    .bind(proof.payment_amount)
    .bind(proof.submission_number)
    .bind(proof.revision_count)
    .bind(proof.revision_deadline)
    .bind(proof.rejection_deadline)
    .bind(&proof.review_feedback)
    .bind(proof.worker_response)
    .bind(proof.worker_response_at)
    .bind(proof.submitted_at)
    .bind(proof.reviewed_at)
    .bind(proof.created_at)
    .bind(proof.updated_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(written)
}

#[async_trait]
impl WorkProofExt for DBClient {
    async fn get_work_proof(&self, proof_id: Uuid) -> Result<Option<WorkProof>, ServiceError> {
        let proof = sqlx::query_as::<_, WorkProof>(&format!(
            "SELECT {} FROM work_proofs WHERE id = $1",
            WORK_PROOF_COLUMNS
        ))
        .bind(proof_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(proof)
    }

    async fn get_work_proofs_by_job(&self, job_id: Uuid) -> Result<Vec<WorkProof>, ServiceError> {
        let proofs = sqlx::query_as::<_, WorkProof>(&format!(
            "SELECT {} FROM work_proofs WHERE job_id = $1 ORDER BY submitted_at DESC",
            WORK_PROOF_COLUMNS
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(proofs)
    }

    async fn get_job_terms(&self, job_id: Uuid) -> Result<Option<JobTerms>, ServiceError> {
        let terms = sqlx::query_as::<_, JobTerms>(
            r#"
            SELECT id AS job_id, employer_id, title, approval_type, manual_approval_days
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(terms)
    }

    async fn insert_work_proof(
        &self,
        proof: &WorkProof,
        settlement: &[LedgerEntry],
    ) -> Result<WorkProof, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let inserted = write_work_proof(&mut *tx, proof).await?;
        post_entries_on(&mut *tx, settlement, proof.updated_at).await?;

        tx.commit().await?;

        Ok(inserted)
    }

    async fn apply_work_proof_change(
        &self,
        change: &WorkProofChange,
        settlement: &[LedgerEntry],
    ) -> Result<Option<WorkProof>, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, WorkProof>(&format!(
            "SELECT {} FROM work_proofs WHERE id = $1 FOR UPDATE",
            WORK_PROOF_COLUMNS
        ))
        .bind(change.proof_id)
        .fetch_optional(&mut *tx)
        .await?;

        let mut proof = match current {
            Some(proof) if proof.status == change.from => proof,
            _ => return Ok(None),
        };

        change.apply_to(&mut proof);
        let updated = write_work_proof(&mut *tx, &proof).await?;
        post_entries_on(&mut *tx, settlement, change.at).await?;

        tx.commit().await?;

        Ok(Some(updated))
    }

    async fn find_overdue_manual_proofs(
        &self,
        now: DateTime<Utc>,
        default_approval_type: ApprovalType,
        default_approval_days: i64,
    ) -> Result<Vec<Uuid>, ServiceError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT wp.id
            FROM work_proofs wp
            JOIN jobs j ON j.id = wp.job_id
            WHERE wp.status = $1
              AND COALESCE(j.approval_type, $2) = $3
              AND wp.submitted_at
                  + make_interval(days => COALESCE(j.manual_approval_days, $4::int)) < $5
            ORDER BY wp.submitted_at ASC
            "#,
        )
        .bind(WorkProofStatus::Submitted)
        .bind(default_approval_type)
        .bind(ApprovalType::Manual)
        .bind(default_approval_days as i32)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn find_elapsed_windows(
        &self,
        status: WorkProofStatus,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, ServiceError> {
        let deadline_column = match status {
            WorkProofStatus::Rejected => "rejection_deadline",
            WorkProofStatus::RevisionRequested => "revision_deadline",
            other => {
                return Err(ServiceError::InvalidState(format!(
                    "{} proofs have no response window",
                    other.to_str()
                )))
            }
        };

        let ids = sqlx::query_scalar::<_, Uuid>(&format!(
            r#"
            SELECT id
            FROM work_proofs
            WHERE status = $1 AND {column} < $2
            ORDER BY {column} ASC
            "#,
            column = deadline_column
        ))
        .bind(status)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
