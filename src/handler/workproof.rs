// handler/workproof.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        workproofdtos::{
            ApproveWorkProofDto, RejectWorkProofDto, RequestRevisionDto, ResubmitWorkProofDto,
            SubmitWorkProofDto, WorkProofResponseDto,
        },
        ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    models::workproofmodel::{NewWorkProof, WorkProof},
    service::error::ServiceError,
    utils::currency::to_minor_units,
    AppState,
};

pub fn work_proof_handler() -> Router {
    Router::new()
        .route("/", post(submit_work_proof))
        .route("/:proof_id", get(get_work_proof))
        .route("/job/:job_id", get(get_job_work_proofs))
        .route("/:proof_id/approve", put(approve_work_proof))
        .route("/:proof_id/reject", put(reject_work_proof))
        .route("/:proof_id/revision", put(request_revision))
        .route("/:proof_id/resubmit", put(resubmit_work_proof))
        .route("/:proof_id/accept-rejection", put(accept_rejection))
        .route("/:proof_id/cancel", put(cancel_after_revision))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Party {
    Worker,
    Employer,
    Either,
}

/// Proofs are only visible to the two parties on them; everyone else gets
/// the same answer as for a proof that does not exist.
async fn load_proof_for(
    app_state: &AppState,
    proof_id: Uuid,
    user_id: Uuid,
    party: Party,
) -> Result<WorkProof, HttpError> {
    let proof = app_state.work_proof_service.get_work_proof(proof_id).await?;

    let allowed = match party {
        Party::Worker => proof.worker_id == user_id,
        Party::Employer => proof.employer_id == user_id,
        Party::Either => proof.worker_id == user_id || proof.employer_id == user_id,
    };

    if !allowed {
        return Err(ServiceError::not_found("Work proof").into());
    }

    Ok(proof)
}

fn proof_response(message: &str, proof: WorkProof) -> Json<ApiResponse<WorkProofResponseDto>> {
    Json(ApiResponse::success(message, WorkProofResponseDto::from(proof)))
}

pub async fn submit_work_proof(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<SubmitWorkProofDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let payment_amount = to_minor_units(body.payment_amount).map_err(HttpError::bad_request)?;
    let terms = app_state.work_proof_service.job_terms(body.job_id).await?;

    let proof = app_state
        .work_proof_service
        .submit(NewWorkProof {
            job_id: body.job_id,
            application_id: body.application_id,
            worker_id: auth.user_id,
            employer_id: terms.employer_id,
            title: body.title,
            description: body.description,
            artifacts: body.artifacts,
            payment_amount,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        proof_response("Work proof submitted successfully", proof),
    ))
}

pub async fn get_work_proof(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(proof_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let proof = load_proof_for(&app_state, proof_id, auth.user_id, Party::Either).await?;

    Ok(proof_response("Work proof retrieved successfully", proof))
}

pub async fn get_job_work_proofs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let terms = app_state.work_proof_service.job_terms(job_id).await?;
    if terms.employer_id != auth.user_id {
        return Err(ServiceError::not_found("Job").into());
    }

    let proofs: Vec<WorkProofResponseDto> = app_state
        .work_proof_service
        .list_for_job(job_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(ApiResponse::success(
        "Work proofs retrieved successfully",
        proofs,
    )))
}

pub async fn approve_work_proof(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(proof_id): Path<Uuid>,
    Json(body): Json<ApproveWorkProofDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    load_proof_for(&app_state, proof_id, auth.user_id, Party::Employer).await?;

    let proof = app_state
        .work_proof_service
        .approve(proof_id, body.review_notes)
        .await?;

    Ok(proof_response("Work proof approved and payment released", proof))
}

pub async fn reject_work_proof(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(proof_id): Path<Uuid>,
    Json(body): Json<RejectWorkProofDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    load_proof_for(&app_state, proof_id, auth.user_id, Party::Employer).await?;

    let proof = app_state
        .work_proof_service
        .reject(proof_id, body.reason, body.timeout_hours)
        .await?;

    Ok(proof_response("Work proof rejected", proof))
}

pub async fn request_revision(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(proof_id): Path<Uuid>,
    Json(body): Json<RequestRevisionDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    load_proof_for(&app_state, proof_id, auth.user_id, Party::Employer).await?;

    let proof = app_state
        .work_proof_service
        .request_revision(proof_id, body.notes, body.timeout_hours)
        .await?;

    Ok(proof_response("Revision requested", proof))
}

pub async fn resubmit_work_proof(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(proof_id): Path<Uuid>,
    Json(body): Json<ResubmitWorkProofDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    load_proof_for(&app_state, proof_id, auth.user_id, Party::Worker).await?;

    let proof = app_state
        .work_proof_service
        .resubmit(proof_id, body.description, body.artifacts)
        .await?;

    Ok(proof_response("Work proof resubmitted successfully", proof))
}

pub async fn accept_rejection(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(proof_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    load_proof_for(&app_state, proof_id, auth.user_id, Party::Worker).await?;

    let proof = app_state.work_proof_service.accept_rejection(proof_id).await?;

    Ok(proof_response("Rejection accepted", proof))
}

pub async fn cancel_after_revision(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(proof_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    load_proof_for(&app_state, proof_id, auth.user_id, Party::Worker).await?;

    let proof = app_state
        .work_proof_service
        .cancel_after_revision(proof_id)
        .await?;

    Ok(proof_response("Work proof cancelled", proof))
}
