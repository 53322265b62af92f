// service/workproof_state.rs
//
// Lifecycle of a work proof as a pure function of (status, event). The
// caller executes the returned effects in the same storage transaction that
// commits the new status.
use uuid::Uuid;

use crate::{models::workproofmodel::WorkProofStatus, service::error::ServiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkProofEvent {
    Approve,
    AutoApprove,
    Reject,
    RequestRevision,
    Resubmit,
    AcceptRejection,
    RejectionWindowElapsed,
    CancelRevision,
    RevisionWindowElapsed,
}

impl WorkProofEvent {
    fn is_settlement(&self) -> bool {
        matches!(self, WorkProofEvent::Approve | WorkProofEvent::AutoApprove)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Pay the proof amount from employer to worker
    SettlePayment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: WorkProofStatus,
    pub to: WorkProofStatus,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    AlreadySettled,
    NotAllowed {
        from: WorkProofStatus,
        event: WorkProofEvent,
    },
}

impl TransitionError {
    pub fn into_service_error(self, proof_id: Uuid) -> ServiceError {
        match self {
            TransitionError::AlreadySettled => ServiceError::AlreadySettled(proof_id),
            TransitionError::NotAllowed { from, event } => ServiceError::InvalidState(format!(
                "cannot {:?} a work proof that is {}",
                event,
                from.to_str()
            )),
        }
    }
}

pub fn transition(
    current: WorkProofStatus,
    event: WorkProofEvent,
) -> Result<Transition, TransitionError> {
    use WorkProofEvent as E;
    use WorkProofStatus as S;

    let (to, effects) = match (current, event) {
        (S::Submitted, E::Approve) => (S::Approved, vec![Effect::SettlePayment]),
        (S::Submitted, E::AutoApprove) => (S::AutoApproved, vec![Effect::SettlePayment]),
        (S::Submitted, E::Reject) => (S::Rejected, vec![]),
        (S::Submitted, E::RequestRevision) => (S::RevisionRequested, vec![]),
        (S::RevisionRequested, E::Resubmit) => (S::Submitted, vec![]),
        (S::RevisionRequested, E::CancelRevision | E::RevisionWindowElapsed) => {
            (S::CancelledByWorker, vec![])
        }
        (S::Rejected, E::AcceptRejection | E::RejectionWindowElapsed) => {
            (S::RejectedAccepted, vec![])
        }
        (from, event) if from.is_settled() && event.is_settlement() => {
            return Err(TransitionError::AlreadySettled)
        }
        (from, event) => return Err(TransitionError::NotAllowed { from, event }),
    };

    Ok(Transition {
        from: current,
        to,
        effects,
    })
}
