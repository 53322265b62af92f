// db/memorydb.rs
//
// In-memory store used by the unit tests. Every operation holds the state
// lock for its whole duration and only writes once all checks have passed,
// which gives it the same all-or-nothing behaviour as a storage transaction.
use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    posting,
    reservationdb::{NewReservation, ReservationExt},
    settingsdb::SettingsExt,
    walletdb::WalletExt,
    workproofdb::WorkProofExt,
};
use crate::{
    models::{
        reservationmodel::{
            JobReservation, ReservationStatus, ReservationViolation, ReservationWithJob,
            REPEATED_EXPIRY_VIOLATION,
        },
        settingsmodel::PlatformSettings,
        walletmodels::{LedgerEntry, Wallet, WalletTransaction},
        workproofmodel::{
            ApprovalType, JobTerms, WorkProof, WorkProofChange, WorkProofStatus,
        },
    },
    service::error::ServiceError,
};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    wallets: HashMap<Uuid, Wallet>,
    transactions: Vec<WalletTransaction>,
    reservations: Vec<JobReservation>,
    violations: Vec<ReservationViolation>,
    proofs: HashMap<Uuid, WorkProof>,
    jobs: HashMap<Uuid, JobTerms>,
    settings: PlatformSettings,
}

#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
    fail_next_posting: AtomicBool,
    settings_loads: AtomicUsize,
}

impl MemoryLedger {
    pub fn new() -> Self {
        MemoryLedger::default()
    }

    pub async fn add_job(&self, terms: JobTerms) {
        self.state.lock().await.jobs.insert(terms.job_id, terms);
    }

    /// Seed a spendable balance without writing a transaction row
    pub async fn fund(&self, user_id: Uuid, balance: i64) {
        let mut state = self.state.lock().await;
        let wallet = state
            .wallets
            .entry(user_id)
            .or_insert_with(|| Wallet::empty(user_id, Utc::now()));
        wallet.balance = balance;
    }

    pub async fn wallet(&self, user_id: Uuid) -> Option<Wallet> {
        self.state.lock().await.wallets.get(&user_id).cloned()
    }

    pub async fn transactions_for_reference(&self, reference_id: Uuid) -> Vec<WalletTransaction> {
        self.state
            .lock()
            .await
            .transactions
            .iter()
            .filter(|t| t.reference_id == Some(reference_id))
            .cloned()
            .collect()
    }

    pub async fn transaction_count(&self) -> usize {
        self.state.lock().await.transactions.len()
    }

    pub async fn proof_count(&self) -> usize {
        self.state.lock().await.proofs.len()
    }

    pub async fn reservation(&self, reservation_id: Uuid) -> Option<JobReservation> {
        self.state
            .lock()
            .await
            .reservations
            .iter()
            .find(|r| r.id == reservation_id)
            .cloned()
    }

    /// Change stored settings without going through the service
    pub async fn replace_settings(&self, settings: PlatformSettings) {
        self.state.lock().await.settings = settings;
    }

    pub fn settings_loads(&self) -> usize {
        self.settings_loads.load(Ordering::SeqCst)
    }

    /// Make the next non-empty posting fail after its balance checks passed
    pub fn fail_next_posting(&self) {
        self.fail_next_posting.store(true, Ordering::SeqCst);
    }

    fn post(
        &self,
        state: &mut MemoryState,
        entries: &[LedgerEntry],
        now: DateTime<Utc>,
    ) -> Result<Vec<WalletTransaction>, ServiceError> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let mut wallets: HashMap<Uuid, Wallet> = entries
            .iter()
            .map(|e| {
                let wallet = state
                    .wallets
                    .get(&e.user_id)
                    .cloned()
                    .unwrap_or_else(|| Wallet::empty(e.user_id, now));
                (e.user_id, wallet)
            })
            .collect();

        posting::apply_entries(&mut wallets, entries, now)?;

        if self.fail_next_posting.swap(false, Ordering::SeqCst) {
            return Err(ServiceError::StorageFailure(
                "connection reset while writing wallet_transactions".to_string(),
            ));
        }

        let rows: Vec<WalletTransaction> = entries.iter().map(|e| e.to_transaction(now)).collect();
        state.wallets.extend(wallets);
        state.transactions.extend(rows.iter().cloned());

        Ok(rows)
    }
}

#[async_trait]
impl WalletExt for MemoryLedger {
    async fn get_wallet(&self, user_id: Uuid) -> Result<Option<Wallet>, ServiceError> {
        Ok(self.state.lock().await.wallets.get(&user_id).cloned())
    }

    async fn get_or_create_wallet(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Wallet, ServiceError> {
        let mut state = self.state.lock().await;
        let wallet = state
            .wallets
            .entry(user_id)
            .or_insert_with(|| Wallet::empty(user_id, now));
        Ok(wallet.clone())
    }

    async fn post_entries(
        &self,
        entries: &[LedgerEntry],
        now: DateTime<Utc>,
    ) -> Result<Vec<WalletTransaction>, ServiceError> {
        let mut state = self.state.lock().await;
        self.post(&mut state, entries, now)
    }

    async fn get_wallet_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WalletTransaction>, ServiceError> {
        let state = self.state.lock().await;
        let mut rows: Vec<WalletTransaction> = state
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        rows.reverse();

        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}

#[async_trait]
impl ReservationExt for MemoryLedger {
    async fn create_reservation(
        &self,
        reservation: NewReservation,
        now: DateTime<Utc>,
        max_active: i64,
    ) -> Result<JobReservation, ServiceError> {
        let mut state = self.state.lock().await;

        let live: Vec<&JobReservation> = state
            .reservations
            .iter()
            .filter(|r| r.user_id == reservation.user_id && r.is_live_at(now))
            .collect();

        if live.iter().any(|r| r.job_id == reservation.job_id) {
            return Err(ServiceError::DuplicateReservation {
                job_id: reservation.job_id,
            });
        }
        if live.len() as i64 >= max_active {
            return Err(ServiceError::ReservationLimitExceeded { limit: max_active });
        }

        let created = JobReservation {
            id: Uuid::new_v4(),
            job_id: reservation.job_id,
            user_id: reservation.user_id,
            status: ReservationStatus::Active,
            expires_at: reservation.expires_at,
            created_at: now,
            updated_at: now,
        };
        state.reservations.push(created.clone());

        Ok(created)
    }

    async fn cancel_reservation(
        &self,
        reservation_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<JobReservation>, ServiceError> {
        let mut state = self.state.lock().await;
        let found = state
            .reservations
            .iter_mut()
            .find(|r| r.id == reservation_id && r.user_id == user_id && r.is_live_at(now));

        Ok(found.map(|r| {
            r.status = ReservationStatus::Cancelled;
            r.updated_at = now;
            r.clone()
        }))
    }

    async fn get_active_reservations(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReservationWithJob>, ServiceError> {
        let state = self.state.lock().await;
        let mut rows: Vec<ReservationWithJob> = state
            .reservations
            .iter()
            .filter(|r| r.user_id == user_id && r.is_live_at(now))
            .map(|r| ReservationWithJob {
                reservation: r.clone(),
                job_title: state.jobs.get(&r.job_id).map(|j| j.title.clone()),
                job_budget: None,
            })
            .collect();
        rows.sort_by_key(|r| r.reservation.expires_at);

        Ok(rows)
    }

    async fn expire_reservations(&self, now: DateTime<Utc>) -> Result<u64, ServiceError> {
        let mut state = self.state.lock().await;
        let mut affected = 0;
        for reservation in state
            .reservations
            .iter_mut()
            .filter(|r| r.status == ReservationStatus::Active && r.expires_at <= now)
        {
            reservation.status = ReservationStatus::Expired;
            reservation.updated_at = now;
            affected += 1;
        }

        Ok(affected)
    }

    async fn record_expiry_violations(
        &self,
        window_start: DateTime<Utc>,
        threshold: i64,
        now: DateTime<Utc>,
    ) -> Result<u64, ServiceError> {
        let mut state = self.state.lock().await;

        let mut expired_per_user: HashMap<Uuid, i64> = HashMap::new();
        for r in state
            .reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::Expired && r.updated_at >= window_start)
        {
            *expired_per_user.entry(r.user_id).or_insert(0) += 1;
        }

        let mut recorded = 0;
        for (user_id, expired_count) in expired_per_user {
            let already_flagged = state
                .violations
                .iter()
                .any(|v| v.user_id == user_id && v.created_at >= window_start);
            if expired_count >= threshold && !already_flagged {
                state.violations.push(ReservationViolation {
                    id: Uuid::new_v4(),
                    user_id,
                    violation_type: REPEATED_EXPIRY_VIOLATION.to_string(),
                    expired_count,
                    window_start,
                    created_at: now,
                });
                recorded += 1;
            }
        }

        Ok(recorded)
    }

    async fn get_reservation_violations(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ReservationViolation>, i64), ServiceError> {
        let state = self.state.lock().await;
        let mut rows = state.violations.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = rows.len() as i64;

        Ok((
            rows.into_iter()
                .skip(offset.max(0) as usize)
                .take(limit.max(0) as usize)
                .collect(),
            total,
        ))
    }

    async fn purge_reservation_violations(&self, before: DateTime<Utc>) -> Result<u64, ServiceError> {
        let mut state = self.state.lock().await;
        let before_len = state.violations.len();
        state.violations.retain(|v| v.created_at >= before);
        Ok((before_len - state.violations.len()) as u64)
    }
}

#[async_trait]
impl WorkProofExt for MemoryLedger {
    async fn get_work_proof(&self, proof_id: Uuid) -> Result<Option<WorkProof>, ServiceError> {
        Ok(self.state.lock().await.proofs.get(&proof_id).cloned())
    }

    async fn get_work_proofs_by_job(&self, job_id: Uuid) -> Result<Vec<WorkProof>, ServiceError> {
        let state = self.state.lock().await;
        let mut proofs: Vec<WorkProof> = state
            .proofs
            .values()
            .filter(|p| p.job_id == job_id)
            .cloned()
            .collect();
        proofs.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(proofs)
    }

    async fn get_job_terms(&self, job_id: Uuid) -> Result<Option<JobTerms>, ServiceError> {
        Ok(self.state.lock().await.jobs.get(&job_id).cloned())
    }

    async fn insert_work_proof(
        &self,
        proof: &WorkProof,
        settlement: &[LedgerEntry],
    ) -> Result<WorkProof, ServiceError> {
        let mut state = self.state.lock().await;
        self.post(&mut state, settlement, proof.updated_at)?;
        state.proofs.insert(proof.id, proof.clone());
        Ok(proof.clone())
    }

    async fn apply_work_proof_change(
        &self,
        change: &WorkProofChange,
        settlement: &[LedgerEntry],
    ) -> Result<Option<WorkProof>, ServiceError> {
        let mut state = self.state.lock().await;

        let mut proof = match state.proofs.get(&change.proof_id) {
            Some(proof) if proof.status == change.from => proof.clone(),
            _ => return Ok(None),
        };

        change.apply_to(&mut proof);
        self.post(&mut state, settlement, change.at)?;
        state.proofs.insert(proof.id, proof.clone());

        Ok(Some(proof))
    }

    async fn find_overdue_manual_proofs(
        &self,
        now: DateTime<Utc>,
        default_approval_type: ApprovalType,
        default_approval_days: i64,
    ) -> Result<Vec<Uuid>, ServiceError> {
        let state = self.state.lock().await;
        let mut overdue: Vec<&WorkProof> = state
            .proofs
            .values()
            .filter(|p| p.status == WorkProofStatus::Submitted)
            .filter(|p| match state.jobs.get(&p.job_id) {
                Some(job) => {
                    let approval_type = job.approval_type.unwrap_or(default_approval_type);
                    let days = job
                        .manual_approval_days
                        .map(i64::from)
                        .unwrap_or(default_approval_days);
                    approval_type == ApprovalType::Manual && p.submitted_at + Duration::days(days) < now
                }
                None => false,
            })
            .collect();
        overdue.sort_by_key(|p| p.submitted_at);

        Ok(overdue.into_iter().map(|p| p.id).collect())
    }

    async fn find_elapsed_windows(
        &self,
        status: WorkProofStatus,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, ServiceError> {
        let deadline_of: fn(&WorkProof) -> Option<DateTime<Utc>> = match status {
            WorkProofStatus::Rejected => |p| p.rejection_deadline,
            WorkProofStatus::RevisionRequested => |p| p.revision_deadline,
            other => {
                return Err(ServiceError::InvalidState(format!(
                    "{} proofs have no response window",
                    other.to_str()
                )))
            }
        };

        let state = self.state.lock().await;
        let mut elapsed: Vec<(DateTime<Utc>, Uuid)> = state
            .proofs
            .values()
            .filter(|p| p.status == status)
            .filter_map(|p| deadline_of(p).filter(|deadline| *deadline < now).map(|d| (d, p.id)))
            .collect();
        elapsed.sort();

        Ok(elapsed.into_iter().map(|(_, id)| id).collect())
    }
}

#[async_trait]
impl SettingsExt for MemoryLedger {
    async fn load_settings(&self) -> Result<PlatformSettings, ServiceError> {
        self.settings_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().await.settings.clone())
    }

    async fn save_settings(
        &self,
        settings: &PlatformSettings,
        _now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        self.state.lock().await.settings = settings.clone();
        Ok(())
    }
}
