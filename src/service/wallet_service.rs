// service/wallet_service.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{walletdb::WalletExt, LedgerStore},
    models::{
        settingsmodel::PlatformFeeSettings,
        walletmodels::{
            BalanceType, LedgerEntry, PaymentOrder, TransactionType, Wallet, WalletTransaction,
        },
    },
    service::error::ServiceError,
    utils::clock::Clock,
};

pub const WITHDRAWAL_REFERENCE_TYPE: &str = "withdrawal";
pub const RELEASE_REFERENCE_TYPE: &str = "pending_release";

#[derive(Debug, Clone)]
pub struct Adjustment {
    pub user_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: i64,
    pub balance_type: BalanceType,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub payer_transaction: WalletTransaction,
    pub payee_transaction: WalletTransaction,
}

#[derive(Debug, Clone)]
pub struct WithdrawalReceipt {
    pub withdrawal: WalletTransaction,
    pub fee: Option<WalletTransaction>,
}

#[derive(Debug, Clone)]
pub struct WalletService {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl WalletService {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn get_or_create_wallet(&self, user_id: Uuid) -> Result<Wallet, ServiceError> {
        self.store.get_or_create_wallet(user_id, self.clock.now()).await
    }

    /// The two postings of a payment: payer's settled balance to the payee's
    /// pending balance.
    pub fn payment_entries(order: &PaymentOrder) -> Result<Vec<LedgerEntry>, ServiceError> {
        if order.amount <= 0 {
            return Err(ServiceError::Validation(
                "Payment amount must be greater than zero".to_string(),
            ));
        }
        if order.payer_id == order.payee_id {
            return Err(ServiceError::Validation(
                "Payer and payee must be different users".to_string(),
            ));
        }

        Ok(vec![
            LedgerEntry {
                user_id: order.payer_id,
                transaction_type: TransactionType::Payment,
                balance_type: BalanceType::Deposit,
                amount: order.amount,
                description: Some(order.description.clone()),
                reference_id: Some(order.reference_id),
                reference_type: Some(order.reference_type.clone()),
            },
            LedgerEntry {
                user_id: order.payee_id,
                transaction_type: TransactionType::Earning,
                balance_type: BalanceType::Pending,
                amount: order.amount,
                description: Some(order.description.clone()),
                reference_id: Some(order.reference_id),
                reference_type: Some(order.reference_type.clone()),
            },
        ])
    }

    pub async fn process_payment(&self, order: PaymentOrder) -> Result<PaymentReceipt, ServiceError> {
        let entries = Self::payment_entries(&order)?;
        let mut rows = self.store.post_entries(&entries, self.clock.now()).await?.into_iter();

        match (rows.next(), rows.next()) {
            (Some(payer_transaction), Some(payee_transaction)) => {
                tracing::info!(
                    "Payment of {} from {} to {} recorded ({} {})",
                    order.amount,
                    order.payer_id,
                    order.payee_id,
                    order.reference_type,
                    order.reference_id
                );
                Ok(PaymentReceipt {
                    payer_transaction,
                    payee_transaction,
                })
            }
            _ => Err(ServiceError::StorageFailure(
                "payment did not record both sides".to_string(),
            )),
        }
    }

    pub async fn release_pending(
        &self,
        user_id: Uuid,
        amount: i64,
    ) -> Result<WalletTransaction, ServiceError> {
        let entry = LedgerEntry {
            user_id,
            transaction_type: TransactionType::TransferPendingToAvailable,
            balance_type: BalanceType::Pending,
            amount,
            description: Some("Pending earnings released".to_string()),
            reference_id: None,
            reference_type: Some(RELEASE_REFERENCE_TYPE.to_string()),
        };

        self.post_single(entry).await
    }

    pub async fn record_adjustment(
        &self,
        adjustment: Adjustment,
    ) -> Result<WalletTransaction, ServiceError> {
        if !adjustment.transaction_type.is_manual_adjustment() {
            return Err(ServiceError::Validation(format!(
                "{} transactions cannot be recorded as adjustments",
                adjustment.transaction_type.to_str()
            )));
        }

        let entry = LedgerEntry {
            user_id: adjustment.user_id,
            transaction_type: adjustment.transaction_type,
            balance_type: adjustment.balance_type,
            amount: adjustment.amount,
            description: adjustment.description,
            reference_id: None,
            reference_type: None,
        };

        self.post_single(entry).await
    }

    /// Withdrawal and platform fee are debited together or not at all
    pub async fn withdraw(
        &self,
        user_id: Uuid,
        amount: i64,
        fee_settings: &PlatformFeeSettings,
    ) -> Result<WithdrawalReceipt, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::Validation(
                "Withdrawal amount must be greater than zero".to_string(),
            ));
        }

        let reference_id = Uuid::new_v4();
        let mut entries = vec![LedgerEntry {
            user_id,
            transaction_type: TransactionType::Withdrawal,
            balance_type: BalanceType::Deposit,
            amount,
            description: Some("Wallet withdrawal".to_string()),
            reference_id: Some(reference_id),
            reference_type: Some(WITHDRAWAL_REFERENCE_TYPE.to_string()),
        }];

        let fee = fee_settings.fee_for(amount);
        if fee > 0 {
            entries.push(LedgerEntry {
                user_id,
                transaction_type: TransactionType::Fee,
                balance_type: BalanceType::Deposit,
                amount: fee,
                description: Some("Platform withdrawal fee".to_string()),
                reference_id: Some(reference_id),
                reference_type: Some(WITHDRAWAL_REFERENCE_TYPE.to_string()),
            });
        }

        let mut rows = self.store.post_entries(&entries, self.clock.now()).await?.into_iter();
        let withdrawal = rows.next().ok_or_else(|| {
            ServiceError::StorageFailure("withdrawal row was not recorded".to_string())
        })?;

        tracing::info!("User {} withdrew {} (fee {})", user_id, amount, fee);

        Ok(WithdrawalReceipt {
            withdrawal,
            fee: rows.next(),
        })
    }

    pub async fn get_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WalletTransaction>, ServiceError> {
        self.store.get_wallet_transactions(user_id, limit, offset).await
    }

    async fn post_single(&self, entry: LedgerEntry) -> Result<WalletTransaction, ServiceError> {
        self.store
            .post_entries(std::slice::from_ref(&entry), self.clock.now())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::StorageFailure("transaction row was not recorded".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::memorydb::MemoryLedger, utils::clock::ManualClock};
    use chrono::Utc;
    use futures::future::join_all;

    fn setup() -> (Arc<MemoryLedger>, WalletService) {
        let store = Arc::new(MemoryLedger::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = WalletService::new(store.clone(), clock);
        (store, service)
    }

    fn order(payer_id: Uuid, payee_id: Uuid, amount: i64) -> PaymentOrder {
        PaymentOrder {
            payer_id,
            payee_id,
            amount,
            description: "Payment for approved work: Logo".to_string(),
            reference_id: Uuid::new_v4(),
            reference_type: "work_proof_payment".to_string(),
        }
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let (_, service) = setup();
        let user = Uuid::new_v4();

        let first = service.get_or_create_wallet(user).await.unwrap();
        let second = service.get_or_create_wallet(user).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.balance, 0);
        assert_eq!(first.pending_balance, 0);
    }

    #[tokio::test]
    async fn payment_conserves_funds() {
        let (store, service) = setup();
        let (payer, payee) = (Uuid::new_v4(), Uuid::new_v4());
        store.fund(payer, 10_000).await;

        let payment = order(payer, payee, 4_000);
        let reference_id = payment.reference_id;
        let receipt = service.process_payment(payment).await.unwrap();

        assert_eq!(receipt.payer_transaction.transaction_type, TransactionType::Payment);
        assert_eq!(receipt.payee_transaction.transaction_type, TransactionType::Earning);
        assert_eq!(receipt.payee_transaction.balance_type, BalanceType::Pending);

        let payer_wallet = store.wallet(payer).await.unwrap();
        let payee_wallet = store.wallet(payee).await.unwrap();
        assert_eq!(payer_wallet.balance, 6_000);
        assert_eq!(payer_wallet.total_spent, 4_000);
        assert_eq!(payee_wallet.pending_balance, 4_000);
        assert_eq!(payee_wallet.total_earned, 4_000);
        assert_eq!(store.transactions_for_reference(reference_id).await.len(), 2);
    }

    #[tokio::test]
    async fn overdraft_leaves_ledger_unchanged() {
        let (store, service) = setup();
        let (payer, payee) = (Uuid::new_v4(), Uuid::new_v4());
        store.fund(payer, 10_000).await;

        let err = service.process_payment(order(payer, payee, 15_000)).await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::InsufficientBalance { required: 15_000, available: 10_000 }
        ));
        assert_eq!(store.wallet(payer).await.unwrap().balance, 10_000);
        assert!(store.wallet(payee).await.is_none());
        assert_eq!(store.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn storage_failure_rolls_back_both_sides() {
        let (store, service) = setup();
        let (payer, payee) = (Uuid::new_v4(), Uuid::new_v4());
        store.fund(payer, 10_000).await;
        store.fail_next_posting();

        let err = service.process_payment(order(payer, payee, 5_000)).await.unwrap_err();

        assert!(matches!(err, ServiceError::StorageFailure(_)));
        assert_eq!(store.wallet(payer).await.unwrap().balance, 10_000);
        assert_eq!(store.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn concurrent_payments_never_overdraw() {
        let (store, service) = setup();
        let payer = Uuid::new_v4();
        store.fund(payer, 10_000).await;

        let attempts = (0..5).map(|_| service.process_payment(order(payer, Uuid::new_v4(), 3_000)));
        let results = join_all(attempts).await;

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 3);
        assert_eq!(store.wallet(payer).await.unwrap().balance, 1_000);
    }

    #[tokio::test]
    async fn payment_rejects_bad_orders() {
        let (_, service) = setup();
        let user = Uuid::new_v4();

        assert!(matches!(
            service.process_payment(order(user, user, 100)).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            service.process_payment(order(user, Uuid::new_v4(), 0)).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn release_moves_pending_to_balance() {
        let (store, service) = setup();
        let (payer, payee) = (Uuid::new_v4(), Uuid::new_v4());
        store.fund(payer, 10_000).await;
        service.process_payment(order(payer, payee, 5_000)).await.unwrap();

        let err = service.release_pending(payee, 6_000).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InsufficientPendingBalance { required: 6_000, available: 5_000 }
        ));

        let row = service.release_pending(payee, 2_000).await.unwrap();
        assert_eq!(row.transaction_type, TransactionType::TransferPendingToAvailable);

        let wallet = store.wallet(payee).await.unwrap();
        assert_eq!(wallet.pending_balance, 3_000);
        assert_eq!(wallet.balance, 2_000);
    }

    #[tokio::test]
    async fn adjustments_credit_and_debit() {
        let (store, service) = setup();
        let user = Uuid::new_v4();

        service
            .record_adjustment(Adjustment {
                user_id: user,
                transaction_type: TransactionType::Deposit,
                amount: 2_500,
                balance_type: BalanceType::Deposit,
                description: Some("Bank transfer".to_string()),
            })
            .await
            .unwrap();
        service
            .record_adjustment(Adjustment {
                user_id: user,
                transaction_type: TransactionType::Fee,
                amount: 500,
                balance_type: BalanceType::Deposit,
                description: None,
            })
            .await
            .unwrap();

        let wallet = store.wallet(user).await.unwrap();
        assert_eq!(wallet.balance, 2_000);
        assert_eq!(wallet.total_spent, 500);

        let err = service
            .record_adjustment(Adjustment {
                user_id: user,
                transaction_type: TransactionType::Payment,
                amount: 100,
                balance_type: BalanceType::Deposit,
                description: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn withdrawal_charges_fee_in_one_step() {
        let (store, service) = setup();
        let user = Uuid::new_v4();
        store.fund(user, 10_000).await;
        let fees = PlatformFeeSettings::default();

        let receipt = service.withdraw(user, 4_000, &fees).await.unwrap();
        assert_eq!(receipt.withdrawal.amount, 4_000);
        assert_eq!(receipt.fee.as_ref().map(|f| f.amount), Some(200));
        assert_eq!(store.wallet(user).await.unwrap().balance, 5_800);

        // 5_800 + 290 fee exceeds the balance, nothing is taken
        let err = service.withdraw(user, 5_800, &fees).await.unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientBalance { required: 6_090, .. }));
        assert_eq!(store.wallet(user).await.unwrap().balance, 5_800);
    }

    #[tokio::test]
    async fn oversized_fee_is_refused_without_wrapping() {
        let (store, service) = setup();
        let user = Uuid::new_v4();
        store.fund(user, 10_000).await;
        let fees = PlatformFeeSettings {
            fixed_fee: i64::MAX,
            ..Default::default()
        };

        assert!(service.withdraw(user, 4_000, &fees).await.is_err());
        assert_eq!(store.wallet(user).await.unwrap().balance, 10_000);
        assert_eq!(store.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn history_is_newest_first_and_paged() {
        let (store, service) = setup();
        let user = Uuid::new_v4();
        store.fund(user, 10_000).await;
        let fees = PlatformFeeSettings {
            enabled: false,
            ..Default::default()
        };

        for amount in [100, 200, 300] {
            service.withdraw(user, amount, &fees).await.unwrap();
        }

        let page = service.get_transactions(user, 2, 0).await.unwrap();
        assert_eq!(page.iter().map(|t| t.amount).collect::<Vec<_>>(), vec![300, 200]);

        let rest = service.get_transactions(user, 2, 2).await.unwrap();
        assert_eq!(rest.iter().map(|t| t.amount).collect::<Vec<_>>(), vec![100]);
    }
}
