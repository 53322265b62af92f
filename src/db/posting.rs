// db/posting.rs
//
// Balance rules shared by every store implementation. A store locks the
// affected wallets, runs `apply_entries` on its copies and persists the
// result together with one transaction row per entry.
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    models::walletmodels::{BalanceType, LedgerEntry, TransactionType, Wallet},
    service::error::ServiceError,
};

fn is_debit(entry: &LedgerEntry) -> bool {
    matches!(
        entry.transaction_type,
        TransactionType::Withdrawal
            | TransactionType::Payment
            | TransactionType::Fee
            | TransactionType::TransferPendingToAvailable
    )
}

/// The balance an entry draws from when it is a debit
fn debited_balance(entry: &LedgerEntry) -> BalanceType {
    match entry.transaction_type {
        TransactionType::TransferPendingToAvailable => BalanceType::Pending,
        _ => entry.balance_type,
    }
}

fn overflow() -> ServiceError {
    ServiceError::Validation("Amount exceeds the supported range".to_string())
}

/// Check every entry up front, then mutate. Either all entries are applied
/// or `wallets` is left untouched.
pub fn apply_entries(
    wallets: &mut HashMap<Uuid, Wallet>,
    entries: &[LedgerEntry],
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    let mut debits: HashMap<(Uuid, BalanceType), i64> = HashMap::new();

    for entry in entries {
        if entry.amount <= 0 {
            return Err(ServiceError::Validation(
                "Amount must be greater than zero".to_string(),
            ));
        }
        if !wallets.contains_key(&entry.user_id) {
            return Err(ServiceError::StorageFailure(format!(
                "wallet for user {} was not loaded",
                entry.user_id
            )));
        }
        if is_debit(entry) {
            let total = debits
                .entry((entry.user_id, debited_balance(entry)))
                .or_insert(0);
            *total = total.checked_add(entry.amount).ok_or_else(overflow)?;
        }
    }

    for ((user_id, balance_type), required) in &debits {
        let Some(wallet) = wallets.get(user_id) else {
            continue;
        };
        match balance_type {
            BalanceType::Deposit if wallet.balance < *required => {
                return Err(ServiceError::InsufficientBalance {
                    required: *required,
                    available: wallet.balance,
                });
            }
            BalanceType::Pending if wallet.pending_balance < *required => {
                return Err(ServiceError::InsufficientPendingBalance {
                    required: *required,
                    available: wallet.pending_balance,
                });
            }
            _ => {}
        }
    }

    let mut staged = wallets.clone();
    for entry in entries {
        if let Some(wallet) = staged.get_mut(&entry.user_id) {
            apply_entry(wallet, entry)?;
            wallet.updated_at = now;
        }
    }

    *wallets = staged;
    Ok(())
}

fn apply_entry(wallet: &mut Wallet, entry: &LedgerEntry) -> Result<(), ServiceError> {
    let amount = entry.amount;

    match (entry.transaction_type, entry.balance_type) {
        (TransactionType::TransferPendingToAvailable, _) => {
            wallet.pending_balance -= amount;
            wallet.balance = wallet.balance.checked_add(amount).ok_or_else(overflow)?;
        }
        (TransactionType::Deposit | TransactionType::Refund | TransactionType::Earning, balance_type) => {
            let target = match balance_type {
                BalanceType::Deposit => &mut wallet.balance,
                BalanceType::Pending => &mut wallet.pending_balance,
            };
            *target = target.checked_add(amount).ok_or_else(overflow)?;

            if entry.transaction_type == TransactionType::Earning {
                wallet.total_earned = wallet.total_earned.checked_add(amount).ok_or_else(overflow)?;
            }
        }
        (TransactionType::Withdrawal | TransactionType::Payment | TransactionType::Fee, balance_type) => {
            match balance_type {
                BalanceType::Deposit => wallet.balance -= amount,
                BalanceType::Pending => wallet.pending_balance -= amount,
            }

            if entry.transaction_type != TransactionType::Withdrawal {
                wallet.total_spent = wallet.total_spent.checked_add(amount).ok_or_else(overflow)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user_id: Uuid, transaction_type: TransactionType, balance_type: BalanceType, amount: i64) -> LedgerEntry {
        LedgerEntry {
            user_id,
            transaction_type,
            balance_type,
            amount,
            description: None,
            reference_id: None,
            reference_type: None,
        }
    }

    fn wallets_with(balances: &[(Uuid, i64, i64)]) -> HashMap<Uuid, Wallet> {
        let now = Utc::now();
        balances
            .iter()
            .map(|(user_id, balance, pending)| {
                let mut wallet = Wallet::empty(*user_id, now);
                wallet.balance = *balance;
                wallet.pending_balance = *pending;
                (*user_id, wallet)
            })
            .collect()
    }

    #[test]
    fn payment_moves_funds_into_payee_pending() {
        let (payer, payee) = (Uuid::new_v4(), Uuid::new_v4());
        let mut wallets = wallets_with(&[(payer, 10_000, 0), (payee, 0, 0)]);

        apply_entries(
            &mut wallets,
            &[
                entry(payer, TransactionType::Payment, BalanceType::Deposit, 5_000),
                entry(payee, TransactionType::Earning, BalanceType::Pending, 5_000),
            ],
            Utc::now(),
        )
        .unwrap();

        assert_eq!(wallets[&payer].balance, 5_000);
        assert_eq!(wallets[&payer].total_spent, 5_000);
        assert_eq!(wallets[&payee].pending_balance, 5_000);
        assert_eq!(wallets[&payee].total_earned, 5_000);
    }

    #[test]
    fn combined_debits_are_checked_together() {
        let user = Uuid::new_v4();
        let mut wallets = wallets_with(&[(user, 10_000, 0)]);
        let before = wallets.clone();

        let err = apply_entries(
            &mut wallets,
            &[
                entry(user, TransactionType::Withdrawal, BalanceType::Deposit, 9_800),
                entry(user, TransactionType::Fee, BalanceType::Deposit, 490),
            ],
            Utc::now(),
        )
        .unwrap_err();

        match err {
            ServiceError::InsufficientBalance { required, available } => {
                assert_eq!(required, 10_290);
                assert_eq!(available, 10_000);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(wallets, before);
    }

    #[test]
    fn release_needs_enough_pending() {
        let user = Uuid::new_v4();
        let mut wallets = wallets_with(&[(user, 0, 300)]);

        let err = apply_entries(
            &mut wallets,
            &[entry(user, TransactionType::TransferPendingToAvailable, BalanceType::Pending, 500)],
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientPendingBalance { required: 500, available: 300 }));

        apply_entries(
            &mut wallets,
            &[entry(user, TransactionType::TransferPendingToAvailable, BalanceType::Pending, 300)],
            Utc::now(),
        )
        .unwrap();
        assert_eq!(wallets[&user].pending_balance, 0);
        assert_eq!(wallets[&user].balance, 300);
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let user = Uuid::new_v4();
        let mut wallets = wallets_with(&[(user, 100, 0)]);
        let err = apply_entries(
            &mut wallets,
            &[entry(user, TransactionType::Deposit, BalanceType::Deposit, 0)],
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
