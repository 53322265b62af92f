pub mod cache;
pub mod db;
#[cfg(test)]
pub mod memorydb;
pub mod posting;
pub mod reservationdb;
pub mod settingsdb;
#[cfg(test)]
pub mod testdb;
pub mod walletdb;
pub mod workproofdb;

use reservationdb::ReservationExt;
use settingsdb::SettingsExt;
use walletdb::WalletExt;
use workproofdb::WorkProofExt;

/// Everything the services need from storage. `DBClient` is the production
/// implementation; tests use the in-memory store.
pub trait LedgerStore:
    WalletExt + ReservationExt + WorkProofExt + SettingsExt + std::fmt::Debug + Send + Sync
{
}

impl<T> LedgerStore for T where
    T: WalletExt + ReservationExt + WorkProofExt + SettingsExt + std::fmt::Debug + Send + Sync
{
}
