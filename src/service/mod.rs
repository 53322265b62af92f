pub mod background_jobs;
pub mod error;
pub mod reservation_service;
pub mod settings_service;
pub mod sweeper;
pub mod wallet_service;
pub mod workproof_service;
pub mod workproof_state;
