pub mod admin;
pub mod cron;
pub mod reservation;
pub mod wallet;
pub mod workproof;
