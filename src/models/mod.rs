pub mod reservationmodel;
pub mod settingsmodel;
pub mod usermodel;
pub mod walletmodels;
pub mod workproofmodel;
