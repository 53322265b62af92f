// models/settingsmodel.rs
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::workproofmodel::ApprovalType;

pub const RESERVATION_SETTINGS_KEY: &str = "reservation_settings";
pub const APPROVAL_SETTINGS_KEY: &str = "approval_settings";
pub const REVISION_SETTINGS_KEY: &str = "revision_settings";
pub const PLATFORM_FEE_SETTINGS_KEY: &str = "platform_fee_settings";

pub const SETTING_KEYS: [&str; 4] = [
    RESERVATION_SETTINGS_KEY,
    APPROVAL_SETTINGS_KEY,
    REVISION_SETTINGS_KEY,
    PLATFORM_FEE_SETTINGS_KEY,
];

pub const DEFAULT_RESERVATION_MINUTES: i64 = 30;
pub const DEFAULT_MAX_RESERVATIONS_PER_USER: i64 = 5;
pub const DEFAULT_MANUAL_APPROVAL_DAYS: i64 = 7;
pub const DEFAULT_MAX_REVISION_REQUESTS: i32 = 2;
pub const DEFAULT_REVISION_TIMEOUT_HOURS: i64 = 24;
pub const DEFAULT_REJECTION_TIMEOUT_HOURS: i64 = 24;
pub const DEFAULT_PLATFORM_FEE_BASIS_POINTS: i64 = 500; // 5%

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReservationSettings {
    pub is_enabled: bool,
    #[validate(range(min = 1, max = 10080))]
    pub default_reservation_minutes: i64,
    #[validate(range(min = 1, max = 100))]
    pub max_reservations_per_user: i64,
}

impl Default for ReservationSettings {
    fn default() -> Self {
        ReservationSettings {
            is_enabled: true,
            default_reservation_minutes: DEFAULT_RESERVATION_MINUTES,
            max_reservations_per_user: DEFAULT_MAX_RESERVATIONS_PER_USER,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ApprovalSettings {
    /// Used for jobs that do not carry their own approval type
    pub default_approval_type: ApprovalType,
    #[validate(range(min = 1, max = 90))]
    pub manual_approval_days: i64,
}

impl Default for ApprovalSettings {
    fn default() -> Self {
        ApprovalSettings {
            default_approval_type: ApprovalType::Manual,
            manual_approval_days: DEFAULT_MANUAL_APPROVAL_DAYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RevisionSettings {
    #[validate(range(min = 0, max = 20))]
    pub max_revision_requests: i32,
    #[validate(range(min = 1, max = 720))]
    pub revision_timeout_hours: i64,
    #[validate(range(min = 1, max = 720))]
    pub rejection_timeout_hours: i64,
}

impl Default for RevisionSettings {
    fn default() -> Self {
        RevisionSettings {
            max_revision_requests: DEFAULT_MAX_REVISION_REQUESTS,
            revision_timeout_hours: DEFAULT_REVISION_TIMEOUT_HOURS,
            rejection_timeout_hours: DEFAULT_REJECTION_TIMEOUT_HOURS,
        }
    }
}

/// Fee charged on withdrawals. Amounts are minor units; `maximum_fee` of 0
/// means uncapped. Configured amounts stay at or below 1_000_000_000.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase", default)]
#[validate(schema(function = "validate_fee_bounds"))]
pub struct PlatformFeeSettings {
    pub enabled: bool,
    #[validate(range(min = 0, max = 10000))]
    pub basis_points: i64,
    #[validate(range(min = 0, max = 1_000_000_000))]
    pub fixed_fee: i64,
    #[validate(range(min = 0, max = 1_000_000_000))]
    pub minimum_fee: i64,
    #[validate(range(min = 0, max = 1_000_000_000))]
    pub maximum_fee: i64,
}

fn validate_fee_bounds(fee: &PlatformFeeSettings) -> Result<(), ValidationError> {
    if fee.maximum_fee > 0 && fee.minimum_fee > fee.maximum_fee {
        let mut err = ValidationError::new("fee_bounds");
        err.message = Some("minimumFee cannot exceed maximumFee".into());
        return Err(err);
    }
    Ok(())
}

impl Default for PlatformFeeSettings {
    fn default() -> Self {
        PlatformFeeSettings {
            enabled: true,
            basis_points: DEFAULT_PLATFORM_FEE_BASIS_POINTS,
            fixed_fee: 0,
            minimum_fee: 0,
            maximum_fee: 0,
        }
    }
}

impl PlatformFeeSettings {
    /// `clamp(amount * percentage + fixed, min, max)`, rounded half-up to
    /// the nearest minor unit.
    pub fn fee_for(&self, amount: i64) -> i64 {
        if !self.enabled || amount <= 0 {
            return 0;
        }

        let proportional = (amount as i128 * self.basis_points as i128 + 5_000) / 10_000;
        let mut fee = (proportional as i64).saturating_add(self.fixed_fee);

        if fee < self.minimum_fee {
            fee = self.minimum_fee;
        }
        if self.maximum_fee > 0 && fee > self.maximum_fee {
            fee = self.maximum_fee;
        }

        fee
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformSettings {
    #[validate]
    pub reservation: ReservationSettings,
    #[validate]
    pub approval: ApprovalSettings,
    #[validate]
    pub revision: RevisionSettings,
    #[validate]
    pub fee: PlatformFeeSettings,
}

impl PlatformSettings {
    /// Build the snapshot from `(setting_key, setting_value)` rows. A
    /// document that fails to parse falls back to its defaults.
    pub fn from_documents<I>(documents: I) -> Self
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        let mut settings = PlatformSettings::default();

        for (key, value) in documents {
            match key.as_str() {
                RESERVATION_SETTINGS_KEY => settings.reservation = parse_document(&key, value),
                APPROVAL_SETTINGS_KEY => settings.approval = parse_document(&key, value),
                REVISION_SETTINGS_KEY => settings.revision = parse_document(&key, value),
                PLATFORM_FEE_SETTINGS_KEY => settings.fee = parse_document(&key, value),
                other => tracing::debug!("Ignoring unknown settings document {}", other),
            }
        }

        settings
    }

    pub fn to_documents(&self) -> Result<Vec<(&'static str, serde_json::Value)>, serde_json::Error> {
        Ok(vec![
            (RESERVATION_SETTINGS_KEY, serde_json::to_value(&self.reservation)?),
            (APPROVAL_SETTINGS_KEY, serde_json::to_value(&self.approval)?),
            (REVISION_SETTINGS_KEY, serde_json::to_value(&self.revision)?),
            (PLATFORM_FEE_SETTINGS_KEY, serde_json::to_value(&self.fee)?),
        ])
    }
}

fn parse_document<T: serde::de::DeserializeOwned + Default>(key: &str, value: serde_json::Value) -> T {
    match serde_json::from_value(value) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Invalid settings document {}: {}. Using defaults", key, e);
            T::default()
        }
    }
}
