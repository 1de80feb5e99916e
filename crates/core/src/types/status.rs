//! Warranty status classification.
//!
//! A warranty's status and progress are derived fresh from its purchase and
//! expiry dates relative to "now"; nothing here is persisted.
//!
//! ```
//! use chrono::NaiveDate;
//! use warranty_core::{ProgressBand, WarrantyStatus, classify};
//!
//! let date = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
//!
//! let result = classify(date("2023-06-10"), date("2025-06-10"), date("2024-06-10")).unwrap();
//! assert_eq!(result.status, WarrantyStatus::Active);
//! assert_eq!(result.progress.band(), ProgressBand::Caution);
//! ```

use core::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::warranty::WarrantyError;

/// Days before expiry at which a warranty counts as expiring.
pub const DEFAULT_EXPIRING_HORIZON_DAYS: u32 = 60;

/// Temporal state of a warranty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarrantyStatus {
    /// Coverage runs for longer than the expiring horizon.
    Active,
    /// Coverage ends within the expiring horizon.
    Expiring,
    /// Coverage has ended.
    Expired,
}

impl WarrantyStatus {
    /// All statuses, in display order.
    pub const ALL: [Self; 3] = [Self::Active, Self::Expiring, Self::Expired];
}

impl fmt::Display for WarrantyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Expiring => write!(f, "expiring"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

impl std::str::FromStr for WarrantyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "expiring" => Ok(Self::Expiring),
            "expired" => Ok(Self::Expired),
            _ => Err(format!("invalid warranty status: {s}")),
        }
    }
}

/// Colour band of the progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressBand {
    /// Less than 40% of the coverage period has elapsed.
    Healthy,
    /// Between 40% and 65% has elapsed.
    Caution,
    /// At least 65% has elapsed.
    Urgent,
}

impl fmt::Display for ProgressBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Caution => write!(f, "caution"),
            Self::Urgent => write!(f, "urgent"),
        }
    }
}

/// Elapsed fraction of a warranty's coverage period, always in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Progress(f64);

impl Progress {
    /// Nothing elapsed.
    pub const NONE: Self = Self(0.0);
    /// Fully elapsed.
    pub const FULL: Self = Self(1.0);

    /// Lower bound of [`ProgressBand::Caution`].
    pub const CAUTION_THRESHOLD: f64 = 0.4;
    /// Lower bound of [`ProgressBand::Urgent`].
    pub const URGENT_THRESHOLD: f64 = 0.65;

    /// Create a progress value, clamping into `[0, 1]`. `NaN` maps to zero.
    #[must_use]
    pub fn new(fraction: f64) -> Self {
        if fraction.is_nan() {
            return Self::NONE;
        }
        Self(fraction.clamp(0.0, 1.0))
    }

    /// The fraction as a float in `[0, 1]`.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.0
    }

    /// The fraction as a whole percentage.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Clamped to 0..=100
    pub fn percent(&self) -> u8 {
        (self.0 * 100.0).round() as u8
    }

    /// Colour band for the progress indicator.
    #[must_use]
    pub fn band(&self) -> ProgressBand {
        if self.0 >= Self::URGENT_THRESHOLD {
            ProgressBand::Urgent
        } else if self.0 >= Self::CAUTION_THRESHOLD {
            ProgressBand::Caution
        } else {
            ProgressBand::Healthy
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::NONE
    }
}

impl From<f64> for Progress {
    fn from(fraction: f64) -> Self {
        Self::new(fraction)
    }
}

impl From<Progress> for f64 {
    fn from(progress: Progress) -> Self {
        progress.0
    }
}

/// Human-readable distance between now and a warranty's expiry date.
///
/// Months are 30-day blocks and years 365-day blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemainingTime {
    days: i64,
}

impl RemainingTime {
    /// Build from a signed day count; negative means the date has passed.
    #[must_use]
    pub const fn from_days(days: i64) -> Self {
        Self { days }
    }

    /// Signed day count.
    #[must_use]
    pub const fn days(&self) -> i64 {
        self.days
    }

    fn span(&self) -> String {
        let days = self.days.unsigned_abs();
        let (count, unit) = if days < 30 {
            (days, "day")
        } else if days < 365 {
            (days / 30, "month")
        } else {
            (days / 365, "year")
        };
        if count == 1 {
            format!("1 {unit}")
        } else {
            format!("{count} {unit}s")
        }
    }
}

impl fmt::Display for RemainingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.days {
            0 => write!(f, "today"),
            d if d > 0 => write!(f, "in {}", self.span()),
            _ => write!(f, "{} ago", self.span()),
        }
    }
}

/// Result of classifying a warranty on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Derived status.
    pub status: WarrantyStatus,
    /// Elapsed fraction of the coverage period.
    pub progress: Progress,
    /// Days from now until expiry; negative once expired.
    pub days_remaining: i64,
}

impl Classification {
    /// Distance to expiry in display form.
    #[must_use]
    pub const fn remaining(&self) -> RemainingTime {
        RemainingTime::from_days(self.days_remaining)
    }
}

/// Classification rules with a configurable expiring horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolicy {
    expiring_horizon_days: u32,
}

impl StatusPolicy {
    /// Create a policy that flags warranties ending within `expiring_horizon_days`.
    #[must_use]
    pub const fn new(expiring_horizon_days: u32) -> Self {
        Self {
            expiring_horizon_days,
        }
    }

    /// The expiring horizon in days.
    #[must_use]
    pub const fn expiring_horizon_days(&self) -> u32 {
        self.expiring_horizon_days
    }

    /// Classify a warranty running from `purchase` to `expiry` as seen on `now`.
    ///
    /// # Errors
    ///
    /// Returns [`WarrantyError::InvalidDateRange`] if `expiry` is before `purchase`.
    pub fn classify(
        &self,
        purchase: NaiveDate,
        expiry: NaiveDate,
        now: NaiveDate,
    ) -> Result<Classification, WarrantyError> {
        if expiry < purchase {
            return Err(WarrantyError::InvalidDateRange { purchase, expiry });
        }
        Ok(self.classify_ordered(purchase, expiry, now))
    }

    /// Classification for a range already known to satisfy `purchase <= expiry`.
    pub(crate) fn classify_ordered(
        &self,
        purchase: NaiveDate,
        expiry: NaiveDate,
        now: NaiveDate,
    ) -> Classification {
        let days_remaining = (expiry - now).num_days();

        if now > expiry {
            return Classification {
                status: WarrantyStatus::Expired,
                progress: Progress::FULL,
                days_remaining,
            };
        }

        let status = if days_remaining <= i64::from(self.expiring_horizon_days) {
            WarrantyStatus::Expiring
        } else {
            WarrantyStatus::Active
        };

        Classification {
            status,
            progress: elapsed_fraction(purchase, expiry, now),
            days_remaining,
        }
    }
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRING_HORIZON_DAYS)
    }
}

/// Classify with the default 60-day expiring horizon.
///
/// # Errors
///
/// Returns [`WarrantyError::InvalidDateRange`] if `expiry` is before `purchase`.
pub fn classify(
    purchase: NaiveDate,
    expiry: NaiveDate,
    now: NaiveDate,
) -> Result<Classification, WarrantyError> {
    StatusPolicy::default().classify(purchase, expiry, now)
}

fn elapsed_fraction(purchase: NaiveDate, expiry: NaiveDate, now: NaiveDate) -> Progress {
    let total = (expiry - purchase).num_days();
    if total == 0 {
        return if now >= purchase {
            Progress::FULL
        } else {
            Progress::NONE
        };
    }

    let elapsed = (now - purchase).num_days();
    #[allow(clippy::cast_precision_loss)] // Day counts stay far below 2^52
    let fraction = elapsed as f64 / total as f64;
    Progress::new(fraction)
}
