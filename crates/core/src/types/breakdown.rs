//! Aggregate status counts for a set of warranties.

use serde::Serialize;

use super::status::WarrantyStatus;

/// Number of warranties in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusBreakdown {
    /// Warranties with more than the expiring horizon left.
    pub active: usize,
    /// Warranties ending within the horizon.
    pub expiring: usize,
    /// Warranties past their expiry date.
    pub expired: usize,
}

impl StatusBreakdown {
    /// Count statuses from an iterator.
    pub fn from_statuses(statuses: impl IntoIterator<Item = WarrantyStatus>) -> Self {
        statuses.into_iter().fold(Self::default(), |mut acc, status| {
            acc.record(status);
            acc
        })
    }

    /// Add one status to the counts.
    pub const fn record(&mut self, status: WarrantyStatus) {
        match status {
            WarrantyStatus::Active => self.active += 1,
            WarrantyStatus::Expiring => self.expiring += 1,
            WarrantyStatus::Expired => self.expired += 1,
        }
    }

    /// Count for one status.
    #[must_use]
    pub const fn count(&self, status: WarrantyStatus) -> usize {
        match status {
            WarrantyStatus::Active => self.active,
            WarrantyStatus::Expiring => self.expiring,
            WarrantyStatus::Expired => self.expired,
        }
    }

    /// Total number of warranties counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.active + self.expiring + self.expired
    }

    /// Fraction of warranties in `status`, or `0.0` when nothing was counted.
    #[must_use]
    pub fn share(&self, status: WarrantyStatus) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)] // Warranty counts will never exceed f64 precision
        let share = self.count(status) as f64 / total as f64;
        share
    }
}

impl FromIterator<WarrantyStatus> for StatusBreakdown {
    fn from_iter<I: IntoIterator<Item = WarrantyStatus>>(iter: I) -> Self {
        Self::from_statuses(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_breakdown() {
        let breakdown = StatusBreakdown::default();
        assert_eq!(breakdown.total(), 0);
        assert!((breakdown.share(WarrantyStatus::Expired) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_counts_and_shares() {
        let breakdown: StatusBreakdown = [
            WarrantyStatus::Active,
            WarrantyStatus::Active,
            WarrantyStatus::Expiring,
            WarrantyStatus::Expired,
        ]
        .into_iter()
        .collect();

        assert_eq!(breakdown.active, 2);
        assert_eq!(breakdown.expiring, 1);
        assert_eq!(breakdown.expired, 1);
        assert_eq!(breakdown.total(), 4);
        assert!((breakdown.share(WarrantyStatus::Active) - 0.5).abs() < f64::EPSILON);
        assert!((breakdown.share(WarrantyStatus::Expired) - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shares_sum_to_one() {
        let breakdown = StatusBreakdown::from_statuses([
            WarrantyStatus::Active,
            WarrantyStatus::Expiring,
            WarrantyStatus::Expired,
        ]);
        let sum: f64 = WarrantyStatus::ALL
            .iter()
            .map(|s| breakdown.share(*s))
            .sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
