use chrono::{DateTime, Utc};

/// Outcome of switching a wallet-paid subscription mid-period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proration {
    /// Value of the unused part of the current period.
    pub unused_credit_minor: i64,
    /// Amount to debit (positive) or refund (negative).
    pub net_minor: i64,
}

/// Immediate proration: the unused share of the old price offsets the full new price.
pub fn prorate(
    old_price_minor: i32,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    now: DateTime<Utc>,
    new_price_minor: i32,
) -> Proration {
    let total_seconds = (period_end - period_start).num_seconds();
    let unused_credit_minor = if total_seconds <= 0 {
        0
    } else {
        let remaining_seconds = (period_end - now).num_seconds().clamp(0, total_seconds);
        i64::from(old_price_minor) * remaining_seconds / total_seconds
    };

    Proration {
        unused_credit_minor,
        net_minor: i64::from(new_price_minor) - unused_credit_minor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn period() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();
        (start, start + Duration::days(30))
    }

    #[test]
    fn upgrade_halfway_through_charges_difference() {
        let (start, end) = period();
        let proration = prorate(1_000, start, end, start + Duration::days(15), 3_000);
        assert_eq!(proration.unused_credit_minor, 500);
        assert_eq!(proration.net_minor, 2_500);
    }

    #[test]
    fn downgrade_at_period_start_refunds() {
        let (start, end) = period();
        let proration = prorate(3_000, start, end, start, 1_000);
        assert_eq!(proration.unused_credit_minor, 3_000);
        assert_eq!(proration.net_minor, -2_000);
    }

    #[test]
    fn expired_period_gives_no_credit() {
        let (start, end) = period();
        let proration = prorate(3_000, start, end, end + Duration::days(2), 1_000);
        assert_eq!(proration.unused_credit_minor, 0);
        assert_eq!(proration.net_minor, 1_000);
    }

    #[test]
    fn degenerate_period_gives_no_credit() {
        let (start, _) = period();
        let proration = prorate(3_000, start, start, start, 500);
        assert_eq!(proration.unused_credit_minor, 0);
        assert_eq!(proration.net_minor, 500);
    }
}
