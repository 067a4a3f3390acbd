use chrono::{Duration, NaiveDateTime};

use crate::error::EngineError;

/// Reporting windows supported by the trend endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Days7,
    Days30,
    Months3,
    Months12,
}

/// Step size of the buckets a period resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Week,
    Month,
}

/// Inclusive date window a trend is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Review-volume trends accept every period.
pub const REVIEW_TREND_PERIODS: &[Period] = &[
    Period::Days7,
    Period::Days30,
    Period::Months3,
    Period::Months12,
];

/// Response trends stop at quarterly resolution.
pub const RESPONSE_TREND_PERIODS: &[Period] =
    &[Period::Days7, Period::Days30, Period::Months3];

impl Period {
    pub fn token(&self) -> &'static str {
        match self {
            Period::Days7 => "7d",
            Period::Days30 => "30d",
            Period::Months3 => "3m",
            Period::Months12 => "12m",
        }
    }

    /// Parses a period token against the set a caller supports. An absent
    /// token is the caller's business (default to 30d before calling this).
    pub fn parse(token: &str, supported: &[Period]) -> Result<Period, EngineError> {
        supported
            .iter()
            .copied()
            .find(|p| p.token() == token)
            .ok_or_else(|| EngineError::InvalidPeriod(token.to_string()))
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            Period::Days7 | Period::Days30 => Granularity::Day,
            Period::Months3 => Granularity::Week,
            Period::Months12 => Granularity::Month,
        }
    }

    fn span(&self) -> Duration {
        match self {
            Period::Days7 => Duration::days(7),
            Period::Days30 => Duration::days(30),
            Period::Months3 => Duration::days(90),
            Period::Months12 => Duration::days(365),
        }
    }

    /// Resolves the inclusive window ending at `now`.
    pub fn resolve(&self, now: NaiveDateTime) -> Window {
        Window {
            start: now - self.span(),
            end: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn tokens_round_trip_for_supported_sets() {
        for period in REVIEW_TREND_PERIODS {
            let parsed = Period::parse(period.token(), REVIEW_TREND_PERIODS).unwrap();
            assert_eq!(parsed, *period);
        }
    }

    #[test]
    fn monthly_period_is_rejected_for_response_trends() {
        let err = Period::parse("12m", RESPONSE_TREND_PERIODS).unwrap_err();
        assert!(matches!(err, EngineError::InvalidPeriod(token) if token == "12m"));
    }

    #[test]
    fn unknown_token_is_invalid() {
        assert!(Period::parse("90d", REVIEW_TREND_PERIODS).is_err());
    }

    #[test]
    fn granularity_follows_period() {
        assert_eq!(Period::Days7.granularity(), Granularity::Day);
        assert_eq!(Period::Days30.granularity(), Granularity::Day);
        assert_eq!(Period::Months3.granularity(), Granularity::Week);
        assert_eq!(Period::Months12.granularity(), Granularity::Month);
    }

    #[test]
    fn window_ends_at_now_and_spans_the_period() {
        let now = at(2025, 8, 20);
        let window = Period::Days30.resolve(now);
        assert_eq!(window.end, now);
        assert_eq!(window.start, now - Duration::days(30));
    }
}
