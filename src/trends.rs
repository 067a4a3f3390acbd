use std::collections::HashMap;

use chrono::{Datelike, Duration, Months, NaiveDate, Utc};

use crate::bucket::{bucket_key, display_label, parse_instant};
use crate::cancel::CancellationToken;
use crate::error::EngineError;
use crate::models::{ReviewRecord, TrendBucket};
use crate::period::{Granularity, Period, Window};
use crate::store::{fetch_reviews, ReviewFilter, ReviewStore, TenantMatch};

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Default)]
struct BucketAccum {
    total: u64,
    replied: u64,
    response_hours: f64,
}

/// Groups in-window records by bucket key. Records whose creation time does
/// not parse are excluded here; trends are strictly time-scoped.
fn aggregate(
    records: &[ReviewRecord],
    window: Window,
    granularity: Granularity,
) -> HashMap<String, BucketAccum> {
    let mut buckets: HashMap<String, BucketAccum> = HashMap::new();

    for record in records {
        let Some(created) = parse_instant(&record.create_time) else {
            continue;
        };
        if created < window.start || created > window.end {
            continue;
        }

        let entry = buckets
            .entry(bucket_key(created.date(), granularity))
            .or_default();
        entry.total += 1;

        if record.has_reply() {
            entry.replied += 1;
            // A counted reply is never discarded: an absent or unparsable
            // reply timestamp falls back to the creation time (zero hours).
            let replied_at = record
                .reply
                .as_ref()
                .and_then(|r| r.update_time.as_deref())
                .and_then(parse_instant)
                .unwrap_or(created);
            let hours = (replied_at - created).num_seconds() as f64 / 3600.0;
            entry.response_hours += hours.max(0.0);
        }
    }

    buckets
}

fn finish_bucket(
    date: NaiveDate,
    period: Period,
    buckets: &HashMap<String, BucketAccum>,
    series: &mut Vec<TrendBucket>,
) {
    let key = bucket_key(date, period.granularity());
    if series.last().map(|b| b.bucket_key == key).unwrap_or(false) {
        return;
    }

    let (total, replied, reply_rate, avg_hours) = match buckets.get(&key) {
        Some(acc) => {
            let rate = if acc.total > 0 {
                round1(acc.replied as f64 / acc.total as f64 * 100.0)
            } else {
                0.0
            };
            let avg = if acc.replied > 0 {
                round1(acc.response_hours / acc.replied as f64)
            } else {
                0.0
            };
            (acc.total, acc.replied, rate, avg)
        }
        None => (0, 0, 0.0, 0.0),
    };

    series.push(TrendBucket {
        bucket_key: key,
        display_label: display_label(date, period),
        total_count: total,
        replied_count: replied,
        reply_rate_percent: reply_rate,
        avg_response_hours: avg_hours,
    });
}

/// Walks the whole window at the granularity step and emits one bucket per
/// step, zero-valued where nothing aggregated. The result is ordered,
/// gap-free, and always includes the bucket containing the window end.
fn fill_window(
    buckets: &HashMap<String, BucketAccum>,
    window: Window,
    period: Period,
) -> Vec<TrendBucket> {
    let mut series = Vec::new();
    let start = window.start.date();
    let end = window.end.date();

    match period.granularity() {
        Granularity::Day => {
            let mut current = start;
            while current <= end {
                finish_bucket(current, period, buckets, &mut series);
                current = current + Duration::days(1);
            }
        }
        Granularity::Week => {
            let end_key = bucket_key(end, Granularity::Week);
            let mut current = start;
            loop {
                finish_bucket(current, period, buckets, &mut series);
                if bucket_key(current, Granularity::Week) == end_key {
                    break;
                }
                current = current + Duration::days(7);
            }
        }
        Granularity::Month => {
            // Step the month field itself; a fixed 30-day stride drifts
            // across months of different lengths.
            let mut current = start.with_day(1).unwrap_or(start);
            let last = end.with_day(1).unwrap_or(end);
            while current <= last {
                finish_bucket(current, period, buckets, &mut series);
                current = current + Months::new(1);
            }
        }
    }

    series
}

/// Pure reduction: records plus an explicit window into a dense trend
/// series. `get_trend` resolves the window from the current time.
pub fn trend_series(records: &[ReviewRecord], window: Window, period: Period) -> Vec<TrendBucket> {
    let buckets = aggregate(records, window, period.granularity());
    fill_window(&buckets, window, period)
}

pub async fn trend_in_window(
    store: &dyn ReviewStore,
    tenant: TenantMatch,
    period: Period,
    window: Window,
    cancel: &CancellationToken,
) -> Result<Vec<TrendBucket>, EngineError> {
    let filter = ReviewFilter {
        tenant: Some(tenant),
        date_range: Some((window.start, window.end)),
        ..ReviewFilter::default()
    };
    let records = fetch_reviews(store, &filter, cancel).await?;
    Ok(trend_series(&records, window, period))
}

/// Dense trend series for the period ending now.
pub async fn get_trend(
    store: &dyn ReviewStore,
    tenant: TenantMatch,
    period: Period,
    cancel: &CancellationToken,
) -> Result<Vec<TrendBucket>, EngineError> {
    let window = period.resolve(Utc::now().naive_utc());
    trend_in_window(store, tenant, period, window, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancellation_pair;
    use crate::models::{ReviewReply, StarRating, TenantId};
    use crate::store::MemoryStore;
    use chrono::NaiveDateTime;

    fn instant(raw: &str) -> NaiveDateTime {
        parse_instant(raw).unwrap()
    }

    fn review(create_time: &str, rating: StarRating, reply_time: Option<&str>) -> ReviewRecord {
        ReviewRecord {
            review_id: format!("r-{create_time}-{}", rating.ordinal()),
            tenant_id: TenantId::Number(42),
            tenant_name: "Harbor Cafe".to_string(),
            reviewer_name: "Dana Whitfield".to_string(),
            star_rating: rating,
            comment: Some("Great espresso".to_string()),
            create_time: create_time.to_string(),
            reply: reply_time.map(|t| ReviewReply {
                comment: "Thanks for stopping by!".to_string(),
                update_time: Some(t.to_string()),
            }),
        }
    }

    fn window(start: &str, end: &str) -> Window {
        Window {
            start: instant(start),
            end: instant(end),
        }
    }

    #[test]
    fn daily_buckets_carry_counts_rates_and_latency() {
        let records = vec![
            review(
                "2025-08-01T10:00:00Z",
                StarRating::Five,
                Some("2025-08-01T12:00:00Z"),
            ),
            review("2025-08-01T11:00:00Z", StarRating::One, None),
        ];
        let w = window("2025-07-29T00:00:00Z", "2025-08-05T00:00:00Z");
        let series = trend_series(&records, w, Period::Days7);

        assert_eq!(series.len(), 8);
        let bucket = series
            .iter()
            .find(|b| b.bucket_key == "2025-08-01")
            .unwrap();
        assert_eq!(bucket.total_count, 2);
        assert_eq!(bucket.replied_count, 1);
        assert_eq!(bucket.reply_rate_percent, 50.0);
        assert_eq!(bucket.avg_response_hours, 2.0);
    }

    #[test]
    fn empty_window_yields_a_full_zero_series() {
        let w = window("2025-07-06T09:00:00Z", "2025-08-05T09:00:00Z");
        let series = trend_series(&[], w, Period::Days30);

        assert_eq!(series.len(), 31);
        assert!(series
            .iter()
            .all(|b| b.total_count == 0 && b.reply_rate_percent == 0.0));
    }

    #[test]
    fn bucket_keys_are_unique_and_strictly_increasing() {
        let w = window("2025-05-22T00:00:00Z", "2025-08-20T00:00:00Z");
        for period in [Period::Days7, Period::Days30, Period::Months3, Period::Months12] {
            let series = trend_series(&[], w, period);
            for pair in series.windows(2) {
                assert!(
                    pair[0].bucket_key < pair[1].bucket_key,
                    "{period:?}: {} !< {}",
                    pair[0].bucket_key,
                    pair[1].bucket_key
                );
            }
            assert!(!series.is_empty());
        }
    }

    #[test]
    fn weekly_series_covers_records_near_the_window_end() {
        let w = window("2025-05-22T00:00:00Z", "2025-08-20T00:00:00Z");
        let records = vec![
            review("2025-05-22T08:00:00Z", StarRating::Four, None),
            review("2025-08-20T00:00:00Z", StarRating::Three, None),
        ];
        let series = trend_series(&records, w, Period::Months3);

        let total: u64 = series.iter().map(|b| b.total_count).sum();
        assert_eq!(total, 2);
        let end_key = bucket_key(w.end.date(), Granularity::Week);
        assert_eq!(series.last().unwrap().bucket_key, end_key);
    }

    #[test]
    fn monthly_series_steps_calendar_months_across_year_boundaries() {
        let w = window("2024-08-20T12:00:00Z", "2025-08-20T12:00:00Z");
        let series = trend_series(&[], w, Period::Months12);

        assert_eq!(series.first().unwrap().bucket_key, "2024-08");
        assert_eq!(series.last().unwrap().bucket_key, "2025-08");
        assert_eq!(series.len(), 13);
        assert_eq!(series.first().unwrap().display_label, "Aug 2024");
    }

    #[test]
    fn out_of_window_and_unparsable_records_are_excluded() {
        let mut bad = review("2025-08-01T10:00:00Z", StarRating::Two, None);
        bad.create_time = "last Tuesday".to_string();
        let records = vec![
            bad,
            review("2025-06-01T10:00:00Z", StarRating::Two, None),
            review("2025-08-01T10:00:00Z", StarRating::Five, None),
        ];
        let w = window("2025-07-29T00:00:00Z", "2025-08-05T00:00:00Z");
        let series = trend_series(&records, w, Period::Days7);

        let total: u64 = series.iter().map(|b| b.total_count).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn unparsable_reply_time_still_counts_as_replied_at_zero_hours() {
        let rec = review("2025-08-01T10:00:00Z", StarRating::Five, Some("soon"));
        let w = window("2025-07-29T00:00:00Z", "2025-08-05T00:00:00Z");
        let series = trend_series(&[rec], w, Period::Days7);

        let bucket = series
            .iter()
            .find(|b| b.bucket_key == "2025-08-01")
            .unwrap();
        assert_eq!(bucket.replied_count, 1);
        assert_eq!(bucket.avg_response_hours, 0.0);
        assert_eq!(bucket.reply_rate_percent, 100.0);
    }

    #[test]
    fn blank_reply_comment_is_not_a_reply() {
        let mut rec = review(
            "2025-08-01T10:00:00Z",
            StarRating::Five,
            Some("2025-08-01T12:00:00Z"),
        );
        rec.reply.as_mut().unwrap().comment = " ".to_string();
        let w = window("2025-07-29T00:00:00Z", "2025-08-05T00:00:00Z");
        let series = trend_series(&[rec], w, Period::Days7);

        let bucket = series
            .iter()
            .find(|b| b.bucket_key == "2025-08-01")
            .unwrap();
        assert_eq!(bucket.total_count, 1);
        assert_eq!(bucket.replied_count, 0);
    }

    #[test]
    fn negative_latency_clamps_to_zero() {
        let rec = review(
            "2025-08-01T10:00:00Z",
            StarRating::Five,
            Some("2025-08-01T08:00:00Z"),
        );
        let w = window("2025-07-29T00:00:00Z", "2025-08-05T00:00:00Z");
        let series = trend_series(&[rec], w, Period::Days7);

        let bucket = series
            .iter()
            .find(|b| b.bucket_key == "2025-08-01")
            .unwrap();
        assert_eq!(bucket.avg_response_hours, 0.0);
    }

    #[test]
    fn identical_inputs_produce_identical_series() {
        let records = vec![
            review(
                "2025-08-01T10:00:00Z",
                StarRating::Five,
                Some("2025-08-01T12:00:00Z"),
            ),
            review("2025-08-03T09:00:00Z", StarRating::Two, None),
        ];
        let w = window("2025-07-29T00:00:00Z", "2025-08-05T00:00:00Z");
        assert_eq!(
            trend_series(&records, w, Period::Days7),
            trend_series(&records, w, Period::Days7)
        );
    }

    #[tokio::test]
    async fn cancellation_wins_over_the_store_round_trip() {
        let store = MemoryStore {
            records: vec![review("2025-08-01T10:00:00Z", StarRating::Five, None)],
        };
        let (handle, token) = cancellation_pair();
        handle.cancel();
        let result = get_trend(&store, TenantMatch::Any, Period::Days30, &token).await;
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }

    #[tokio::test]
    async fn trend_scopes_by_tenant_across_id_forms() {
        let mut other = review("2025-08-01T10:00:00Z", StarRating::Three, None);
        other.tenant_id = TenantId::Text("7".to_string());
        other.tenant_name = "Pier Diner".to_string();
        other.review_id = "r-other".to_string();
        let store = MemoryStore {
            records: vec![review("2025-08-01T10:00:00Z", StarRating::Five, None), other],
        };

        let w = window("2025-07-29T00:00:00Z", "2025-08-05T00:00:00Z");
        let token = CancellationToken::never();
        let series = trend_in_window(
            &store,
            TenantMatch::parse(Some("42")),
            Period::Days7,
            w,
            &token,
        )
        .await
        .unwrap();
        let total: u64 = series.iter().map(|b| b.total_count).sum();
        assert_eq!(total, 1);
    }
}
