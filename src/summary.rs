use std::collections::BTreeMap;

use crate::bucket::parse_instant;
use crate::cancel::CancellationToken;
use crate::error::EngineError;
use crate::models::{RatingCount, ReviewRecord, SummaryStats, TenantSummary};
use crate::store::{fetch_reviews, ReviewFilter, ReviewStore};
use crate::trends::round1;

/// Single-pass lifetime reduction. Unlike trends, this counts every record,
/// including ones whose creation timestamp never parses.
pub fn summarize<'a>(records: impl IntoIterator<Item = &'a ReviewRecord>) -> SummaryStats {
    let mut total = 0u64;
    let mut pending = 0u64;
    let mut replied = 0u64;
    let mut rating_sum = 0u64;
    let mut histogram = [0u64; 5];

    for record in records {
        total += 1;
        if record.has_reply() {
            replied += 1;
        } else {
            pending += 1;
        }
        let ordinal = record.star_rating.ordinal();
        rating_sum += u64::from(ordinal);
        histogram[usize::from(ordinal) - 1] += 1;
    }

    let average_rating = if total > 0 {
        round1(rating_sum as f64 / total as f64)
    } else {
        0.0
    };
    let response_rate_percent = if total > 0 {
        round1(replied as f64 / total as f64 * 100.0)
    } else {
        0.0
    };

    SummaryStats {
        total_reviews: total,
        pending_count: pending,
        average_rating,
        response_rate_percent,
        rating_distribution: (1..=5u8)
            .map(|rating| RatingCount {
                rating,
                count: histogram[usize::from(rating) - 1],
            })
            .collect(),
    }
}

/// Groups records per tenant and applies the lifetime reduction to each
/// group, tracking the most recent parsable review date.
pub fn roster(records: &[ReviewRecord]) -> Vec<TenantSummary> {
    let mut groups: BTreeMap<(String, String), Vec<&ReviewRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.tenant_id.as_text(), record.tenant_name.clone()))
            .or_default()
            .push(record);
    }

    groups
        .into_iter()
        .map(|((tenant_id, tenant_name), rows)| {
            let last_review_date = rows
                .iter()
                .filter_map(|r| parse_instant(&r.create_time))
                .max();
            TenantSummary {
                tenant_id,
                tenant_name,
                stats: summarize(rows.iter().copied()),
                last_review_date,
            }
        })
        .collect()
}

/// Lifetime summary for the records matching a filter. The date range is
/// always cleared: summaries cover all of history.
pub async fn get_summary(
    store: &dyn ReviewStore,
    filter: ReviewFilter,
    cancel: &CancellationToken,
) -> Result<SummaryStats, EngineError> {
    let filter = ReviewFilter {
        date_range: None,
        ..filter
    };
    let records = fetch_reviews(store, &filter, cancel).await?;
    Ok(summarize(&records))
}

/// Per-tenant roster over all of history.
pub async fn get_roster(
    store: &dyn ReviewStore,
    cancel: &CancellationToken,
) -> Result<Vec<TenantSummary>, EngineError> {
    let records = fetch_reviews(store, &ReviewFilter::default(), cancel).await?;
    Ok(roster(&records))
}
