use std::fmt::Write;

use crate::models::{SummaryStats, TenantSummary, TrendBucket};
use crate::period::Period;

/// Renders a markdown dashboard from independently computed aggregations.
pub fn build_report(
    tenant: Option<&str>,
    period: Period,
    trend: &[TrendBucket],
    summary: &SummaryStats,
    roster: &[TenantSummary],
) -> String {
    let mut output = String::new();
    let scope_label = tenant.unwrap_or("all tenants");

    let _ = writeln!(output, "# Review Analytics Report");
    let _ = writeln!(
        output,
        "Generated for {} over the last {}",
        scope_label,
        period.token()
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Total reviews: {}", summary.total_reviews);
    let _ = writeln!(output, "- Pending replies: {}", summary.pending_count);
    let _ = writeln!(output, "- Average rating: {:.1}", summary.average_rating);
    let _ = writeln!(
        output,
        "- Response rate: {:.1}%",
        summary.response_rate_percent
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Rating Distribution");
    for entry in &summary.rating_distribution {
        let _ = writeln!(output, "- {} star: {}", entry.rating, entry.count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Review Volume");
    let _ = writeln!(output, "| Bucket | Label | Reviews | Replied | Reply rate | Avg response (h) |");
    let _ = writeln!(output, "|---|---|---|---|---|---|");
    for bucket in trend {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {:.1}% | {:.1} |",
            bucket.bucket_key,
            bucket.display_label,
            bucket.total_count,
            bucket.replied_count,
            bucket.reply_rate_percent,
            bucket.avg_response_hours
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Tenants");
    if roster.is_empty() {
        let _ = writeln!(output, "No reviews recorded yet.");
    } else {
        for row in roster {
            let last = row
                .last_review_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let _ = writeln!(
                output,
                "- {} ({}): {} reviews, avg {:.1}, {} pending, last review {}",
                row.tenant_name,
                row.tenant_id,
                row.stats.total_reviews,
                row.stats.average_rating,
                row.stats.pending_count,
                last
            );
        }
    }

    output
}
