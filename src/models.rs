use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Tenant identifiers arrive from upstream feeds as either a number or a
/// string; both forms refer to the same tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TenantId {
    Number(i64),
    Text(String),
}

impl TenantId {
    pub fn as_text(&self) -> String {
        match self {
            TenantId::Number(n) => n.to_string(),
            TenantId::Text(s) => s.clone(),
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            TenantId::Number(n) => Some(*n),
            TenantId::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StarRating {
    One,
    Two,
    Three,
    Four,
    Five,
}

impl StarRating {
    /// Parses the upstream symbol form. Unknown symbols degrade to the
    /// midpoint rather than aborting a scan.
    pub fn from_symbol(symbol: &str) -> StarRating {
        match symbol {
            "ONE" => StarRating::One,
            "TWO" => StarRating::Two,
            "THREE" => StarRating::Three,
            "FOUR" => StarRating::Four,
            "FIVE" => StarRating::Five,
            _ => StarRating::Three,
        }
    }

    pub fn ordinal(&self) -> u8 {
        match self {
            StarRating::One => 1,
            StarRating::Two => 2,
            StarRating::Three => 3,
            StarRating::Four => 4,
            StarRating::Five => 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewReply {
    pub comment: String,
    /// Raw reply timestamp; may be absent or unparsable on incomplete writes.
    pub update_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub review_id: String,
    pub tenant_id: TenantId,
    pub tenant_name: String,
    pub reviewer_name: String,
    pub star_rating: StarRating,
    pub comment: Option<String>,
    /// Raw creation timestamp as stored; parsed lazily by the engine.
    pub create_time: String,
    pub reply: Option<ReviewReply>,
}

impl ReviewRecord {
    /// A reply with an empty comment is an incomplete write and does not
    /// count as replied.
    pub fn has_reply(&self) -> bool {
        self.reply
            .as_ref()
            .map(|r| !r.comment.trim().is_empty())
            .unwrap_or(false)
    }
}

/// One slot of a gap-free trend series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendBucket {
    pub bucket_key: String,
    pub display_label: String,
    pub total_count: u64,
    pub replied_count: u64,
    pub reply_rate_percent: f64,
    pub avg_response_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RatingCount {
    pub rating: u8,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total_reviews: u64,
    pub pending_count: u64,
    pub average_rating: f64,
    pub response_rate_percent: f64,
    pub rating_distribution: Vec<RatingCount>,
}

/// Per-tenant roster row: lifetime stats plus the most recent review date.
#[derive(Debug, Clone, Serialize)]
pub struct TenantSummary {
    pub tenant_id: String,
    pub tenant_name: String,
    pub stats: SummaryStats,
    pub last_review_date: Option<NaiveDateTime>,
}
