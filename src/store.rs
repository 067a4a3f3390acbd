use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::bucket::parse_instant;
use crate::cancel::CancellationToken;
use crate::error::{EngineError, StoreError};
use crate::models::{ReviewRecord, StarRating};

/// Tenant scope for a query. Upstream storage is loose about identifier
/// types, so a scoped match compares against the id's text form, its numeric
/// form, and the tenant display name, and treats all three as the same
/// tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantMatch {
    Any,
    Scoped { raw: String, numeric: Option<i64> },
}

impl TenantMatch {
    /// `None`, empty, and the literal `"all"` mean unscoped.
    pub fn parse(input: Option<&str>) -> TenantMatch {
        match input.map(str::trim) {
            None | Some("") | Some("all") => TenantMatch::Any,
            Some(raw) => TenantMatch::Scoped {
                raw: raw.to_string(),
                numeric: raw.parse().ok(),
            },
        }
    }

    pub fn matches(&self, record: &ReviewRecord) -> bool {
        match self {
            TenantMatch::Any => true,
            TenantMatch::Scoped { raw, numeric } => {
                if record.tenant_id.as_text() == *raw || record.tenant_name == *raw {
                    return true;
                }
                matches!((numeric, record.tenant_id.as_number()),
                    (Some(a), Some(b)) if a == &b)
            }
        }
    }
}

/// Reply-status scope for summary queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Pending,
    Replied,
}

impl StatusFilter {
    pub fn parse(input: &str) -> Option<StatusFilter> {
        match input {
            "pending" => Some(StatusFilter::Pending),
            "replied" => Some(StatusFilter::Replied),
            _ => None,
        }
    }
}

/// Record-store query filter. Date bounds apply to the parsed creation
/// time, so records with unparsable timestamps only survive unwindowed
/// queries.
#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub tenant: Option<TenantMatch>,
    pub date_range: Option<(NaiveDateTime, NaiveDateTime)>,
    pub status: Option<StatusFilter>,
    pub rating: Option<StarRating>,
    pub search: Option<String>,
}

impl ReviewFilter {
    pub fn for_tenant(tenant: TenantMatch) -> ReviewFilter {
        ReviewFilter {
            tenant: Some(tenant),
            ..ReviewFilter::default()
        }
    }

    pub fn matches(&self, record: &ReviewRecord) -> bool {
        if let Some(tenant) = &self.tenant {
            if !tenant.matches(record) {
                return false;
            }
        }
        if let Some((start, end)) = self.date_range {
            match parse_instant(&record.create_time) {
                Some(created) if created >= start && created <= end => {}
                _ => return false,
            }
        }
        if let Some(status) = self.status {
            let replied = record.has_reply();
            match status {
                StatusFilter::Pending if replied => return false,
                StatusFilter::Replied if !replied => return false,
                _ => {}
            }
        }
        if let Some(rating) = self.rating {
            if record.star_rating != rating {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = record
                .comment
                .as_deref()
                .map(|c| c.to_lowercase().contains(&needle))
                .unwrap_or(false)
                || record.reviewer_name.to_lowercase().contains(&needle)
                || record.tenant_name.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        true
    }
}

/// The engine's only contract with persistence: fetch the records matching
/// a filter. Grouping and reduction stay in-process.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn find_reviews(&self, filter: &ReviewFilter) -> Result<Vec<ReviewRecord>, StoreError>;
}

/// Runs a store query under the caller's cancellation token. Cancellation
/// abandons the in-flight query and never returns a partial result.
pub async fn fetch_reviews(
    store: &dyn ReviewStore,
    filter: &ReviewFilter,
    cancel: &CancellationToken,
) -> Result<Vec<ReviewRecord>, EngineError> {
    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    let mut cancel = cancel.clone();
    tokio::select! {
        _ = cancel.cancelled() => Err(EngineError::Cancelled),
        records = store.find_reviews(filter) => Ok(records?),
    }
}

/// In-memory store for engine tests.
#[cfg(test)]
pub struct MemoryStore {
    pub records: Vec<ReviewRecord>,
}

#[cfg(test)]
#[async_trait]
impl ReviewStore for MemoryStore {
    async fn find_reviews(&self, filter: &ReviewFilter) -> Result<Vec<ReviewRecord>, StoreError> {
        Ok(self
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }
}
