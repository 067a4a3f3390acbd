use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{ReviewRecord, ReviewReply, StarRating, TenantId};
use crate::store::{ReviewFilter, ReviewStore};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Upstream feeds are inconsistent about identifier types; digit-only ids
/// come back as numbers, everything else as text.
fn tenant_id_from_text(raw: String) -> TenantId {
    match raw.parse::<i64>() {
        Ok(n) => TenantId::Number(n),
        Err(_) => TenantId::Text(raw),
    }
}

fn row_to_record(row: &sqlx::postgres::PgRow) -> ReviewRecord {
    let symbol: String = row.get("star_rating");
    let reply_comment: Option<String> = row.get("reply_comment");
    ReviewRecord {
        review_id: row.get("review_id"),
        tenant_id: tenant_id_from_text(row.get("tenant_id")),
        tenant_name: row.get("tenant_name"),
        reviewer_name: row.get("reviewer_name"),
        star_rating: StarRating::from_symbol(&symbol),
        comment: row.get("comment"),
        create_time: row.get("create_time"),
        reply: reply_comment.map(|comment| ReviewReply {
            comment,
            update_time: row.get("reply_time"),
        }),
    }
}

/// Postgres-backed review record store. Rows are filtered in-process with
/// the same predicate the engine tests against, so tri-form tenant matching
/// and tolerant timestamp parsing behave identically everywhere.
pub struct PgReviewStore {
    pool: PgPool,
}

impl PgReviewStore {
    pub fn new(pool: PgPool) -> PgReviewStore {
        PgReviewStore { pool }
    }
}

#[async_trait]
impl ReviewStore for PgReviewStore {
    async fn find_reviews(&self, filter: &ReviewFilter) -> Result<Vec<ReviewRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT review_id, tenant_id, tenant_name, reviewer_name, star_rating, \
             comment, create_time, reply_comment, reply_time \
             FROM review_pulse.reviews \
             ORDER BY create_time",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(row_to_record)
            .filter(|record| filter.matches(record))
            .collect())
    }
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let reviews = vec![
        (
            "seed-001",
            "42",
            "Harbor Cafe",
            "Dana Whitfield",
            "FIVE",
            Some("Best espresso on the waterfront."),
            "2025-07-28T09:15:00Z",
            Some(("So glad you enjoyed it, Dana!", Some("2025-07-28T11:40:00Z"))),
        ),
        (
            "seed-002",
            "42",
            "Harbor Cafe",
            "Miles Okafor",
            "TWO",
            Some("Waited twenty minutes for a table."),
            "2025-08-02T18:05:00Z",
            None,
        ),
        (
            "seed-003",
            "7",
            "Pier Diner",
            "Ines Fuentes",
            "FOUR",
            Some("Generous portions, friendly crew."),
            "2025-08-01T13:30:00Z",
            Some(("Thanks for coming by!", Some("2025-08-02T08:10:00Z"))),
        ),
        (
            "seed-004",
            "dockside-books",
            "Dockside Books",
            "Theo Lindqvist",
            "FIVE",
            Some("Found a signed first edition."),
            "2025-08-03",
            None,
        ),
        (
            "seed-005",
            "7",
            "Pier Diner",
            "Priya Raman",
            "THREE",
            None,
            "2025-07-19T20:45:00Z",
            Some(("", None)),
        ),
    ];

    for (review_id, tenant_id, tenant_name, reviewer, rating, comment, create_time, reply) in
        reviews
    {
        sqlx::query(
            r#"
            INSERT INTO review_pulse.reviews
            (id, review_id, tenant_id, tenant_name, reviewer_name, star_rating,
             comment, create_time, reply_comment, reply_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (review_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(review_id)
        .bind(tenant_id)
        .bind(tenant_name)
        .bind(reviewer)
        .bind(rating)
        .bind(comment)
        .bind(create_time)
        .bind(reply.map(|(c, _)| c))
        .bind(reply.and_then(|(_, t)| t))
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        review_id: Option<String>,
        tenant_id: String,
        tenant_name: String,
        reviewer_name: String,
        star_rating: String,
        comment: Option<String>,
        create_time: String,
        reply_comment: Option<String>,
        reply_time: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let review_id = row
            .review_id
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO review_pulse.reviews
            (id, review_id, tenant_id, tenant_name, reviewer_name, star_rating,
             comment, create_time, reply_comment, reply_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (review_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(review_id)
        .bind(&row.tenant_id)
        .bind(&row.tenant_name)
        .bind(&row.reviewer_name)
        .bind(&row.star_rating)
        .bind(&row.comment)
        .bind(&row.create_time)
        .bind(&row.reply_comment)
        .bind(&row.reply_time)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
