use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod bucket;
mod cancel;
mod db;
mod error;
mod models;
mod period;
mod report;
mod store;
mod summary;
mod trends;

use cancel::{cancellation_pair, CancellationToken};
use db::PgReviewStore;
use models::StarRating;
use period::{Period, RESPONSE_TREND_PERIODS, REVIEW_TREND_PERIODS};
use store::{ReviewFilter, StatusFilter, TenantMatch};

#[derive(Parser)]
#[command(name = "review-pulse")]
#[command(about = "Review analytics engine for multi-tenant review data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import reviews from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Review volume trend for a period
    Trend {
        #[arg(long, default_value = "30d")]
        period: String,
        #[arg(long)]
        tenant: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Reply rate and response latency trend for a period
    ResponseTrend {
        #[arg(long, default_value = "30d")]
        period: String,
        #[arg(long)]
        tenant: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Lifetime summary statistics
    Summary {
        #[arg(long)]
        tenant: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        rating: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Per-tenant roster with lifetime stats
    Roster {
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "30d")]
        period: String,
        #[arg(long)]
        tenant: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn parse_rating(raw: &str) -> anyhow::Result<StarRating> {
    let rating = match raw {
        "1" | "ONE" => StarRating::One,
        "2" | "TWO" => StarRating::Two,
        "3" | "THREE" => StarRating::Three,
        "4" | "FOUR" => StarRating::Four,
        "5" | "FIVE" => StarRating::Five,
        _ => anyhow::bail!("rating must be 1-5 or ONE..FIVE, got {raw}"),
    };
    Ok(rating)
}

fn watch_ctrl_c() -> CancellationToken {
    let (handle, token) = cancellation_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });
    token
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} reviews from {}.", csv.display());
        }
        Commands::Trend {
            period,
            tenant,
            json,
        } => {
            let period = Period::parse(&period, REVIEW_TREND_PERIODS)?;
            let store = PgReviewStore::new(pool);
            let token = watch_ctrl_c();
            let series =
                trends::get_trend(&store, TenantMatch::parse(tenant.as_deref()), period, &token)
                    .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&series)?);
            } else {
                println!("Review volume over the last {}:", period.token());
                for bucket in &series {
                    println!(
                        "- {} ({}): {} reviews",
                        bucket.bucket_key, bucket.display_label, bucket.total_count
                    );
                }
            }
        }
        Commands::ResponseTrend {
            period,
            tenant,
            json,
        } => {
            let period = Period::parse(&period, RESPONSE_TREND_PERIODS)?;
            let store = PgReviewStore::new(pool);
            let token = watch_ctrl_c();
            let series =
                trends::get_trend(&store, TenantMatch::parse(tenant.as_deref()), period, &token)
                    .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&series)?);
            } else {
                println!("Response performance over the last {}:", period.token());
                for bucket in &series {
                    println!(
                        "- {} ({}): {}/{} replied, {:.1}% reply rate, {:.1}h avg response",
                        bucket.bucket_key,
                        bucket.display_label,
                        bucket.replied_count,
                        bucket.total_count,
                        bucket.reply_rate_percent,
                        bucket.avg_response_hours
                    );
                }
            }
        }
        Commands::Summary {
            tenant,
            status,
            rating,
            search,
            json,
        } => {
            let filter = ReviewFilter {
                tenant: Some(TenantMatch::parse(tenant.as_deref())),
                date_range: None,
                status: status
                    .as_deref()
                    .map(|s| {
                        StatusFilter::parse(s)
                            .with_context(|| format!("status must be pending or replied, got {s}"))
                    })
                    .transpose()?,
                rating: rating.as_deref().map(parse_rating).transpose()?,
                search,
            };
            let store = PgReviewStore::new(pool);
            let token = watch_ctrl_c();
            let stats = summary::get_summary(&store, filter, &token).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Total reviews: {}", stats.total_reviews);
                println!("Pending replies: {}", stats.pending_count);
                println!("Average rating: {:.1}", stats.average_rating);
                println!("Response rate: {:.1}%", stats.response_rate_percent);
                println!("Rating distribution:");
                for entry in &stats.rating_distribution {
                    println!("  {} star: {}", entry.rating, entry.count);
                }
            }
        }
        Commands::Roster { json } => {
            let store = PgReviewStore::new(pool);
            let token = watch_ctrl_c();
            let roster = summary::get_roster(&store, &token).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&roster)?);
            } else if roster.is_empty() {
                println!("No reviews recorded yet.");
            } else {
                for row in &roster {
                    println!(
                        "- {} ({}): {} reviews, avg {:.1}, {:.1}% response rate",
                        row.tenant_name,
                        row.tenant_id,
                        row.stats.total_reviews,
                        row.stats.average_rating,
                        row.stats.response_rate_percent
                    );
                }
            }
        }
        Commands::Report {
            period,
            tenant,
            out,
        } => {
            let period = Period::parse(&period, REVIEW_TREND_PERIODS)?;
            let store = PgReviewStore::new(pool);
            let token = watch_ctrl_c();
            let scope = TenantMatch::parse(tenant.as_deref());

            // Independent aggregations; let the store queries overlap.
            let (trend, stats, roster) = tokio::try_join!(
                trends::get_trend(&store, scope.clone(), period, &token),
                summary::get_summary(&store, ReviewFilter::for_tenant(scope.clone()), &token),
                summary::get_roster(&store, &token),
            )?;

            let report = report::build_report(tenant.as_deref(), period, &trend, &stats, &roster);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
