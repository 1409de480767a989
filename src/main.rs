use std::env;

use anyhow::Context;
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};

use adscraper::db::{self, SqlSink};
use adscraper::{extract_ads, Settings, VisitContext, WebDriverSession};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let urls: Vec<String> = env::args().skip(1).collect();
    if urls.is_empty() {
        eprintln!("usage: adscraper <url> [<url> ...]");
        std::process::exit(2);
    }

    let settings = Settings::from_env()?;

    let db_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;
    db::init_db(&pool).await?;
    let sink = SqlSink::new(pool);

    let session = WebDriverSession::connect(&settings).await?;

    for (index, url) in urls.iter().enumerate() {
        let ctx = VisitContext {
            visit_id: index as i64,
            browser_id: settings.browser_id,
            visit_url: url.clone(),
            clean_run: settings.clean_run,
        };
        info!(url, visit_id = ctx.visit_id, "starting visit");

        if let Err(e) = session.goto(url).await {
            warn!(url, error = %e, "navigation failed, skipping visit");
            continue;
        }

        match extract_ads(&session, &sink, &ctx, &settings).await {
            Ok(summary) => info!(
                url,
                ads = summary.ads_processed,
                failed = summary.ads_failed,
                records = summary.records_stored,
                "visit finished"
            ),
            Err(e) => {
                // Only session-fatal errors escape the orchestrator; there
                // is no point continuing with the remaining URLs.
                error!(url, error = %e, "visit failed with a driver-fatal error");
                break;
            }
        }
    }

    session.quit().await?;
    Ok(())
}
