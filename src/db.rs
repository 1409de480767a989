//! Postgres persistence for extracted ad records.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPool;

use crate::extraction::{AdRecord, RecordSink};

pub async fn init_db(pool: &PgPool) -> Result<()> {
    // 1. Create table if not exists (Base schema)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS visit_advertisements (
            id BIGSERIAL PRIMARY KEY,
            visit_id BIGINT NOT NULL,
            browser_id BIGINT NOT NULL,
            ad_number_in_visit BIGINT NOT NULL,
            sub_ad_number_in_chumbox BIGINT,
            ad_url TEXT NOT NULL,
            visit_url TEXT NOT NULL,
            clean_run BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )
    .execute(pool)
    .await?;

    // 2. Schema evolution: add newer columns if they don't exist yet
    sqlx::query(
        "ALTER TABLE visit_advertisements ADD COLUMN IF NOT EXISTS chumbox_platform TEXT;",
    )
    .execute(pool)
    .await
    .ok();

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_visit_ads_visit ON visit_advertisements (visit_id, browser_id);",
    )
    .execute(pool)
    .await
    .ok();

    Ok(())
}

/// `RecordSink` over a shared Postgres pool.
pub struct SqlSink {
    pool: PgPool,
}

impl SqlSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const INSERT_AD_SQL: &str = r#"
    INSERT INTO visit_advertisements (
        visit_id, browser_id, ad_number_in_visit, sub_ad_number_in_chumbox,
        ad_url, visit_url, clean_run, chumbox_platform
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
"#;

/// Bind values for one record, in `INSERT_AD_SQL` column order. Several
/// columns share the BIGINT type, so the pairing lives in one place.
#[allow(clippy::type_complexity)]
fn insert_values(
    record: &AdRecord,
) -> (i64, i64, i64, Option<i64>, &str, &str, bool, Option<&str>) {
    (
        record.visit_id,
        record.browser_id,
        record.ad_number_in_visit,
        record.sub_ad_number_in_chumbox,
        &record.ad_url,
        &record.visit_url,
        record.clean_run,
        record.chumbox_platform.as_deref(),
    )
}

#[async_trait]
impl RecordSink for SqlSink {
    async fn store(&self, record: &AdRecord) -> Result<()> {
        let (visit_id, browser_id, ad_number, sub_ad_number, ad_url, visit_url, clean_run, platform) =
            insert_values(record);
        sqlx::query(INSERT_AD_SQL)
            .bind(visit_id)
            .bind(browser_id)
            .bind(ad_number)
            .bind(sub_ad_number)
            .bind(ad_url)
            .bind(visit_url)
            .bind(clean_run)
            .bind(platform)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
