//! Durable bucket store
//!
//! PostgreSQL gateway for the minute-bucket series. The insert is an
//! idempotent upsert on `(timestamp_dt, symbol)`, which is the safety net
//! for every retry path in the crate: re-inserting an already-stored minute
//! succeeds without creating a duplicate row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use thiserror::Error;

use crate::bucket::TradeBucket;
use crate::config::StoreConfig;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection pool could not be established.
    #[error("database connection error: {0}")]
    Connection(String),
    /// Query execution error.
    #[error("query error: {0}")]
    Query(String),
}

/// Interface the ingestion paths require from the store.
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Persist one bucket. Idempotent: inserting an already-stored
    /// `(timestamp, symbol)` succeeds without effect.
    async fn insert(&self, bucket: &TradeBucket) -> Result<(), StoreError>;

    /// Most recent persisted minute, or `None` if the store is empty.
    async fn max_timestamp(&self) -> Result<Option<DateTime<Utc>>, StoreError>;
}

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS trade_bin_1m (
        timestamp_dt     TIMESTAMPTZ NOT NULL,
        symbol           TEXT NOT NULL,
        open_px          NUMERIC,
        high_px          NUMERIC,
        low_px           NUMERIC,
        close_px         NUMERIC,
        trades           BIGINT,
        volume           BIGINT,
        vwap             NUMERIC,
        last_size        BIGINT,
        turnover         BIGINT,
        home_notional    NUMERIC,
        foreign_notional NUMERIC,
        PRIMARY KEY (timestamp_dt, symbol)
    )
";

/// PostgreSQL-backed bucket store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open the connection pool and ensure the table exists.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!(
            max_connections = config.max_connections,
            "store connection pool initialized"
        );

        Ok(Self { pool })
    }

    /// Wrap an existing pool (for tests).
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl BucketStore for PgStore {
    async fn insert(&self, bucket: &TradeBucket) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO trade_bin_1m (
                timestamp_dt, symbol, open_px, high_px, low_px, close_px,
                trades, volume, vwap, last_size, turnover,
                home_notional, foreign_notional
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (timestamp_dt, symbol) DO NOTHING
            ",
        )
        .bind(bucket.timestamp)
        .bind(&bucket.symbol)
        .bind(bucket.open)
        .bind(bucket.high)
        .bind(bucket.low)
        .bind(bucket.close)
        .bind(bucket.trades)
        .bind(bucket.volume)
        .bind(bucket.vwap)
        .bind(bucket.last_size)
        .bind(bucket.turnover)
        .bind(bucket.home_notional)
        .bind(bucket.foreign_notional)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        tracing::debug!(
            timestamp = %bucket.timestamp,
            symbol = %bucket.symbol,
            close = ?bucket.close,
            volume = ?bucket.volume,
            vwap = ?bucket.vwap,
            "bucket stored"
        );
        Ok(())
    }

    async fn max_timestamp(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let row = sqlx::query("SELECT MAX(timestamp_dt) AS max_timestamp FROM trade_bin_1m")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        row.try_get::<Option<DateTime<Utc>>, _>("max_timestamp")
            .map_err(|e| StoreError::Query(e.to_string()))
    }
}
