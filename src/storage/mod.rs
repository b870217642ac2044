use crate::models::{AssetKind, AssetRecord};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use duckdb::{Connection, OptionalExt, params};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

// ── Schema ────────────────────────────────────────────────────────────────────

const SCHEMA_VERSION: i32 = 1;

const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS assets (
    ticker              VARCHAR PRIMARY KEY,
    kind                VARCHAR NOT NULL,
    name                VARCHAR NOT NULL,
    price               DOUBLE,
    last_price_update   TIMESTAMP,
    -- Full typed record as JSON; absent fields stay null
    details             VARCHAR NOT NULL,
    created_at          TIMESTAMP NOT NULL,
    updated_at          TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS quotes (
    ticker              VARCHAR NOT NULL,
    quoted_on           DATE    NOT NULL,
    price               DOUBLE,
    fifty_two_week_low  DOUBLE,
    fifty_two_week_high DOUBLE,
    avg_volume_2m       BIGINT,
    scraped_at          TIMESTAMP NOT NULL,
    PRIMARY KEY (ticker, quoted_on)
);

CREATE SEQUENCE IF NOT EXISTS scrape_run_ids START 1;

CREATE TABLE IF NOT EXISTS scrape_runs (
    id                  BIGINT PRIMARY KEY DEFAULT nextval('scrape_run_ids'),
    started_at          TIMESTAMP NOT NULL,
    finished_at         TIMESTAMP,
    status              VARCHAR NOT NULL DEFAULT 'running',
    tickers_processed   INTEGER DEFAULT 0,
    assets_stored       INTEGER DEFAULT 0,
    not_found           INTEGER DEFAULT 0,
    error_msg           VARCHAR
);

CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TIMESTAMP NOT NULL
);
"#;

const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_quotes_ticker  ON quotes (ticker);
CREATE INDEX IF NOT EXISTS idx_quotes_date    ON quotes (quoted_on);
"#;

/// One stored quotation snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteSnapshot {
    pub quoted_on: NaiveDate,
    pub price: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub avg_volume_2m: Option<i64>,
}

/// Counters written back to `scrape_runs` when a batch finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub tickers_processed: usize,
    pub assets_stored: usize,
    pub not_found: usize,
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open DuckDB at {:?}", path))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn run_migrations(&self) -> Result<()> {
        info!("Running migrations…");
        self.conn.execute_batch(DDL).context("DDL failed")?;
        self.conn
            .execute_batch(INDEXES)
            .context("Index creation failed")?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?, ?)",
            params![SCHEMA_VERSION, Utc::now().naive_utc()],
        )?;
        info!("Migrations done.");
        Ok(())
    }

    // ── Assets ────────────────────────────────────────────────────────────────

    pub fn get_by_ticker(&self, ticker: &str) -> Result<Option<AssetRecord>> {
        let details: Option<String> = self
            .conn
            .query_row(
                "SELECT details FROM assets WHERE ticker = ?",
                params![ticker],
                |r| r.get(0),
            )
            .optional()
            .with_context(|| format!("lookup asset {}", ticker))?;

        details
            .map(|json| {
                serde_json::from_str(&json)
                    .with_context(|| format!("corrupt stored record for {}", ticker))
            })
            .transpose()
    }

    /// Upsert keyed by ticker, plus today's quotation snapshot.
    /// Returns the record as stored.
    pub fn insert(&self, record: &AssetRecord) -> Result<AssetRecord> {
        let ticker = record.ticker();
        let quotation = record.quotation();
        let details = serde_json::to_string(record)
            .with_context(|| format!("serialize record {}", ticker))?;
        let now = Utc::now().naive_utc();
        let last_update: Option<NaiveDateTime> =
            quotation.last_price_update.map(|d| d.naive_utc());

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"INSERT INTO assets
                   (ticker, kind, name, price, last_price_update, details, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (ticker) DO UPDATE SET
                   kind              = excluded.kind,
                   name              = excluded.name,
                   price             = excluded.price,
                   last_price_update = excluded.last_price_update,
                   details           = excluded.details,
                   updated_at        = excluded.updated_at"#,
            params![
                ticker,
                record.kind().as_str(),
                record.name(),
                quotation.price,
                last_update,
                details,
                now,
                now,
            ],
        )
        .with_context(|| format!("upsert asset {}", ticker))?;

        let quoted_on = last_update.map(|d| d.date()).unwrap_or_else(|| now.date());
        tx.execute(
            r#"INSERT INTO quotes
                   (ticker, quoted_on, price, fifty_two_week_low, fifty_two_week_high,
                    avg_volume_2m, scraped_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (ticker, quoted_on) DO UPDATE SET
                   price               = COALESCE(excluded.price,               quotes.price),
                   fifty_two_week_low  = COALESCE(excluded.fifty_two_week_low,  quotes.fifty_two_week_low),
                   fifty_two_week_high = COALESCE(excluded.fifty_two_week_high, quotes.fifty_two_week_high),
                   avg_volume_2m       = COALESCE(excluded.avg_volume_2m,       quotes.avg_volume_2m),
                   scraped_at          = excluded.scraped_at"#,
            params![
                ticker,
                quoted_on,
                quotation.price,
                quotation.fifty_two_week_low,
                quotation.fifty_two_week_high,
                quotation.avg_volume_2m,
                now,
            ],
        )
        .with_context(|| format!("insert quote {} {}", ticker, quoted_on))?;
        tx.commit()?;

        debug!("Stored {} ({})", ticker, record.kind());
        self.get_by_ticker(ticker)?
            .with_context(|| format!("asset {} missing right after upsert", ticker))
    }

    pub fn list_symbols(&self, kind: Option<AssetKind>) -> Result<Vec<String>> {
        let syms: Vec<String> = match kind {
            Some(kind) => {
                let mut stmt = self
                    .conn
                    .prepare("SELECT ticker FROM assets WHERE kind = ? ORDER BY ticker")?;
                stmt.query_map(params![kind.as_str()], |r| r.get(0))?
                    .filter_map(|r| r.ok())
                    .collect()
            }
            None => {
                let mut stmt = self.conn.prepare("SELECT ticker FROM assets ORDER BY ticker")?;
                stmt.query_map([], |r| r.get(0))?
                    .filter_map(|r| r.ok())
                    .collect()
            }
        };
        Ok(syms)
    }

    pub fn asset_count(&self) -> Result<i64> {
        let mut s = self.conn.prepare("SELECT COUNT(*) FROM assets")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    pub fn count_by_kind(&self) -> Result<Vec<(String, i64)>> {
        let mut s = self
            .conn
            .prepare("SELECT kind, COUNT(*) FROM assets GROUP BY kind ORDER BY kind")?;
        let rows = s
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ── Quotes ────────────────────────────────────────────────────────────────

    /// Newest first.
    pub fn quote_history(&self, ticker: &str) -> Result<Vec<QuoteSnapshot>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT quoted_on, price, fifty_two_week_low, fifty_two_week_high, avg_volume_2m
               FROM quotes WHERE ticker = ? ORDER BY quoted_on DESC"#,
        )?;
        let rows = stmt
            .query_map(params![ticker], |r| {
                Ok(QuoteSnapshot {
                    quoted_on: r.get(0)?,
                    price: r.get(1)?,
                    fifty_two_week_low: r.get(2)?,
                    fifty_two_week_high: r.get(3)?,
                    avg_volume_2m: r.get(4)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()
            .with_context(|| format!("read quotes for {}", ticker))?;
        Ok(rows)
    }

    pub fn quote_count(&self) -> Result<i64> {
        let mut s = self.conn.prepare("SELECT COUNT(*) FROM quotes")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    // ── Scrape run log ────────────────────────────────────────────────────────

    pub fn begin_scrape_run(&self) -> Result<i64> {
        let id: i64 = self.conn.query_row(
            "INSERT INTO scrape_runs (started_at, status) VALUES (?, 'running') RETURNING id",
            params![Utc::now().naive_utc()],
            |r| r.get(0),
        )?;
        Ok(id)
    }

    pub fn finish_scrape_run(
        &self,
        run_id: i64,
        totals: RunTotals,
        error: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            r#"UPDATE scrape_runs SET
               finished_at = ?, status = ?,
               tickers_processed = ?, assets_stored = ?, not_found = ?, error_msg = ?
               WHERE id = ?"#,
            params![
                Utc::now().naive_utc(),
                if error.is_none() { "success" } else { "error" },
                totals.tickers_processed as i64,
                totals.assets_stored as i64,
                totals.not_found as i64,
                error,
                run_id,
            ],
        )?;
        Ok(())
    }

    /// `(id, status, finished_at)` of the most recent run.
    pub fn last_scrape_run(&self) -> Result<Option<(i64, String, Option<NaiveDateTime>)>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, status, finished_at FROM scrape_runs ORDER BY id DESC LIMIT 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?)
    }
}
