//! Ticker-list loader for batch scraping.
//!
//! Accepts a plain CSV of `ticker[,kind]` rows. A header row, `#` comments
//! and blank lines are tolerated; rows without a kind take the default.

use crate::models::AssetKind;
use crate::pipeline::ScrapeJob;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

pub fn load_ticker_list(path: &Path, default_kind: AssetKind) -> Result<Vec<ScrapeJob>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open ticker list {:?}", path))?;
    let jobs = read_ticker_list(file, default_kind)?;
    info!("{:?}: {} tickers loaded", path, jobs.len());
    Ok(jobs)
}

pub fn read_ticker_list<R: Read>(reader: R, default_kind: AssetKind) -> Result<Vec<ScrapeJob>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut seen = HashSet::new();
    let mut jobs = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Row {}: {}", i + 1, e);
                continue;
            }
        };

        let Some(ticker) = record.get(0).filter(|t| !t.is_empty()) else {
            continue;
        };
        if i == 0 && ticker.eq_ignore_ascii_case("ticker") {
            continue;
        }
        if !ticker.chars().all(|c| c.is_ascii_alphanumeric()) {
            warn!("Row {}: invalid ticker {:?}, skipped", i + 1, ticker);
            continue;
        }

        let kind = match record.get(1).filter(|k| !k.is_empty()) {
            None => default_kind,
            Some(raw) => match raw.parse::<AssetKind>() {
                Ok(kind) => kind,
                Err(e) => {
                    warn!("Row {}: {}, skipped", i + 1, e);
                    continue;
                }
            },
        };

        let ticker = ticker.to_uppercase();
        if !seen.insert(ticker.clone()) {
            debug!("Duplicate ticker {} ignored", ticker);
            continue;
        }
        jobs.push(ScrapeJob { ticker, kind });
    }

    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn job(ticker: &str, kind: AssetKind) -> ScrapeJob {
        ScrapeJob {
            ticker: ticker.into(),
            kind,
        }
    }

    #[test]
    fn test_read_ticker_list() {
        let csv = "ticker,kind\n\
                   petr4,stock\n\
                   # funds\n\
                   HGLG11, fii\n\
                   VALE3\n\
                   \n\
                   PETR4,reit\n\
                   BAD-1,stock\n\
                   ITUB4,bond\n";

        let jobs = read_ticker_list(csv.as_bytes(), AssetKind::Stock).unwrap();
        assert_eq!(
            jobs,
            vec![
                job("PETR4", AssetKind::Stock),
                job("HGLG11", AssetKind::Reit),
                job("VALE3", AssetKind::Stock),
            ]
        );
    }

    #[test]
    fn test_default_kind_applies_without_header() {
        let jobs = read_ticker_list("KNRI11\nMXRF11\n".as_bytes(), AssetKind::Reit).unwrap();
        assert_eq!(
            jobs,
            vec![job("KNRI11", AssetKind::Reit), job("MXRF11", AssetKind::Reit)]
        );
    }

    #[test]
    fn test_missing_file() {
        assert!(load_ticker_list(Path::new("does/not/exist.csv"), AssetKind::Stock).is_err());
    }
}
