pub mod cleaner;
pub mod error;
pub mod http_client;
pub mod parsers;
pub mod reit;
pub mod stock;

use crate::models::{AssembledPage, AssetKind, AssetRecord};
use anyhow::Context;
use async_trait::async_trait;
use scraper::Html;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub use self::error::ScrapeError;
use self::parsers::TableIndex;
use self::reit::ReitAssembler;
use self::stock::StockAssembler;

// ── Seams ─────────────────────────────────────────────────────────────────────

/// Swappable page source (live HTTP, saved files, canned test pages).
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch_page(&self, ticker: &str) -> Result<String, ScrapeError>;
}

/// A page saved to disk, served for whatever ticker is asked.
pub struct SavedPage {
    html: String,
}

impl SavedPage {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
        // Fundamentus serves Latin-1; saved copies may be either encoding.
        let html = match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
        };
        Ok(Self { html })
    }
}

#[async_trait]
impl DocumentSource for SavedPage {
    async fn fetch_page(&self, _ticker: &str) -> Result<String, ScrapeError> {
        Ok(self.html.clone())
    }
}

/// Turns an indexed page into the sections of one asset kind.
pub trait PageAssembler: Send + Sync {
    fn kind(&self) -> AssetKind;
    fn assemble(&self, index: &TableIndex) -> AssembledPage;
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

/// Picks the assembler for an asset kind and runs the whole extraction:
/// fetch, not-found check, table index, assembly, typed record.
pub struct Extractor {
    source: Arc<dyn DocumentSource>,
    assemblers: HashMap<AssetKind, Box<dyn PageAssembler>>,
}

impl Extractor {
    /// Extractor with the stock and REIT assemblers registered.
    pub fn new(source: Arc<dyn DocumentSource>) -> Self {
        let mut extractor = Self {
            source,
            assemblers: HashMap::new(),
        };
        extractor.register(Box::new(StockAssembler));
        extractor.register(Box::new(ReitAssembler));
        extractor
    }

    /// Replaces any assembler already registered for the same kind.
    pub fn register(&mut self, assembler: Box<dyn PageAssembler>) {
        self.assemblers.insert(assembler.kind(), assembler);
    }

    pub async fn execute(&self, kind: AssetKind, ticker: &str) -> Result<AssetRecord, ScrapeError> {
        let ticker = ticker.trim().to_uppercase();
        info!("Scraping {} {}", kind, ticker);

        let html = self.source.fetch_page(&ticker).await?;
        self.extract(kind, &ticker, &html)
    }

    /// Extraction from an already fetched page. Pure and synchronous.
    pub fn extract(&self, kind: AssetKind, ticker: &str, html: &str) -> Result<AssetRecord, ScrapeError> {
        let assembler = self
            .assemblers
            .get(&kind)
            .ok_or(ScrapeError::UnsupportedKind(kind))?;

        let doc = Html::parse_document(html);
        if parsers::is_not_found(&doc) {
            return Err(ScrapeError::NotFound {
                ticker: ticker.to_string(),
            });
        }

        let index = TableIndex::from_document(&doc);
        let page = assembler.assemble(&index);
        debug!("{}: assembled {} tables into sections", ticker, index.table_count());

        AssetRecord::create(kind, page.to_json()).map_err(|source| ScrapeError::Invalid {
            ticker: ticker.to_string(),
            source,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    pub const NOT_FOUND_PAGE: &str = r#"
        <html><body>
          <div class="error"><h1>Nenhum papel encontrado</h1><p>Papel não encontrado!</p></div>
          <table><tr><td>?Papel</td><td>XXXX3</td></tr></table>
        </body></html>
    "#;

    pub const STOCK_PAGE: &str = r#"
        <html><body>
        <table>
          <tr><td>?Papel</td><td>PETR4</td><td>?Cotação</td><td>31,50</td></tr>
          <tr><td>?Tipo</td><td>ON</td><td>?Data últ cot</td><td>02/05/2025</td></tr>
          <tr><td>?Empresa</td><td>Petrobras</td><td>?Min 52 sem</td><td>20,10</td></tr>
          <tr><td>?Setor</td><td>Petróleo</td><td>?Max 52 sem</td><td>35,00</td></tr>
          <tr><td>?Subsetor</td><td>Exploração</td><td>?Vol $ méd (2m)</td><td>1.000.000</td></tr>
        </table>
        </body></html>
    "#;

    /// Serves canned pages by ticker and records every request.
    #[derive(Default)]
    pub struct FakeSource {
        pub pages: HashMap<String, String>,
        pub requests: Mutex<Vec<String>>,
    }

    impl FakeSource {
        pub fn with_page(mut self, ticker: &str, html: &str) -> Self {
            self.pages.insert(ticker.to_string(), html.to_string());
            self
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().map(|r| r.len()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl DocumentSource for FakeSource {
        async fn fetch_page(&self, ticker: &str) -> Result<String, ScrapeError> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(ticker.to_string());
            }
            self.pages
                .get(ticker)
                .cloned()
                .ok_or_else(|| ScrapeError::NotFound {
                    ticker: ticker.to_string(),
                })
        }
    }
}
