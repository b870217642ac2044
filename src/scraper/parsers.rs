use crate::models::Section;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

use super::cleaner::{format_key, parse_cell};

static TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid table selector"));
static TR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("valid row selector"));
static CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td, th").expect("valid cell selector"));
static ERROR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.error").expect("valid error selector"));

const NOT_FOUND_PHRASE: &str = "papel não encontrado";

/// Keys pulled out of the identity table into the quotation block.
pub const QUOTATION_KEYS: [&str; 5] = [
    "cotacao",
    "min_52_sem",
    "max_52_sem",
    "data_ult_cot",
    "vol_med_2m",
];

pub type Row = Vec<String>;

// ── Table index ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Concatenated text of the first row.
    pub header: String,
    pub rows: Vec<Row>,
}

/// Every table of one document, parsed once, in document order.
#[derive(Debug, Clone, Default)]
pub struct TableIndex {
    tables: Vec<Table>,
}

impl TableIndex {
    pub fn from_html(html: &str) -> Self {
        Self::from_document(&Html::parse_document(html))
    }

    pub fn from_document(doc: &Html) -> Self {
        let tables: Vec<Table> = doc.select(&TABLE_SEL).map(read_table).collect();
        debug!("Indexed {} tables", tables.len());
        Self { tables }
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Rows of the first table whose header row contains `header`
    /// (case-sensitive substring). Empty when no table matches.
    pub fn find_rows_by_header(&self, header: &str) -> &[Row] {
        match self.tables.iter().find(|t| t.header.contains(header)) {
            Some(table) => table.rows.as_slice(),
            None => {
                debug!("No table headed {:?}", header);
                &[]
            }
        }
    }

    /// Convenience: locate then decode pairwise.
    pub fn section(&self, header: &str) -> Section {
        rows_to_map(self.find_rows_by_header(header))
    }
}

fn read_table(table: ElementRef<'_>) -> Table {
    let header = table
        .select(&TR_SEL)
        .next()
        .map(|tr| tr.text().collect::<String>())
        .unwrap_or_default();

    let rows = table
        .select(&TR_SEL)
        .map(|tr| {
            tr.select(&CELL_SEL)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect::<Row>()
        })
        .filter(|row| !row.is_empty())
        .collect();

    Table { header, rows }
}

// ── Row-pair decoding ─────────────────────────────────────────────────────────

/// Read every row as (label, value) cell pairs. A trailing odd cell is
/// ignored, empty labels are skipped and later rows win on duplicate keys.
pub fn rows_to_map(rows: &[Row]) -> Section {
    let mut section = Section::new();
    for row in rows {
        for pair in row.chunks_exact(2) {
            insert_pair(&mut section, &pair[0], &pair[1]);
        }
    }
    section
}

/// Insert one decoded pair unless the label normalizes to nothing.
pub fn insert_pair(section: &mut Section, label: &str, value: &str) {
    let key = format_key(label);
    if key.is_empty() {
        return;
    }
    section.insert(key, parse_cell(value));
}

/// Move the quotation keys out of `identity` into their own section.
pub fn split_quotation(identity: &mut Section) -> Section {
    QUOTATION_KEYS
        .iter()
        .filter_map(|k| identity.remove_entry(*k))
        .collect()
}

// ── Not-found detection ───────────────────────────────────────────────────────

/// Fundamentus answers unknown tickers with 200 and an error banner.
pub fn is_not_found(doc: &Html) -> bool {
    doc.select(&ERROR_SEL).any(|el| {
        el.text()
            .collect::<String>()
            .to_lowercase()
            .contains(NOT_FOUND_PHRASE)
    })
}
