//! Section assembler for real-estate funds (FIIs).
//!
//! A fund page packs oscillations, indicators, period results and the balance
//! sheet into one wide `Oscilações` table, so most of the work here is
//! positional.

use crate::models::{AssembledPage, AssetKind, PeriodSections, Section};
use tracing::debug;

use super::PageAssembler;
use super::parsers::{Row, TableIndex, insert_pair, split_quotation};

pub const IDENTITY_HEADER: &str = "FII";
pub const PROPERTIES_HEADER: &str = "Imóveis";
pub const OSCILLATIONS_HEADER: &str = "Oscilações";
pub const BALANCE_SHEET_MARKER: &str = "Balanço Patrimonial";

const TWELVE_MONTHS: &str = "12 meses";
const TOOLTIP: char = '?';

pub struct ReitAssembler;

impl PageAssembler for ReitAssembler {
    fn kind(&self) -> AssetKind {
        AssetKind::Reit
    }

    fn assemble(&self, index: &TableIndex) -> AssembledPage {
        let mut identity = index.section(IDENTITY_HEADER);
        let last_financial_info = split_quotation(&mut identity);
        let market_values = index.section(PROPERTIES_HEADER);

        let wide = decode_oscillations(index.find_rows_by_header(OSCILLATIONS_HEADER));

        debug!(
            "REIT page: {} identity, {} properties, {} variations, {} indicators",
            identity.len(),
            market_values.len(),
            wide.variations.len(),
            wide.indicators.len()
        );

        AssembledPage {
            identity,
            last_financial_info,
            market_values,
            variations: wide.variations,
            indicators: wide.indicators,
            balance_sheet: wide.balance_sheet,
            financial_results: wide.results,
        }
    }
}

#[derive(Debug, Default)]
struct WideTable {
    variations: Section,
    indicators: Section,
    results: PeriodSections,
    balance_sheet: Section,
}

fn decode_oscillations(rows: &[Row]) -> WideTable {
    let mut out = WideTable::default();

    // Rows 1..=3: a fixed period followed by indicator pairs.
    for row in rows.iter().take(4).skip(1) {
        let mut pairs = row.chunks_exact(2);
        if let Some(period) = pairs.next() {
            insert_pair(&mut out.variations, &period[0], &period[1]);
        }
        for pair in pairs {
            insert_pair(&mut out.indicators, &pair[0], &pair[1]);
        }
    }

    // Row 4: "12 meses" and calendar years, each followed by its value.
    if let Some(row) = rows.get(4) {
        for (cell, value) in row.iter().zip(row.iter().skip(1)) {
            if cell == TWELVE_MONTHS || is_year(cell) {
                insert_pair(&mut out.variations, cell, value);
            }
        }
    }

    // Rows 5+: label at 2, 12-month value at 3, 3-month value at 5.
    for row in rows.iter().skip(5) {
        let is_metric = row.len() >= 6
            && !row[0].is_empty()
            && row[2].starts_with(TOOLTIP);
        if is_metric {
            insert_pair(&mut out.results.last_12_months, &row[2], &row[3]);
            insert_pair(&mut out.results.last_3_months, &row[2], &row[5]);
        }
    }

    out.balance_sheet = balance_sheet(rows);
    out
}

/// Everything after the marker cell, blanks dropped, read as label/value pairs.
fn balance_sheet(rows: &[Row]) -> Section {
    let mut section = Section::new();

    let Some((row, at)) = rows.iter().find_map(|row| {
        row.iter()
            .position(|cell| cell == BALANCE_SHEET_MARKER)
            .map(|at| (row, at))
    }) else {
        debug!("No balance sheet marker in oscillations table");
        return section;
    };

    let cells: Vec<&String> = row[at + 1..].iter().filter(|c| !c.is_empty()).collect();
    for pair in cells.chunks_exact(2) {
        insert_pair(&mut section, pair[0], pair[1]);
    }
    section
}

fn is_year(cell: &str) -> bool {
    cell.len() == 4 && cell.bytes().all(|b| b.is_ascii_digit())
}
