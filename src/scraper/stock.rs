//! Section assembler for ordinary equities (`detalhes.php?papel=PETR4`).
//!
//! Page layout, one table per region:
//!
//! | header                               | shape                                   |
//! |--------------------------------------|-----------------------------------------|
//! | `Papel`                              | label/value pairs, quotation mixed in   |
//! | `Valor de mercado`                   | label/value pairs                       |
//! | `Oscilações`                         | period, value, then indicator pairs     |
//! | `Dados Balanço Patrimonial`          | label/value pairs                       |
//! | `Dados demonstrativos de resultados` | two sub-header rows, then 12m / 3m      |

use crate::models::{AssembledPage, AssetKind, PeriodSections, Section};
use tracing::debug;

use super::PageAssembler;
use super::parsers::{Row, TableIndex, insert_pair, split_quotation};

pub const IDENTITY_HEADER: &str = "Papel";
pub const MARKET_VALUE_HEADER: &str = "Valor de mercado";
pub const OSCILLATIONS_HEADER: &str = "Oscilações";
pub const BALANCE_SHEET_HEADER: &str = "Dados Balanço Patrimonial";
pub const RESULTS_HEADER: &str = "Dados demonstrativos de resultados";

/// Rows 1..=11 of the oscillations table carry data; row 0 is its header.
const OSCILLATION_LAST_ROW: usize = 11;
/// Sub-header rows above the results ("Últimos 12 meses", "Últimos 3 meses").
const RESULTS_SKIP: usize = 2;

pub struct StockAssembler;

impl PageAssembler for StockAssembler {
    fn kind(&self) -> AssetKind {
        AssetKind::Stock
    }

    fn assemble(&self, index: &TableIndex) -> AssembledPage {
        let mut identity = index.section(IDENTITY_HEADER);
        identity.extend(index.section(MARKET_VALUE_HEADER));
        let last_financial_info = split_quotation(&mut identity);

        let (variations, indicators) =
            split_oscillations(index.find_rows_by_header(OSCILLATIONS_HEADER));
        let balance_sheet = index.section(BALANCE_SHEET_HEADER);
        let financial_results = period_results(index.find_rows_by_header(RESULTS_HEADER));

        debug!(
            "Stock page: {} identity, {} variations, {} indicators, {} balance sheet keys",
            identity.len(),
            variations.len(),
            indicators.len(),
            balance_sheet.len()
        );

        AssembledPage {
            identity,
            last_financial_info,
            market_values: Section::new(),
            variations,
            indicators,
            balance_sheet,
            financial_results,
        }
    }
}

/// Left column pair of each row is a period oscillation; every following
/// pair is an indicator. A label without a value cell is dropped.
fn split_oscillations(rows: &[Row]) -> (Section, Section) {
    let mut variations = Section::new();
    let mut indicators = Section::new();

    for row in rows.iter().take(OSCILLATION_LAST_ROW + 1).skip(1) {
        let mut pairs = row.chunks_exact(2);
        if let Some(period) = pairs.next() {
            insert_pair(&mut variations, &period[0], &period[1]);
        }
        for pair in pairs {
            insert_pair(&mut indicators, &pair[0], &pair[1]);
        }
    }

    (variations, indicators)
}

fn period_results(rows: &[Row]) -> PeriodSections {
    let mut results = PeriodSections::default();

    for row in rows.iter().skip(RESULTS_SKIP) {
        if let (Some(label), Some(value)) = (row.first(), row.get(1)) {
            insert_pair(&mut results.last_12_months, label, value);
        }
        if let (Some(label), Some(value)) = (row.get(2), row.get(3)) {
            insert_pair(&mut results.last_3_months, label, value);
        }
    }

    results
}
