pub mod lenient;
pub mod record;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use record::{AssetRecord, RecordError};

// ── Asset kind ────────────────────────────────────────────────────────────────

/// Discriminant passed alongside raw page data; selects assembler and record shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Stock,
    Reit,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Stock => "stock",
            AssetKind::Reit => "reit",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    /// Accepts the English tags plus the Portuguese ones used on Fundamentus.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stock" | "stocks" | "acao" | "acoes" => Ok(AssetKind::Stock),
            "reit" | "reits" | "fii" | "fiis" => Ok(AssetKind::Reit),
            other => Err(format!("unknown asset kind: {other:?}")),
        }
    }
}

// ── Parsed cell values ────────────────────────────────────────────────────────

/// A typed scalar decoded from one raw cell. Absence is modelled as
/// `Option::<ParsedValue>::None`, never as a zero or empty variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParsedValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParsedValue {
    pub fn to_json(&self) -> Value {
        match self {
            ParsedValue::Int(i) => Value::from(*i),
            // Non-finite floats never leave the value parser.
            ParsedValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ParsedValue::Text(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for ParsedValue {
    fn from(v: &str) -> Self {
        ParsedValue::Text(v.to_string())
    }
}

// ── Sections ──────────────────────────────────────────────────────────────────

/// Normalized label → parsed value for one logical table area.
/// `None` marks a cell that was present but held the absent placeholder.
pub type Section = BTreeMap<String, Option<ParsedValue>>;

/// Render a section as a JSON object, leaving absent values out.
pub fn section_to_json(section: &Section) -> Value {
    let map: Map<String, Value> = section
        .iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| (k.clone(), v.to_json())))
        .collect();
    Value::Object(map)
}

/// Twelve-month and three-month buckets of one results table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodSections {
    pub last_12_months: Section,
    pub last_3_months: Section,
}

impl PeriodSections {
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "last_12_months": section_to_json(&self.last_12_months),
            "last_3_months": section_to_json(&self.last_3_months),
        })
    }
}

// ── Assembled page ────────────────────────────────────────────────────────────

/// Every section an assembler pulled from one page, before typing.
///
/// `identity` keys land at the top level of the nested map handed to the
/// record builder; the others become named sub-maps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledPage {
    pub identity: Section,
    pub last_financial_info: Section,
    pub market_values: Section,
    pub variations: Section,
    pub indicators: Section,
    pub balance_sheet: Section,
    pub financial_results: PeriodSections,
}

impl AssembledPage {
    pub fn to_json(&self) -> Value {
        let mut map = match section_to_json(&self.identity) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        map.insert(
            "last_financial_info".into(),
            section_to_json(&self.last_financial_info),
        );
        map.insert("market_values".into(), section_to_json(&self.market_values));
        map.insert("variations".into(), section_to_json(&self.variations));
        map.insert("indicators".into(), section_to_json(&self.indicators));
        map.insert("balance_sheet".into(), section_to_json(&self.balance_sheet));
        map.insert("financial_results".into(), self.financial_results.to_json());
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_kind_from_str() {
        assert_eq!("stock".parse::<AssetKind>(), Ok(AssetKind::Stock));
        assert_eq!("FII".parse::<AssetKind>(), Ok(AssetKind::Reit));
        assert_eq!(" reits ".parse::<AssetKind>(), Ok(AssetKind::Reit));
        assert!("bond".parse::<AssetKind>().is_err());
    }

    #[test]
    fn test_section_to_json_skips_absent() {
        let mut section = Section::new();
        section.insert("cotacao".into(), Some(ParsedValue::Float(31.5)));
        section.insert("p_l".into(), None);
        section.insert("tipo".into(), Some("ON".into()));

        let json = section_to_json(&section);
        assert_eq!(json, serde_json::json!({ "cotacao": 31.5, "tipo": "ON" }));
    }

    #[test]
    fn test_assembled_page_layout() {
        let mut page = AssembledPage::default();
        page.identity.insert("papel".into(), Some("PETR4".into()));
        page.variations.insert("dia".into(), Some(ParsedValue::Float(-1.2)));

        let json = page.to_json();
        assert_eq!(json["papel"], "PETR4");
        assert_eq!(json["variations"]["dia"], -1.2);
        assert!(json["financial_results"]["last_3_months"].is_object());
    }
}
