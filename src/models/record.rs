//! Typed asset records and the builder that validates assembled page data.
//!
//! Field names are the public (English) shape; `alias` binds each field to the
//! normalized Fundamentus label it is read from. Labels with no field are
//! ignored, so new rows on the source page never break the build.

use super::AssetKind;
use super::lenient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("validation failed: {0}")]
    Validation(String),
}

// ── Record ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssetRecord {
    Stock(StockDetails),
    Reit(ReitDetails),
}

impl AssetRecord {
    /// Build a typed record from the nested map produced by an assembler.
    ///
    /// Null-valued keys are pruned first, so an absent cell behaves exactly
    /// like a missing row. Labels spelled two ways are folded into one key.
    /// Only `ticker` and `name` are required.
    pub fn create(kind: AssetKind, data: Value) -> Result<Self, RecordError> {
        let data = fold_synonyms(prune_nulls(data));
        let record = match kind {
            AssetKind::Stock => serde_json::from_value(data).map(AssetRecord::Stock),
            AssetKind::Reit => serde_json::from_value(data).map(AssetRecord::Reit),
        };
        record.map_err(|e| RecordError::Validation(e.to_string()))
    }

    pub fn kind(&self) -> AssetKind {
        match self {
            AssetRecord::Stock(_) => AssetKind::Stock,
            AssetRecord::Reit(_) => AssetKind::Reit,
        }
    }

    pub fn ticker(&self) -> &str {
        match self {
            AssetRecord::Stock(s) => &s.ticker,
            AssetRecord::Reit(r) => &r.ticker,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AssetRecord::Stock(s) => &s.name,
            AssetRecord::Reit(r) => &r.name,
        }
    }

    pub fn quotation(&self) -> &Quotation {
        match self {
            AssetRecord::Stock(s) => &s.asset,
            AssetRecord::Reit(r) => &r.asset,
        }
    }
}

#[cfg(test)]
impl AssetRecord {
    pub fn variations(&self) -> &Variations {
        match self {
            AssetRecord::Stock(s) => &s.variations,
            AssetRecord::Reit(r) => &r.variations,
        }
    }
}

/// Recursively drop object entries whose value is `null`.
fn prune_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, prune_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(prune_nulls).collect()),
        other => other,
    }
}

/// Labels the source spells more than one way, as (kept, folded).
const SYNONYMS: [(&str, &str); 5] = [
    ("papel", "fii"),
    ("empresa", "nome"),
    ("ativo", "ativos"),
    ("patrim_liq", "patrim_liquido"),
    ("receita_liquida", "receita"),
];

/// Two aliases of one field in the same object would be a duplicate field;
/// keep the first spelling and drop the other.
fn fold_synonyms(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            for (kept, folded) in SYNONYMS {
                if let Some(v) = map.remove(folded) {
                    map.entry(kept).or_insert(v);
                }
            }
            Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, fold_synonyms(v)))
                    .collect(),
            )
        }
        other => other,
    }
}

// ── Stock ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockDetails {
    #[serde(alias = "papel", deserialize_with = "lenient::string")]
    pub ticker: String,
    #[serde(alias = "empresa", deserialize_with = "lenient::string")]
    pub name: String,

    #[serde(default, alias = "tipo", deserialize_with = "lenient::opt_string")]
    pub governance: Option<String>,
    #[serde(default, alias = "setor", deserialize_with = "lenient::opt_string")]
    pub sector: Option<String>,
    #[serde(default, alias = "subsetor", deserialize_with = "lenient::opt_string")]
    pub subsector: Option<String>,
    #[serde(default, alias = "valor_de_mercado", deserialize_with = "lenient::opt_i64")]
    pub market_value: Option<i64>,
    #[serde(default, alias = "valor_da_firma", deserialize_with = "lenient::opt_i64")]
    pub company_value: Option<i64>,
    #[serde(
        default,
        alias = "ult_balanco_processado",
        deserialize_with = "lenient::opt_datetime"
    )]
    pub last_balance_processed: Option<DateTime<Utc>>,
    #[serde(default, alias = "nro_acoes", deserialize_with = "lenient::opt_i64")]
    pub stock_count: Option<i64>,

    #[serde(default, alias = "last_financial_info")]
    pub asset: Quotation,
    #[serde(default)]
    pub variations: Variations,
    #[serde(default)]
    pub indicators: StockIndicators,
    #[serde(default)]
    pub balance_sheet: StockBalanceSheet,
    #[serde(default)]
    pub financial_results: FinancialResults,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockIndicators {
    // Valuation
    #[serde(default, alias = "p_l", deserialize_with = "lenient::opt_f64")]
    pub pe_ratio: Option<f64>,
    #[serde(default, alias = "lpa", deserialize_with = "lenient::opt_f64")]
    pub eps: Option<f64>,
    #[serde(default, alias = "p_vp", deserialize_with = "lenient::opt_f64")]
    pub pb_ratio: Option<f64>,
    #[serde(default, alias = "vpa", deserialize_with = "lenient::opt_f64")]
    pub book_value_per_share: Option<f64>,
    #[serde(default, alias = "p_ebit", deserialize_with = "lenient::opt_f64")]
    pub price_to_ebit: Option<f64>,
    #[serde(default, alias = "psr", deserialize_with = "lenient::opt_f64")]
    pub ps_ratio: Option<f64>,
    #[serde(default, alias = "p_ativos", deserialize_with = "lenient::opt_f64")]
    pub price_to_assets: Option<f64>,
    #[serde(default, alias = "p_cap_giro", deserialize_with = "lenient::opt_f64")]
    pub price_to_working_capital: Option<f64>,
    #[serde(default, alias = "p_ativ_circ_liq", deserialize_with = "lenient::opt_f64")]
    pub price_to_net_current_assets: Option<f64>,
    #[serde(default, alias = "div_yield", deserialize_with = "lenient::opt_f64")]
    pub dividend_yield: Option<f64>,

    // Margins (%)
    #[serde(default, alias = "marg_bruta", deserialize_with = "lenient::opt_f64")]
    pub gross_margin: Option<f64>,
    #[serde(default, alias = "marg_ebit", deserialize_with = "lenient::opt_f64")]
    pub ebit_margin: Option<f64>,
    #[serde(default, alias = "marg_liquida", deserialize_with = "lenient::opt_f64")]
    pub net_margin: Option<f64>,

    // Returns (%)
    #[serde(default, alias = "roic", deserialize_with = "lenient::opt_f64")]
    pub roic: Option<f64>,
    #[serde(default, alias = "roe", deserialize_with = "lenient::opt_f64")]
    pub roe: Option<f64>,
    #[serde(default, alias = "ebit_ativo", deserialize_with = "lenient::opt_f64")]
    pub ebit_to_assets: Option<f64>,
    #[serde(default, alias = "cres_rec_5a", deserialize_with = "lenient::opt_f64")]
    pub revenue_growth_5y: Option<f64>,

    // Enterprise value
    #[serde(default, alias = "ev_ebitda", deserialize_with = "lenient::opt_f64")]
    pub ev_ebitda: Option<f64>,
    #[serde(default, alias = "ev_ebit", deserialize_with = "lenient::opt_f64")]
    pub ev_ebit: Option<f64>,

    // Financial health
    #[serde(default, alias = "liquidez_corr", deserialize_with = "lenient::opt_f64")]
    pub current_ratio: Option<f64>,
    #[serde(default, alias = "div_br_patrim", deserialize_with = "lenient::opt_f64")]
    pub debt_to_equity: Option<f64>,
    #[serde(default, alias = "giro_ativos", deserialize_with = "lenient::opt_f64")]
    pub asset_turnover: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockBalanceSheet {
    #[serde(default, alias = "ativo", alias = "ativos", deserialize_with = "lenient::opt_i64")]
    pub total_assets: Option<i64>,
    #[serde(
        default,
        alias = "patrim_liq",
        alias = "patrim_liquido",
        deserialize_with = "lenient::opt_i64"
    )]
    pub shareholders_equity: Option<i64>,
    #[serde(default, alias = "div_bruta", deserialize_with = "lenient::opt_i64")]
    pub gross_debt: Option<i64>,
    #[serde(default, alias = "disponibilidades", deserialize_with = "lenient::opt_i64")]
    pub cash_and_equivalents: Option<i64>,
    #[serde(default, alias = "div_liquida", deserialize_with = "lenient::opt_f64")]
    pub net_debt: Option<f64>,
    #[serde(default, alias = "ativo_circulante", deserialize_with = "lenient::opt_i64")]
    pub current_assets: Option<i64>,
    // Banks report deposits and card receivables instead of debt lines.
    #[serde(default, alias = "depositos", deserialize_with = "lenient::opt_i64")]
    pub deposits: Option<i64>,
    #[serde(default, alias = "cart_de_credito", deserialize_with = "lenient::opt_i64")]
    pub credit_cards: Option<i64>,
}

// ── REIT ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReitDetails {
    #[serde(alias = "papel", alias = "fii", deserialize_with = "lenient::string")]
    pub ticker: String,
    #[serde(alias = "empresa", alias = "nome", deserialize_with = "lenient::string")]
    pub name: String,

    #[serde(default, alias = "segmento", deserialize_with = "lenient::opt_string")]
    pub segment: Option<String>,
    #[serde(default, alias = "mandato", deserialize_with = "lenient::opt_string")]
    pub management: Option<String>,
    #[serde(default, alias = "gestao", deserialize_with = "lenient::opt_string")]
    pub investment_strategy: Option<String>,

    #[serde(default, alias = "last_financial_info")]
    pub asset: Quotation,
    #[serde(default, alias = "market_values")]
    pub property_metrics: PropertyMetrics,
    #[serde(default)]
    pub variations: Variations,
    #[serde(default)]
    pub indicators: ReitIndicators,
    #[serde(default)]
    pub balance_sheet: BalanceSheet,
    #[serde(default)]
    pub financial_results: FinancialResults,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReitIndicators {
    #[serde(default, alias = "ffo_yield", deserialize_with = "lenient::opt_f64")]
    pub ffo_yield: Option<f64>,
    #[serde(default, alias = "ffo_cota", deserialize_with = "lenient::opt_f64")]
    pub ffo_per_share: Option<f64>,
    #[serde(default, alias = "div_yield", deserialize_with = "lenient::opt_f64")]
    pub dividend_yield: Option<f64>,
    #[serde(default, alias = "dividendo_cota", deserialize_with = "lenient::opt_f64")]
    pub dividend_per_share: Option<f64>,
    #[serde(default, alias = "p_vp", deserialize_with = "lenient::opt_f64")]
    pub pb_ratio: Option<f64>,
    #[serde(default, alias = "vp_cota", deserialize_with = "lenient::opt_f64")]
    pub book_value_per_share: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyMetrics {
    #[serde(default, alias = "qtd_imoveis", deserialize_with = "lenient::opt_i64")]
    pub property_count: Option<i64>,
    #[serde(default, alias = "area_m2", deserialize_with = "lenient::opt_i64")]
    pub total_area_sqm: Option<i64>,
    #[serde(default, alias = "qtd_unidades", deserialize_with = "lenient::opt_i64")]
    pub unit_count: Option<i64>,
    #[serde(default, alias = "cap_rate", deserialize_with = "lenient::opt_f64")]
    pub cap_rate: Option<f64>,
    #[serde(default, alias = "vacancia_media", deserialize_with = "lenient::opt_f64")]
    pub avg_vacancy_rate: Option<f64>,
    #[serde(default, alias = "aluguel_m2", deserialize_with = "lenient::opt_f64")]
    pub rent_per_sqm: Option<f64>,
    #[serde(default, alias = "preco_do_m2", deserialize_with = "lenient::opt_f64")]
    pub price_per_sqm: Option<f64>,
    #[serde(default, alias = "imoveis_pl_do_fii", deserialize_with = "lenient::opt_f64")]
    pub portfolio_allocation: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    #[serde(default, alias = "ativo", alias = "ativos", deserialize_with = "lenient::opt_i64")]
    pub total_assets: Option<i64>,
    #[serde(
        default,
        alias = "patrim_liq",
        alias = "patrim_liquido",
        deserialize_with = "lenient::opt_i64"
    )]
    pub shareholders_equity: Option<i64>,
}

// ── Shared sub-records ────────────────────────────────────────────────────────

/// Last quotation block ("last financial info" on the page).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quotation {
    #[serde(default, alias = "cotacao", deserialize_with = "lenient::opt_f64")]
    pub price: Option<f64>,
    #[serde(default, alias = "data_ult_cot", deserialize_with = "lenient::opt_datetime")]
    pub last_price_update: Option<DateTime<Utc>>,
    #[serde(default, alias = "min_52_sem", deserialize_with = "lenient::opt_f64")]
    pub fifty_two_week_low: Option<f64>,
    #[serde(default, alias = "max_52_sem", deserialize_with = "lenient::opt_f64")]
    pub fifty_two_week_high: Option<f64>,
    #[serde(default, alias = "vol_med_2m", deserialize_with = "lenient::opt_i64")]
    pub avg_volume_2m: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodResults {
    #[serde(
        default,
        alias = "receita",
        alias = "receita_liquida",
        deserialize_with = "lenient::opt_i64"
    )]
    pub revenue: Option<i64>,
    #[serde(default, alias = "venda_de_ativos", deserialize_with = "lenient::opt_i64")]
    pub asset_sales: Option<i64>,
    #[serde(default, alias = "ffo", deserialize_with = "lenient::opt_i64")]
    pub ffo: Option<i64>,
    #[serde(default, alias = "rend_distribuido", deserialize_with = "lenient::opt_i64")]
    pub distributions: Option<i64>,
    #[serde(default, alias = "ebit", deserialize_with = "lenient::opt_i64")]
    pub ebit: Option<i64>,
    #[serde(default, alias = "result_int_financ", deserialize_with = "lenient::opt_i64")]
    pub finance_revenue_intermediate: Option<i64>,
    #[serde(default, alias = "rec_servicos", deserialize_with = "lenient::opt_i64")]
    pub service_revenue: Option<i64>,
    #[serde(default, alias = "lucro_liquido", deserialize_with = "lenient::opt_i64")]
    pub net_revenue: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialResults {
    #[serde(default)]
    pub last_12_months: PeriodResults,
    #[serde(default)]
    pub last_3_months: PeriodResults,
}

// ── Variations ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyVariation {
    pub year: i32,
    pub variation: f64,
}

/// Price oscillations: four fixed periods plus whatever calendar years the
/// page happened to list, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Variations {
    pub day: Option<f64>,
    pub month: Option<f64>,
    pub thirty_days: Option<f64>,
    pub twelve_months: Option<f64>,
    pub yearly_variations: Vec<YearlyVariation>,
}

const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=2100;

impl Variations {
    /// Build from a raw oscillation map keyed by normalized period labels
    /// (`dia`, `mes`, `30_dias`, `12_meses`, `2024`, ...). Stored records use
    /// the English field names, which are accepted too.
    pub fn from_raw(raw: BTreeMap<String, Value>) -> Self {
        let mut out = Variations::default();

        for (key, value) in raw {
            match key.as_str() {
                "dia" | "day" => out.day = value.as_f64(),
                "mes" | "month" => out.month = value.as_f64(),
                "30_dias" | "thirty_days" => out.thirty_days = value.as_f64(),
                "12_meses" | "twelve_months" => out.twelve_months = value.as_f64(),
                "yearly_variations" => {
                    if let Ok(stored) = serde_json::from_value::<Vec<YearlyVariation>>(value) {
                        out.yearly_variations.extend(stored);
                    }
                }
                _ => {
                    if let Some(entry) = yearly_entry(&key, &value) {
                        out.yearly_variations.push(entry);
                    }
                }
            }
        }

        out.yearly_variations.sort_by(|a, b| b.year.cmp(&a.year));
        out
    }
}

#[cfg(test)]
impl Variations {
    pub fn for_year(&self, year: i32) -> Option<f64> {
        self.yearly_variations
            .iter()
            .find(|v| v.year == year)
            .map(|v| v.variation)
    }
}

fn yearly_entry(key: &str, value: &Value) -> Option<YearlyVariation> {
    if key.len() != 4 || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = key.parse().ok()?;
    if !YEAR_RANGE.contains(&year) {
        return None;
    }
    let variation = match value {
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    Some(YearlyVariation { year, variation })
}

impl<'de> Deserialize<'de> for Variations {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(d)?;
        Ok(Variations::from_raw(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn stock_page() -> Value {
        json!({
            "papel": "PETR4",
            "tipo": "PN N2",
            "empresa": "Petrobras PN",
            "setor": "Petróleo, Gás e Biocombustíveis",
            "valor_de_mercado": 412_000_000_000_i64,
            "ult_balanco_processado": "2025-03-31T00:00:00Z",
            "nro_acoes": 12_888_732_761_i64,
            "last_financial_info": {
                "cotacao": 31.5,
                "min_52_sem": 20.1,
                "max_52_sem": 35.0,
                "data_ult_cot": "2025-05-02T00:00:00Z",
                "vol_med_2m": 1_000_000
            },
            "market_values": {},
            "variations": { "dia": -0.5, "mes": 2.1, "30_dias": 3.0, "12_meses": 10.2, "2024": 12.5 },
            "indicators": { "p_l": 4.5, "div_yield": 14.2, "novo_indicador": 1.0 },
            "balance_sheet": { "ativo": 1_000_000, "div_liquida": -2_500.0, "patrim_liq": 400_000 },
            "financial_results": {
                "last_12_months": { "receita_liquida": 500_000, "lucro_liquido": 90_000 },
                "last_3_months": { "receita_liquida": 120_000 }
            }
        })
    }

    #[test]
    fn test_create_stock_record() {
        let record = AssetRecord::create(AssetKind::Stock, stock_page()).unwrap();
        let AssetRecord::Stock(stock) = &record else {
            panic!("expected a stock record");
        };

        assert_eq!(record.ticker(), "PETR4");
        assert_eq!(record.name(), "Petrobras PN");
        assert_eq!(stock.governance.as_deref(), Some("PN N2"));
        assert_eq!(stock.market_value, Some(412_000_000_000));
        assert_eq!(stock.asset.price, Some(31.5));
        assert_eq!(stock.asset.avg_volume_2m, Some(1_000_000));
        assert_eq!(stock.indicators.pe_ratio, Some(4.5));
        assert_eq!(stock.indicators.dividend_yield, Some(14.2));
        assert_eq!(stock.indicators.roe, None);
        assert_eq!(stock.balance_sheet.total_assets, Some(1_000_000));
        assert_eq!(stock.balance_sheet.shareholders_equity, Some(400_000));
        assert_eq!(stock.balance_sheet.net_debt, Some(-2_500.0));
        assert_eq!(stock.financial_results.last_12_months.revenue, Some(500_000));
        assert_eq!(stock.financial_results.last_3_months.net_revenue, None);
        assert_eq!(stock.variations.for_year(2024), Some(12.5));
    }

    #[test]
    fn test_missing_ticker_is_validation_error() {
        let mut data = stock_page();
        data.as_object_mut().unwrap().remove("papel");

        let err = AssetRecord::create(AssetKind::Stock, data).unwrap_err();
        assert!(err.to_string().contains("ticker"), "{err}");
    }

    #[test]
    fn test_null_ticker_counts_as_missing() {
        let mut data = stock_page();
        data["papel"] = Value::Null;
        assert!(AssetRecord::create(AssetKind::Stock, data).is_err());
    }

    #[test]
    fn test_malformed_optional_value_is_dropped() {
        let mut data = stock_page();
        data["indicators"]["p_l"] = json!("n/d");

        let record = AssetRecord::create(AssetKind::Stock, data).unwrap();
        let AssetRecord::Stock(stock) = record else {
            panic!("expected a stock record");
        };
        assert_eq!(stock.indicators.pe_ratio, None);
    }

    #[test]
    fn test_create_reit_record() {
        let data = json!({
            "fii": "HGLG11",
            "nome": "CSHG Logística",
            "segmento": "Logística",
            "mandato": "Renda",
            "gestao": "Ativa",
            "last_financial_info": { "cotacao": 160.2 },
            "market_values": { "qtd_imoveis": 21, "cap_rate": 8.9, "vacancia_media": 3.4 },
            "indicators": { "ffo_yield": 7.8, "p_vp": 1.01, "p_l": 9.0 },
            "balance_sheet": { "ativos": 5_000_000, "patrim_liquido": 4_800_000 },
            "financial_results": { "last_12_months": { "receita": 400_000, "ffo": 380_000 } }
        });

        let record = AssetRecord::create(AssetKind::Reit, data).unwrap();
        let AssetRecord::Reit(reit) = &record else {
            panic!("expected a REIT record");
        };

        assert_eq!(record.kind(), AssetKind::Reit);
        assert_eq!(reit.ticker, "HGLG11");
        assert_eq!(reit.segment.as_deref(), Some("Logística"));
        assert_eq!(reit.property_metrics.property_count, Some(21));
        assert_eq!(reit.property_metrics.avg_vacancy_rate, Some(3.4));
        assert_eq!(reit.indicators.ffo_yield, Some(7.8));
        assert_eq!(reit.balance_sheet.total_assets, Some(5_000_000));
        assert_eq!(reit.financial_results.last_12_months.ffo, Some(380_000));
        assert_eq!(reit.financial_results.last_3_months, PeriodResults::default());
    }

    #[test]
    fn test_both_spellings_of_a_label_fold_into_one() {
        let mut data = stock_page();
        data["balance_sheet"]["ativos"] = json!(2_000_000);
        data["balance_sheet"]["patrim_liquido"] = json!(450_000);
        data["financial_results"]["last_12_months"]["receita"] = json!(1);

        let record = AssetRecord::create(AssetKind::Stock, data).unwrap();
        let AssetRecord::Stock(stock) = record else {
            panic!("expected a stock record");
        };
        assert_eq!(stock.balance_sheet.total_assets, Some(1_000_000));
        assert_eq!(stock.balance_sheet.shareholders_equity, Some(400_000));
        assert_eq!(stock.financial_results.last_12_months.revenue, Some(500_000));
    }

    #[test]
    fn test_reit_identity_with_both_ticker_labels() {
        let data = json!({ "papel": "HGLG11", "fii": "HGLG11", "nome": "CSHG Logística" });
        let record = AssetRecord::create(AssetKind::Reit, data).unwrap();
        assert_eq!(record.ticker(), "HGLG11");
        assert_eq!(record.name(), "CSHG Logística");
    }

    #[test]
    fn test_absent_kept_spelling_falls_back_to_other() {
        let mut data = stock_page();
        data["balance_sheet"]["ativo"] = Value::Null;
        data["balance_sheet"]["ativos"] = json!(7);

        let record = AssetRecord::create(AssetKind::Stock, data).unwrap();
        let AssetRecord::Stock(stock) = record else {
            panic!("expected a stock record");
        };
        assert_eq!(stock.balance_sheet.total_assets, Some(7));
    }

    #[test]
    fn test_yearly_variations_sorted_and_filtered() {
        let raw: BTreeMap<String, Value> = serde_json::from_value(json!({
            "dia": 1.0,
            "mes": 2.0,
            "30_dias": 3.0,
            "12_meses": 4.0,
            "2021": 5.0,
            "2025": -6.5,
            "2023": 7,
            "1888": 8.0,
            "2150": 9.0,
            "20245": 10.0,
            "2022": "invalid",
            "ano": 11.0
        }))
        .unwrap();

        let variations = Variations::from_raw(raw);
        assert_eq!(variations.day, Some(1.0));
        assert_eq!(variations.twelve_months, Some(4.0));
        assert_eq!(
            variations.yearly_variations,
            vec![
                YearlyVariation { year: 2025, variation: -6.5 },
                YearlyVariation { year: 2023, variation: 7.0 },
                YearlyVariation { year: 2021, variation: 5.0 },
            ]
        );
    }

    #[test]
    fn test_absent_year_value_is_not_listed() {
        let data = json!({
            "papel": "VALE3",
            "empresa": "Vale",
            "variations": { "dia": 0.3, "2022": null, "2023": 4.0 }
        });
        let record = AssetRecord::create(AssetKind::Stock, data).unwrap();
        assert_eq!(
            record.variations().yearly_variations,
            vec![YearlyVariation { year: 2023, variation: 4.0 }]
        );
    }

    #[test]
    fn test_stored_shape_reads_back() {
        let record = AssetRecord::create(AssetKind::Stock, stock_page()).unwrap();
        let stored = serde_json::to_string(&record).unwrap();
        let back: AssetRecord = serde_json::from_str(&stored).unwrap();

        assert_eq!(back, record);
        assert_eq!(back.quotation().fifty_two_week_high, Some(35.0));
    }
}
