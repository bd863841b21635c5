use chrono::NaiveDate;
use serde::Serialize;
use tabled::Tabled;

use crate::util::format_price;

pub const COL_ITEM_CODE: &str = "INSUMOCDG";
pub const COL_ITEM_DESCRIPTION: &str = "INSUMO";
pub const COL_REGION: &str = "ESTADO";
pub const COL_PURCHASE_DATE: &str = "DATACOMPRA";
pub const COL_PRICE: &str = "VALORESPRATICADOS";

/// One row as handed over by the raw data source: (header, value) pairs in
/// column order. Header names may still carry surrounding whitespace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub fields: Vec<(String, String)>,
}

impl RawRow {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// One purchase observation after normalization.
///
/// `purchase_date` and `price_value` are `None` when the source value
/// could not be parsed; such records stay in listings but are skipped by
/// every date- or price-dependent computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecord {
    pub item_code: Option<String>,
    pub item_description: Option<String>,
    pub region: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub price_raw: Option<String>,
    pub price_value: Option<f64>,
    /// `1.234,56` style rendering of `price_value`, for display only.
    pub price_display: Option<String>,
}

/// Immutable, ordered collection of records. Built once by the normalizer
/// (or by the filter engine from another set) and only ever read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    records: Vec<PriceRecord>,
}

impl RecordSet {
    pub(crate) fn new(records: Vec<PriceRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PriceRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a PriceRecord;
    type IntoIter = std::slice::Iter<'a, PriceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Mean price of one region in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySeriesPoint {
    /// First day of the month.
    pub month_bucket: NaiveDate,
    pub region: Option<String>,
    pub mean_price: f64,
    pub observations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VariationMetric {
    pub latest_price: f64,
    pub percent_change: f64,
}

/// Outcome of the variation calculator. Only `Computed` carries a
/// percentage; the other variants replace what would otherwise be a
/// NaN or an infinity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Variation {
    Computed(VariationMetric),
    InsufficientData { observations: usize },
    /// First observation in the window is zero.
    Undefined { latest_price: f64 },
}

impl Variation {
    pub fn status(&self) -> &'static str {
        match self {
            Variation::Computed(_) => "computed",
            Variation::InsufficientData { .. } => "insufficient_data",
            Variation::Undefined { .. } => "undefined_division_by_zero",
        }
    }

    pub fn latest_price(&self) -> Option<f64> {
        match self {
            Variation::Computed(m) => Some(m.latest_price),
            Variation::Undefined { latest_price } => Some(*latest_price),
            Variation::InsufficientData { .. } => None,
        }
    }

    pub fn percent_change(&self) -> Option<f64> {
        match self {
            Variation::Computed(m) => Some(m.percent_change),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrendOutcome {
    /// No single item description is pinned, so a trend would mix items.
    Suppressed,
    /// Nothing priced and dated falls inside the window.
    NoData { cutoff: NaiveDate },
    Ready {
        cutoff: NaiveDate,
        points: Vec<MonthlySeriesPoint>,
        variation: Variation,
    },
}

const MISSING: &str = "-";

fn or_missing(v: &Option<String>) -> String {
    v.clone().unwrap_or_else(|| MISSING.to_string())
}

fn date_or_missing(d: Option<NaiveDate>) -> String {
    d.map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct LatestPriceRow {
    #[serde(rename = "ItemCode")]
    #[tabled(rename = "ItemCode")]
    pub item_code: String,
    #[serde(rename = "Item")]
    #[tabled(rename = "Item")]
    pub item_description: String,
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "PurchaseDate")]
    #[tabled(rename = "PurchaseDate")]
    pub purchase_date: String,
    #[serde(rename = "Price")]
    #[tabled(rename = "Price")]
    pub price: String,
}

impl From<&PriceRecord> for LatestPriceRow {
    fn from(r: &PriceRecord) -> Self {
        Self {
            item_code: or_missing(&r.item_code),
            item_description: or_missing(&r.item_description),
            region: or_missing(&r.region),
            purchase_date: date_or_missing(r.purchase_date),
            price: or_missing(&r.price_display),
        }
    }
}

/// Full-listing row; unlike the snapshot it also shows the price exactly
/// as it was typed.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ListingRow {
    #[serde(rename = "ItemCode")]
    #[tabled(rename = "ItemCode")]
    pub item_code: String,
    #[serde(rename = "Item")]
    #[tabled(rename = "Item")]
    pub item_description: String,
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "PurchaseDate")]
    #[tabled(rename = "PurchaseDate")]
    pub purchase_date: String,
    #[serde(rename = "RawPrice")]
    #[tabled(rename = "RawPrice")]
    pub price_raw: String,
    #[serde(rename = "Price")]
    #[tabled(rename = "Price")]
    pub price: String,
}

impl From<&PriceRecord> for ListingRow {
    fn from(r: &PriceRecord) -> Self {
        Self {
            item_code: or_missing(&r.item_code),
            item_description: or_missing(&r.item_description),
            region: or_missing(&r.region),
            purchase_date: date_or_missing(r.purchase_date),
            price_raw: or_missing(&r.price_raw),
            price: or_missing(&r.price_display),
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TrendPointRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "MeanPrice")]
    #[tabled(rename = "MeanPrice")]
    pub mean_price: String,
    #[serde(rename = "Observations")]
    #[tabled(rename = "Observations")]
    pub observations: usize,
}

impl From<&MonthlySeriesPoint> for TrendPointRow {
    fn from(p: &MonthlySeriesPoint) -> Self {
        Self {
            month: p.month_bucket.format("%m/%Y").to_string(),
            region: or_missing(&p.region),
            mean_price: format_price(p.mean_price),
            observations: p.observations,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrendSummary {
    pub item_description: Option<String>,
    pub window_months: u32,
    pub as_of: NaiveDate,
    pub cutoff: Option<NaiveDate>,
    pub points: usize,
    pub status: String,
    pub latest_price: Option<f64>,
    pub percent_change: Option<f64>,
}
