use crate::error::{AppError, Result};
use crate::filter::FilterCriteria;
use crate::types::{
    MonthlySeriesPoint, PriceRecord, RecordSet, TrendOutcome, Variation, VariationMetric,
};
use crate::util::{average, month_start};
use chrono::{Months, NaiveDate};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Window presets offered by the console.
pub const WINDOW_PRESETS: [u32; 3] = [3, 6, 12];

/// Trailing window length in whole months; always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window(u32);

impl Window {
    pub fn months(n: u32) -> Result<Self> {
        if n == 0 {
            return Err(AppError::InvalidWindow(
                "window must be at least one month".to_string(),
            ));
        }
        Ok(Self(n))
    }

    pub fn month_count(&self) -> u32 {
        self.0
    }

    /// `as_of` minus the window, day clamped to the target month's length.
    pub fn cutoff(&self, as_of: NaiveDate) -> NaiveDate {
        as_of
            .checked_sub_months(Months::new(self.0))
            .unwrap_or(NaiveDate::MIN)
    }
}

/// Candidate replaces the current pick only when strictly newer; an
/// undated record never replaces a dated one.
fn is_more_recent(candidate: Option<NaiveDate>, current: Option<NaiveDate>) -> bool {
    match (candidate, current) {
        (Some(c), Some(cur)) => c > cur,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// One record per (item code, region): the one with the latest purchase
/// date. Ties go to the record seen first; groups come out in the order
/// their key first appears. Records missing either key field are skipped.
pub fn latest_snapshot(records: &RecordSet) -> Vec<PriceRecord> {
    let mut slots: HashMap<(&str, &str), usize> = HashMap::new();
    let mut picked: Vec<&PriceRecord> = Vec::new();

    for r in records {
        let (Some(code), Some(region)) = (r.item_code.as_deref(), r.region.as_deref()) else {
            continue;
        };
        match slots.entry((code, region)) {
            Entry::Vacant(slot) => {
                slot.insert(picked.len());
                picked.push(r);
            }
            Entry::Occupied(slot) => {
                let current = &mut picked[*slot.get()];
                if is_more_recent(r.purchase_date, current.purchase_date) {
                    *current = r;
                }
            }
        }
    }
    picked.into_iter().cloned().collect()
}

/// Priced, dated observation inside a window.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation<'a> {
    pub date: NaiveDate,
    pub price: f64,
    pub record: &'a PriceRecord,
}

/// The observations a window keeps, oldest first. Shared by the monthly
/// aggregator and the variation calculator so both see the same data.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedSubset<'a> {
    pub as_of: NaiveDate,
    pub cutoff: NaiveDate,
    pub observations: Vec<Observation<'a>>,
}

pub fn window_subset(records: &RecordSet, window: Window, as_of: NaiveDate) -> WindowedSubset<'_> {
    let cutoff = window.cutoff(as_of);
    let mut observations: Vec<Observation<'_>> = records
        .iter()
        .filter_map(|r| {
            let date = r.purchase_date?;
            let price = r.price_value?;
            (date >= cutoff && date <= as_of).then_some(Observation { date, price, record: r })
        })
        .collect();
    observations.sort_by_key(|o| o.date);
    debug!(
        %cutoff,
        %as_of,
        months = window.month_count(),
        kept = observations.len(),
        "window subset built"
    );
    WindowedSubset { as_of, cutoff, observations }
}

/// Mean price per (month, region), ordered by month then region.
/// Empty when the window holds nothing.
pub fn monthly_series(subset: &WindowedSubset<'_>) -> Vec<MonthlySeriesPoint> {
    let mut buckets: BTreeMap<(NaiveDate, Option<&str>), Vec<f64>> = BTreeMap::new();
    for o in &subset.observations {
        buckets
            .entry((month_start(o.date), o.record.region.as_deref()))
            .or_default()
            .push(o.price);
    }
    buckets
        .into_iter()
        .filter_map(|((month_bucket, region), prices)| {
            Some(MonthlySeriesPoint {
                month_bucket,
                region: region.map(str::to_string),
                mean_price: average(&prices)?,
                observations: prices.len(),
            })
        })
        .collect()
}

/// Percent change between the first and last observation of the window.
pub fn variation(subset: &WindowedSubset<'_>) -> Variation {
    let obs = &subset.observations;
    let (Some(first), Some(last)) = (obs.first(), obs.last()) else {
        return Variation::InsufficientData { observations: 0 };
    };
    if obs.len() < 2 {
        return Variation::InsufficientData { observations: obs.len() };
    }
    if first.price == 0.0 {
        return Variation::Undefined { latest_price: last.price };
    }
    let percent_change = (last.price - first.price) / first.price * 100.0;
    if !percent_change.is_finite() {
        return Variation::Undefined { latest_price: last.price };
    }
    Variation::Computed(VariationMetric {
        latest_price: last.price,
        percent_change,
    })
}

/// Trend and variation for an already filtered set. Only produced when a
/// single item description is pinned.
pub fn trend_view(
    filtered: &RecordSet,
    criteria: &FilterCriteria,
    window: Window,
    as_of: NaiveDate,
) -> TrendOutcome {
    if criteria.item_description.is_none() {
        return TrendOutcome::Suppressed;
    }
    let subset = window_subset(filtered, window, as_of);
    if subset.observations.is_empty() {
        return TrendOutcome::NoData { cutoff: subset.cutoff };
    }
    TrendOutcome::Ready {
        cutoff: subset.cutoff,
        points: monthly_series(&subset),
        variation: variation(&subset),
    }
}
