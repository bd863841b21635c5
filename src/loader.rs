use crate::error::Result;
use crate::types::{
    PriceRecord, RawRow, RecordSet, COL_ITEM_CODE, COL_ITEM_DESCRIPTION, COL_PRICE,
    COL_PURCHASE_DATE, COL_REGION,
};
use crate::util::{format_price, non_empty, parse_date_safe, parse_price_safe};
use csv::ReaderBuilder;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub null_dates: usize,
    pub null_prices: usize,
    /// CSV lines the reader could not frame; these never reach the normalizer.
    pub skipped_lines: usize,
}

/// Field text, or empty (and so null downstream) when it is not UTF-8.
fn field_text(bytes: &[u8]) -> Option<String> {
    std::str::from_utf8(bytes).ok().map(str::to_string)
}

/// Read a headered CSV export into raw rows, keyed by the header text as-is.
///
/// Fields that are not valid UTF-8 come through as empty values; the rest
/// of their row is kept.
pub fn read_rows<R: Read>(reader: R) -> Result<(Vec<RawRow>, usize)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();
    let mut rows = Vec::new();
    let mut skipped = 0usize;
    let mut bad_fields = 0usize;

    for (line, result) in rdr.byte_records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(line = line + 2, error = %e, "skipping unreadable CSV line");
                skipped += 1;
                continue;
            }
        };
        let pairs = headers.iter().zip(record.iter()).map(|(h, bytes)| {
            let value = field_text(bytes).unwrap_or_else(|| {
                bad_fields += 1;
                String::new()
            });
            (h.clone(), value)
        });
        rows.push(RawRow::from_pairs(pairs));
    }
    if bad_fields > 0 {
        warn!(bad_fields, "non UTF-8 fields left empty");
    }
    debug!(rows = rows.len(), skipped, "raw rows read");
    Ok((rows, skipped))
}

fn clean_header(name: &str) -> String {
    name.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
        .to_string()
}

/// Turn raw rows into a `RecordSet`.
///
/// Every input row produces exactly one record; unparseable dates and
/// prices become `None` instead of dropping the row. Records come out
/// ordered by purchase date, newest first, with undated records last and
/// equal dates in input order.
pub fn normalize(rows: &[RawRow]) -> (RecordSet, LoadReport) {
    let mut records: Vec<PriceRecord> = rows
        .iter()
        .map(|row| {
            // Headers that trim to the same name resolve to the leftmost column.
            let mut fields: HashMap<String, &str> = HashMap::new();
            for (k, v) in &row.fields {
                fields.entry(clean_header(k)).or_insert(v.as_str());
            }
            let get = |col: &str| fields.get(col).copied();

            let price_raw = non_empty(get(COL_PRICE));
            let price_value = parse_price_safe(price_raw.as_deref());
            PriceRecord {
                item_code: non_empty(get(COL_ITEM_CODE)),
                item_description: non_empty(get(COL_ITEM_DESCRIPTION)),
                region: non_empty(get(COL_REGION)),
                purchase_date: parse_date_safe(get(COL_PURCHASE_DATE)),
                price_raw,
                price_value,
                price_display: price_value.map(format_price),
            }
        })
        .collect();

    // `sort_by` is stable, so ties keep their input order.
    records.sort_by(|a, b| match (a.purchase_date, b.purchase_date) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    let report = LoadReport {
        total_rows: records.len(),
        null_dates: records.iter().filter(|r| r.purchase_date.is_none()).count(),
        null_prices: records.iter().filter(|r| r.price_value.is_none()).count(),
        skipped_lines: 0,
    };
    if report.null_dates > 0 || report.null_prices > 0 {
        warn!(
            null_dates = report.null_dates,
            null_prices = report.null_prices,
            "some fields could not be parsed and were left empty"
        );
    }
    (RecordSet::new(records), report)
}

pub fn load_from_reader<R: Read>(reader: R) -> Result<(RecordSet, LoadReport)> {
    let (rows, skipped) = read_rows(reader)?;
    let (set, mut report) = normalize(&rows);
    report.skipped_lines = skipped;
    Ok((set, report))
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<(RecordSet, LoadReport)> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let loaded = load_from_reader(file)?;
    info!(path = %path.display(), rows = loaded.1.total_rows, "price ledger loaded");
    Ok(loaded)
}
