use chrono::NaiveDate;
use price_panel::filter::{self, FilterCriteria, Selection};
use price_panel::loader;
use price_panel::output;
use price_panel::reports::{self, Window};
use price_panel::types::{LatestPriceRow, TrendOutcome, TrendPointRow, Variation};

const LEDGER: &str = "\
INSUMOCDG,INSUMO,ESTADO,DATACOMPRA,VALORESPRATICADOS
C-01,Cimento CP-II 50kg,SP,2024-01-01,100
C-01,Cimento CP-II 50kg,SP,2024-02-01,110
C-01,Cimento CP-II 50kg,RJ,2024-01-15,90
";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn region_scenario_end_to_end() {
    let (records, report) = loader::load_from_reader(LEDGER.as_bytes()).unwrap();
    assert_eq!(report.total_rows, 3);

    let criteria = FilterCriteria::new(Selection::All, Selection::All, Selection::only("SP"));
    let filtered = filter::apply(&records, &criteria);
    assert_eq!(filtered.len(), 2);

    let snapshot = reports::latest_snapshot(&filtered);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].purchase_date, Some(date(2024, 2, 1)));
    assert_eq!(snapshot[0].region.as_deref(), Some("SP"));

    let window = Window::months(3).unwrap();
    let subset = reports::window_subset(&filtered, window, date(2024, 2, 15));
    let points = reports::monthly_series(&subset);
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].month_bucket, date(2024, 1, 1));
    assert_eq!(points[0].mean_price, 100.0);
    assert_eq!(points[1].month_bucket, date(2024, 2, 1));
    assert_eq!(points[1].mean_price, 110.0);
    assert!(points.iter().all(|p| p.region.as_deref() == Some("SP")));

    match reports::variation(&subset) {
        Variation::Computed(m) => assert!((m.percent_change - 10.0).abs() < 1e-9),
        other => panic!("expected a computed variation, got {other:?}"),
    }
}

#[test]
fn snapshot_matches_max_date_per_key_after_unfiltered_load() {
    let (records, _) = loader::load_from_reader(LEDGER.as_bytes()).unwrap();
    let everything = filter::apply(&records, &FilterCriteria::default());
    assert_eq!(everything, records);

    let snapshot = reports::latest_snapshot(&everything);
    assert_eq!(snapshot.len(), 2);
    for pick in &snapshot {
        let max = records
            .iter()
            .filter(|r| r.item_code == pick.item_code && r.region == pick.region)
            .filter_map(|r| r.purchase_date)
            .max();
        assert_eq!(pick.purchase_date, max);
    }
}

#[test]
fn trend_view_and_outputs_are_written() {
    let (records, _) = loader::load_from_reader(LEDGER.as_bytes()).unwrap();
    let criteria = FilterCriteria::new(
        Selection::All,
        Selection::only("Cimento CP-II 50kg"),
        Selection::All,
    );
    let filtered = filter::apply(&records, &criteria);
    let outcome = reports::trend_view(
        &filtered,
        &criteria,
        Window::months(3).unwrap(),
        date(2024, 2, 15),
    );
    let TrendOutcome::Ready { points, variation, .. } = outcome else {
        panic!("trend should be ready");
    };
    // Jan has SP and RJ, Feb only SP.
    assert_eq!(points.len(), 3);
    assert_eq!(points[0].region.as_deref(), Some("RJ"));
    // Raw first (SP 100 on Jan 1st) and last (SP 110 on Feb 1st).
    assert_eq!(variation.percent_change().map(|p| (p * 100.0).round() / 100.0), Some(10.0));

    let dir = tempfile::tempdir().unwrap();
    let latest: Vec<LatestPriceRow> = reports::latest_snapshot(&filtered)
        .iter()
        .map(LatestPriceRow::from)
        .collect();
    let rows: Vec<TrendPointRow> = points.iter().map(TrendPointRow::from).collect();
    output::write_csv(dir.path().join("latest_prices.csv"), &latest).unwrap();
    output::write_csv(dir.path().join("monthly_trend.csv"), &rows).unwrap();

    let written = std::fs::read_to_string(dir.path().join("monthly_trend.csv")).unwrap();
    let mut lines = written.lines();
    assert_eq!(lines.next(), Some("Month,Region,MeanPrice,Observations"));
    assert_eq!(lines.next(), Some("01/2024,RJ,\"90,00\",1"));

    let table = output::render_table(&latest, 10).unwrap();
    assert!(table.contains("110,00"));
}
