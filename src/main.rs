// Entry point and high-level CLI flow.
//
// - Option [1] loads and normalizes the price ledger, printing diagnostics.
// - Option [2] picks the item code / description / region filters and the
//   trend window.
// - Option [3] prints the latest prices, the full listing and (when a single
//   item description is selected) the monthly trend, writing each to disk.
use chrono::{Local, NaiveDate};
use price_panel::config::Config;
use price_panel::error::{AppError, Result};
use price_panel::filter::{self, Field, FilterCriteria, Selection, ALL};
use price_panel::loader;
use price_panel::output;
use price_panel::reports::{self, Window, WINDOW_PRESETS};
use price_panel::types::{
    LatestPriceRow, ListingRow, RecordSet, TrendOutcome, TrendPointRow, TrendSummary, Variation,
};
use price_panel::util::{format_int, format_number, format_price};
use std::io::{self, Write};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Loaded once per run and only read afterwards; handed to each report by
/// reference.
struct Session {
    records: Option<RecordSet>,
    criteria: FilterCriteria,
    window: Window,
}

fn prompt(label: &str) -> String {
    print!("{}: ", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    prompt("Enter choice")
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        let resp = prompt("Back to Report Selection (Y/N)").to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn handle_load(cfg: &Config, session: &mut Session) {
    match loader::load_from_path(&cfg.data_path) {
        Ok((records, report)) => {
            println!(
                "Processing dataset... ({} rows loaded)",
                format_int(report.total_rows as u64)
            );
            if report.null_dates > 0 || report.null_prices > 0 {
                println!(
                    "Note: {} rows without a readable date, {} without a readable price.",
                    format_int(report.null_dates as u64),
                    format_int(report.null_prices as u64)
                );
            }
            if report.skipped_lines > 0 {
                println!(
                    "Note: {} unreadable lines skipped.",
                    format_int(report.skipped_lines as u64)
                );
            }
            println!();
            session.records = Some(records);
        }
        Err(e) => {
            error!(path = %cfg.data_path.display(), error = %e, "load failed");
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

fn pick(records: &RecordSet, field: Field, narrowed: &FilterCriteria) -> Selection {
    // Offer only values still reachable under the filters chosen so far.
    let options = filter::distinct_values(&filter::apply(records, narrowed), field);
    println!("{} ({} options, '{}' for no filter):", field.label(), options.len(), ALL);
    for opt in options.iter().take(20) {
        println!("  {}", opt);
    }
    if options.len() > 20 {
        println!("  ... and {} more", options.len() - 20);
    }
    Selection::from_input(&prompt(field.label()), &options)
}

fn pick_window(current: Window) -> Window {
    let presets: Vec<String> = WINDOW_PRESETS.iter().map(|m| m.to_string()).collect();
    loop {
        let raw = prompt(&format!(
            "Trend window in months [{}] (current {})",
            presets.join("/"),
            current.month_count()
        ));
        if raw.is_empty() {
            return current;
        }
        match raw.parse::<u32>().map_err(|e| AppError::InvalidWindow(e.to_string())) {
            Ok(n) => match Window::months(n) {
                Ok(w) => return w,
                Err(e) => println!("{}", e),
            },
            Err(e) => println!("{}", e),
        }
    }
}

fn handle_filters(session: &mut Session) -> Result<()> {
    let records = session
        .records
        .as_ref()
        .ok_or_else(|| AppError::NoData("load the file first (option 1)".to_string()))?;

    let mut criteria = FilterCriteria::default();
    for field in [Field::ItemCode, Field::ItemDescription, Field::Region] {
        let choice = pick(records, field, &criteria);
        criteria.set(field, choice);
    }
    session.window = pick_window(session.window);
    info!(criteria = %criteria.describe(), months = session.window.month_count(), "filters set");
    session.criteria = criteria;
    println!();
    Ok(())
}

fn write_or_warn(result: Result<()>, file: &str) {
    if let Err(e) = result {
        warn!(file, error = %e, "write failed");
        eprintln!("Write error: {}", e);
    }
}

fn handle_generate_reports(cfg: &Config, session: &Session, as_of: NaiveDate) -> Result<()> {
    let records = session
        .records
        .as_ref()
        .ok_or_else(|| AppError::NoData("load the file first (option 1)".to_string()))?;
    let criteria = &session.criteria;
    let filtered = filter::apply(records, criteria);

    println!("Filters: {}\n", criteria.describe());
    if filtered.is_empty() {
        println!("No records match the selected filters.\n");
        return Ok(());
    }

    let latest: Vec<LatestPriceRow> = reports::latest_snapshot(&filtered)
        .iter()
        .map(LatestPriceRow::from)
        .collect();
    let file1 = cfg.output_dir.join("latest_prices.csv");
    write_or_warn(output::write_csv(&file1, &latest), "latest_prices.csv");
    println!("Latest Prices Paid\n");
    output::preview_table_rows(&latest, latest.len());
    println!("(Full table exported to {})\n", file1.display());

    let listing: Vec<ListingRow> = filtered.iter().map(ListingRow::from).collect();
    println!(
        "Full Listing (first {} of {})\n",
        cfg.preview_rows.min(listing.len()),
        format_int(listing.len() as u64)
    );
    output::preview_table_rows(&listing, cfg.preview_rows);

    let window = session.window;
    let outcome = reports::trend_view(&filtered, criteria, window, as_of);
    let mut summary = TrendSummary {
        item_description: criteria.item_description.clone(),
        window_months: window.month_count(),
        as_of,
        cutoff: None,
        points: 0,
        status: "suppressed".to_string(),
        latest_price: None,
        percent_change: None,
    };

    println!("Monthly Price Trend (last {} months)\n", window.month_count());
    match &outcome {
        TrendOutcome::Suppressed => {
            println!("Select a single item description to see its price trend.\n");
        }
        TrendOutcome::NoData { cutoff } => {
            summary.cutoff = Some(*cutoff);
            summary.status = "no_data".to_string();
            println!("No priced purchases since {}.\n", cutoff.format("%d/%m/%Y"));
        }
        TrendOutcome::Ready { cutoff, points, variation } => {
            summary.cutoff = Some(*cutoff);
            summary.points = points.len();
            summary.status = variation.status().to_string();
            summary.latest_price = variation.latest_price();
            summary.percent_change = variation.percent_change();

            let rows: Vec<TrendPointRow> = points.iter().map(TrendPointRow::from).collect();
            let file2 = cfg.output_dir.join("monthly_trend.csv");
            write_or_warn(output::write_csv(&file2, &rows), "monthly_trend.csv");
            output::preview_table_rows(&rows, rows.len());
            println!("(Full table exported to {})\n", file2.display());

            match variation {
                Variation::Computed(m) => println!(
                    "Latest price: {}  Variation: {}%\n",
                    format_price(m.latest_price),
                    format_number(m.percent_change, 2)
                ),
                Variation::InsufficientData { observations } => println!(
                    "Variation: insufficient data ({} observation(s) in window)\n",
                    observations
                ),
                Variation::Undefined { latest_price } => println!(
                    "Latest price: {}  Variation: undefined (first price is zero)\n",
                    format_price(*latest_price)
                ),
            }
        }
    }

    let file3 = cfg.output_dir.join("trend_summary.json");
    write_or_warn(output::write_json(&file3, &summary), "trend_summary.json");
    Ok(())
}

fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .with_writer(io::stderr)
        .init();

    let mut session = Session {
        records: None,
        criteria: FilterCriteria::default(),
        window: cfg.window,
    };

    loop {
        println!("Supply Price Panel");
        println!("[1] Load the file");
        println!("[2] Set filters");
        println!("[3] Generate Reports\n");
        match read_choice().as_str() {
            "1" => handle_load(&cfg, &mut session),
            "2" => {
                if let Err(e) = handle_filters(&mut session) {
                    println!("Error: {}\n", e);
                }
            }
            "3" => {
                println!();
                let as_of = Local::now().date_naive();
                if let Err(e) = handle_generate_reports(&cfg, &session, as_of) {
                    println!("Error: {}\n", e);
                    continue;
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1, 2 or 3.\n"),
        }
    }
}
