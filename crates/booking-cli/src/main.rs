use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use booking_columnar::Value;
use booking_model::{load_csv, CsvOptions, Dataset};
use booking_pivot::{
    BookingStatus, CountryOrder, Dashboard, DashboardFilters, DashboardView, PanelOptions,
    Preview,
};
use clap::{ArgAction, Parser, ValueEnum};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser, Debug)]
#[command(
    name = "booking-dashboard",
    about = "Render the hotel booking dashboard for a filter selection as JSON"
)]
struct Args {
    /// Booking CSV with a header row.
    #[arg(long)]
    input: PathBuf,

    /// Field delimiter of the input file.
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Hotel types to keep (repeatable). Omit to keep all.
    #[arg(long = "hotel")]
    hotels: Vec<String>,

    /// Booking statuses to keep (repeatable).
    #[arg(long = "status", value_enum)]
    statuses: Vec<StatusArg>,

    /// Assigned-room values to keep (repeatable).
    #[arg(long = "assigned-room")]
    assigned_room: Vec<bool>,

    /// Deposit types to keep (repeatable).
    #[arg(long = "deposit")]
    deposits: Vec<String>,

    /// Panel options as a JSON file. Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    country_order: Option<OrderArg>,

    #[arg(long)]
    country_limit: Option<usize>,

    /// Include a uniformly sampled preview of this many rows.
    #[arg(long)]
    sample: Option<usize>,

    /// Seed for `--sample`. Without it the preview differs between runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusArg {
    Cancelled,
    NotCancelled,
}

impl From<StatusArg> for BookingStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Cancelled => BookingStatus::Cancelled,
            StatusArg::NotCancelled => BookingStatus::NotCancelled,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OrderArg {
    Top,
    Bottom,
}

impl From<OrderArg> for CountryOrder {
    fn from(value: OrderArg) -> Self {
        match value {
            OrderArg::Top => CountryOrder::Top,
            OrderArg::Bottom => CountryOrder::Bottom,
        }
    }
}

#[derive(Debug, Serialize)]
struct PreviewOutput {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl PreviewOutput {
    fn new(dataset: &Dataset) -> Self {
        PreviewOutput {
            columns: dataset.schema().iter().map(|c| c.name.clone()).collect(),
            rows: dataset.rows().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    preview: Option<PreviewOutput>,
    dashboard: DashboardView,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    // Also installs the `log` bridge, so library records reach stderr.
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn panel_options(args: &Args) -> Result<PanelOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            serde_json::from_str::<PanelOptions>(&text)
                .with_context(|| format!("parse config {}", path.display()))?
        }
        None => PanelOptions::default(),
    };
    if let Some(order) = args.country_order {
        options.country_order = order.into();
    }
    if let Some(limit) = args.country_limit {
        options.country_limit = limit;
    }
    Ok(options)
}

fn filters(args: &Args) -> Result<DashboardFilters> {
    let filters = DashboardFilters::default()
        .with_hotels(args.hotels.iter().map(String::as_str))
        .context("--hotel")?
        .with_statuses(args.statuses.iter().map(|s| BookingStatus::from(*s)))
        .context("--status")?
        .with_assigned_room(args.assigned_room.iter().copied())
        .context("--assigned-room")?
        .with_deposits(args.deposits.iter().map(String::as_str))
        .context("--deposit")?;
    Ok(filters)
}

fn write_json(output: &Output) -> Result<()> {
    let json = serde_json::to_string_pretty(output).context("serialize dashboard")?;
    let mut stdout = io::stdout().lock();
    match writeln!(stdout, "{json}") {
        Ok(()) => Ok(()),
        // `booking-dashboard ... | head` closes stdout early.
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err).context("write dashboard"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let delimiter = u8::try_from(args.delimiter)
        .with_context(|| format!("delimiter {:?} is not a single byte", args.delimiter))?;
    let csv_options = CsvOptions {
        delimiter,
        ..CsvOptions::default()
    };
    let dataset = load_csv(&args.input, &csv_options)
        .with_context(|| format!("load bookings from {}", args.input.display()))?;

    let options = panel_options(&args)?;
    let filters = filters(&args)?;
    let dashboard = Dashboard::with_options(dataset, options);

    let preview = match args.sample {
        Some(n) => {
            let mut rng = match args.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let sample = dashboard
                .preview(Preview::Random(n), &mut rng)
                .context("--sample")?;
            Some(PreviewOutput::new(&sample))
        }
        None => None,
    };

    let view = dashboard.render(&filters)?;
    info!(
        "rendered {} of {} rows; aggregation cache: {:?}",
        view.selected_rows,
        view.rows,
        dashboard.engine().stats()
    );

    write_json(&Output {
        input: args.input.display().to_string(),
        preview,
        dashboard: view,
    })
}
