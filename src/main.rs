use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};

use staybook::config::Config;
use staybook::engine::occupancy;
use staybook::model::YearMonth;
use staybook::persist::SnapshotRepository;
use staybook::portfolio::{Portfolio, PropertyRecord};
use staybook::timeline::{CategoryFilter, TimelineCategory, TimelineEvent, TimelineRow};

fn glyph(event: Option<&TimelineEvent>) -> char {
    let Some(event) = event else { return '.' };
    match event.category {
        TimelineCategory::Bookings if event.is_start => '[',
        TimelineCategory::Bookings => match event.interval_kind {
            Some(staybook::model::IntervalCategory::Maintenance) => 'm',
            _ => '=',
        },
        TimelineCategory::Leases if event.is_start => '<',
        TimelineCategory::Leases => '-',
        TimelineCategory::LeaseEnds => '>',
        TimelineCategory::Payments => '$',
        TimelineCategory::Cleaning => 'c',
    }
}

fn print_row(row: &TimelineRow) {
    let line: String = row.cells.iter().map(|c| glyph(c.event.as_ref())).collect();
    println!("  {:<24} {line}", row.property.name);
}

#[derive(Parser, Debug)]
#[command(name = "staybook")]
#[command(about = "Print a month of bookings, leases and cleanings across a rental portfolio")]
struct Args {
    /// Portfolio JSON file (array of property records)
    input: PathBuf,

    /// Month to show (YYYY-MM); defaults to the current month
    month: Option<YearMonth>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    staybook::observability::init_logging(args.verbose);

    let config = Config::from_env()?;
    let month = args.month.unwrap_or_else(|| YearMonth::of(config.today()));

    let repo = SnapshotRepository::open(&config.data_dir)?;

    let records: Vec<PropertyRecord> = serde_json::from_slice(&std::fs::read(&args.input)?)?;
    let mut portfolio = Portfolio::from_records(records, config.cleaning_cost)?;

    // A snapshot, when present, is newer than the input file.
    let ids: Vec<_> = portfolio.properties().iter().map(|p| p.id()).collect();
    for id in ids {
        if !repo.path_for(id).exists() {
            continue;
        }
        if let Some(property) = portfolio.get_mut(id)
            && let Err(e) = property.reload(&repo)
        {
            warn!("keeping input intervals for {id}: {e}");
        }
    }

    info!("staybook: {} properties", portfolio.len());
    info!("  data_dir: {}", config.data_dir.display());
    info!("  month: {month}");

    println!("{month} ({})", config.currency);
    for row in portfolio.timeline(month, &CategoryFilter::all()) {
        print_row(&row);
    }

    println!();
    println!("occupancy {month}:");
    for property in portfolio.properties() {
        let occ = occupancy(property.intervals(), &month.span())?;
        println!(
            "  {:<24} {:>5.1}%  guest={} maintenance={} vacant={}",
            property.info().name,
            occ.rate() * 100.0,
            occ.guest_nights,
            occ.maintenance_nights,
            occ.vacant_nights(),
        );
    }

    portfolio.save_all(&repo)?;
    Ok(())
}
