use clap::Parser;
use lib::{LogSink, PipelineError, SimpleLogger, TransformConfig, extract, load, transform};
use log::debug;
use rusqlite::Connection;
use std::path::PathBuf;
use std::time::Instant;

static LOGGER: SimpleLogger = SimpleLogger;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input apps CSV file
    #[arg(short, long)]
    apps_file: PathBuf,

    /// Input reviews CSV file (optional)
    #[arg(short, long)]
    reviews_file: Option<PathBuf>,

    /// SQLite database file the tables are loaded into
    #[arg(short, long, default_value = "etl.db")]
    database: PathBuf,

    /// Drop duplicate apps (by App) and exact-duplicate reviews
    #[arg(long, default_value_t = false)]
    drop_duplicates: bool,

    /// Keep only apps in this category (exact match, e.g. FOOD_AND_DRINK)
    #[arg(long)]
    category: Option<String>,

    /// Keep only apps with Rating strictly above this value
    #[arg(long)]
    min_rating: Option<f64>,

    /// Keep only apps with Reviews strictly above this value
    #[arg(long)]
    min_reviews: Option<f64>,

    /// Aggregate reviews to a mean Sentiment_Polarity per app before joining
    #[arg(long, default_value_t = false)]
    aggregate_reviews: bool,

    /// Columns to keep in the result, in order (e.g. App,Rating,Reviews)
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Columns to sort by, descending (e.g. Rating,Reviews)
    #[arg(long, value_delimiter = ',')]
    sort_by: Vec<String>,

    /// Log level for output
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn main() -> Result<(), PipelineError> {
    // Initialize timer and logger
    let total_start = Instant::now();
    log::set_logger(&LOGGER).unwrap();

    // Acquire CLI args
    let args = Args::parse();
    if args.debug {
        log::set_max_level(log::LevelFilter::Debug);
    } else {
        log::set_max_level(log::LevelFilter::Info);
    }

    println!("App-store ETL pipeline");
    debug!(
        "Apps file: {} | Reviews file: {}",
        args.apps_file.display(),
        args.reviews_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    debug!("Database: {}", args.database.display());

    // Extract data from source files
    println!("Starting data extraction...");
    let extract_start = Instant::now();
    let apps_data = extract(&args.apps_file)?;
    let reviews_data = match &args.reviews_file {
        Some(path) => Some(extract(path)?),
        None => None,
    };
    println!(
        "Extraction completed in {:.2?} | {} apps, {} reviews",
        extract_start.elapsed(),
        apps_data.row_count(),
        reviews_data.as_ref().map_or(0, |r| r.row_count())
    );

    // Create transformation config
    let config = TransformConfig {
        drop_duplicates: args.drop_duplicates,
        category: args.category,
        aggregate_reviews: args.aggregate_reviews,
        columns_to_keep: (!args.columns.is_empty()).then(|| args.columns.clone()),
        min_rating: args.min_rating,
        min_reviews: args.min_reviews,
        sort_by: (!args.sort_by.is_empty()).then(|| args.sort_by.clone()),
    };
    debug!("Transformation configuration: {config:?}");

    // Transform
    println!("Starting data transformation...");
    let transform_start = Instant::now();
    let filtered_apps_data = transform(&apps_data, reviews_data.as_ref(), &config, &mut LogSink)?;
    println!(
        "Transformation completed in {:.2?} | {} rows, {} columns",
        transform_start.elapsed(),
        filtered_apps_data.row_count(),
        filtered_apps_data.columns.len()
    );

    // Load raw and transformed datasets, replacing prior table contents
    println!("Starting data loading...");
    let load_start = Instant::now();
    let mut conn = Connection::open(&args.database)?;
    load(&apps_data, "apps_data", &mut conn)?;
    load(&filtered_apps_data, "filtered_apps_data", &mut conn)?;
    if let Some(reviews) = &reviews_data {
        load(reviews, "reviews_data", &mut conn)?;
    }
    println!(
        "Loading completed in {:.2?} | Database: {}",
        load_start.elapsed(),
        args.database.display()
    );

    println!(
        "Pipeline completed successfully in {:.2?}",
        total_start.elapsed()
    );
    Ok(())
}
