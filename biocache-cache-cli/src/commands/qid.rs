//! Query cache CLI commands.
//!
//! Provides `qid put`, `qid get`, `qid reap`, `qid stats` and `qid clear`
//! against the configured store directory.

use biocache_cache::config::format_size;
use biocache_cache::qid::{parse_qid, QueryParams, QueryStore};
use clap::Subcommand;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Qid subcommands.
#[derive(Debug, Subcommand)]
pub enum QidAction {
    /// Store a query and print its qid
    Put {
        /// Raw search query (e.g., lsid:urn:lsid:biodiversity.org.au:apni.taxon:295861)
        query: String,

        /// Human-readable form of the query
        #[arg(long, default_value = "")]
        display: String,

        /// WKT geometry restricting the search
        #[arg(long, default_value = "")]
        wkt: String,

        /// Bounding box as min_lon,min_lat,max_lon,max_lat
        #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
        bbox: Option<[f64; 4]>,

        /// Filter query term (repeatable)
        #[arg(long = "filter")]
        filters: Vec<String>,
    },

    /// Print the stored parameters of a qid
    Get {
        /// Qid as a number or a `qid:<id>` term
        qid: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete stored queries older than the maximum file age
    Reap,

    /// Show query store statistics
    Stats,

    /// Delete every stored query
    Clear,
}

/// Run a qid subcommand.
pub fn run(action: QidAction) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("qid");

    match action {
        QidAction::Put {
            query,
            display,
            wkt,
            bbox,
            filters,
        } => run_put(&runner, query, display, wkt, bbox, filters),
        QidAction::Get { qid, json } => run_get(&runner, &qid, json),
        QidAction::Reap => run_reap(&runner),
        QidAction::Stats => run_stats(&runner),
        QidAction::Clear => run_clear(&runner),
    }
}

fn run_put(
    runner: &CliRunner,
    query: String,
    display: String,
    wkt: String,
    bbox: Option<[f64; 4]>,
    filters: Vec<String>,
) -> Result<(), CliError> {
    let mut params = QueryParams::new(query)
        .with_display_query(display)
        .with_wkt(wkt);
    params.bbox = bbox;
    params.filters = filters;

    let cache = runner.query_cache()?;
    let qid = cache.put_params(params)?;
    println!("qid:{}", qid);
    Ok(())
}

fn run_get(runner: &CliRunner, arg: &str, json: bool) -> Result<(), CliError> {
    let key = parse_qid_arg(arg)?;
    let cache = runner.query_cache()?;
    let entry = cache.get(key).ok_or(CliError::NotFound(key))?;

    if json {
        let rendered = serde_json::to_string_pretty(&entry.to_stored())
            .map_err(|e| CliError::Output(e.to_string()))?;
        println!("{}", rendered);
        return Ok(());
    }

    println!("qid:           {}", entry.key());
    println!("query:         {}", entry.query());
    if !entry.display_query().is_empty() {
        println!("display query: {}", entry.display_query());
    }
    if !entry.wkt().is_empty() {
        println!("wkt:           {}", entry.wkt());
    }
    if let Some([min_lon, min_lat, max_lon, max_lat]) = entry.bbox() {
        println!(
            "bbox:          {},{},{},{}",
            min_lon, min_lat, max_lon, max_lat
        );
    }
    for filter in entry.filters() {
        println!("filter:        {}", filter);
    }
    Ok(())
}

fn run_reap(runner: &CliRunner) -> Result<(), CliError> {
    let cache = runner.query_cache()?;
    let summary = cache.reap_expired();
    println!(
        "Deleted {} stored queries older than {}s",
        summary.stored_deleted,
        cache.config().max_file_age.as_secs()
    );
    Ok(())
}

fn run_stats(runner: &CliRunner) -> Result<(), CliError> {
    let store = runner.file_store()?;
    let keys = store.keys()?;
    let bytes = store.disk_usage()?;

    println!("Query store: {}", store.directory().display());
    println!("  Queries: {}", keys.len());
    println!("  Size:    {}", format_size(bytes));
    if let (Some(oldest), Some(newest)) = (keys.iter().min(), keys.iter().max()) {
        println!("  Oldest:  qid:{}", oldest);
        println!("  Newest:  qid:{}", newest);
    }
    println!(
        "  Maximum age: {}s",
        runner.config().qid.max_file_age_secs
    );
    Ok(())
}

fn run_clear(runner: &CliRunner) -> Result<(), CliError> {
    let cache = runner.query_cache()?;
    let deleted = cache.clear();
    println!("Deleted {} stored queries", deleted);
    Ok(())
}

/// Parse `123` or `qid:123`.
fn parse_qid_arg(arg: &str) -> Result<u64, CliError> {
    arg.trim()
        .parse()
        .ok()
        .or_else(|| parse_qid(arg))
        .ok_or_else(|| CliError::InvalidQid(arg.to_string()))
}

fn parse_bbox(s: &str) -> Result<[f64; 4], String> {
    let values: Vec<f64> = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid coordinate: {}", e))?;

    match values.as_slice() {
        &[min_lon, min_lat, max_lon, max_lat] => Ok([min_lon, min_lat, max_lon, max_lat]),
        _ => Err(format!("expected 4 comma-separated values, got {}", values.len())),
    }
}
