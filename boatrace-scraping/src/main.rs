use std::path::PathBuf;

use boatrace_scraping::api::BoatraceClient;
use boatrace_scraping::chrono_util::DateKey;
use boatrace_scraping::snapshot::build_snapshot;
use boatrace_scraping::venue::VenueTable;
use boatrace_scraping_utils::fs_json_util::write_json_pretty;
use clap::Parser;
use log::info;

#[derive(Parser)]
struct Opts {
    /// Target day as YYYYMMDD; defaults to today in JST.
    #[arg(long)]
    date: Option<DateKey>,
    /// Where the snapshot document is written (replaced wholesale).
    #[arg(long, default_value = "data/venues_today.json")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opts = Opts::parse();
    let date = opts.date.unwrap_or_else(DateKey::today_jst);

    let client = BoatraceClient::new()?;
    let snapshot = build_snapshot(&client, VenueTable::official(), date).await;

    if let Some(parent) = opts.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }
    write_json_pretty(&opts.output, &snapshot)?;
    info!(
        "Wrote {:?}: venues={} errors={}",
        opts.output,
        snapshot.count(),
        snapshot.errors().len()
    );
    Ok(())
}
