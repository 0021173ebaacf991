use std::path::PathBuf;

use clap::Parser;
use place_tile_rs::{
    CancelToken, KakaoClient, PlaceTileError, RowPage, RunProgress, SearchRequest,
    default_export_name, run_search, write_csv, write_geojson,
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "place-tile")]
#[command(about = "Collect every place around a location from Kakao Local keyword search")]
struct Cli {
    /// Keyword to search for
    #[arg(short, long, default_value = "카페")]
    query: String,

    /// Address or place name the search is centered on
    #[arg(short, long, default_value = "서울시청")]
    location: String,

    /// Keep franchise brands in the results
    #[arg(long)]
    include_franchises: bool,

    /// Result page to print
    #[arg(long, default_value_t = 1)]
    page: usize,

    #[arg(long, default_value_t = 50)]
    rows_per_page: usize,

    /// Save rows as CSV (pass no value for the default file name)
    #[arg(long, num_args = 0..=1)]
    csv: Option<Option<PathBuf>>,

    /// Save the raw places as GeoJSON
    #[arg(long)]
    geojson: Option<PathBuf>,
}

fn print_progress(p: RunProgress) {
    eprintln!("tile {}/{}  collected {}", p.tile_index, p.total_tiles, p.collected);
}

#[tokio::main]
async fn main() -> Result<(), PlaceTileError> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = KakaoClient::new()?;
    let request = SearchRequest::new(cli.query.clone(), cli.location.clone())
        .with_exclude_franchises(!cli.include_franchises);

    let cancel = CancelToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("stop requested, finishing current request");
            stop.cancel();
        }
    });

    // The worker reports through a channel; rendering stays on this task.
    let (tx, mut rx) = mpsc::unbounded_channel::<RunProgress>();
    let worker = tokio::spawn(async move {
        let mut sink = move |p: RunProgress| {
            let _ = tx.send(p);
        };
        run_search(&client, &request, &cancel, &mut sink).await
    });

    while let Some(p) = rx.recv().await {
        print_progress(p);
    }

    let report = worker
        .await
        .map_err(|e| PlaceTileError::Worker(e.to_string()))??;

    if cli.include_franchises {
        println!("Total {}", report.rows.len());
    } else {
        println!(
            "Total {} (franchises excluded: {})",
            report.rows.len(),
            report.excluded
        );
    }

    let page = RowPage::of(&report.rows, cli.page, cli.rows_per_page);
    for (no, row) in &page.rows {
        println!("{:>5}  {}  |  {}  |  {}", no, row.name, row.address, row.phone);
    }
    println!("page {} / {}", page.page, page.total_pages);
    println!("{}", report.status_line());

    if report.rows.is_empty() {
        return Ok(());
    }

    if let Some(path) = cli.csv {
        let path =
            path.unwrap_or_else(|| PathBuf::from(default_export_name(&cli.location, &cli.query)));
        write_csv(&report.rows, &path)?;
        info!(path = %path.display(), rows = report.rows.len(), "saved CSV");
    }

    if let Some(path) = cli.geojson {
        write_geojson(&report.records, &path)?;
        info!(path = %path.display(), places = report.raw_count(), "saved GeoJSON");
    }

    Ok(())
}
