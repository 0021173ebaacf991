use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

use crate::core::tiles;
use crate::error::PlaceTileError;

use super::traits::PlaceSearch;
use super::types::{BoundingBox, KeywordQuery, PlaceRecord};

/// Configuration for a tiled fetch run.
#[derive(Debug, Clone)]
pub struct TilingConfig {
    pub tile_size_deg: f64,
    pub request_delay: Duration,
    pub page_size: u32,
    pub max_pages_per_tile: u32,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            tile_size_deg: 0.01,
            request_delay: Duration::from_millis(250),
            page_size: 15,
            max_pages_per_tile: 45,
        }
    }
}

impl TilingConfig {
    /// Sets the tile edge length in degrees.
    pub fn with_tile_size_deg(mut self, deg: f64) -> Self {
        self.tile_size_deg = deg;
        self
    }

    /// Sets the courtesy delay between requests.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Sets the per-page result count.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Sets how deep a single tile may be paged.
    pub fn with_max_pages_per_tile(mut self, pages: u32) -> Self {
        self.max_pages_per_tile = pages;
        self
    }
}

/// Shared stop flag. Clones observe the same flag; signal from any thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears the flag so the token can guard the next run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Snapshot reported after every fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunProgress {
    pub tile_index: usize,
    pub total_tiles: usize,
    pub collected: usize,
}

/// Receives progress from the worker, synchronously and in order.
///
/// Callers that render on another thread forward the snapshot (e.g. over a
/// channel) instead of touching their state from here.
pub trait ProgressSink {
    fn report(&mut self, progress: RunProgress);
}

impl<F: FnMut(RunProgress)> ProgressSink for F {
    fn report(&mut self, progress: RunProgress) {
        self(progress)
    }
}

/// Records keyed by provider id, kept in first-seen order.
///
/// Merge policy: a record whose id is already present replaces the stored
/// version in place (last write wins) without moving it. Entries are never
/// removed during a run.
#[derive(Debug, Default)]
pub struct ResultSet {
    positions: HashMap<String, usize>,
    records: Vec<PlaceRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, record: PlaceRecord) {
        match self.positions.get(&record.id) {
            Some(&pos) => self.records[pos] = record,
            None => {
                self.positions.insert(record.id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<PlaceRecord> {
        self.records
    }
}

/// Outcome of a tiled run that was not aborted by an error.
#[derive(Debug, Default)]
pub struct TiledResult {
    pub records: Vec<PlaceRecord>,
    /// The run stopped early because the token was signalled.
    pub cancelled: bool,
    pub tiles_completed: usize,
    pub pages_fetched: usize,
}

impl TiledResult {
    pub fn is_complete(&self) -> bool {
        !self.cancelled
    }
}

/// Per-run state, owned by the worker for the run's duration.
#[derive(Default)]
struct RunContext {
    results: ResultSet,
    tiles_completed: usize,
    pages_fetched: usize,
    cancelled: bool,
}

impl RunContext {
    fn finish(self) -> TiledResult {
        TiledResult {
            records: self.results.into_records(),
            cancelled: self.cancelled,
            tiles_completed: self.tiles_completed,
            pages_fetched: self.pages_fetched,
        }
    }
}

/// Collects every place matching `query` inside `bbox`.
///
/// The box is split into tiles (see [`crate::core::tiles`]) and each tile is
/// paged sequentially until the provider reports its last page or
/// `max_pages_per_tile` is reached, waiting `request_delay` between requests.
/// Records are merged by id into a [`ResultSet`] and `progress` is told after
/// every page.
///
/// `cancel` is checked before each tile, before each page and after each
/// tile's pages. A cancelled run still returns what was collected.
///
/// # Errors
///
/// [`PlaceTileError::InvalidInput`] for a blank query and
/// [`PlaceTileError::InvalidRegion`] for a malformed box, both before any
/// request. Any failed page aborts the whole run with that error; records
/// collected so far are only visible through earlier progress reports.
pub async fn fetch_tiled<S, P>(
    search: &S,
    query: &str,
    bbox: &BoundingBox,
    config: &TilingConfig,
    cancel: &CancelToken,
    progress: &mut P,
) -> Result<TiledResult, PlaceTileError>
where
    S: PlaceSearch + ?Sized,
    P: ProgressSink + ?Sized,
{
    let query = query.trim();
    if query.is_empty() {
        return Err(PlaceTileError::InvalidInput("query is empty".into()));
    }

    let tile_iter = tiles(bbox, config.tile_size_deg)?;
    let max_pages = config.max_pages_per_tile.max(1);
    info!(query, total_tiles = tile_iter.total(), "starting tiled fetch");

    let mut run = RunContext::default();

    'tiles: for tile in tile_iter {
        if cancel.is_cancelled() {
            run.cancelled = true;
            break;
        }

        let mut page = 1;
        loop {
            if cancel.is_cancelled() {
                run.cancelled = true;
                break 'tiles;
            }

            let request = KeywordQuery::in_rect(query, tile.rect, page, config.page_size);
            let result = match search.search_keyword(&request).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(
                        tile = tile.index,
                        page,
                        error = %e,
                        "page fetch failed, aborting run"
                    );
                    return Err(e);
                }
            };
            run.pages_fetched += 1;

            let returned = result.records.len();
            for record in result.records {
                run.results.merge(record);
            }
            debug!(
                tile = tile.index,
                page,
                returned,
                is_end = result.is_end,
                collected = run.results.len(),
                "fetched page"
            );

            progress.report(RunProgress {
                tile_index: tile.index,
                total_tiles: tile.total,
                collected: run.results.len(),
            });

            if result.is_end || page >= max_pages {
                break;
            }

            page += 1;
            sleep(config.request_delay).await;
        }

        run.tiles_completed += 1;
        info!(
            tile = tile.index,
            total = tile.total,
            collected = run.results.len(),
            "tile done"
        );

        if cancel.is_cancelled() {
            run.cancelled = true;
            break;
        }
        sleep(config.request_delay).await;
    }

    if run.cancelled {
        info!(collected = run.results.len(), "tiled fetch cancelled");
    } else {
        info!(collected = run.results.len(), "tiled fetch finished");
    }

    Ok(run.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::types::{KeywordPage, SearchArea};
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::Instant;

    fn record(id: &str, name: &str) -> PlaceRecord {
        PlaceRecord {
            id: id.to_string(),
            name: name.to_string(),
            road_address: String::new(),
            address: String::new(),
            phone: String::new(),
            place_url: String::new(),
            coordinate: None,
        }
    }

    fn fast() -> TilingConfig {
        TilingConfig::default().with_request_delay(Duration::ZERO)
    }

    /// Serves pages from a closure of (call number, request) and counts calls.
    struct Scripted<F> {
        calls: AtomicUsize,
        requests: Mutex<Vec<KeywordQuery>>,
        page: F,
    }

    impl<F> Scripted<F>
    where
        F: Fn(usize, &KeywordQuery) -> Result<KeywordPage, PlaceTileError> + Send + Sync,
    {
        fn new(page: F) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                page,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl<F> PlaceSearch for Scripted<F>
    where
        F: Fn(usize, &KeywordQuery) -> Result<KeywordPage, PlaceTileError> + Send + Sync,
    {
        async fn search_keyword(
            &self,
            query: &KeywordQuery,
        ) -> Result<KeywordPage, PlaceTileError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(query.clone());
            (self.page)(n, query)
        }
    }

    fn tile_of(q: &KeywordQuery) -> BoundingBox {
        match q.area {
            SearchArea::Rect(r) => r,
            _ => panic!("expected rect search"),
        }
    }

    // 2 x 2 tiles of 0.01 deg
    fn four_tiles() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 0.02, 0.02)
    }

    #[tokio::test]
    async fn test_empty_provider_returns_empty_list() {
        let search = Scripted::new(|_, _| {
            Ok(KeywordPage {
                records: vec![],
                is_end: true,
            })
        });
        let mut seen = Vec::new();

        let result = fetch_tiled(
            &search,
            "카페",
            &four_tiles(),
            &fast(),
            &CancelToken::new(),
            &mut |p: RunProgress| seen.push(p),
        )
        .await
        .unwrap();

        assert!(result.records.is_empty());
        assert!(result.is_complete());
        assert_eq!(result.tiles_completed, 4);
        assert_eq!(search.calls(), 4);
        assert_eq!(seen.len(), 4);
    }

    #[tokio::test]
    async fn test_requests_are_rect_scoped_and_paged() {
        let search = Scripted::new(|n, q| {
            Ok(KeywordPage {
                records: vec![record(&format!("p{n}"), "cafe")],
                is_end: q.page == 3,
            })
        });

        let result = fetch_tiled(
            &search,
            "  cafe ",
            &BoundingBox::new(0.0, 0.0, 0.005, 0.005),
            &fast(),
            &CancelToken::new(),
            &mut |_: RunProgress| {},
        )
        .await
        .unwrap();

        let requests = search.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        for (i, q) in requests.iter().enumerate() {
            assert_eq!(q.query, "cafe");
            assert_eq!(q.page, i as u32 + 1);
            assert_eq!(q.size, 15);
            assert_eq!(tile_of(q), BoundingBox::new(0.0, 0.0, 0.005, 0.005));
        }
        assert_eq!(result.records.len(), 3);
        assert_eq!(result.pages_fetched, 3);
    }

    #[tokio::test]
    async fn test_duplicates_keep_last_version_in_first_seen_order() {
        // Every tile returns "shared" plus its own place; the name tracks the call.
        let search = Scripted::new(|n, _| {
            Ok(KeywordPage {
                records: vec![
                    record("shared", &format!("version {n}")),
                    record(&format!("own{n}"), "own"),
                ],
                is_end: true,
            })
        });

        let result = fetch_tiled(
            &search,
            "cafe",
            &four_tiles(),
            &fast(),
            &CancelToken::new(),
            &mut |_: RunProgress| {},
        )
        .await
        .unwrap();

        let ids: Vec<&str> = result.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["shared", "own0", "own1", "own2", "own3"]);
        assert_eq!(result.records[0].name, "version 3");
    }

    #[tokio::test]
    async fn test_cancel_before_start_issues_no_request() {
        let search = Scripted::new(|_, _| {
            Ok(KeywordPage {
                records: vec![record("a", "a")],
                is_end: true,
            })
        });
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut reports = 0;

        let result = fetch_tiled(
            &search,
            "cafe",
            &four_tiles(),
            &fast(),
            &cancel,
            &mut |_: RunProgress| reports += 1,
        )
        .await
        .unwrap();

        assert!(result.records.is_empty());
        assert!(result.cancelled);
        assert_eq!(search.calls(), 0);
        assert_eq!(reports, 0);
    }

    #[tokio::test]
    async fn test_cancel_between_tiles_keeps_finished_tiles() {
        // 5 tiles in one row, one page each; cancel once tile 2 has finished.
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let search = Scripted::new(move |n, _| {
            if n == 1 {
                trigger.cancel();
            }
            Ok(KeywordPage {
                records: vec![record(&format!("tile{}", n + 1), "cafe")],
                is_end: true,
            })
        });

        let result = fetch_tiled(
            &search,
            "cafe",
            &BoundingBox::new(0.0, 0.0, 0.05, 0.01),
            &fast(),
            &cancel,
            &mut |_: RunProgress| {},
        )
        .await
        .unwrap();

        let ids: Vec<&str> = result.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["tile1", "tile2"]);
        assert_eq!(search.calls(), 2);
        assert_eq!(result.tiles_completed, 2);
        assert!(result.cancelled);
    }

    #[tokio::test]
    async fn test_cancel_mid_tile_keeps_completed_pages() {
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let search = Scripted::new(move |n, _| {
            if n == 1 {
                trigger.cancel();
            }
            Ok(KeywordPage {
                records: vec![record(&format!("p{n}"), "cafe")],
                is_end: false,
            })
        });

        let result = fetch_tiled(
            &search,
            "cafe",
            &four_tiles(),
            &fast(),
            &cancel,
            &mut |_: RunProgress| {},
        )
        .await
        .unwrap();

        assert_eq!(search.calls(), 2);
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.tiles_completed, 0);
        assert!(result.cancelled);
    }

    #[tokio::test]
    async fn test_progress_after_every_page_in_order() {
        // 3 tiles in one row, 2 pages each, 2 new places per page.
        let search = Scripted::new(|n, q| {
            Ok(KeywordPage {
                records: vec![
                    record(&format!("a{n}"), "cafe"),
                    record(&format!("b{n}"), "cafe"),
                ],
                is_end: q.page == 2,
            })
        });
        let mut seen = Vec::new();

        fetch_tiled(
            &search,
            "cafe",
            &BoundingBox::new(0.0, 0.0, 0.03, 0.01),
            &fast(),
            &CancelToken::new(),
            &mut |p: RunProgress| seen.push(p),
        )
        .await
        .unwrap();

        let expected: Vec<(usize, usize, usize)> =
            vec![(1, 3, 2), (1, 3, 4), (2, 3, 6), (2, 3, 8), (3, 3, 10), (3, 3, 12)];
        let got: Vec<(usize, usize, usize)> = seen
            .iter()
            .map(|p| (p.tile_index, p.total_tiles, p.collected))
            .collect();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn test_page_depth_is_capped() {
        let search = Scripted::new(|n, _| {
            Ok(KeywordPage {
                records: vec![record(&format!("p{n}"), "cafe")],
                is_end: false,
            })
        });

        let result = fetch_tiled(
            &search,
            "cafe",
            &BoundingBox::new(0.0, 0.0, 0.01, 0.01),
            &fast(),
            &CancelToken::new(),
            &mut |_: RunProgress| {},
        )
        .await
        .unwrap();

        assert_eq!(search.calls(), 45);
        assert_eq!(result.pages_fetched, 45);
        let last = search.requests.lock().unwrap().last().map(|q| q.page);
        assert_eq!(last, Some(45));
    }

    #[tokio::test]
    async fn test_failed_page_aborts_run() {
        let search = Scripted::new(|n, _| {
            if n == 2 {
                Err(PlaceTileError::Api {
                    status: 500,
                    url: "http://test".into(),
                })
            } else {
                Ok(KeywordPage {
                    records: vec![record(&format!("p{n}"), "cafe")],
                    is_end: true,
                })
            }
        });
        let mut last = None;

        let err = fetch_tiled(
            &search,
            "cafe",
            &four_tiles(),
            &fast(),
            &CancelToken::new(),
            &mut |p: RunProgress| last = Some(p),
        )
        .await
        .unwrap_err();

        assert!(err.is_provider_error());
        assert_eq!(search.calls(), 3);
        assert_eq!(last.map(|p| p.collected), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_between_pages_and_after_each_tile() {
        // 2 tiles in one row, 2 pages each
        let search = Scripted::new(|n, q| {
            Ok(KeywordPage {
                records: vec![record(&format!("p{n}"), "cafe")],
                is_end: q.page == 2,
            })
        });
        let delay = Duration::from_millis(250);
        let config = TilingConfig::default().with_request_delay(delay);

        let start = Instant::now();
        let result = fetch_tiled(
            &search,
            "cafe",
            &BoundingBox::new(0.0, 0.0, 0.02, 0.01),
            &config,
            &CancelToken::new(),
            &mut |_: RunProgress| {},
        )
        .await
        .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(result.pages_fetched, 4);
        // one wait between the pages of each tile, one after each tile
        assert!(elapsed >= delay * 4, "elapsed {elapsed:?}");
        assert!(elapsed < delay * 5, "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_run_skips_wait_after_tile() {
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let search = Scripted::new(move |n, q| {
            if n == 1 {
                trigger.cancel();
            }
            Ok(KeywordPage {
                records: vec![record(&format!("p{n}"), "cafe")],
                is_end: q.page == 2,
            })
        });
        let delay = Duration::from_millis(250);
        let config = TilingConfig::default().with_request_delay(delay);

        let start = Instant::now();
        let result = fetch_tiled(
            &search,
            "cafe",
            &BoundingBox::new(0.0, 0.0, 0.02, 0.01),
            &config,
            &cancel,
            &mut |_: RunProgress| {},
        )
        .await
        .unwrap();
        let elapsed = start.elapsed();

        assert!(result.cancelled);
        assert_eq!(result.tiles_completed, 1);
        // only the wait between the first tile's two pages
        assert!(elapsed >= delay, "elapsed {elapsed:?}");
        assert!(elapsed < delay * 2, "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn test_rejects_blank_query_and_bad_region() {
        let search = Scripted::new(|_, _| Ok(KeywordPage::default()));

        let blank = fetch_tiled(
            &search,
            "  ",
            &four_tiles(),
            &fast(),
            &CancelToken::new(),
            &mut |_: RunProgress| {},
        )
        .await;
        assert!(matches!(blank, Err(PlaceTileError::InvalidInput(_))));

        let inverted = BoundingBox::new(0.02, 0.0, 0.0, 0.02);
        let bad = fetch_tiled(
            &search,
            "cafe",
            &inverted,
            &fast(),
            &CancelToken::new(),
            &mut |_: RunProgress| {},
        )
        .await;
        assert!(matches!(bad, Err(PlaceTileError::InvalidRegion(_))));
        assert_eq!(search.calls(), 0);
    }

    #[test]
    fn test_result_set_overwrites_in_place() {
        let mut set = ResultSet::new();
        assert!(set.is_empty());

        set.merge(record("a", "first"));
        set.merge(record("b", "b"));
        set.merge(record("a", "second"));

        assert_eq!(set.len(), 2);
        let records = set.into_records();
        assert_eq!(records[0].id, "a");
        assert_eq!(records[0].name, "second");
        assert_eq!(records[1].id, "b");
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!clone.is_cancelled());
    }
}
