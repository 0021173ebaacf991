use tracing::info;

use crate::client::{
    CancelToken, Coordinate, Geocoder, PlaceRecord, PlaceSearch, ProgressSink, TilingConfig,
    fetch_tiled,
};
use crate::core::{PlaceRow, bbox_from_center_radius, normalize_records};
use crate::error::PlaceTileError;

/// Radius collected around the geocoded location.
pub const DEFAULT_RADIUS_M: f64 = 3000.0;

/// What to look for, and where.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub location: String,
    pub exclude_franchises: bool,
    pub radius_m: f64,
    pub tiling: TilingConfig,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            location: location.into(),
            exclude_franchises: true,
            radius_m: DEFAULT_RADIUS_M,
            tiling: TilingConfig::default(),
        }
    }

    pub fn with_exclude_franchises(mut self, exclude: bool) -> Self {
        self.exclude_franchises = exclude;
        self
    }

    pub fn with_tiling(mut self, tiling: TilingConfig) -> Self {
        self.tiling = tiling;
        self
    }
}

#[derive(Debug)]
pub struct SearchReport {
    pub center: Coordinate,
    pub rows: Vec<PlaceRow>,
    /// Unique places returned by the provider, before filtering.
    pub records: Vec<PlaceRecord>,
    pub excluded: usize,
    pub cancelled: bool,
}

impl SearchReport {
    pub fn raw_count(&self) -> usize {
        self.records.len()
    }

    pub fn status_line(&self) -> String {
        let at = format!("({:.6}, {:.6})", self.center.lon, self.center.lat);
        match (self.rows.is_empty(), self.cancelled) {
            (true, false) => "No results found.".to_string(),
            (true, true) => "Stopped. No partial results.".to_string(),
            (false, true) => format!(
                "Stopped. Showing {} partial results. Center={}",
                self.rows.len(),
                at
            ),
            (false, false) => format!("Done. {} results. Center={}", self.rows.len(), at),
        }
    }
}

/// Geocodes the location, tiles the surrounding area, collects and normalizes.
///
/// Blank query or location fail with [`PlaceTileError::InvalidInput`] before
/// any request is made.
pub async fn run_search<C, P>(
    client: &C,
    request: &SearchRequest,
    cancel: &CancelToken,
    progress: &mut P,
) -> Result<SearchReport, PlaceTileError>
where
    C: Geocoder + PlaceSearch,
    P: ProgressSink + ?Sized,
{
    let query = request.query.trim();
    let location = request.location.trim();
    if query.is_empty() {
        return Err(PlaceTileError::InvalidInput("query is empty".into()));
    }
    if location.is_empty() {
        return Err(PlaceTileError::InvalidInput("location is empty".into()));
    }

    let center = client.geocode(location).await?;
    let bbox = bbox_from_center_radius(center, request.radius_m);
    info!(location, lon = center.lon, lat = center.lat, "resolved search center");

    let fetched = fetch_tiled(client, query, &bbox, &request.tiling, cancel, progress).await?;
    let normalized = normalize_records(&fetched.records, request.exclude_franchises);

    Ok(SearchReport {
        center,
        rows: normalized.rows,
        records: fetched.records,
        excluded: normalized.excluded,
        cancelled: fetched.cancelled,
    })
}
