pub mod client;
pub mod core;
pub mod error;
pub mod search;

pub use client::{
    BoundingBox, CancelToken, Coordinate, Geocoder, KakaoClient, KeywordPage, KeywordQuery,
    PlaceRecord, PlaceSearch, ProgressSink, RunProgress, SearchArea, SortOrder, TiledResult,
    TilingConfig, fetch_tiled,
};
pub use crate::core::{
    FRANCHISE_KEYWORDS, PlaceRow, RowPage, Tile, bbox_from_center_radius, default_export_name,
    is_franchise, normalize_records, tiles, write_csv, write_geojson,
};
pub use error::PlaceTileError;
pub use search::{DEFAULT_RADIUS_M, SearchReport, SearchRequest, run_search};
