pub mod kakao;
pub mod tiling;
pub mod traits;
pub mod types;

pub use kakao::KakaoClient;
pub use tiling::{
    CancelToken, ProgressSink, ResultSet, RunProgress, TiledResult, TilingConfig, fetch_tiled,
};
pub use traits::{Geocoder, PlaceSearch};
pub use types::{
    BoundingBox, Coordinate, HttpClient, KeywordPage, KeywordQuery, PlaceRecord, SearchArea,
    SortOrder,
};
