mod export;
mod geometry;
mod normalize;
mod table;

pub use export::{default_export_name, write_csv, write_geojson};
pub use geometry::{METERS_PER_DEGREE, Tile, TileIter, bbox_from_center_radius, tiles};
pub use normalize::{FRANCHISE_KEYWORDS, Normalized, PlaceRow, is_franchise, normalize_records};
pub use table::RowPage;
