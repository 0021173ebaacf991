use crate::client::{BoundingBox, Coordinate};
use crate::error::PlaceTileError;

/// Meters per degree of latitude used by the planar approximation.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Floor for the cosine correction so longitude spans stay finite near the poles.
const MIN_COS_LAT: f64 = 0.1;

/// Absorbs float noise when a span is an exact multiple of the tile size.
const SPAN_EPSILON: f64 = 1e-9;

// =============================================================================
// Bounding box from center + radius
// =============================================================================

/// Approximates the box enclosing a circle of `radius_m` meters around `center`.
///
/// Planar degrees-per-meter conversion, longitude corrected by the cosine of
/// the center latitude (clamped to 0.1). Not geodesically exact.
pub fn bbox_from_center_radius(center: Coordinate, radius_m: f64) -> BoundingBox {
    let dlat = radius_m / METERS_PER_DEGREE;
    let cos_lat = center.lat.to_radians().cos().max(MIN_COS_LAT);
    let dlon = radius_m / (METERS_PER_DEGREE * cos_lat);

    BoundingBox::new(
        center.lon - dlon,
        center.lat - dlat,
        center.lon + dlon,
        center.lat + dlat,
    )
}

// =============================================================================
// Tile enumeration
// =============================================================================

/// A grid cell of a [`BoundingBox`] with its 1-based position in the run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    pub rect: BoundingBox,
    pub index: usize,
    pub total: usize,
}

/// Lazy row-major walk over the tiles of a box, bottom row first.
///
/// Cells are computed on demand from their grid position, so adjacent tiles
/// share exactly the same edge values and the last row and column are clipped
/// to the box.
#[derive(Debug, Clone)]
pub struct TileIter {
    bbox: BoundingBox,
    tile_deg: f64,
    cols: usize,
    total: usize,
    next: usize,
}

impl TileIter {
    pub fn total(&self) -> usize {
        self.total
    }

    fn edge(min: f64, max: f64, step: f64, i: usize, last: usize) -> f64 {
        if i >= last {
            max
        } else {
            (min + i as f64 * step).min(max)
        }
    }
}

impl Iterator for TileIter {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        if self.next >= self.total {
            return None;
        }

        let k = self.next;
        self.next += 1;

        let rows = self.total / self.cols;
        let (row, col) = (k / self.cols, k % self.cols);
        let b = &self.bbox;

        let rect = BoundingBox::new(
            Self::edge(b.min_lon, b.max_lon, self.tile_deg, col, self.cols),
            Self::edge(b.min_lat, b.max_lat, self.tile_deg, row, rows),
            Self::edge(b.min_lon, b.max_lon, self.tile_deg, col + 1, self.cols),
            Self::edge(b.min_lat, b.max_lat, self.tile_deg, row + 1, rows),
        );

        Some(Tile {
            rect,
            index: k + 1,
            total: self.total,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for TileIter {}

fn cells_along(span: f64, tile_deg: f64) -> Result<usize, PlaceTileError> {
    let cells = (span / tile_deg - SPAN_EPSILON).ceil();
    if !cells.is_finite() || cells >= usize::MAX as f64 {
        return Err(PlaceTileError::InvalidRegion(format!(
            "tile grid too large: {} / {} cells",
            span, tile_deg
        )));
    }
    Ok((cells as usize).max(1))
}

/// Partitions `bbox` into `tile_deg`-sized tiles.
///
/// Fails with [`PlaceTileError::InvalidRegion`] before producing anything if
/// the box is inverted or empty, the tile size is not a positive number, or
/// the tile count does not fit in a `usize`.
pub fn tiles(bbox: &BoundingBox, tile_deg: f64) -> Result<TileIter, PlaceTileError> {
    bbox.validate()?;
    if !(tile_deg.is_finite() && tile_deg > 0.0) {
        return Err(PlaceTileError::InvalidRegion(format!(
            "tile size must be positive, got {}",
            tile_deg
        )));
    }

    let cols = cells_along(bbox.width(), tile_deg)?;
    let rows = cells_along(bbox.height(), tile_deg)?;
    let total = cols.checked_mul(rows).ok_or_else(|| {
        PlaceTileError::InvalidRegion(format!("tile grid too large: {cols} x {rows} tiles"))
    })?;

    Ok(TileIter {
        bbox: *bbox,
        tile_deg,
        cols,
        total,
        next: 0,
    })
}
