use std::future::Future;

use super::types::{Coordinate, KeywordPage, KeywordQuery};
use crate::error::PlaceTileError;

/// Trait for place providers that answer paged keyword searches.
pub trait PlaceSearch {
    fn search_keyword(
        &self,
        query: &KeywordQuery,
    ) -> impl Future<Output = Result<KeywordPage, PlaceTileError>> + Send;
}

/// Trait for resolving free text (an address or a place name) to a coordinate.
///
/// Implementations fail with [`PlaceTileError::InvalidInput`] on blank text and
/// [`PlaceTileError::LocationNotFound`] when nothing usable comes back.
pub trait Geocoder {
    fn geocode(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Coordinate, PlaceTileError>> + Send;
}
