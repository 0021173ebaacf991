use std::time::Duration;

use geo_types::{Point, Rect, coord};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::PlaceTileError;

pub struct HttpClient {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl HttpClient {
    const TIMEOUT: Duration = Duration::from_secs(20);

    pub fn new() -> Result<Self, PlaceTileError> {
        let client = reqwest::Client::builder().timeout(Self::TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, PlaceTileError> {
        let mut request = self.client.get(url);

        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("KakaoAK {}", key));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(PlaceTileError::Api {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let data: T = response.json().await?;
        Ok(data)
    }
}

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Parses the decimal-string `x`/`y` pair the provider returns.
    pub fn parse(x: &str, y: &str) -> Option<Self> {
        let lon: f64 = x.trim().parse().ok()?;
        let lat: f64 = y.trim().parse().ok()?;
        (lon.is_finite() && lat.is_finite()).then_some(Self { lon, lat })
    }
}

impl From<Coordinate> for Point<f64> {
    fn from(c: Coordinate) -> Self {
        Point::new(c.lon, c.lat)
    }
}

/// Axis-aligned rectangle in decimal degrees.
///
/// A valid box has `min_lon < max_lon` and `min_lat < max_lat`; see
/// [`BoundingBox::validate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn validate(&self) -> Result<(), PlaceTileError> {
        let finite = [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
            .iter()
            .all(|v| v.is_finite());

        if !finite || self.min_lon >= self.max_lon || self.min_lat >= self.max_lat {
            return Err(PlaceTileError::InvalidRegion(format!(
                "expected min_lon < max_lon and min_lat < max_lat, got ({}, {}, {}, {})",
                self.min_lon, self.min_lat, self.max_lon, self.max_lat
            )));
        }
        Ok(())
    }

    /// The `rect` query value: `min_lon,min_lat,max_lon,max_lat`.
    pub fn to_rect_param(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

impl From<BoundingBox> for Rect<f64> {
    fn from(b: BoundingBox) -> Self {
        Rect::new(
            coord! { x: b.min_lon, y: b.min_lat },
            coord! { x: b.max_lon, y: b.max_lat },
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Accuracy,
    Distance,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Accuracy => "accuracy",
            SortOrder::Distance => "distance",
        }
    }
}

/// Where a keyword search is scoped.
///
/// A rectangle always wins over a center: the two are never sent together.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SearchArea {
    #[default]
    Anywhere,
    Rect(BoundingBox),
    Around {
        center: Coordinate,
        radius_m: Option<u32>,
    },
}

/// One keyword-search page request.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordQuery {
    pub query: String,
    pub page: u32,
    pub size: u32,
    pub sort: SortOrder,
    pub area: SearchArea,
}

impl KeywordQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page: 1,
            size: 15,
            sort: SortOrder::default(),
            area: SearchArea::default(),
        }
    }

    pub fn in_rect(query: impl Into<String>, rect: BoundingBox, page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            area: SearchArea::Rect(rect),
            ..Self::new(query)
        }
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }
}

/// A provider search hit. `id` is the identity used for deduplication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceRecord {
    pub id: String,
    pub name: String,
    /// Road-name form, may be empty.
    pub road_address: String,
    /// Lot-number form.
    pub address: String,
    pub phone: String,
    pub place_url: String,
    pub coordinate: Option<Coordinate>,
}

/// One page of keyword results plus the provider's last-page signal.
#[derive(Debug, Clone, Default)]
pub struct KeywordPage {
    pub records: Vec<PlaceRecord>,
    pub is_end: bool,
}
