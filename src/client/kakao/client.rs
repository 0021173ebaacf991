use tracing::debug;

use crate::client::traits::{Geocoder, PlaceSearch};
use crate::client::types::{Coordinate, HttpClient, KeywordPage, KeywordQuery, SearchArea};
use crate::error::PlaceTileError;

use super::record::{AddressResponse, KeywordResponse};

/// Client for the Kakao Local REST API (keyword and address search).
pub struct KakaoClient {
    http: HttpClient,
    base_url: String,
}

impl KakaoClient {
    const DEFAULT_BASE_URL: &'static str = "https://dapi.kakao.com";
    const KEYWORD_PATH: &'static str = "/v2/local/search/keyword.json";
    const ADDRESS_PATH: &'static str = "/v2/local/search/address.json";
    const ADDRESS_PAGE_SIZE: u32 = 10;

    /// Builds a client from `KAKAO_REST_API_KEY`.
    pub fn new() -> Result<Self, PlaceTileError> {
        let key = std::env::var("KAKAO_REST_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| PlaceTileError::Config("KAKAO_REST_API_KEY not set".into()))?;

        Self::with_api_key(key)
    }

    pub fn with_api_key(key: impl Into<String>) -> Result<Self, PlaceTileError> {
        Ok(Self {
            http: HttpClient::new()?.with_api_key(key),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Points the client at another host, e.g. a local mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn keyword_url(&self, query: &KeywordQuery) -> String {
        let mut url = format!(
            "{}{}?query={}&page={}&size={}&sort={}",
            self.base_url,
            Self::KEYWORD_PATH,
            urlencoding::encode(&query.query),
            query.page,
            query.size,
            query.sort.as_str()
        );

        match query.area {
            SearchArea::Anywhere => {}
            SearchArea::Rect(rect) => {
                url.push_str(&format!(
                    "&rect={}",
                    urlencoding::encode(&rect.to_rect_param())
                ));
            }
            SearchArea::Around { center, radius_m } => {
                url.push_str(&format!("&x={}&y={}", center.lon, center.lat));
                if let Some(radius) = radius_m {
                    url.push_str(&format!("&radius={}", radius));
                }
            }
        }
        url
    }

    fn address_url(&self, query: &str, page: u32, size: u32) -> String {
        format!(
            "{}{}?query={}&page={}&size={}",
            self.base_url,
            Self::ADDRESS_PATH,
            urlencoding::encode(query),
            page,
            size
        )
    }

    /// Raw keyword search, documents untouched.
    pub async fn fetch_keyword(
        &self,
        query: &KeywordQuery,
    ) -> Result<KeywordResponse, PlaceTileError> {
        self.http.fetch_json(&self.keyword_url(query)).await
    }

    /// Raw address search.
    pub async fn fetch_address(
        &self,
        query: &str,
        page: u32,
        size: u32,
    ) -> Result<AddressResponse, PlaceTileError> {
        self.http
            .fetch_json(&self.address_url(query, page, size))
            .await
    }
}

impl PlaceSearch for KakaoClient {
    async fn search_keyword(&self, query: &KeywordQuery) -> Result<KeywordPage, PlaceTileError> {
        let response = self.fetch_keyword(query).await?;
        debug!(
            page = query.page,
            total_count = response.meta.total_count,
            is_end = response.meta.is_end,
            "keyword page"
        );

        Ok(KeywordPage {
            is_end: response.meta.is_end,
            records: response
                .documents
                .into_iter()
                .filter_map(|d| d.into_record())
                .collect(),
        })
    }
}

impl Geocoder for KakaoClient {
    /// Address lookup first, then a place-name keyword lookup.
    async fn geocode(&self, text: &str) -> Result<Coordinate, PlaceTileError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PlaceTileError::InvalidInput("location is empty".into()));
        }

        let addresses = self.fetch_address(text, 1, Self::ADDRESS_PAGE_SIZE).await?;
        let by_address = addresses
            .documents
            .first()
            .and_then(|d| d.address.as_ref())
            .and_then(|a| Coordinate::parse(&a.x, &a.y));

        if let Some(coordinate) = by_address {
            debug!(text, ?coordinate, "geocoded by address");
            return Ok(coordinate);
        }

        let places = self
            .fetch_keyword(&KeywordQuery::new(text).with_size(1))
            .await?;
        let by_keyword = places.documents.first().and_then(|d| d.coordinate());

        match by_keyword {
            Some(coordinate) => {
                debug!(text, ?coordinate, "geocoded by keyword");
                Ok(coordinate)
            }
            None => Err(PlaceTileError::LocationNotFound(text.to_string())),
        }
    }
}
