use serde::{Deserialize, Deserializer};

use crate::client::types::{Coordinate, PlaceRecord};

#[derive(Debug, Deserialize)]
pub struct KeywordResponse {
    #[serde(default)]
    pub meta: KeywordMeta,
    #[serde(default)]
    pub documents: Vec<KeywordDocument>,
}

#[derive(Debug, Deserialize)]
pub struct KeywordMeta {
    /// A response without the flag is treated as the last page.
    #[serde(default = "default_is_end")]
    pub is_end: bool,
    #[serde(default)]
    pub total_count: u64,
}

fn default_is_end() -> bool {
    true
}

impl Default for KeywordMeta {
    fn default() -> Self {
        Self {
            is_end: true,
            total_count: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct KeywordDocument {
    pub id: String,
    pub place_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub road_address_name: String,
    pub address_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub phone: String,
    pub place_url: String,
    pub x: String,
    pub y: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl KeywordDocument {
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::parse(&self.x, &self.y)
    }

    /// Converts to a [`PlaceRecord`]; documents without an id are dropped.
    pub fn into_record(self) -> Option<PlaceRecord> {
        if self.id.is_empty() {
            return None;
        }
        let coordinate = self.coordinate();
        Some(PlaceRecord {
            id: self.id,
            name: self.place_name,
            road_address: self.road_address_name,
            address: self.address_name,
            phone: self.phone,
            place_url: self.place_url,
            coordinate,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AddressResponse {
    #[serde(default)]
    pub documents: Vec<AddressDocument>,
}

/// Only the lot-number match carries the coordinate used for geocoding.
#[derive(Debug, Deserialize)]
pub struct AddressDocument {
    pub address: Option<AddressDetail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddressDetail {
    pub x: String,
    pub y: String,
}
