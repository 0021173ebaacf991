use std::collections::HashSet;

use serde::Serialize;

use crate::client::PlaceRecord;

/// Franchise brand fragments matched as case-insensitive substrings of a name.
pub const FRANCHISE_KEYWORDS: &[&str] = &[
    "MGC",
    "메가커피",
    "메가",
    "MEGA",
    "컴포즈",
    "컴포즈커피",
    "COMPOSE",
    "스타벅스",
    "STARBUCKS",
    "빽다방",
    "PAIK",
    "이디야",
    "투썸",
    "매머드",
];

/// A display/export row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PlaceRow {
    pub name: String,
    pub address: String,
    pub phone: String,
}

impl From<&PlaceRecord> for PlaceRow {
    /// Trims fields and prefers the road-name address over the lot-number one.
    fn from(record: &PlaceRecord) -> Self {
        let road = record.road_address.trim();
        let address = if road.is_empty() {
            record.address.trim()
        } else {
            road
        };

        Self {
            name: record.name.trim().to_string(),
            address: address.to_string(),
            phone: record.phone.trim().to_string(),
        }
    }
}

pub fn is_franchise(name: &str) -> bool {
    let name = name.trim().to_lowercase();
    FRANCHISE_KEYWORDS
        .iter()
        .any(|k| name.contains(&k.to_lowercase()))
}

#[derive(Debug, Default)]
pub struct Normalized {
    pub rows: Vec<PlaceRow>,
    /// Records dropped by the franchise filter, counted before row dedup.
    pub excluded: usize,
}

/// Turns raw records into rows, optionally dropping franchises, then removes
/// rows identical in name, address and phone (first occurrence kept).
pub fn normalize_records(records: &[PlaceRecord], exclude_franchises: bool) -> Normalized {
    let mut seen = HashSet::new();
    let mut out = Normalized::default();

    for record in records {
        let row = PlaceRow::from(record);
        if exclude_franchises && is_franchise(&row.name) {
            out.excluded += 1;
            continue;
        }
        if seen.insert(row.clone()) {
            out.rows.push(row);
        }
    }
    out
}
