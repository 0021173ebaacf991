use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};

use crate::client::PlaceRecord;
use crate::error::PlaceTileError;

use super::normalize::PlaceRow;

const CSV_HEADER: [&str; 4] = ["No", "이름", "주소", "전화번호"];

/// Default export name for a search, e.g. `서울시청_카페_results.csv`.
pub fn default_export_name(location: &str, query: &str) -> String {
    let location = Some(location.trim()).filter(|s| !s.is_empty()).unwrap_or("location");
    let query = Some(query.trim()).filter(|s| !s.is_empty()).unwrap_or("results");
    format!("{}_{}_results.csv", location, query)
}

/// Writes rows as CSV with a leading 1-based `No` column.
pub fn write_csv(rows: &[PlaceRow], path: impl AsRef<Path>) -> Result<(), PlaceTileError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(CSV_HEADER)?;

    for (i, row) in rows.iter().enumerate() {
        let no = (i + 1).to_string();
        writer.write_record([
            no.as_str(),
            row.name.as_str(),
            row.address.as_str(),
            row.phone.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

impl PlaceRecord {
    /// Converts the record to a GeoJSON [`Feature`] with a point geometry when
    /// the coordinate is known.
    pub fn to_geojson_feature(&self) -> Feature {
        let geometry = self
            .coordinate
            .map(|c| Geometry::new(GeoJsonValue::Point(vec![c.lon, c.lat])));

        let mut properties = serde_json::Map::new();
        properties.insert("id".to_string(), serde_json::json!(self.id));
        properties.insert("name".to_string(), serde_json::json!(self.name));
        properties.insert(
            "road_address".to_string(),
            serde_json::json!(self.road_address),
        );
        properties.insert("address".to_string(), serde_json::json!(self.address));
        properties.insert("phone".to_string(), serde_json::json!(self.phone));
        properties.insert("place_url".to_string(), serde_json::json!(self.place_url));

        Feature {
            bbox: None,
            geometry,
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// Writes raw records as a GeoJSON FeatureCollection.
pub fn write_geojson(
    records: &[PlaceRecord],
    path: impl AsRef<Path>,
) -> Result<(), PlaceTileError> {
    let file = File::create(path)?;
    write_feature_collection(records, BufWriter::new(file))
}

// `Json` is reserved for provider bodies; export failures surface as `Io`.
fn write_feature_collection<W: Write>(
    records: &[PlaceRecord],
    mut writer: W,
) -> Result<(), PlaceTileError> {
    let collection = FeatureCollection {
        bbox: None,
        features: records.iter().map(PlaceRecord::to_geojson_feature).collect(),
        foreign_members: None,
    };

    serde_json::to_writer_pretty(&mut writer, &collection).map_err(std::io::Error::from)?;
    writer.flush()?;
    Ok(())
}
