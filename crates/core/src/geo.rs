use crate::directory::extract_zip5;
use crate::error::GeoError;
use crate::models::{PostalArea, ProviderRecord};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

const MILES_PER_DEGREE_LAT: f64 = 69.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ZipCentroid {
    pub zip5: String,
    pub lat: f64,
    pub lon: f64,
}

/// Postal code reference table: ZIP to centroid latitude/longitude.
#[derive(Debug, Clone, Default)]
pub struct PostalTable {
    centroids: Vec<ZipCentroid>,
}

impl PostalTable {
    pub fn new(centroids: Vec<ZipCentroid>) -> Self {
        Self { centroids }
    }

    /// Loads a GeoNames postal code dump (tab-separated, code in column 2,
    /// latitude and longitude in columns 10 and 11).
    pub fn from_geonames_file(path: &Path) -> Result<Self, GeoError> {
        let data = std::fs::read_to_string(path)?;
        Self::parse_geonames(&data)
    }

    pub fn parse_geonames(data: &str) -> Result<Self, GeoError> {
        let mut centroids = Vec::new();
        for (lineno, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 11 {
                return Err(GeoError::Parse {
                    line: lineno + 1,
                    details: format!("too few columns ({})", parts.len()),
                });
            }
            let Some(zip5) = extract_zip5(parts[1]) else {
                continue;
            };
            let lat = parse_coordinate(parts[9], lineno + 1, "latitude")?;
            let lon = parse_coordinate(parts[10], lineno + 1, "longitude")?;
            centroids.push(ZipCentroid { zip5, lat, lon });
        }
        Ok(Self { centroids })
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    pub fn lookup(&self, zip: &str) -> Option<PostalArea<'_>> {
        self.areas().find(|area| area.zip == zip)
    }

    pub fn areas(&self) -> impl Iterator<Item = PostalArea<'_>> {
        self.centroids.iter().map(|centroid| PostalArea {
            zip: &centroid.zip5,
            lat: centroid.lat,
            lon: centroid.lon,
        })
    }
}

fn parse_coordinate(raw: &str, line: usize, field: &str) -> Result<f64, GeoError> {
    raw.trim().parse::<f64>().map_err(|error| GeoError::Parse {
        line,
        details: format!("invalid {field} {raw:?}: {error}"),
    })
}

/// Axis-aligned bounding box around a centre point. Points in the box corners
/// lie outside the true circle and are still admitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn around(lat: f64, lon: f64, radius_miles: f64) -> Self {
        let radius = radius_miles.max(0.0);
        let lat_offset = radius / MILES_PER_DEGREE_LAT;
        let lon_offset = radius / (MILES_PER_DEGREE_LAT * lat.to_radians().cos());

        Self {
            min_lat: lat - lat_offset,
            max_lat: lat + lat_offset,
            min_lon: lon - lon_offset,
            max_lon: lon + lon_offset,
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

/// Radius filtering over an optional postal reference table.
///
/// Without a table, or for a centre ZIP the table does not know, the allowed
/// set is just the centre ZIP itself.
#[derive(Debug, Clone, Default)]
pub struct GeoFilter {
    table: Option<PostalTable>,
}

impl GeoFilter {
    pub fn new(table: Option<PostalTable>) -> Self {
        Self { table }
    }

    pub fn with_table(table: PostalTable) -> Self {
        Self { table: Some(table) }
    }

    /// Sorted, deduplicated ZIPs within `radius_miles` of `center_zip`.
    pub fn expand_radius(&self, center_zip: &str, radius_miles: f64) -> BTreeSet<String> {
        let Some(center) = extract_zip5(center_zip) else {
            return BTreeSet::new();
        };

        let Some(table) = &self.table else {
            return BTreeSet::from([center]);
        };

        let Some(origin) = table.lookup(&center) else {
            warn!(zip = %center, "zip not in postal table, matching exact zip only");
            return BTreeSet::from([center]);
        };

        let bounds = BoundingBox::around(origin.lat, origin.lon, radius_miles);
        let mut nearby: BTreeSet<String> = table
            .areas()
            .filter(|area| bounds.contains(area.lat, area.lon))
            .map(|area| area.zip.to_string())
            .collect();
        nearby.insert(center);

        debug!(
            zip = %origin.zip,
            radius_miles,
            zip_count = nearby.len(),
            "expanded search radius"
        );
        nearby
    }

    /// Records whose ZIP lies within the radius, in input order.
    pub fn filter_by_zip(
        &self,
        records: &[ProviderRecord],
        center_zip: &str,
        radius_miles: f64,
    ) -> Vec<ProviderRecord> {
        let allowed = self.expand_radius(center_zip, radius_miles);
        if allowed.is_empty() {
            return Vec::new();
        }

        records
            .iter()
            .filter(|record| allowed.contains(&record.zip))
            .cloned()
            .collect()
    }
}
