//! Static description of a flying site.
use metfor::Meters;
use serde::{Deserialize, Serialize};

/// A launch site with the terrain reference used for safety margins.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Short key, used to name source bags and in reports.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Station (landing) elevation in metres.
    pub elevation_m: f64,
    /// Typical ridge or peak elevation in metres. Cloud base margins are measured against this.
    pub peak_elevation_m: f64,
    /// GeoSphere Austria station id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geosphere_id: Option<String>,
    /// DWD MOSMIX station id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mosmix_id: Option<String>,
    /// Driving time from home in hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_h: Option<f64>,
}

impl Location {
    /// Station elevation.
    pub fn elevation(&self) -> Meters {
        Meters(self.elevation_m)
    }

    /// Peak elevation.
    pub fn peaks(&self) -> Meters {
        Meters(self.peak_elevation_m)
    }

    /// Create a location with only the fields the analysis needs.
    pub fn new<S: Into<String>>(key: S, elevation_m: f64, peak_elevation_m: f64) -> Self {
        let key = key.into();
        Location {
            name: key.clone(),
            key,
            latitude: 0.0,
            longitude: 0.0,
            elevation_m,
            peak_elevation_m,
            geosphere_id: None,
            mosmix_id: None,
            drive_h: None,
        }
    }
}
