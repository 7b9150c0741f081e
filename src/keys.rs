//! Enums used as keys for forecast parameters, models and model families.
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use strum_macros::{AsRefStr, EnumIter, EnumString};

/// Forecast parameters as they are named in a normalized hourly series.
///
/// The names follow the Open-Meteo convention because every adapter maps its provider onto it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumString, AsRefStr,
)]
pub enum Param {
    /// 2 m temperature (C)
    #[strum(serialize = "temperature_2m")]
    Temperature2m,
    /// 2 m dew point (C)
    #[strum(serialize = "dewpoint_2m")]
    DewPoint2m,
    /// 2 m relative humidity (%)
    #[strum(serialize = "relative_humidity_2m")]
    RelativeHumidity2m,
    /// Total cloud cover (%)
    #[strum(serialize = "cloudcover")]
    CloudCover,
    /// Low cloud cover (%)
    #[strum(serialize = "cloudcover_low")]
    CloudCoverLow,
    /// Mid cloud cover (%)
    #[strum(serialize = "cloudcover_mid")]
    CloudCoverMid,
    /// High cloud cover (%)
    #[strum(serialize = "cloudcover_high")]
    CloudCoverHigh,
    /// Precipitation rate (mm/h)
    #[strum(serialize = "precipitation")]
    Precipitation,
    /// 10 m wind speed (m/s)
    #[strum(serialize = "windspeed_10m")]
    WindSpeed10m,
    /// 10 m wind gusts (m/s)
    #[strum(serialize = "windgusts_10m")]
    WindGusts10m,
    /// 850 hPa wind speed (m/s)
    #[strum(serialize = "windspeed_850hPa")]
    WindSpeed850,
    /// 700 hPa wind speed (m/s)
    #[strum(serialize = "windspeed_700hPa")]
    WindSpeed700,
    /// 850 hPa temperature (C)
    #[strum(serialize = "temperature_850hPa")]
    Temperature850,
    /// 700 hPa temperature (C)
    #[strum(serialize = "temperature_700hPa")]
    Temperature700,
    /// 850 hPa relative humidity (%)
    #[strum(serialize = "relative_humidity_850hPa")]
    RelativeHumidity850,
    /// 700 hPa relative humidity (%)
    #[strum(serialize = "relative_humidity_700hPa")]
    RelativeHumidity700,
    /// Shortwave radiation (W/m²)
    #[strum(serialize = "shortwave_radiation")]
    ShortwaveRadiation,
    /// Convective Available Potential Energy (J/kg)
    #[strum(serialize = "cape")]
    Cape,
    /// Convective inhibition (J/kg)
    #[strum(serialize = "convective_inhibition")]
    ConvectiveInhibition,
    /// Lifted index
    #[strum(serialize = "lifted_index")]
    LiftedIndex,
    /// Boundary layer height (m)
    #[strum(serialize = "boundary_layer_height")]
    BoundaryLayerHeight,
    /// Model native convective updraft velocity (m/s)
    #[strum(serialize = "updraft")]
    Updraft,
}

impl Param {
    /// Parameters summarized by the ensemble sources.
    pub const ENSEMBLE: [Param; 7] = [
        Param::Temperature2m,
        Param::WindSpeed10m,
        Param::WindGusts10m,
        Param::CloudCover,
        Param::Precipitation,
        Param::Cape,
        Param::WindSpeed850,
    ];

    /// Parameters merged into the hourly profile.
    pub const PROFILE: [Param; 21] = [
        Param::Temperature2m,
        Param::DewPoint2m,
        Param::CloudCover,
        Param::CloudCoverLow,
        Param::CloudCoverMid,
        Param::CloudCoverHigh,
        Param::Precipitation,
        Param::WindSpeed10m,
        Param::WindGusts10m,
        Param::WindSpeed850,
        Param::WindSpeed700,
        Param::Temperature850,
        Param::Temperature700,
        Param::RelativeHumidity850,
        Param::RelativeHumidity700,
        Param::ShortwaveRadiation,
        Param::Cape,
        Param::ConvectiveInhibition,
        Param::LiftedIndex,
        Param::BoundaryLayerHeight,
        Param::Updraft,
    ];

    /// Number of decimals kept when two models are averaged.
    pub fn averaging_decimals(self) -> i32 {
        use self::Param::*;

        match self {
            CloudCover | CloudCoverLow | CloudCoverMid | CloudCoverHigh | RelativeHumidity2m
            | RelativeHumidity850 | RelativeHumidity700 | Cape | ShortwaveRadiation => 0,
            _ => 2,
        }
    }
}

macro_rules! string_key_serde {
    ($type:ty, $what:expr) => {
        impl Serialize for $type {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_ref())
            }
        }

        impl<'de> Deserialize<'de> for $type {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let key = String::deserialize(deserializer)?;
                <$type>::from_str(&key)
                    .map_err(|_| de::Error::custom(format!("unknown {}: {}", $what, key)))
            }
        }
    };
}

string_key_serde!(Param, "parameter");

/// Forecast models, deterministic, ensemble and regional.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumString, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Model {
    /// ICON-D2, 2 km, ~48 h horizon.
    IconD2,
    /// ICON-EU, 7 km.
    IconEu,
    /// ICON global, 13 km.
    IconGlobal,
    /// Open-Meteo ICON blend, kept for older source bags.
    IconSeamless,
    /// ECMWF IFS HRES 0.25°.
    #[strum(serialize = "ecmwf_ifs025")]
    EcmwfIfs025,
    /// ECMWF IFS 0.4°.
    #[strum(serialize = "ecmwf_ifs04")]
    EcmwfIfs04,
    /// Older key for ECMWF HRES.
    EcmwfHres,
    /// GFS seamless blend.
    GfsSeamless,
    /// GFS 0.25°.
    Gfs,
    /// ECMWF 51 member ensemble.
    EcmwfEns,
    /// ICON-EU 40 member ensemble.
    IconEuEps,
    /// GeoSphere AROME 2.5 km.
    GeosphereArome,
    /// DWD MOSMIX_L station forecast.
    Mosmix,
}

impl Model {
    /// Human readable model name.
    pub fn label(self) -> &'static str {
        use self::Model::*;

        match self {
            IconD2 => "ICON-D2 2 km",
            IconEu => "ICON-EU 7 km",
            IconGlobal => "ICON Global 13 km",
            IconSeamless => "ICON Seamless (Open-Meteo blend)",
            EcmwfIfs025 | EcmwfHres => "ECMWF IFS HRES 0.25°",
            EcmwfIfs04 => "ECMWF IFS 0.4°",
            GfsSeamless => "GFS Seamless",
            Gfs => "GFS 0.25°",
            EcmwfEns => "ECMWF ENS 51-member",
            IconEuEps => "ICON-EU EPS 40-member",
            GeosphereArome => "GeoSphere AROME 2.5 km",
            Mosmix => "DWD MOSMIX_L",
        }
    }

    /// Whether this model publishes a native convective updraft velocity.
    ///
    /// Only the 2 km regional run does; coarser runs return it as null.
    pub fn reports_updraft(self) -> bool {
        self == Model::IconD2
    }
}

string_key_serde!(Model, "model");

/// Deterministic model families. Only one member of a family is ever used for a date.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumString, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Family {
    /// DWD ICON runs.
    Icon,
    /// ECMWF IFS runs.
    Ecmwf,
    /// NCEP GFS runs, the only family reporting BL height, LI and CIN.
    Gfs,
}

string_key_serde!(Family, "model family");
