//! Physical derivations used throughout the analysis.
//!
//! These are pure functions. A missing input always yields a missing output, they never fail.
use crate::utility::round_to;
use metfor::{Celsius, Kelvin, Meters, MetersPSec, Quantity};

/// Dry adiabatic spread factor, metres of lift per degree of dew point depression.
const LCL_SPREAD_FACTOR: f64 = 125.0;
/// Assumed thickness of the 850-700 hPa layer in km.
const LAYER_850_700_KM: f64 = 1.5;
/// Fraction of incoming shortwave radiation converted to sensible heat flux.
const SENSIBLE_HEAT_FRACTION: f64 = 0.4;
/// Air density (kg/m³) times specific heat at constant pressure (J/kg/K).
const RHO_CP: f64 = 1.1 * 1005.0;
const GRAVITY: f64 = 9.81;

/// Estimate the cloud base in metres above mean sea level.
///
/// This is the usual linear approximation of the lifting condensation level from the surface
/// temperature - dew point spread, rounded to the nearest metre.
///
/// # Examples
///
/// ```rust
/// use metfor::{Celsius, Meters};
/// use thermal_triage::cloud_base_msl;
///
/// let base = cloud_base_msl(Some(Celsius(20.0)), Some(Celsius(8.0)), Meters(700.0));
/// assert_eq!(base, Some(Meters(2200.0)));
///
/// assert!(cloud_base_msl(None, Some(Celsius(8.0)), Meters(700.0)).is_none());
/// ```
pub fn cloud_base_msl(
    temperature: Option<Celsius>,
    dew_point: Option<Celsius>,
    elevation: Meters,
) -> Option<Meters> {
    let (t, td) = (temperature?, dew_point?);
    let spread = (t - td).unpack();

    Some(Meters(
        (LCL_SPREAD_FACTOR * spread + elevation.unpack()).round(),
    ))
}

/// Lapse rate between 850 and 700 hPa in &deg;C / km, rounded to one decimal.
///
/// A fixed layer thickness is assumed, so no heights are required.
pub fn lapse_rate(t850: Option<Celsius>, t700: Option<Celsius>) -> Option<f64> {
    let (low, high) = (t850?, t700?);

    Some(round_to((low - high).unpack() / LAYER_850_700_KM, 1))
}

/// Deardorff convective velocity scale, W*.
///
/// The surface heat flux is estimated as a fixed fraction of the shortwave radiation. Returns
/// `None` when the boundary layer is shallower than 10 m, radiation is below 10 W/m², the
/// temperature is missing, or the temperature is physically implausible (below 200 K). A
/// non-positive buoyancy flux yields zero, which is a legitimate "no convection" answer.
///
/// # Arguments
///  - bl_height is the boundary layer depth.
///  - shortwave is the incoming shortwave radiation in W/m².
///  - temperature is the 2 m temperature.
pub fn wstar(
    bl_height: Option<Meters>,
    shortwave: Option<f64>,
    temperature: Option<Celsius>,
) -> Option<MetersPSec> {
    let bl_height = bl_height.filter(|&h| h > Meters(10.0))?;
    let shortwave = shortwave.filter(|&sw| sw > 10.0)?;
    let t_k = Kelvin::from(temperature?);

    if t_k < Kelvin(200.0) {
        return None;
    }

    let heat_flux = SENSIBLE_HEAT_FRACTION * shortwave;
    let arg = (GRAVITY / t_k.unpack()) * bl_height.unpack() * heat_flux / RHO_CP;

    if arg > 0.0 {
        Some(MetersPSec(round_to(arg.cbrt(), 2)))
    } else {
        Some(MetersPSec(0.0))
    }
}

/// Difference between gusts and mean wind, one decimal. Large values mean mechanical turbulence.
pub fn gust_factor(gust: Option<MetersPSec>, mean_wind: Option<MetersPSec>) -> Option<MetersPSec> {
    let (gust, wind) = (gust?, mean_wind?);

    Some(MetersPSec(round_to(gust.unpack() - wind.unpack(), 1)))
}
