//! Small numeric helpers shared by the analysis modules.

/// Round to a fixed number of decimals.
pub fn round_to(val: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (val * factor).round() / factor
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(vals: &[f64]) -> Option<f64> {
    if vals.is_empty() {
        None
    } else {
        Some(vals.iter().sum::<f64>() / vals.len() as f64)
    }
}

/// Median, averaging the two middle values for an even count.
pub fn median(vals: &[f64]) -> Option<f64> {
    if vals.is_empty() {
        return None;
    }

    let mut sorted = vals.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Maximum of a slice, `None` if empty.
pub fn max(vals: &[f64]) -> Option<f64> {
    vals.iter().cloned().reduce(f64::max)
}

/// Minimum of a slice, `None` if empty.
pub fn min(vals: &[f64]) -> Option<f64> {
    vals.iter().cloned().reduce(f64::min)
}

/// Clock label for a local hour, e.g. `13:00`.
pub fn hour_label(hour: u32) -> String {
    format!("{:02}:00", hour)
}

/// Serialize an optional hour as a clock label.
pub(crate) fn serialize_hour<S>(hour: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match hour {
        Some(h) => serializer.serialize_str(&hour_label(*h)),
        None => serializer.serialize_none(),
    }
}
