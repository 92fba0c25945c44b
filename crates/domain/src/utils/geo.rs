//! Great-circle distance for nearby-space search
//!
//! Haversine over a spherical Earth model. Good to a few meters at city
//! scale, which is all the radius filter needs.

use crate::constants::EARTH_RADIUS_KM;
use crate::errors::{HiveDeskError, Result};

/// Great-circle distance between two coordinates, in kilometers.
///
/// Identical inputs return exactly `0.0` rather than whatever the floating
/// point rounding of a zero central angle produces. NaN or out-of-range
/// coordinates fail fast with `InvalidCoordinate`.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64> {
    validate(lat1, lon1)?;
    validate(lat2, lon2)?;

    if lat1 == lat2 && lon1 == lon2 {
        return Ok(0.0);
    }

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Clamp guards against a > 1 from rounding near antipodal points.
    let c = 2.0 * a.sqrt().min(1.0).asin();

    Ok(EARTH_RADIUS_KM * c)
}

/// Radius filter used by nearby-space search.
pub fn within_radius(
    lat1: f64,
    lon1: f64,
    lat2: f64,
    lon2: f64,
    radius_km: f64,
) -> Result<bool> {
    if !radius_km.is_finite() || radius_km < 0.0 {
        return Err(HiveDeskError::InvalidCoordinate(format!(
            "radius must be a non-negative number, got {radius_km}"
        )));
    }
    Ok(distance_km(lat1, lon1, lat2, lon2)? <= radius_km)
}

fn validate(lat: f64, lon: f64) -> Result<()> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(HiveDeskError::InvalidCoordinate(format!("latitude out of range: {lat}")));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(HiveDeskError::InvalidCoordinate(format!("longitude out of range: {lon}")));
    }
    Ok(())
}
