use crate::models::GeoPoint;

/// Средний радиус Земли, км
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Расстояние по дуге большого круга между двумя точками (формула гаверсинусов), в км.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}
