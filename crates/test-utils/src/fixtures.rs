//! Common fixtures shared across comparison tests.

/// The four-point mixed case: one match, one difference, one NaN in A only
/// and one shared missing value.
pub mod mixed {
    pub const MISSING_VALUE: f64 = -999.0;
    pub const EPSILON: f64 = 0.1;

    pub fn a() -> Vec<f64> {
        vec![1.0, 2.0, f64::NAN, MISSING_VALUE]
    }

    pub fn b() -> Vec<f64> {
        vec![1.0, 2.5, 3.0, MISSING_VALUE]
    }
}

/// Small geolocation swaths.
pub mod geolocation {
    /// 2x3 swath, all points on the earth.
    pub fn valid_lon() -> Vec<f64> {
        vec![-120.0, -119.5, -119.0, -120.0, -119.5, -119.0]
    }

    pub fn valid_lat() -> Vec<f64> {
        vec![45.0, 45.0, 45.0, 44.5, 44.5, 44.5]
    }

    /// Same swath with fill values at the last point, as some products
    /// write -999 for geolocation they could not compute.
    pub fn lon_with_fill() -> Vec<f64> {
        let mut lon = valid_lon();
        lon[5] = -999.0;
        lon
    }

    pub fn lat_with_fill() -> Vec<f64> {
        let mut lat = valid_lat();
        lat[5] = -999.0;
        lat
    }

    pub const SHAPE: [usize; 2] = [2, 3];
}
