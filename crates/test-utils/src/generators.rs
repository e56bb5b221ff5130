//! Synthetic swath data for comparison tests.
//!
//! Everything here is deterministic: the same arguments always produce the
//! same values, so tests can assert on exact counts.

/// Creates a brightness-temperature-like field in Kelvin (roughly 220K to
/// 300K), warmer toward the bottom-right.
pub fn create_brightness_temperature_field(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let x = col as f64 / width.max(1) as f64;
            let y = row as f64 / height.max(1) as f64;
            data.push(220.0 + 80.0 * (x + y) / 2.0);
        }
    }
    data
}

/// Creates a regular longitude/latitude swath, row-major.
///
/// Returns `(longitude, latitude)` spanning the given corners inclusively.
pub fn create_lon_lat_swath(
    width: usize,
    height: usize,
    (min_lon, max_lon): (f64, f64),
    (min_lat, max_lat): (f64, f64),
) -> (Vec<f64>, Vec<f64>) {
    let step = |lo: f64, hi: f64, n: usize, i: usize| {
        if n > 1 {
            lo + (hi - lo) * i as f64 / (n - 1) as f64
        } else {
            lo
        }
    };

    let mut lon = Vec::with_capacity(width * height);
    let mut lat = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            lon.push(step(min_lon, max_lon, width, col));
            lat.push(step(max_lat, min_lat, height, row));
        }
    }
    (lon, lat)
}

/// Adds a deterministic perturbation in `[-amplitude, amplitude]` to every
/// value.
pub fn perturb(values: &[f64], amplitude: f64, seed: u32) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let h = simple_hash(i as u32, 0, seed);
            let unit = (h % 20001) as f64 / 10000.0 - 1.0;
            v + amplitude * unit
        })
        .collect()
}

/// Replaces the values at `positions` with NaN.
pub fn inject_nans(values: &mut [f64], positions: &[usize]) {
    inject_value(values, positions, f64::NAN);
}

/// Replaces the values at `positions` with a missing-value sentinel.
pub fn inject_missing(values: &mut [f64], positions: &[usize], missing_value: f64) {
    inject_value(values, positions, missing_value);
}

fn inject_value(values: &mut [f64], positions: &[usize], value: f64) {
    for &i in positions {
        if let Some(slot) = values.get_mut(i) {
            *slot = value;
        }
    }
}

/// Every `stride`-th index starting at `offset`, below `len`.
pub fn every_nth(len: usize, stride: usize, offset: usize) -> Vec<usize> {
    (offset..len).step_by(stride.max(1)).collect()
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lon_lat_swath_corners() {
        let (lon, lat) = create_lon_lat_swath(3, 2, (-10.0, 10.0), (-5.0, 5.0));
        assert_eq!(lon, vec![-10.0, 0.0, 10.0, -10.0, 0.0, 10.0]);
        assert_eq!(lat, vec![5.0, 5.0, 5.0, -5.0, -5.0, -5.0]);
    }

    #[test]
    fn test_perturb_is_bounded_and_deterministic() {
        let base = create_brightness_temperature_field(8, 8);
        let a = perturb(&base, 0.5, 7);
        let b = perturb(&base, 0.5, 7);
        assert_eq!(a, b);
        for (p, v) in a.iter().zip(&base) {
            assert!((p - v).abs() <= 0.5 + 1e-12);
        }
    }

    #[test]
    fn test_injection() {
        let mut values = vec![1.0; 6];
        inject_nans(&mut values, &[0, 10]);
        inject_missing(&mut values, &every_nth(6, 2, 1), -999.0);
        assert!(values[0].is_nan());
        assert_eq!(values[1], -999.0);
        assert_eq!(values[2], 1.0);
        assert_eq!(values[5], -999.0);
    }
}
