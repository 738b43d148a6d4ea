//! Fixed-precision coordinate string encodings
//!
//! Both encodings are pure functions of the coordinate pair: the same
//! (lat, lon) always yields the same strings, so stored records are
//! directly comparable and indexable on them.

use trackhub_common::{Error, Result};

/// Geohash cell of a coordinate pair at the given precision.
pub fn geohash_cell(lat: f64, lon: f64, precision: usize) -> Result<String> {
    geohash::encode(geohash::Coord { x: lon, y: lat }, precision)
        .map_err(|e| Error::InvalidInput(format!("coordinates out of range: {e}")))
}

const OLC_ALPHABET: &[u8; 20] = b"23456789CFGHJMPQRVWX";
const OLC_SEPARATOR: char = '+';
const OLC_SEPARATOR_POSITION: usize = 8;
const OLC_PAIR_DIGITS: usize = 10;
const OLC_MAX_DIGITS: usize = 15;
const OLC_GRID_ROWS: i64 = 5;
const OLC_GRID_COLUMNS: i64 = 4;
const OLC_LAT_MAX: f64 = 90.0;
const OLC_LON_MAX: f64 = 180.0;
// Integer value of one degree at the finest (15-digit) resolution:
// five base-20 pair refinements, then five 5x4 grid refinements.
const OLC_FINAL_LAT_PRECISION: i64 = 8_000 * 3_125;
const OLC_FINAL_LON_PRECISION: i64 = 8_000 * 1_024;

/// Open location code ("plus code") of a coordinate pair.
///
/// `code_length` counts digits, excluding the `+` separator; it is
/// clamped to [2, 15] and lengths below 10 are rounded up to even, as
/// required by the encoding. Latitude is clipped and longitude
/// normalized, so every input encodes.
pub fn pluscode(lat: f64, lon: f64, code_length: usize) -> String {
    let mut code_length = code_length.clamp(2, OLC_MAX_DIGITS);
    if code_length < OLC_PAIR_DIGITS && code_length % 2 == 1 {
        code_length += 1;
    }

    let lat = lat.clamp(-OLC_LAT_MAX, OLC_LAT_MAX);
    let lon = normalize_longitude(lon);

    // Work in positive integer space; rounding at 1e-6 absorbs float noise
    let mut lat_val =
        (((lat + OLC_LAT_MAX) * OLC_FINAL_LAT_PRECISION as f64 * 1e6).round() / 1e6) as i64;
    let mut lon_val =
        (((lon + OLC_LON_MAX) * OLC_FINAL_LON_PRECISION as f64 * 1e6).round() / 1e6) as i64;

    // The north pole belongs to the top cell, not one past it
    lat_val = lat_val.min(2 * OLC_LAT_MAX as i64 * OLC_FINAL_LAT_PRECISION - 1);
    lon_val = lon_val.min(2 * OLC_LON_MAX as i64 * OLC_FINAL_LON_PRECISION - 1);

    let mut digits = [0u8; OLC_MAX_DIGITS];

    // Five least-significant grid digits, each a 5x4 cell refinement
    for i in (OLC_PAIR_DIGITS..OLC_MAX_DIGITS).rev() {
        let row = lat_val % OLC_GRID_ROWS;
        let col = lon_val % OLC_GRID_COLUMNS;
        digits[i] = OLC_ALPHABET[(row * OLC_GRID_COLUMNS + col) as usize];
        lat_val /= OLC_GRID_ROWS;
        lon_val /= OLC_GRID_COLUMNS;
    }

    // Five most-significant pairs, base 20, latitude first
    for i in (0..OLC_PAIR_DIGITS / 2).rev() {
        digits[2 * i] = OLC_ALPHABET[(lat_val % 20) as usize];
        digits[2 * i + 1] = OLC_ALPHABET[(lon_val % 20) as usize];
        lat_val /= 20;
        lon_val /= 20;
    }

    let digits: String = digits.iter().map(|&b| b as char).collect();
    if code_length < OLC_SEPARATOR_POSITION {
        format!(
            "{}{}{}",
            &digits[..code_length],
            "0".repeat(OLC_SEPARATOR_POSITION - code_length),
            OLC_SEPARATOR
        )
    } else {
        format!(
            "{}{}{}",
            &digits[..OLC_SEPARATOR_POSITION],
            OLC_SEPARATOR,
            &digits[OLC_SEPARATOR_POSITION..code_length]
        )
    }
}

fn normalize_longitude(mut lon: f64) -> f64 {
    while lon < -OLC_LON_MAX {
        lon += 360.0;
    }
    while lon >= OLC_LON_MAX {
        lon -= 360.0;
    }
    lon
}
