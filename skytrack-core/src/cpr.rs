//! Compact Position Reporting.
//!
//! An airborne position frame does not carry coordinates directly; it
//! carries 17-bit offsets into a latitude/longitude zone grid, with even
//! and odd frames laid over grids of 60 and 59 zone rows. One frame of
//! each parity pins down the zone and recovers an unambiguous position
//! with no reference point.
//!
//! This module is pure arithmetic. Frame pairing and the time window that
//! governs it live in the registry.

use std::f64::consts::PI;

use thiserror::Error;

use crate::types::Parity;

/// Latitude zone rows per hemisphere on the even grid.
const NZ: f64 = 15.0;

/// Width of a raw CPR coordinate in bits.
const NB: u32 = 17;

/// Bin count of a 17-bit field, 2^17.
const CPR_SCALE: f64 = (1u32 << NB) as f64;

const D_LAT_EVEN: f64 = 360.0 / (4.0 * NZ);
const D_LAT_ODD: f64 = 360.0 / (4.0 * NZ - 1.0);

/// Why a frame pair could not be resolved to a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectionReason {
    /// A raw CPR field does not fit in 17 bits.
    #[error("CPR field exceeds 17-bit range")]
    RawFieldOutOfRange,
    /// The candidate latitude fell outside [-90, 90] after normalization.
    #[error("decoded latitude outside [-90, 90]")]
    LatitudeOutOfRange,
    /// The even and odd frames straddle a longitude zone boundary.
    #[error("even and odd frames disagree on longitude zone count")]
    ZoneMismatch,
}

/// Longitude zone count at a latitude (the NL lookup).
///
/// 59 at the equator, falling off toward the poles. The acos argument is
/// clamped to [-1, 1], so the band just short of the poles reads 2 rather
/// than producing NaN; 90 degrees itself reads 1.
pub fn nl(lat: f64) -> i32 {
    let lat = lat.abs();
    if lat >= 90.0 {
        return 1;
    }

    let numer = 1.0 - (PI / (2.0 * NZ)).cos();
    let denom = lat.to_radians().cos().powi(2);
    let zones = 2.0 * PI / (1.0 - numer / denom).clamp(-1.0, 1.0).acos();
    (zones.floor() as i32).max(1)
}

/// Remainder that never goes negative.
fn pos_mod(x: f64, y: f64) -> f64 {
    x - y * (x / y).floor()
}

/// Snap to 1e-6 degrees.
fn round6(deg: f64) -> f64 {
    (deg * 1e6).round() / 1e6
}

/// Recover latitude/longitude from an even/odd raw-field pair.
///
/// `newer` names the parity of the more recently received frame; the
/// final position is computed in that frame's zone.
///
/// Coordinates come back in degrees, rounded to 1e-6.
pub fn resolve(
    lat_even: u32,
    lon_even: u32,
    lat_odd: u32,
    lon_odd: u32,
    newer: Parity,
) -> Result<(f64, f64), RejectionReason> {
    let limit = 1u32 << NB;
    if lat_even >= limit || lon_even >= limit || lat_odd >= limit || lon_odd >= limit {
        return Err(RejectionReason::RawFieldOutOfRange);
    }

    let elat = f64::from(lat_even) / CPR_SCALE;
    let elon = f64::from(lon_even) / CPR_SCALE;
    let olat = f64::from(lat_odd) / CPR_SCALE;
    let olon = f64::from(lon_odd) / CPR_SCALE;

    // Zone row index shared by the pair
    let j = (59.0 * elat - 60.0 * olat + 0.5).floor();

    // One candidate latitude per grid
    let mut cand_even = D_LAT_EVEN * (pos_mod(j, 60.0) + elat);
    let mut cand_odd = D_LAT_ODD * (pos_mod(j, 59.0) + olat);

    // Southern hemisphere comes out in [270, 360)
    if cand_even >= 270.0 {
        cand_even -= 360.0;
    }
    if cand_odd >= 270.0 {
        cand_odd -= 360.0;
    }

    if !(-90.0..=90.0).contains(&cand_even) || !(-90.0..=90.0).contains(&cand_odd) {
        return Err(RejectionReason::LatitudeOutOfRange);
    }

    // Both candidates must sit in the same longitude zone band
    if nl(cand_even) != nl(cand_odd) {
        return Err(RejectionReason::ZoneMismatch);
    }

    let (lat, lon) = match newer {
        Parity::Even => {
            let zones = nl(cand_even);
            let n = zones.max(1);
            let width = 360.0 / f64::from(n);
            let m = (elon * f64::from(zones - 1) - olon * f64::from(zones) + 0.5).floor();
            (cand_even, width * (pos_mod(m, f64::from(n)) + elon))
        }
        Parity::Odd => {
            let zones = nl(cand_odd);
            let n = (zones - 1).max(1);
            let width = 360.0 / f64::from(n);
            let m = (elon * f64::from(zones - 1) - olon * f64::from(zones) + 0.5).floor();
            (cand_odd, width * (pos_mod(m, f64::from(n)) + olon))
        }
    };

    // Into [-180, 180)
    let lon = if lon >= 180.0 { lon - 360.0 } else { lon };

    Ok((round6(lat), round6(lon)))
}

/// Encode a position into raw 17-bit CPR fields for the given parity.
///
/// Inverse of [`resolve`]; useful for synthesizing frames at known
/// coordinates.
pub fn encode(lat: f64, lon: f64, parity: Parity) -> (u32, u32) {
    let odd = match parity {
        Parity::Even => 0.0,
        Parity::Odd => 1.0,
    };

    let lat_width = 360.0 / (4.0 * NZ - odd);
    let yz = (CPR_SCALE * pos_mod(lat, lat_width) / lat_width + 0.5).floor();
    let rlat = lat_width * (yz / CPR_SCALE + (lat / lat_width).floor());

    let n = (nl(rlat) - odd as i32).max(1);
    let lon_width = 360.0 / f64::from(n);
    let xz = (CPR_SCALE * pos_mod(lon, lon_width) / lon_width + 0.5).floor();

    (
        (yz as i64).rem_euclid(1 << NB) as u32,
        (xz as i64).rem_euclid(1 << NB) as u32,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nl_at_equator() {
        assert_eq!(nl(0.0), 59);
    }

    #[test]
    fn test_nl_mid_latitudes() {
        assert_eq!(nl(52.2572), 36);
        assert_eq!(nl(-52.2572), 36);
    }

    #[test]
    fn test_nl_near_pole_clamps_to_two() {
        assert_eq!(nl(87.0), 2);
        assert_eq!(nl(-87.0), 2);
        assert_eq!(nl(88.5), 2);
    }

    #[test]
    fn test_nl_at_poles() {
        assert_eq!(nl(90.0), 1);
        assert_eq!(nl(-90.0), 1);
    }

    #[test]
    fn test_pos_mod_stays_non_negative() {
        assert!((pos_mod(7.0, 3.0) - 1.0).abs() < 1e-10);
        assert!((pos_mod(-1.0, 60.0) - 59.0).abs() < 1e-10);
    }

    #[test]
    fn test_resolve_known_pair_even_newer() {
        // Pair from the 1090 MHz Riddle worked example: even 93000/51372,
        // odd 74158/50194
        let (lat, lon) = resolve(93000, 51372, 74158, 50194, Parity::Even).unwrap();
        assert!((lat - 52.25720).abs() < 1e-4, "even-zone lat, got {lat}");
        assert!((lon - 3.91937).abs() < 1e-4, "even-zone lon, got {lon}");
    }

    #[test]
    fn test_resolve_known_pair_odd_newer() {
        // Same pair computed in the odd frame's zone
        let (lat, lon) = resolve(93000, 51372, 74158, 50194, Parity::Odd).unwrap();
        assert!((lat - 52.26578).abs() < 1e-4, "odd-zone lat, got {lat}");
        assert!((lon - 3.93891).abs() < 1e-4, "odd-zone lon, got {lon}");
    }

    #[test]
    fn test_resolve_rejects_oversized_raw() {
        assert_eq!(
            resolve(131072, 51372, 74158, 50194, Parity::Even),
            Err(RejectionReason::RawFieldOutOfRange)
        );
        assert_eq!(
            resolve(93000, 51372, 74158, 200000, Parity::Odd),
            Err(RejectionReason::RawFieldOutOfRange)
        );
    }

    #[test]
    fn test_resolve_latitude_out_of_range() {
        // This pair yields a candidate latitude near 186 degrees, which is
        // below the 270-degree wrap threshold but far outside [-90, 90]
        assert_eq!(
            resolve(129761, 51372, 61604, 50194, Parity::Even),
            Err(RejectionReason::LatitudeOutOfRange)
        );
    }

    #[test]
    fn test_resolve_zone_mismatch() {
        // 53.08 sits at NL=36 and 53.11 at NL=35; frames encoded on opposite
        // sides of the boundary must be rejected
        assert_eq!(nl(53.08), 36);
        assert_eq!(nl(53.11), 35);

        let (even_lat, even_lon) = encode(53.08, 6.0, Parity::Even);
        let (odd_lat, odd_lon) = encode(53.11, 6.0, Parity::Odd);
        assert_eq!(
            resolve(even_lat, even_lon, odd_lat, odd_lon, Parity::Even),
            Err(RejectionReason::ZoneMismatch)
        );
    }

    #[test]
    fn test_encode_known_position() {
        assert_eq!(encode(52.2572021, 3.9193726, Parity::Even), (93000, 51372));
        assert_eq!(encode(52.2657852, 3.9389135, Parity::Odd), (74158, 50194));
    }

    #[test]
    fn test_resolve_round_trip() {
        // Points chosen away from NL zone boundaries; quantization keeps the
        // recovered position within ~5e-5 degrees
        let points = [
            (52.2572, 4.7342),    // Amsterdam area
            (40.6413, -73.7781),  // JFK
            (-33.9461, 151.1772), // Sydney
            (64.1466, -21.9426),  // Reykjavik
            (-54.8019, -68.3030), // Ushuaia
        ];

        for &(lat, lon) in &points {
            let (even_lat, even_lon) = encode(lat, lon, Parity::Even);
            let (odd_lat, odd_lon) = encode(lat, lon, Parity::Odd);

            for newer in [Parity::Even, Parity::Odd] {
                let (rlat, rlon) =
                    resolve(even_lat, even_lon, odd_lat, odd_lon, newer).unwrap();
                assert!(
                    (rlat - lat).abs() < 1e-4,
                    "lat {lat}: recovered {rlat} as {newer}"
                );
                assert!(
                    (rlon - lon).abs() < 1e-4,
                    "lon {lon}: recovered {rlon} as {newer}"
                );
            }
        }
    }

    #[test]
    fn test_resolve_southern_hemisphere_wrap() {
        // Candidate latitudes for southern positions land in [270, 360)
        // before normalization; the wrap must bring them back negative
        let (even_lat, even_lon) = encode(-33.9461, 151.1772, Parity::Even);
        let (odd_lat, odd_lon) = encode(-33.9461, 151.1772, Parity::Odd);
        let (lat, lon) = resolve(even_lat, even_lon, odd_lat, odd_lon, Parity::Even).unwrap();
        assert!(lat < 0.0, "southern latitude must come back negative: {lat}");
        assert!((lat + 33.9461).abs() < 1e-4);
        assert!((lon - 151.1772).abs() < 1e-4);
    }
}
