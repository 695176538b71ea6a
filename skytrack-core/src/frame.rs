//! Hex frame lines into `ModeFrame`s.
//!
//! Two address families: DF11/17/18 announce the ICAO in the clear and
//! carry a plain CRC, while the reply formats (DF0/4/5/16/20/21) overlay
//! the address on the parity field. A reply address therefore arrives as
//! the CRC remainder, and is only trusted once the same aircraft has been
//! heard announcing it recently.

use std::collections::HashMap;

use crate::crc;
use crate::types::{bytes_from_hex, df_name, icao_from_bytes, Icao};

// ---------------------------------------------------------------------------
// Address cache
// ---------------------------------------------------------------------------

/// Addresses recently confirmed by a CRC-checked announcing frame.
///
/// Gates residual-recovered addresses: noise decodes to a random remainder,
/// and a random remainder almost never matches an aircraft heard within
/// the TTL.
pub struct AddressCache {
    ttl: f64,
    seen: HashMap<Icao, f64>,
}

impl AddressCache {
    pub fn new(ttl: f64) -> Self {
        AddressCache {
            ttl,
            seen: HashMap::new(),
        }
    }

    /// Record a confirmed address.
    pub fn insert(&mut self, icao: Icao, timestamp: f64) {
        self.seen.insert(icao, timestamp);
    }

    /// Was this address confirmed within the TTL?
    pub fn contains(&self, icao: Icao, now: f64) -> bool {
        self.seen.get(&icao).is_some_and(|&at| now - at <= self.ttl)
    }

    /// Drop entries past the TTL. Expired entries never validate either
    /// way; this just bounds memory.
    pub fn sweep(&mut self, now: f64) {
        let ttl = self.ttl;
        self.seen.retain(|_, stamp| now - *stamp <= ttl);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for AddressCache {
    fn default() -> Self {
        AddressCache::new(60.0)
    }
}

// ---------------------------------------------------------------------------
// ModeFrame
// ---------------------------------------------------------------------------

/// One parsed Mode S downlink frame.
#[derive(Debug, Clone)]
pub struct ModeFrame {
    /// Downlink Format, the top 5 bits of the frame
    pub df: u8,
    /// 24-bit transponder address
    pub icao: Icao,
    /// Complete frame bytes, 7 or 14
    pub raw: Vec<u8>,
    /// Capture time, Unix seconds
    pub timestamp: f64,
    /// Whether the frame checked out against its parity field
    pub crc_ok: bool,
}

impl ModeFrame {
    pub fn df_name(&self) -> &'static str {
        df_name(self.df)
    }

    /// 112-bit frame?
    pub fn is_long(&self) -> bool {
        self.raw.len() == 14
    }

    /// The 56-bit ME payload of an extended squitter; empty for short
    /// frames.
    pub fn me(&self) -> &[u8] {
        if self.is_long() {
            &self.raw[4..11]
        } else {
            &[]
        }
    }

    /// ADS-B Type Code, the top 5 bits of ME. None outside DF17/18.
    pub fn type_code(&self) -> Option<u8> {
        match self.df {
            17 | 18 if self.is_long() => Some(self.raw[4] >> 3),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse one hex line into a frame.
///
/// With `validate_icao` set, a reply frame whose recovered address has no
/// recent confirmation in the cache is dropped.
pub fn parse(
    hex_str: &str,
    timestamp: f64,
    validate_icao: bool,
    cache: &mut AddressCache,
) -> Option<ModeFrame> {
    let hex = hex_str.trim();
    if hex.len() != 14 && hex.len() != 28 {
        return None;
    }

    let raw = bytes_from_hex(hex)?;
    let df = raw[0] >> 3;

    // Frame length is fixed per Downlink Format
    let expected_len = match df {
        0 | 4 | 5 | 11 => 7,
        16 | 17 | 18 | 20 | 21 => 14,
        _ => return None,
    };
    if raw.len() != expected_len {
        return None;
    }

    let (icao, crc_ok) = match df {
        11 | 17 | 18 => {
            let icao = icao_from_bytes(&raw[1..4]);
            let crc_ok = crc::parity_ok(&raw);
            if crc_ok && validate_icao {
                cache.insert(icao, timestamp);
            }
            (icao, crc_ok)
        }
        _ => {
            // The transponder XORs its address into the parity field, so
            // the CRC remainder of an intact frame IS the address
            let icao = crc::remainder(&raw);
            if validate_icao && !cache.contains(icao, timestamp) {
                return None;
            }
            (icao, true)
        }
    };

    Some(ModeFrame {
        df,
        icao,
        raw,
        timestamp,
        crc_ok,
    })
}

/// Parse with no address gating. For standalone frames where no squitter
/// context exists.
pub fn parse_standalone(hex_str: &str, timestamp: f64) -> Option<ModeFrame> {
    parse(hex_str, timestamp, false, &mut AddressCache::default())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::icao_to_string;

    #[test]
    fn test_df17_parses() {
        let frame = parse_standalone("8D4840D6202CC371C32CE0576098", 1.0).unwrap();
        assert_eq!(frame.df, 17);
        assert_eq!(icao_to_string(frame.icao), "4840D6");
        assert!(frame.crc_ok);
        assert!(frame.is_long());
        assert_eq!(frame.df_name(), "ADS-B extended squitter");
    }

    #[test]
    fn test_position_frame_type_code() {
        let frame = parse_standalone("8D40621D58C382D690C8AC2863A7", 1.0).unwrap();
        assert_eq!(frame.icao, 0x40621D);
        assert!(frame.crc_ok);

        // TC 11: airborne position, barometric altitude
        assert_eq!(frame.type_code(), Some(11));
    }

    #[test]
    fn test_bad_length_rejected() {
        assert!(parse_standalone("8D4840D6", 0.0).is_none());
        assert!(parse_standalone("", 0.0).is_none());
    }

    #[test]
    fn test_bad_hex_rejected() {
        assert!(parse_standalone("ZZZZZZZZZZZZZZ", 0.0).is_none());
    }

    #[test]
    fn test_corrupted_frame_keeps_crc_flag() {
        // One flipped bit: the frame still parses, crc_ok goes false
        let frame = parse_standalone("8D4840D6202CC371C32CE0576099", 1.0).unwrap();
        assert!(!frame.crc_ok);
    }

    #[test]
    fn test_me_payload() {
        let frame = parse_standalone("8D4840D6202CC371C32CE0576098", 1.0).unwrap();
        assert_eq!(frame.me().len(), 7);
    }

    #[test]
    fn test_address_cache_ttl() {
        let mut cache = AddressCache::new(60.0);

        assert!(!cache.contains(0x4840D6, 0.0));

        cache.insert(0x4840D6, 1.0);
        assert!(cache.contains(0x4840D6, 2.0));
        assert!(!cache.contains(0x4840D6, 62.0));
    }

    #[test]
    fn test_address_cache_sweep() {
        let mut cache = AddressCache::new(10.0);
        cache.insert(0x010203, 0.0);
        cache.insert(0x040506, 5.0);

        assert_eq!(cache.len(), 2);
        cache.sweep(12.0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_reply_address_needs_prior_squitter() {
        let mut cache = AddressCache::new(60.0);

        // DF4 altitude reply with an unconfirmed address: dropped
        assert!(parse("20001838000000", 1.0, true, &mut cache).is_none());

        // Same frame, gating off
        let frame = parse_standalone("20001838000000", 1.0).unwrap();
        assert_eq!(frame.df, 4);
        assert!(frame.crc_ok);

        // And once the address is confirmed, it passes
        cache.insert(frame.icao, 0.5);
        let gated = parse("20001838000000", 1.0, true, &mut cache).unwrap();
        assert_eq!(gated.icao, frame.icao);
    }

    #[test]
    fn test_squitter_confirms_address() {
        let mut cache = AddressCache::new(60.0);
        let frame = parse("8D4840D6202CC371C32CE0576098", 1.0, true, &mut cache);
        assert!(frame.is_some());
        assert!(cache.contains(0x4840D6, 2.0));
    }
}
