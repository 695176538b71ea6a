//! Frame payload decoding: airborne positions and altitude replies.
//!
//! Two message families come out of here: DF17/18 extended squitters with
//! TC 9-18 become `PositionMsg`, DF0/4/16/20 surveillance replies become
//! `AltitudeMsg`. Everything else (identification, velocity, squawk,
//! surface position) reads as None; callers count those, nothing errors.

use crate::frame::ModeFrame;
use crate::types::{AltitudeMsg, DecodedMsg, Parity, PositionMsg};

// ---------------------------------------------------------------------------
// Altitude fields
// ---------------------------------------------------------------------------

/// Feet from the 13-bit AC field of a surveillance reply.
///
/// M (bit 6) selects metric altitude, which reads as unavailable. Q
/// (bit 4) picks 25 ft binary steps; with Q clear the code is 100 ft
/// Gillham. An all-zero field means altitude not available.
pub fn ac13_to_feet(code: u32) -> Option<i32> {
    if code == 0 {
        return None;
    }
    if code & 0x40 != 0 {
        return None;
    }
    if code & 0x10 != 0 {
        // Q=1: strip M and Q, leaving an 11-bit count of 25 ft steps
        let count = ((code & 0x1F80) >> 2) | ((code & 0x0020) >> 1) | (code & 0x000F);
        return Some(count as i32 * 25 - 1000);
    }
    gillham_to_feet(code)
}

/// Feet from the 12-bit AC field of an airborne position message.
///
/// Same encoding as the reply field minus the M bit; reinsert a zero M
/// and reuse the 13-bit decoder.
pub fn ac12_to_feet(code: u32) -> Option<i32> {
    let ac13 = ((code & 0x0FC0) << 1) | (code & 0x003F);
    ac13_to_feet(ac13)
}

/// 100 ft Gillham altitude, 13-bit reply layout.
///
/// Bit order, MSB first: C1 A1 C2 A2 C4 A4 M B1 Q B2 D2 B4 D4. The D,
/// A, and B pulses gray-count 500 ft bands; the C pulses gray-count
/// 100 ft steps within the band, sweeping in the opposite direction on
/// odd bands.
fn gillham_to_feet(code: u32) -> Option<i32> {
    let bit = |n: u32| (code >> n) & 1;

    // C readings 1-4 and 7 are legal; 7 encodes the fifth step, and
    // 0, 5, 6 never come off a working encoder.
    let mut step = gray_to_bin(bit(12) << 2 | bit(10) << 1 | bit(8));
    if matches!(step, 0 | 5 | 6) {
        return None;
    }
    if step == 7 {
        step = 5;
    }

    let band_gray = (bit(2) << 7)
        | (bit(0) << 6)
        | (bit(11) << 5)
        | (bit(9) << 4)
        | (bit(7) << 3)
        | (bit(5) << 2)
        | (bit(3) << 1)
        | bit(1);
    let band = gray_to_bin(band_gray);

    if band % 2 == 1 {
        step = 6 - step;
    }

    Some(band as i32 * 500 + step as i32 * 100 - 1300)
}

fn gray_to_bin(gray: u32) -> u32 {
    let mut value = gray;
    value ^= value >> 4;
    value ^= value >> 2;
    value ^= value >> 1;
    value
}

// ---------------------------------------------------------------------------
// Message decoding
// ---------------------------------------------------------------------------

/// Airborne position from a DF17/18 extended squitter, TC 9-18.
///
/// Surface positions (TC 5-8) and GNSS-height positions (TC 20-22) are
/// out of scope here and read as None.
pub fn airborne_position(frame: &ModeFrame) -> Option<PositionMsg> {
    if !matches!(frame.type_code(), Some(9..=18)) {
        return None;
    }

    let me = frame.me();
    if me.len() < 7 {
        return None;
    }

    // Fold the 56-bit ME field into the low bits of a u64
    let mut field = 0u64;
    for &byte in me {
        field = field << 8 | u64::from(byte);
    }

    Some(PositionMsg {
        icao: frame.icao,
        parity: Parity::from_odd_bit(field >> 34 & 1),
        cpr_lat: (field >> 17 & 0x1FFFF) as u32,
        cpr_lon: (field & 0x1FFFF) as u32,
        altitude_ft: ac12_to_feet((field >> 36 & 0x0FFF) as u32),
        timestamp: frame.timestamp,
    })
}

/// Altitude reply (DF 0/4/16/20): 13-bit AC field spanning bytes 2-3.
pub fn surveillance_altitude(frame: &ModeFrame) -> Option<AltitudeMsg> {
    if !matches!(frame.df, 0 | 4 | 16 | 20) || frame.raw.len() < 4 {
        return None;
    }

    let code = u32::from(frame.raw[2] & 0x1F) << 8 | u32::from(frame.raw[3]);

    // A reply with an unreadable AC field is still a sighting of the
    // aircraft; the None altitude rides along.
    Some(AltitudeMsg {
        icao: frame.icao,
        altitude_ft: ac13_to_feet(code),
        timestamp: frame.timestamp,
    })
}

/// Route a parsed frame to its decoder.
///
/// Frames that failed CRC never decode.
pub fn decode(frame: &ModeFrame) -> Option<DecodedMsg> {
    if !frame.crc_ok {
        return None;
    }

    match frame.df {
        17 | 18 => airborne_position(frame).map(DecodedMsg::Position),
        0 | 4 | 16 | 20 => surveillance_altitude(frame).map(DecodedMsg::Altitude),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
