//! Shared types for skytrack-core: ICAO addresses, CPR parity, and the
//! decoded message forms the registry consumes.

use serde::Serialize;

// ---------------------------------------------------------------------------
// ICAO address helpers
// ---------------------------------------------------------------------------

/// 24-bit ICAO transponder address, stored as an integer so it can key a
/// hash map without allocation.
pub type Icao = u32;

/// Render an address the way it is printed: 6 uppercase hex digits.
pub fn icao_to_string(icao: Icao) -> String {
    format!("{:06X}", icao)
}

/// Parse a printed address back. Exactly 6 hex digits, nothing else.
pub fn icao_from_hex(text: &str) -> Option<Icao> {
    if text.len() != 6 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(text, 16).ok()
}

/// Assemble an address from the 3 address bytes of a frame.
pub fn icao_from_bytes(b: &[u8]) -> Icao {
    u32::from_be_bytes([0, b[0], b[1], b[2]])
}

// ---------------------------------------------------------------------------
// Downlink Format names
// ---------------------------------------------------------------------------

/// Human-readable name for a Downlink Format.
pub fn df_name(df: u8) -> &'static str {
    match df {
        0 => "Short air-air surveillance",
        4 => "Surveillance altitude reply",
        5 => "Surveillance identity reply",
        11 => "All-call reply",
        16 => "Long air-air surveillance",
        17 => "ADS-B extended squitter",
        18 => "TIS-B / ADS-R",
        20 => "Comm-B altitude reply",
        21 => "Comm-B identity reply",
        _ => "Unknown",
    }
}

// ---------------------------------------------------------------------------
// Hex text
// ---------------------------------------------------------------------------

/// Turn hex text into bytes. Case-insensitive, surrounding whitespace
/// ignored, odd digit counts rejected.
pub fn bytes_from_hex(text: &str) -> Option<Vec<u8>> {
    let text = text.trim();
    if text.len() % 2 != 0 {
        return None;
    }
    text.as_bytes()
        .chunks_exact(2)
        .map(|pair| Some(nibble(pair[0])? << 4 | nibble(pair[1])?))
        .collect()
}

fn nibble(c: u8) -> Option<u8> {
    (c as char).to_digit(16).map(|d| d as u8)
}

// ---------------------------------------------------------------------------
// CPR parity
// ---------------------------------------------------------------------------

/// CPR frame format: even and odd frames alternate, and one of each is
/// needed for a globally unambiguous decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    /// Build from the CPR format bit of a position message (0 = even).
    pub fn from_odd_bit(bit: u64) -> Self {
        if bit & 1 == 1 {
            Parity::Odd
        } else {
            Parity::Even
        }
    }
}

impl std::fmt::Display for Parity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Parity::Even => write!(f, "even"),
            Parity::Odd => write!(f, "odd"),
        }
    }
}

// ---------------------------------------------------------------------------
// Decoded message types
// ---------------------------------------------------------------------------

/// TC 9-18: airborne CPR-encoded position, with the barometric altitude
/// carried in the same message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionMsg {
    pub icao: Icao,
    pub parity: Parity,
    pub cpr_lat: u32,
    pub cpr_lon: u32,
    pub altitude_ft: Option<i32>,
    pub timestamp: f64,
}

/// DF0/4/16/20: altitude reply. `altitude_ft` is `None` when the AC field
/// is zero or otherwise unreadable; the frame still proves liveness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AltitudeMsg {
    pub icao: Icao,
    pub altitude_ft: Option<i32>,
    pub timestamp: f64,
}

/// Everything the frame decoder can produce.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum DecodedMsg {
    Position(PositionMsg),
    Altitude(AltitudeMsg),
}

impl DecodedMsg {
    /// Address of the transmitting aircraft.
    pub fn icao(&self) -> Icao {
        match self {
            DecodedMsg::Position(m) => m.icao,
            DecodedMsg::Altitude(m) => m.icao,
        }
    }

    /// Receive time, Unix seconds.
    pub fn timestamp(&self) -> f64 {
        match self {
            DecodedMsg::Position(m) => m.timestamp,
            DecodedMsg::Altitude(m) => m.timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icao_text_forms() {
        assert_eq!(icao_from_hex("4840D6"), Some(0x4840D6));
        assert_eq!(icao_to_string(0x4840D6), "4840D6");
        assert_eq!(icao_to_string(0x00A1B2), "00A1B2");
        assert_eq!(icao_from_hex("00A1B2"), Some(0x00A1B2));
        assert_eq!(icao_from_hex("A1B2"), None, "six digits required");
        assert_eq!(icao_from_hex("+1B2C3"), None, "sign is not a digit");
    }

    #[test]
    fn test_icao_from_frame_bytes() {
        assert_eq!(icao_from_bytes(&[0x48, 0x40, 0xD6]), 0x4840D6);
    }

    #[test]
    fn test_bytes_from_hex() {
        assert_eq!(bytes_from_hex("02e197"), Some(vec![0x02, 0xE1, 0x97]));
        assert_eq!(bytes_from_hex(" 4840D6 "), Some(vec![0x48, 0x40, 0xD6]));
        assert_eq!(bytes_from_hex("123"), None, "odd digit count");
        assert_eq!(bytes_from_hex("12G4"), None, "not hex");
    }

    #[test]
    fn test_df_name() {
        assert_eq!(df_name(17), "ADS-B extended squitter");
        assert_eq!(df_name(4), "Surveillance altitude reply");
        assert_eq!(df_name(3), "Unknown");
    }

    #[test]
    fn test_parity_from_odd_bit() {
        assert_eq!(Parity::from_odd_bit(0), Parity::Even);
        assert_eq!(Parity::from_odd_bit(1), Parity::Odd);
        assert_eq!(format!("{}", Parity::Odd), "odd");
    }
}
