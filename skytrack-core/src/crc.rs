//! Mode S parity (CRC-24, generator polynomial 0xFFF409).
//!
//! The downlink formats split in how they use the 24 parity bits.
//! Squitters (DF11/17/18) append a plain CRC, so dividing an intact frame
//! leaves remainder zero. Interrogation replies (DF0/4/5/16/20/21) overlay
//! the transponder address on the parity field, so the same division
//! returns the address itself.

const POLY: u32 = 0xFF_F409;

// ---------------------------------------------------------------------------
// Remainder table
// ---------------------------------------------------------------------------

/// Eight division steps on the top byte of a 24-bit register.
const fn shift_byte(mut reg: u32) -> u32 {
    let mut step = 0;
    while step < 8 {
        let carry = reg & 0x80_0000 != 0;
        reg = (reg << 1) & 0xFF_FFFF;
        if carry {
            reg ^= POLY;
        }
        step += 1;
    }
    reg
}

static BYTE_REMAINDERS: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut byte = 0;
    while byte < 256 {
        table[byte] = shift_byte((byte as u32) << 16);
        byte += 1;
    }
    table
};

// ---------------------------------------------------------------------------
// Division
// ---------------------------------------------------------------------------

/// Divide a frame by the generator and fold in the parity field.
///
/// Zero for an intact squitter; the sender's address for an intact
/// interrogation reply.
pub fn remainder(frame: &[u8]) -> u32 {
    let Some(split) = frame.len().checked_sub(3) else {
        return 0;
    };
    let (payload, parity) = frame.split_at(split);

    let mut reg = 0u32;
    for &byte in payload {
        let idx = ((reg >> 16) as u8 ^ byte) as usize;
        reg = ((reg << 8) & 0xFF_FFFF) ^ BYTE_REMAINDERS[idx];
    }
    reg ^ u32::from_be_bytes([0, parity[0], parity[1], parity[2]])
}

/// True when the frame divides cleanly (squitter formats only).
pub fn parity_ok(frame: &[u8]) -> bool {
    remainder(frame) == 0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
