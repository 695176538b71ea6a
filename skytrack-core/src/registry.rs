//! Per-aircraft pairing registry with CPR slot storage.
//!
//! Pure state — no I/O, no clocks. Callers feed decoded messages in via
//! `apply()` (or the finer-grained `upsert`/`upsert_altitude`) and read
//! state back out via `snapshot()`. Eviction happens only through
//! `prune_stale()`/`remove()`; decode failures never drop a record.

use std::collections::HashMap;

use serde::Serialize;

use crate::cpr::{self, RejectionReason};
use crate::types::{DecodedMsg, Icao, Parity};

/// Default maximum age difference between paired frames (seconds).
pub const DEFAULT_PAIRING_WINDOW: f64 = 10.0;

/// Default silence threshold before an aircraft is evicted (seconds).
pub const DEFAULT_STALE_AFTER: f64 = 60.0;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One stored CPR frame: raw 17-bit fields plus capture time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CprSlot {
    pub raw_lat: u32,
    pub raw_lon: u32,
    pub captured_at: f64,
}

/// A successfully resolved geographic position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub decoded_at: f64,
}

/// Everything known about one aircraft, keyed by its address.
#[derive(Debug, Clone)]
pub struct AircraftRecord {
    pub icao: Icao,
    pub even_slot: Option<CprSlot>,
    pub odd_slot: Option<CprSlot>,
    pub altitude_ft: Option<i32>,
    pub last_position: Option<GeoPosition>,
    pub first_seen: f64,
    pub last_seen: f64,
    pub message_count: u64,
}

impl AircraftRecord {
    pub fn new(icao: Icao, timestamp: f64) -> Self {
        AircraftRecord {
            icao,
            even_slot: None,
            odd_slot: None,
            altitude_ft: None,
            last_position: None,
            first_seen: timestamp,
            last_seen: timestamp,
            message_count: 0,
        }
    }

    pub fn has_position(&self) -> bool {
        self.last_position.is_some()
    }

    pub fn age(&self, now: f64) -> f64 {
        now - self.last_seen
    }
}

/// An eligible even/odd frame pair, ready for the resolver.
///
/// `newer` is the parity of the more recently captured slot; ties go to
/// even.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotPair {
    pub odd: CprSlot,
    pub even: CprSlot,
    pub newer: Parity,
}

/// Result of applying a position message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolveOutcome {
    /// Both slots were present and in-window; a position was committed.
    Resolved(GeoPosition),
    /// The complementary slot is missing or too old. Not an error.
    AwaitingPair,
    /// The pair was eligible but the resolver refused it. The record and
    /// its slots are kept.
    Rejected(RejectionReason),
}

/// Point-in-time counters for display and logging.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RegistryStats {
    pub aircraft_tracked: usize,
    pub with_position: usize,
    pub total_messages: u64,
    pub positions_resolved: u64,
    pub pairs_rejected: u64,
    pub skipped_frames: u64,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// The full picture of the airspace, built up message by message.
///
/// The pairing window and staleness threshold are the only tunables.
pub struct Registry {
    aircraft: HashMap<Icao, AircraftRecord>,
    pairing_window: f64,
    stale_after: f64,

    // Counters
    pub total_messages: u64,
    pub positions_resolved: u64,
    pub pairs_rejected: u64,
    pub skipped_frames: u64,
}

impl Registry {
    pub fn new(pairing_window: f64, stale_after: f64) -> Self {
        Registry {
            aircraft: HashMap::new(),
            pairing_window,
            stale_after,
            total_messages: 0,
            positions_resolved: 0,
            pairs_rejected: 0,
            skipped_frames: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }

    pub fn get(&self, icao: Icao) -> Option<&AircraftRecord> {
        self.aircraft.get(&icao)
    }

    /// Store a CPR frame in the record's even or odd slot, creating the
    /// record if needed. A frame of the same parity replaces the previous
    /// slot. Raw fields are stored verbatim; validation happens in the
    /// resolver.
    pub fn upsert(
        &mut self,
        icao: Icao,
        parity: Parity,
        raw_lat: u32,
        raw_lon: u32,
        timestamp: f64,
    ) {
        let rec = self
            .aircraft
            .entry(icao)
            .or_insert_with(|| AircraftRecord::new(icao, timestamp));
        rec.last_seen = timestamp;
        rec.message_count += 1;

        let slot = CprSlot {
            raw_lat,
            raw_lon,
            captured_at: timestamp,
        };
        match parity {
            Parity::Even => rec.even_slot = Some(slot),
            Parity::Odd => rec.odd_slot = Some(slot),
        }
    }

    /// Record an altitude sighting, creating the record if needed.
    ///
    /// An undecodable altitude (None) still refreshes `last_seen` — the
    /// reply proves the aircraft is alive.
    pub fn upsert_altitude(&mut self, icao: Icao, altitude_ft: Option<i32>, timestamp: f64) {
        let rec = self
            .aircraft
            .entry(icao)
            .or_insert_with(|| AircraftRecord::new(icao, timestamp));
        rec.last_seen = timestamp;
        rec.message_count += 1;

        if altitude_ft.is_some() {
            rec.altitude_ft = altitude_ft;
        }
    }

    /// Return the even/odd pair for an aircraft if both slots are present
    /// and captured within the pairing window of each other.
    pub fn pair_if_eligible(&self, icao: Icao) -> Option<SlotPair> {
        let rec = self.aircraft.get(&icao)?;
        let even = rec.even_slot?;
        let odd = rec.odd_slot?;

        if (even.captured_at - odd.captured_at).abs() > self.pairing_window {
            return None;
        }

        let newer = if even.captured_at >= odd.captured_at {
            Parity::Even
        } else {
            Parity::Odd
        };

        Some(SlotPair { odd, even, newer })
    }

    /// Apply a decoded message: store it, and for position messages attempt
    /// a global CPR resolve.
    ///
    /// Returns None for non-position messages.
    pub fn apply(&mut self, msg: &DecodedMsg) -> Option<ResolveOutcome> {
        self.total_messages += 1;

        let m = match msg {
            DecodedMsg::Position(m) => m,
            DecodedMsg::Altitude(m) => {
                self.upsert_altitude(m.icao, m.altitude_ft, m.timestamp);
                return None;
            }
        };

        self.upsert(m.icao, m.parity, m.cpr_lat, m.cpr_lon, m.timestamp);
        if m.altitude_ft.is_some() {
            if let Some(rec) = self.aircraft.get_mut(&m.icao) {
                rec.altitude_ft = m.altitude_ft;
            }
        }

        let pair = match self.pair_if_eligible(m.icao) {
            Some(pair) => pair,
            None => return Some(ResolveOutcome::AwaitingPair),
        };

        match cpr::resolve(
            pair.even.raw_lat,
            pair.even.raw_lon,
            pair.odd.raw_lat,
            pair.odd.raw_lon,
            pair.newer,
        ) {
            Ok((latitude, longitude)) => {
                let position = GeoPosition {
                    latitude,
                    longitude,
                    decoded_at: m.timestamp,
                };
                if let Some(rec) = self.aircraft.get_mut(&m.icao) {
                    rec.last_position = Some(position);
                }
                self.positions_resolved += 1;
                Some(ResolveOutcome::Resolved(position))
            }
            Err(reason) => {
                self.pairs_rejected += 1;
                Some(ResolveOutcome::Rejected(reason))
            }
        }
    }

    /// Count a frame that parsed but produced no usable message.
    pub fn note_skipped(&mut self) {
        self.skipped_frames += 1;
    }

    /// Immutable copies of all records, ordered by ICAO address.
    pub fn snapshot(&self) -> Vec<AircraftRecord> {
        let mut records: Vec<_> = self.aircraft.values().cloned().collect();
        records.sort_by_key(|rec| rec.icao);
        records
    }

    /// Remove a single aircraft. Only the staleness reaper calls this.
    pub fn remove(&mut self, icao: Icao) -> Option<AircraftRecord> {
        self.aircraft.remove(&icao)
    }

    /// Evict aircraft silent for longer than the staleness threshold.
    /// Returns the evicted addresses.
    pub fn prune_stale(&mut self, now: f64) -> Vec<Icao> {
        let stale: Vec<Icao> = self
            .aircraft
            .iter()
            .filter(|(_, rec)| rec.age(now) > self.stale_after)
            .map(|(&icao, _)| icao)
            .collect();
        for &icao in &stale {
            self.remove(icao);
        }
        stale
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            aircraft_tracked: self.aircraft.len(),
            with_position: self
                .aircraft
                .values()
                .filter(|rec| rec.has_position())
                .count(),
            total_messages: self.total_messages,
            positions_resolved: self.positions_resolved,
            pairs_rejected: self.pairs_rejected,
            skipped_frames: self.skipped_frames,
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new(DEFAULT_PAIRING_WINDOW, DEFAULT_STALE_AFTER)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
