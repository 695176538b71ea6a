//! skytrack-core: Pure decode + pairing library for Mode S / ADS-B positions.
//!
//! No async, no I/O — just algorithms. This crate is the core used by the
//! `skytrack` CLI: frame parsing, CRC validation, global CPR resolution,
//! and the per-aircraft pairing registry.

pub mod cpr;
pub mod crc;
pub mod decode;
pub mod frame;
pub mod registry;
pub mod types;

// Re-export commonly used types at crate root
pub use cpr::RejectionReason;
pub use decode::decode;
pub use frame::{AddressCache, ModeFrame};
pub use registry::{AircraftRecord, GeoPosition, Registry, RegistryStats, ResolveOutcome};
pub use types::*;
