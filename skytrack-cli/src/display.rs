//! Terminal rendering and snapshot file output.

use std::io;
use std::path::Path;

use comfy_table::{Cell, Table};
use serde::Serialize;

use skytrack_core::registry::{AircraftRecord, RegistryStats};
use skytrack_core::types::icao_to_string;

/// One aircraft row, flattened for table and JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotRow {
    pub icao: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_ft: Option<i32>,
    pub slots: String,
    pub messages: u64,
    pub last_seen: f64,
    pub age_s: f64,
}

impl SnapshotRow {
    pub fn from_record(rec: &AircraftRecord, now: f64) -> Self {
        let slots = match (rec.even_slot.is_some(), rec.odd_slot.is_some()) {
            (true, true) => "E+O",
            (true, false) => "E",
            (false, true) => "O",
            (false, false) => "-",
        };
        SnapshotRow {
            icao: icao_to_string(rec.icao),
            latitude: rec.last_position.map(|p| p.latitude),
            longitude: rec.last_position.map(|p| p.longitude),
            altitude_ft: rec.altitude_ft,
            slots: slots.to_string(),
            messages: rec.message_count,
            last_seen: rec.last_seen,
            age_s: (now - rec.last_seen).max(0.0),
        }
    }
}

/// Build the aircraft table, most recently heard first.
pub fn render_table(records: &[AircraftRecord], now: f64) -> Table {
    let mut sorted: Vec<&AircraftRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.last_seen.total_cmp(&a.last_seen));

    let mut table = Table::new();
    table.set_header(vec![
        "ICAO", "Lat", "Lon", "Alt (ft)", "Slots", "Msgs", "Age (s)",
    ]);

    for rec in sorted {
        let row = SnapshotRow::from_record(rec, now);
        table.add_row(vec![
            Cell::new(&row.icao),
            Cell::new(
                row.latitude
                    .map(|l| format!("{l:.4}"))
                    .unwrap_or("-".into()),
            ),
            Cell::new(
                row.longitude
                    .map(|l| format!("{l:.4}"))
                    .unwrap_or("-".into()),
            ),
            Cell::new(
                row.altitude_ft
                    .map(|a| a.to_string())
                    .unwrap_or("-".into()),
            ),
            Cell::new(&row.slots),
            Cell::new(row.messages),
            Cell::new(format!("{:.0}", row.age_s)),
        ]);
    }

    table
}

/// Full live view: clear the screen, print a status line, then the table.
pub fn render_live(records: &[AircraftRecord], stats: &RegistryStats, now: f64) -> String {
    let mut out = String::new();
    out.push_str("\x1b[2J\x1b[1;1H"); // clear screen, cursor home
    out.push_str(&format!(
        "skytrack — {} aircraft ({} with position) | {} msgs | {} resolved | {} rejected | {} skipped\n\n",
        stats.aircraft_tracked,
        stats.with_position,
        stats.total_messages,
        stats.positions_resolved,
        stats.pairs_rejected,
        stats.skipped_frames,
    ));
    out.push_str(&render_table(records, now).to_string());
    out.push('\n');
    out
}

#[derive(Serialize)]
struct StateDoc<'a> {
    updated_at: f64,
    stats: &'a RegistryStats,
    aircraft: Vec<SnapshotRow>,
}

/// Write the snapshot JSON atomically: a temp file next to the target,
/// then a rename over it. Readers never observe a partial file.
pub fn write_state(
    path: &Path,
    records: &[AircraftRecord],
    stats: &RegistryStats,
    now: f64,
) -> io::Result<()> {
    let doc = StateDoc {
        updated_at: now,
        stats,
        aircraft: records
            .iter()
            .map(|rec| SnapshotRow::from_record(rec, now))
            .collect(),
    };
    let json = serde_json::to_string_pretty(&doc)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
