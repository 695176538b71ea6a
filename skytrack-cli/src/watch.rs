//! Live tracking: ingest task, staleness reaper, and snapshot publisher.
//!
//! Three concerns, three tasks:
//! - Ingest: the single producer. Reads lines, parses, decodes, applies.
//! - Reaper: wakes on a fixed interval and evicts silent aircraft. The
//!   only eviction path.
//! - Publisher: redraws the latest snapshot on its own clock; a slow
//!   terminal never blocks ingest, it just skips ticks.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::signal;
use tokio::sync::RwLock;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use skytrack_core::decode;
use skytrack_core::frame::{self, AddressCache};
use skytrack_core::registry::Registry;
use skytrack_core::types::icao_to_string;
use skytrack_core::ResolveOutcome;

use crate::display;
use crate::source::{clean_line, FrameSource};

/// Reaper wake interval (seconds). Not a user tunable.
const REAP_INTERVAL: f64 = 5.0;

/// Sweep the address cache every this many input lines.
const ADDRESS_SWEEP_EVERY: u64 = 4096;

pub struct WatchOptions {
    pub source: FrameSource,
    pub pairing_window: f64,
    pub stale_after: f64,
    pub refresh: f64,
    pub state_path: Option<PathBuf>,
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Run live tracking until ctrl-c.
pub async fn run(opts: WatchOptions) -> io::Result<()> {
    let registry = Arc::new(RwLock::new(Registry::new(
        opts.pairing_window,
        opts.stale_after,
    )));

    info!("Watching {}", opts.source.describe());
    info!(
        "Pairing window {}s, stale after {}s, refresh every {}s",
        opts.pairing_window, opts.stale_after, opts.refresh
    );

    let (reader, child) = opts.source.open().await?;

    let ingest_registry = registry.clone();
    let ingest = tokio::spawn(async move {
        ingest_lines(reader, ingest_registry).await;
    });

    let reap_registry = registry.clone();
    let reaper = tokio::spawn(async move {
        reap_stale(reap_registry, Duration::from_secs_f64(REAP_INTERVAL)).await;
    });

    let mut refresh = time::interval(Duration::from_secs_f64(opts.refresh.max(0.05)));
    refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = refresh.tick() => {
                publish(&registry, opts.state_path.as_deref()).await;
            }
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Received shutdown signal (Ctrl+C)"),
                    Err(err) => error!("Unable to listen for shutdown signal: {}", err),
                }
                break;
            }
        }
    }

    // Graceful shutdown
    ingest.abort();
    reaper.abort();
    if let Some(mut child) = child {
        if let Err(err) = child.start_kill() {
            warn!("Failed to stop subprocess: {}", err);
        }
    }

    let stats = registry.read().await.stats();
    info!(
        "Stopped. {} aircraft tracked, {} messages, {} positions resolved, {} pairs rejected, {} frames skipped",
        stats.aircraft_tracked, stats.total_messages, stats.positions_resolved,
        stats.pairs_rejected, stats.skipped_frames
    );
    Ok(())
}

/// Read, parse, decode, and apply lines until the source ends.
///
/// Lines without an embedded timestamp are stamped with the wall clock.
async fn ingest_lines(reader: Box<dyn AsyncRead + Unpin + Send>, registry: Arc<RwLock<Registry>>) {
    let mut lines = BufReader::new(reader).lines();
    let mut addresses = AddressCache::default();
    let mut lines_seen = 0u64;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Input source ended; snapshot stays live until aircraft go stale");
                return;
            }
            Err(err) => {
                warn!("Input read error: {}", err);
                return;
            }
        };

        lines_seen += 1;

        let Some((hex, line_ts)) = clean_line(&line) else {
            continue;
        };
        let timestamp = line_ts.unwrap_or_else(unix_now);

        if lines_seen % ADDRESS_SWEEP_EVERY == 0 {
            addresses.sweep(timestamp);
        }

        let Some(mode_frame) = frame::parse(hex, timestamp, true, &mut addresses) else {
            // Malformed frames count the same as undecodable ones;
            // comment and blank lines never get this far.
            registry.write().await.note_skipped();
            continue;
        };

        match decode::decode(&mode_frame) {
            Some(msg) => {
                let mut reg = registry.write().await;
                match reg.apply(&msg) {
                    Some(ResolveOutcome::Resolved(pos)) => {
                        debug!(
                            "{} resolved at {:.4}, {:.4}",
                            icao_to_string(mode_frame.icao),
                            pos.latitude,
                            pos.longitude
                        );
                    }
                    Some(ResolveOutcome::Rejected(reason)) => {
                        debug!(
                            "{} pair rejected: {}",
                            icao_to_string(mode_frame.icao),
                            reason
                        );
                    }
                    Some(ResolveOutcome::AwaitingPair) | None => {}
                }
            }
            None => {
                registry.write().await.note_skipped();
            }
        }
    }
}

/// Evict silent aircraft on a fixed interval.
async fn reap_stale(registry: Arc<RwLock<Registry>>, every: Duration) {
    let mut interval = time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let now = unix_now();
        let evicted = registry.write().await.prune_stale(now);
        if !evicted.is_empty() {
            for icao in &evicted {
                debug!("Evicted stale aircraft {}", icao_to_string(*icao));
            }
            info!("Reaper evicted {} stale aircraft", evicted.len());
        }
    }
}

/// Copy the current state out of the registry and render it.
///
/// The lock is held only for the snapshot copy, never for I/O.
async fn publish(registry: &Arc<RwLock<Registry>>, state_path: Option<&Path>) {
    let (records, stats) = {
        let reg = registry.read().await;
        (reg.snapshot(), reg.stats())
    };
    let now = unix_now();

    print!("{}", display::render_live(&records, &stats, now));
    let _ = io::stdout().flush();

    if let Some(path) = state_path {
        if let Err(err) = display::write_state(path, &records, &stats, now) {
            warn!("Failed to write state file {}: {}", path.display(), err);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use skytrack_core::types::Parity;

    #[tokio::test]
    async fn test_reaper_evicts_silent_aircraft() {
        let registry = Arc::new(RwLock::new(Registry::default()));
        let now = unix_now();
        {
            let mut reg = registry.write().await;
            reg.upsert(0x111111, Parity::Even, 1, 2, now - 100.0);
            reg.upsert(0x222222, Parity::Even, 3, 4, now);
        }

        let handle = tokio::spawn(reap_stale(registry.clone(), Duration::from_millis(50)));
        time::sleep(Duration::from_millis(300)).await;
        handle.abort();

        let reg = registry.read().await;
        assert_eq!(reg.len(), 1, "only the silent aircraft goes");
        assert!(reg.get(0x222222).is_some());
    }

    #[tokio::test]
    async fn test_ingest_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.txt");
        std::fs::write(
            &path,
            "# even/odd position pair plus one velocity frame\n\
             8D40621D58C382D690C8AC2863A7;1.0\n\
             *8D40621D58C386435CC412692AD6;3.0\n\
             8D485020994409940838175B284F;4.0\n\
             this is not hex\n",
        )
        .unwrap();

        let registry = Arc::new(RwLock::new(Registry::default()));
        let (reader, _child) = FrameSource::File(path).open().await.unwrap();
        ingest_lines(reader, registry.clone()).await;

        let reg = registry.read().await;
        let rec = reg.get(0x40621D).unwrap();
        assert!(rec.has_position(), "pair within window should resolve");
        assert_eq!(rec.altitude_ft, Some(38000));

        let stats = reg.stats();
        assert_eq!(stats.positions_resolved, 1);
        // The velocity frame parses but carries nothing we track, and
        // the junk line fails to parse at all; both count as skipped
        assert_eq!(stats.skipped_frames, 2);
    }
}
