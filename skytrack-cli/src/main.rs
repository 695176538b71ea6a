//! skytrack: Mode S / ADS-B position decoder and live tracker.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use skytrack_core::decode;
use skytrack_core::frame::{self, AddressCache};
use skytrack_core::registry::{self, Registry};

mod display;
mod source;
mod watch;

use source::{clean_line, FrameSource};

#[derive(Parser)]
#[command(name = "skytrack", version, about = "Mode S / ADS-B position decoder and tracker")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode hex frames from a file and print an aircraft table
    Decode {
        /// Path to file containing hex frames (one per line), or - for stdin
        file: PathBuf,

        /// Print each decoded message as a JSON line
        #[arg(long)]
        json: bool,

        /// Print each decoded message in debug form
        #[arg(short, long)]
        raw: bool,

        /// Maximum seconds between paired even/odd frames
        #[arg(long, default_value_t = registry::DEFAULT_PAIRING_WINDOW)]
        pairing_window: f64,
    },

    /// Track aircraft live and redraw a snapshot table
    Watch {
        /// Path to file containing hex frames (defaults to stdin)
        file: Option<PathBuf>,

        /// Spawn a shell command and read frames from its stdout
        #[arg(long)]
        spawn: Option<String>,

        /// Maximum seconds between paired even/odd frames
        #[arg(long, default_value_t = registry::DEFAULT_PAIRING_WINDOW)]
        pairing_window: f64,

        /// Seconds of silence before an aircraft is evicted
        #[arg(long, default_value_t = registry::DEFAULT_STALE_AFTER)]
        stale_after: f64,

        /// Seconds between display refreshes
        #[arg(long, default_value_t = 1.0)]
        refresh: f64,

        /// Write a JSON snapshot to this path on every refresh
        #[arg(long)]
        state: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Decode {
            file,
            json,
            raw,
            pairing_window,
        } => {
            cmd_decode(file, json, raw, pairing_window);
            Ok(())
        }
        Commands::Watch {
            file,
            spawn,
            pairing_window,
            stale_after,
            refresh,
            state,
        } => {
            watch::run(watch::WatchOptions {
                source: FrameSource::from_args(file, spawn),
                pairing_window,
                stale_after,
                refresh,
                state_path: state,
            })
            .await
        }
    }
}

/// Initialize logging to stderr; stdout is reserved for decoded output.
fn init_logging(verbose: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_writer(io::stderr);

    if verbose {
        subscriber.with_max_level(tracing::Level::DEBUG).init();
    } else {
        subscriber.with_max_level(tracing::Level::INFO).init();
    }
}

/// Stdin when the path is `-`, a buffered file otherwise.
fn open_input(path: &Path) -> io::Result<Box<dyn BufRead>> {
    if path.to_str() == Some("-") {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = std::fs::File::open(path)?;
    Ok(Box::new(io::BufReader::new(file)))
}

fn cmd_decode(file: PathBuf, json: bool, raw: bool, pairing_window: f64) {
    let reader = match open_input(&file) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("cannot read {}: {e}", file.display());
            std::process::exit(1);
        }
    };

    let mut reg = Registry::new(pairing_window, registry::DEFAULT_STALE_AFTER);
    let mut addresses = AddressCache::default();
    let mut frames = 0u64;
    let mut next_ts = 0.0f64;

    for line in reader.lines() {
        let Ok(line) = line else { continue };

        let Some((hex, line_ts)) = clean_line(&line) else {
            continue;
        };

        let ts = line_ts.unwrap_or(next_ts);
        next_ts = ts + 0.1; // auto-advance for files without timestamps

        let mode_frame = match frame::parse(hex, ts, true, &mut addresses) {
            Some(f) => f,
            None => {
                // Retry without address gating: standalone captures may
                // hold replies for aircraft whose squitters are not in
                // the file
                match frame::parse(hex, ts, false, &mut addresses) {
                    Some(f) => f,
                    None => {
                        reg.note_skipped();
                        continue;
                    }
                }
            }
        };

        frames += 1;

        let Some(msg) = decode::decode(&mode_frame) else {
            reg.note_skipped();
            continue;
        };

        if raw {
            println!("{msg:?}");
        } else if json {
            match serde_json::to_string(&msg) {
                Ok(s) => println!("{s}"),
                Err(e) => eprintln!("JSON encode error: {e}"),
            }
        }

        reg.apply(&msg);
    }

    if !raw && !json {
        print_summary(&reg, frames, next_ts);
    }
}

fn print_summary(reg: &Registry, frames: u64, now: f64) {
    let stats = reg.stats();
    println!();
    println!(
        "Frames: {} parsed, {} decoded, {} aircraft",
        frames, stats.total_messages, stats.aircraft_tracked
    );
    println!(
        "Positions: {} resolved, {} pairs rejected",
        stats.positions_resolved, stats.pairs_rejected
    );

    if reg.is_empty() {
        return;
    }

    println!();
    println!("{}", display::render_table(&reg.snapshot(), now));
}
