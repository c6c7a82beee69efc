//! cdilink - CDI module monitor and map writer
//!
//! Command-line driver for a capacitor-discharge-ignition engine-control
//! module on a serial port: list candidate adapter ports, watch live
//! telemetry, and stream ignition maps to the module.

mod display;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cdilink_core::datalog::TelemetryLog;
use cdilink_core::demo::{DemoCdi, CAPTURED_FRAMES};
use cdilink_core::mapfile;
use cdilink_core::monitor::{Monitor, MonitorEvent};
use cdilink_core::protocol::{
    list_ports, Connection, ConnectionConfig, PollOutcome, TelemetryPacket,
};

#[derive(Parser)]
#[command(name = "cdilink")]
#[command(about = "Monitor and program a CDI engine-control module over serial")]
#[command(version)]
struct Cli {
    /// Output telemetry as JSON lines for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List serial ports, most plausible adapters first
    Ports,

    /// Poll telemetry continuously and print one row per frame
    Monitor {
        /// Serial port to use; `demo` runs a simulated module, `test`
        /// decodes the captured reference frames once and exits
        port: String,

        /// Pause between poll cycles in milliseconds
        #[arg(long, default_value_t = 100, value_name = "MS")]
        interval_ms: u64,

        /// Append decoded telemetry to a CSV file
        #[arg(long, value_name = "FILE")]
        log: Option<PathBuf>,
    },

    /// Load a tab-separated ignition map file and stream it to the module
    WriteMap {
        /// Serial port the module is on
        port: String,

        /// Map file: one table row per line, tab-separated advance values
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("cdilink={log_level},cdilink_core={log_level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match &cli.command {
        Commands::Ports => run_ports(cli.json),
        Commands::Monitor {
            port,
            interval_ms,
            log,
        } => run_monitor(port, *interval_ms, log.as_deref(), cli.json),
        Commands::WriteMap { port, file } => run_write_map(port, file),
    }
}

fn run_ports(json: bool) -> Result<()> {
    let ports = list_ports();
    if json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
    } else {
        display::print_ports(&ports);
    }
    Ok(())
}

fn install_cancel_handler() -> Result<Arc<AtomicBool>> {
    let cancel = Arc::new(AtomicBool::new(false));
    let handler = Arc::clone(&cancel);
    ctrlc::set_handler(move || handler.store(true, Ordering::Relaxed))
        .context("failed to install Ctrl-C handler")?;
    Ok(cancel)
}

fn run_monitor(port: &str, interval_ms: u64, log_path: Option<&Path>, json: bool) -> Result<()> {
    let mut log = match log_path {
        Some(path) => Some(
            TelemetryLog::create(path)
                .with_context(|| format!("failed to create log file '{}'", path.display()))?,
        ),
        None => None,
    };

    if !json {
        display::print_monitor_header();
    }

    match port {
        "test" => run_captures(&mut log, json),
        "demo" => {
            let cancel = install_cancel_handler()?;
            run_demo(&cancel, interval_ms, &mut log, json);
            eprintln!("Monitoring stopped.");
        }
        _ => {
            let cancel = install_cancel_handler()?;
            let mut config = ConnectionConfig::new(port);
            config.timing.cycle_pause = Duration::from_millis(interval_ms);

            Monitor::new(config).run(&cancel, |event| match event {
                MonitorEvent::Connected(outcome) => {
                    if outcome.acknowledged() {
                        eprintln!("Connected to {port}, module acknowledged init");
                    } else {
                        eprintln!("Connected to {port}, module silent after init (normal)");
                    }
                }
                MonitorEvent::Sample(PollOutcome::Telemetry(packet)) => {
                    emit_sample(&packet, &mut log, json);
                }
                MonitorEvent::Sample(PollOutcome::Invalid(_)) => {
                    if !json {
                        println!("{}", display::invalid_row());
                    }
                }
                MonitorEvent::Sample(PollOutcome::NoData) => {}
                MonitorEvent::ConnectionLost(e) => {
                    eprintln!("Connection lost: {e}. Retrying...");
                }
            });
            eprintln!("Monitoring stopped.");
        }
    }

    if let Some(log) = log.as_mut() {
        log.flush().context("failed to flush telemetry log")?;
        eprintln!("Logged {} rows", log.rows());
    }
    Ok(())
}

/// Decode the frames captured from a live module and print them once
fn run_captures(log: &mut Option<TelemetryLog>, json: bool) {
    for frame in &CAPTURED_FRAMES {
        match TelemetryPacket::decode(frame) {
            Ok(packet) => emit_sample(&packet, log, json),
            Err(e) => warn!("captured frame failed to decode: {e}"),
        }
    }
}

/// Poll a simulated module instead of hardware
fn run_demo(cancel: &AtomicBool, interval_ms: u64, log: &mut Option<TelemetryLog>, json: bool) {
    eprintln!("Demo module running; Ctrl-C to stop");
    let mut demo = DemoCdi::new();

    while !cancel.load(Ordering::Relaxed) {
        let frame = demo.next_frame();
        match TelemetryPacket::decode(&frame) {
            Ok(packet) => emit_sample(&packet, log, json),
            Err(e) => warn!("demo produced an invalid frame: {e}"),
        }
        thread::sleep(Duration::from_millis(interval_ms));
    }
}

fn emit_sample(packet: &TelemetryPacket, log: &mut Option<TelemetryLog>, json: bool) {
    if json {
        match display::json_line(packet) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("could not serialize sample: {e}"),
        }
    } else {
        println!("{}", display::telemetry_row(packet));
    }

    if let Some(log) = log.as_mut() {
        if let Err(e) = log.record(packet) {
            warn!("could not write log row: {e}");
        }
    }
}

fn run_write_map(port: &str, file: &Path) -> Result<()> {
    let map = mapfile::load(file)
        .with_context(|| format!("failed to load map from '{}'", file.display()))?;
    eprintln!(
        "Loaded {} advance values from '{}'",
        map.len(),
        file.display()
    );

    let mut conn = Connection::new(ConnectionConfig::new(port));
    conn.connect()
        .with_context(|| format!("failed to connect to the module on {port}"))?;

    let outcome = conn.write_map(&map).context("map write failed")?;

    if outcome.response.is_empty() {
        eprintln!(
            "Write complete, {} bytes sent. No response from the module; it does not acknowledge writes.",
            outcome.bytes_written
        );
    } else {
        eprintln!(
            "Write complete, {} bytes sent. Module answered with {} bytes: {:02X?}",
            outcome.bytes_written,
            outcome.response.len(),
            outcome.response
        );
    }

    conn.disconnect();
    Ok(())
}
