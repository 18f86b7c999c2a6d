//! Vitalstream CLI
//!
//! Physiological sensor telemetry over TCP.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vitalstream::{
    config::{Config, DeliveryMode},
    pipeline::{IngestPolicy, PulsePipeline, TemperaturePipeline, WaveformEstimator},
    sensor::{SyntheticOximeter, SyntheticThermometer},
    server::{ServerConfig, TelemetryServer},
    stats::{SessionStats, SharedSessionStats},
    VERSION,
};

#[derive(Parser)]
#[command(name = "vitalstream")]
#[command(version = VERSION)]
#[command(about = "Physiological sensor telemetry over TCP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve median-reduced readings from one sensor kind
    Serve {
        /// Sensor kind to serve (temperature or oximeter)
        #[arg(long, default_value = "temperature")]
        sensor: String,

        /// Listen address (overrides the config file)
        #[arg(long)]
        listen: Option<SocketAddr>,

        /// Session termination mode (one_shot or streaming)
        #[arg(long)]
        mode: Option<String>,

        /// Readings per batch (overrides the config file)
        #[arg(long)]
        batch_capacity: Option<usize>,
    },

    /// Connect to a running server and print the payloads it sends
    Watch {
        /// Server address to connect to
        #[arg(long, default_value = "127.0.0.1:65432")]
        addr: SocketAddr,
    },

    /// Show configuration
    Config,
}

/// Which sensor kind a server instance polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SensorKind {
    Temperature,
    Oximeter,
}

impl SensorKind {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "temperature" | "temp" => Some(SensorKind::Temperature),
            "oximeter" | "pulse" | "spo2" => Some(SensorKind::Oximeter),
            _ => None,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            sensor,
            listen,
            mode,
            batch_capacity,
        } => cmd_serve(&sensor, listen, mode.as_deref(), batch_capacity),
        Commands::Watch { addr } => cmd_watch(addr),
        Commands::Config => cmd_config(),
    }
}

fn cmd_serve(
    sensor: &str,
    listen: Option<SocketAddr>,
    mode: Option<&str>,
    batch_capacity: Option<usize>,
) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let Some(kind) = SensorKind::parse(sensor) else {
        bail!("unknown sensor kind '{sensor}' (expected temperature or oximeter)");
    };

    let config = Config::load().unwrap_or_default();
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create data directory: {e}");
    }

    let mode = match mode {
        None => config.delivery_mode,
        Some("one_shot") | Some("oneshot") => DeliveryMode::OneShot,
        Some("streaming") => DeliveryMode::Streaming,
        Some(other) => bail!("unknown delivery mode '{other}' (expected one_shot or streaming)"),
    };

    let server_config = match kind {
        SensorKind::Temperature => ServerConfig {
            listen: listen.unwrap_or(config.temperature.listen),
            mode,
            batch_capacity: batch_capacity.unwrap_or(config.temperature.batch_capacity),
            ingest_policy: IngestPolicy::IngestAll,
            poll_interval: std::time::Duration::from_millis(config.temperature.poll_interval_ms),
        },
        SensorKind::Oximeter => ServerConfig {
            listen: listen.unwrap_or(config.oximeter.listen),
            mode,
            batch_capacity: batch_capacity.unwrap_or(config.oximeter.batch_capacity),
            ingest_policy: IngestPolicy::IngestIfAlgorithmValid,
            poll_interval: std::time::Duration::from_millis(config.oximeter.poll_interval_ms),
        },
    };

    println!("Vitalstream v{VERSION}");
    println!();
    println!("Starting {kind:?} telemetry server...");
    println!("  Listen address: {}", server_config.listen);
    println!("  Delivery mode: {mode:?}");
    println!("  Batch capacity: {} readings", server_config.batch_capacity);
    println!("  Sample source: synthetic (no hardware attached)");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let stats: SharedSessionStats = Arc::new(SessionStats::with_persistence(
        config.data_path.join("stats.json"),
    ));

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    let server = TelemetryServer::bind(server_config, stats.clone(), running)
        .context("could not start telemetry server")?;

    match kind {
        SensorKind::Temperature => {
            let offset = config.temperature.calibration_offset_c;
            server.run(move || Ok(TemperaturePipeline::new(SyntheticThermometer::new(), offset)))
        }
        SensorKind::Oximeter => {
            let rate = config.oximeter.sample_rate_hz;
            server.run(move || {
                Ok(PulsePipeline::new(
                    SyntheticOximeter::new(),
                    WaveformEstimator::new(rate),
                ))
            })
        }
    }
    .context("telemetry server failed")?;

    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save session stats: {e}");
    }

    println!();
    println!("{}", stats.summary());
    Ok(())
}

fn cmd_watch(addr: SocketAddr) -> anyhow::Result<()> {
    println!("Connecting to {addr}...");
    let mut stream =
        TcpStream::connect(addr).with_context(|| format!("could not connect to {addr}"))?;
    println!("Connected. Waiting for payloads (one per completed batch)...");
    println!();

    let mut buf = [0u8; 1024];
    loop {
        let n = stream.read(&mut buf).context("read failed")?;
        if n == 0 {
            println!("Connection closed by server.");
            return Ok(());
        }

        // One read is one payload in one-shot mode; streaming mode frames
        // payloads with newlines, so split just in case several arrived.
        let chunk = String::from_utf8_lossy(&buf[..n]);
        for document in chunk.split('\n').filter(|s| !s.trim().is_empty()) {
            match serde_json::from_str::<serde_json::Value>(document) {
                Ok(value) => print_payload(&value),
                Err(e) => eprintln!("Warning: received non-JSON data ({e}): {document}"),
            }
        }
    }
}

fn print_payload(value: &serde_json::Value) {
    if let Some(temperature) = value.get("temperature") {
        println!("  ---> Temperature = {temperature} °C");
    } else if let (Some(bpm), Some(spo2)) = (value.get("bpm"), value.get("spo2")) {
        println!("  ---> BPM = {bpm}, SpO2 = {spo2} %");
    } else {
        println!("  ---> {value}");
    }
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");
}
