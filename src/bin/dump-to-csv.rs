use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use telemetry_dump::capture::Outcome;
use telemetry_dump::connection::{self, ConnectionConfig, DEFAULT_BAUD_RATE};
use telemetry_dump::DumpConfig;

/// Read a telemetry file from the flight computer and save it as CSV.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Serial port to connect to (e.g. COM3 or /dev/ttyUSB0)
    #[arg(long, required_unless_present = "list_ports")]
    port: Option<String>,

    /// Baud rate for the serial connection
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baudrate: u32,

    /// Read timeout in seconds. The dump ends once the device is silent for this long.
    #[arg(long, default_value_t = 1)]
    timeout: u64,

    /// Output CSV file
    #[arg(long, default_value = "output.csv")]
    output: PathBuf,

    /// ID of the telemetry file to dump
    #[arg(long, required_unless_present = "list_ports", allow_negative_numbers = true)]
    id: Option<i64>,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

impl Args {
    fn dump_config(&self) -> Option<DumpConfig> {
        Some(DumpConfig {
            connection: ConnectionConfig {
                port: self.port.clone()?,
                baud_rate: self.baudrate,
                timeout: Duration::from_secs(self.timeout),
            },
            output: self.output.clone(),
            id: self.id?,
        })
    }
}

fn list_ports() -> ExitCode {
    match connection::available_ports() {
        Ok(ports) => {
            if ports.is_empty() {
                eprintln!("No serial ports found.");
            }
            for port in ports {
                println!("{}\t{:?}", port.port_name, port.port_type);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("failed to enumerate serial ports: {e}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    log::info!("dump-to-csv (v{})", env!("CARGO_PKG_VERSION"));

    if args.list_ports {
        return list_ports();
    }
    let Some(config) = args.dump_config() else {
        // clap enforces --port and --id unless --list-ports is given.
        log::error!("--port and --id are required");
        return ExitCode::FAILURE;
    };

    match telemetry_dump::run(&config, |record| println!("{record}")) {
        Ok(summary) => match summary.outcome {
            Outcome::Done => {
                log::info!(
                    "wrote {} rows to {}",
                    summary.rows,
                    config.output.display()
                );
                ExitCode::SUCCESS
            }
            Outcome::Failed(e) => {
                log::error!(
                    "dump stopped early ({e}), kept {} rows in {}",
                    summary.rows,
                    config.output.display()
                );
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
