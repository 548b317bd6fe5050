use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;

use telemetry_dump::capture::Received;
use telemetry_dump::connection::{Connection, ConnectionConfig, DEFAULT_BAUD_RATE};
use telemetry_dump::protocol::Command;

/// Print everything the flight computer's console sends, optionally after
/// sending it a command (e.g. "help", "hexdump 3").
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Serial port to connect to (e.g. COM3 or /dev/ttyUSB0)
    #[arg(long)]
    port: String,

    /// Baud rate for the serial connection
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baudrate: u32,

    /// Console command to send before listening
    #[arg(long)]
    command: Option<String>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    log::info!("telemetry spy (v{})", env!("CARGO_PKG_VERSION"));

    let command = match args.command.as_deref().map(Command::from_str).transpose() {
        Ok(command) => command,
        Err(e) => {
            log::error!("not sending invalid command: {e}");
            return ExitCode::FAILURE;
        }
    };

    let config = ConnectionConfig {
        port: args.port,
        baud_rate: args.baudrate,
        // Very long timeout, because the console stays quiet until spoken to.
        timeout: Duration::from_secs(60 * 60 * 24),
    };
    let mut connection = match Connection::open(&config) {
        Ok(connection) => connection,
        Err(e) => {
            log::error!("error connecting to serial port: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(command) = command {
        if let Err(e) = connection.send(&command) {
            log::error!("failed to send command: {e}");
            return ExitCode::FAILURE;
        }
    }

    let mut lines = connection.lines();
    loop {
        match lines.read_text() {
            Ok(Received::Line(text)) => println!("{text}"),
            Ok(Received::Silence) => continue,
            Ok(Received::Closed) => return ExitCode::SUCCESS,
            Err(e) => {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        }
    }
}
