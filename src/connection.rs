use std::io::{BufReader, Read, Write};
use std::time::Duration;

use serialport::{SerialPort, SerialPortInfo};

use crate::capture::LineReader;
use crate::protocol::{self, Command};

/// The flight computer's console runs at 115200 baud.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionConfig {
    pub port: String,
    pub baud_rate: u32,
    /// How long a single read may block. A dump ends when the device stays
    /// silent for this long.
    pub timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(port: impl Into<String>) -> ConnectionConfig {
        ConnectionConfig {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// An open serial connection. The port is closed when this is dropped, which
/// covers both normal completion and early returns via `?`.
pub struct Connection {
    name: String,
    port: Box<dyn SerialPort>,
}

impl Connection {
    pub fn open(config: &ConnectionConfig) -> serialport::Result<Connection> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(config.timeout)
            .open()?;
        log::info!(
            "connected to {} at {} baud",
            config.port,
            config.baud_rate
        );
        Ok(Connection {
            name: config.port.clone(),
            port,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn send(&mut self, command: &Command) -> std::io::Result<()> {
        log::info!("sending command: {command}");
        protocol::write_command(&mut self.port, command)
    }

    /// Line reader over the port. Only one may exist at a time, and the
    /// connection can't be written to while it is alive; neither is an issue
    /// for a send-once-then-read exchange.
    pub fn lines(&mut self) -> LineReader<BufReader<&mut dyn SerialPort>> {
        LineReader::new(BufReader::new(&mut *self.port))
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        log::info!("serial connection to {} closed", self.name);
    }
}

pub fn available_ports() -> serialport::Result<Vec<SerialPortInfo>> {
    serialport::available_ports()
}
