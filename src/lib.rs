pub mod capture;
pub mod connection;
pub mod protocol;

use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use capture::{CaptureSummary, LineReader};
use connection::{Connection, ConnectionConfig};
use protocol::Command;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("error connecting to serial port: {0}")]
    Open(#[from] serialport::Error),
    #[error("failed to send command: {0}")]
    Send(#[source] std::io::Error),
    #[error("failed to write output: {0}")]
    Output(#[from] csv::Error),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DumpConfig {
    pub connection: ConnectionConfig,
    pub output: PathBuf,
    /// ID of the telemetry file to dump.
    pub id: i64,
}

/// Dump one telemetry file from the device into a CSV file.
///
/// The output file is only created once the port is open and the command has
/// been sent, so a missing device never clobbers an existing file.
/// `on_record` sees every header/data line as it arrives.
/// A dump that stops early still returns Ok: check `CaptureSummary::outcome`.
/// Whatever was received up to that point is left in the output file.
pub fn run(config: &DumpConfig, on_record: impl FnMut(&str)) -> Result<CaptureSummary, Error> {
    let mut connection = Connection::open(&config.connection)?;
    log::debug!(
        "writing {} from {}",
        config.output.display(),
        connection.name()
    );
    dump(&mut connection, config.id, &config.output, on_record)
}

/// Sends `dump <id>` over an already open port, then creates `output` and
/// streams the response into it.
pub fn dump<P: Read + Write>(
    port: &mut P,
    id: i64,
    output: &Path,
    on_record: impl FnMut(&str),
) -> Result<CaptureSummary, Error> {
    let command = Command::Dump { id };
    log::info!("sending command: {command}");
    protocol::write_command(port, &command).map_err(Error::Send)?;

    let mut writer = capture::record_writer_builder().from_path(output)?;
    let mut lines = LineReader::new(BufReader::new(port));
    Ok(capture::capture(&mut lines, &mut writer, on_record)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_missing_port_leaves_output_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("output.csv");
        let config = DumpConfig {
            connection: ConnectionConfig::new("/dev/telemetry-dump-no-such-port"),
            output: output.clone(),
            id: 7,
        };

        let mut records = 0;
        let result = run(&config, |_| records += 1);
        assert!(
            matches!(result, Err(Error::Open(_))),
            "got={result:?}"
        );
        assert_eq!(records, 0);
        assert!(!output.exists());
    }

    /// In-memory port that remembers whether the output file existed when the
    /// command was written and when the response was first read.
    struct FakePort<'a> {
        response: std::io::Cursor<&'static str>,
        output: &'a Path,
        sent: Vec<u8>,
        output_existed_on_send: Option<bool>,
        output_existed_on_read: Option<bool>,
    }

    impl<'a> FakePort<'a> {
        fn new(response: &'static str, output: &'a Path) -> FakePort<'a> {
            FakePort {
                response: std::io::Cursor::new(response),
                output,
                sent: Vec::new(),
                output_existed_on_send: None,
                output_existed_on_read: None,
            }
        }
    }

    impl Read for FakePort<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.output_existed_on_read
                .get_or_insert(self.output.exists());
            self.response.read(buf)
        }
    }

    impl Write for FakePort<'_> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.output_existed_on_send
                .get_or_insert(self.output.exists());
            self.sent.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_dump() {
        struct TestCase<'a> {
            name: &'a str,
            input: &'static str,
            expected_output: &'a str,
            expected_records: Vec<&'a str>,
        }
        let tests = [
            TestCase {
                name: "echo_header_and_rows",
                input: "dump 3\na,b,c\n1,2,3\n4,5,6\n\n",
                expected_output: "a,b,c\r\n1,2,3\r\n4,5,6\r\n",
                expected_records: vec!["a,b,c", "1,2,3", "4,5,6"],
            },
            TestCase {
                name: "immediate_blank",
                input: "\n",
                expected_output: "",
                expected_records: vec![],
            },
            TestCase {
                name: "silent_device",
                input: "",
                expected_output: "",
                expected_records: vec![],
            },
        ];
        for case in tests {
            let dir = tempfile::tempdir().unwrap();
            let output = dir.path().join("output.csv");
            let mut port = FakePort::new(case.input, &output);

            let mut records = Vec::new();
            let summary = dump(&mut port, 3, &output, |record| {
                records.push(record.to_string())
            })
            .unwrap();

            assert!(
                matches!(summary.outcome, capture::Outcome::Done),
                "{}: got={:?}",
                case.name,
                summary.outcome
            );
            assert_eq!(port.sent, b"dump 3\n", "{}: sent", case.name);
            assert_eq!(
                port.output_existed_on_send,
                Some(false),
                "{}: output created before send",
                case.name
            );
            assert_eq!(
                port.output_existed_on_read,
                Some(true),
                "{}: output not created before first read",
                case.name
            );
            assert_eq!(records, case.expected_records, "{}: records", case.name);
            let got = std::fs::read_to_string(&output).unwrap();
            assert_eq!(
                got, case.expected_output,
                "{}: got={got:?}, want={:?}",
                case.name, case.expected_output
            );
        }
    }

    #[test]
    fn test_dump_truncates_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("output.csv");
        std::fs::write(&output, "stale,data\r\n").unwrap();

        let mut port = FakePort::new("dump 3\n\n", &output);
        let summary = dump(&mut port, 3, &output, |_| ()).unwrap();

        assert_eq!(summary.header, None);
        assert_eq!(summary.rows, 0);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "");
    }

    #[test]
    fn test_error_messages() {
        let error = Error::Send(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "port gone",
        ));
        assert_eq!(error.to_string(), "failed to send command: port gone");
    }
}
