use std::io::{BufRead, ErrorKind};

use crate::protocol::{self, ResponseLine};

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("error reading from device: {0}")]
    Io(#[from] std::io::Error),
    #[error("device sent invalid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),
}

/// The result of a single line read.
#[derive(Debug, PartialEq)]
pub enum Received<'a> {
    /// A line with surrounding whitespace removed. A timeout part-way through
    /// a line yields whatever was received so far.
    Line(&'a str),
    /// Nothing arrived before the port timed out.
    Silence,
    /// The stream ended.
    Closed,
}

/// Reads newline-terminated text from the device.
pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> LineReader<R> {
        LineReader {
            inner,
            buf: Vec::new(),
        }
    }

    pub fn read_text(&mut self) -> Result<Received<'_>, ReadError> {
        self.buf.clear();
        let timed_out = match self.inner.read_until(b'\n', &mut self.buf) {
            Ok(_) => false,
            Err(error) if error.kind() == ErrorKind::TimedOut => true,
            Err(error) => return Err(ReadError::Io(error)),
        };
        if self.buf.is_empty() {
            return Ok(if timed_out {
                Received::Silence
            } else {
                Received::Closed
            });
        }
        Ok(Received::Line(std::str::from_utf8(&self.buf)?.trim()))
    }

    /// Reads and classifies the next line. Silence and end of stream both
    /// count as a blank line.
    pub fn read_line(&mut self) -> Result<ResponseLine, ReadError> {
        Ok(match self.read_text()? {
            Received::Line(text) => protocol::classify(text),
            Received::Silence | Received::Closed => ResponseLine::Blank,
        })
    }
}

#[derive(Debug)]
pub enum Outcome {
    /// The device terminated the dump with an empty line.
    Done,
    /// Reading stopped early. Everything received before the error has
    /// already been written out.
    Failed(ReadError),
}

#[derive(Debug)]
pub struct CaptureSummary {
    pub header: Option<Vec<String>>,
    /// Data rows written, excluding the header.
    pub rows: usize,
    pub outcome: Outcome,
}

enum CaptureState {
    AwaitingFirstLine,
    StreamingRows,
}

/// Writer settings for dump output: CRLF-terminated records, and rows may
/// differ in length from the header.
pub fn record_writer_builder() -> csv::WriterBuilder {
    let mut builder = csv::WriterBuilder::new();
    builder.flexible(true).terminator(csv::Terminator::CRLF);
    builder
}

/// Streams the device's response into `writer` until an empty line or a read
/// error. Each record is flushed as soon as it has been written, and passed to
/// `on_record` as it was received.
/// Only failures writing the output are returned as errors: read failures are
/// reported via `CaptureSummary::outcome`.
pub fn capture<R: BufRead, W: std::io::Write>(
    lines: &mut LineReader<R>,
    writer: &mut csv::Writer<W>,
    mut on_record: impl FnMut(&str),
) -> csv::Result<CaptureSummary> {
    let mut state = CaptureState::AwaitingFirstLine;
    let mut header = None;
    let mut rows = 0;
    let outcome = loop {
        let line = match lines.read_line() {
            Ok(line) => line,
            Err(error) => {
                log::error!("{error}");
                break Outcome::Failed(error);
            }
        };
        let record = match line {
            ResponseLine::Echo(echo) => {
                log::debug!("skipping echo: {echo}");
                continue;
            }
            ResponseLine::Blank => {
                log::info!("done");
                break Outcome::Done;
            }
            ResponseLine::Record(record) => record,
        };
        on_record(&record);
        let fields = protocol::split_fields(&record);
        writer.write_record(&fields)?;
        writer.flush()?;
        state = match state {
            CaptureState::AwaitingFirstLine => {
                header = Some(fields);
                CaptureState::StreamingRows
            }
            CaptureState::StreamingRows => {
                rows += 1;
                CaptureState::StreamingRows
            }
        };
    };
    Ok(CaptureSummary {
        header,
        rows,
        outcome,
    })
}
