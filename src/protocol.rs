use std::str::FromStr;

/// Lines starting with this prefix are the console echoing our own command
/// back at us.
pub const ECHO_PREFIX: &str = "dump";

/// Commands understood by the flight computer's serial console.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Help,
    /// List the telemetry files stored in flash.
    List,
    /// Emit the telemetry file with the given ID as CSV text, terminated by
    /// an empty line.
    Dump {
        id: i64,
    },
    Hexdump {
        id: i64,
    },
    Delete {
        id: i64,
    },
    /// Asks for confirmation before wiping flash. The device aborts the
    /// format unless the very next command is ConfirmFormat.
    Format,
    ConfirmFormat,
}

impl Command {
    pub fn to_wire(&self) -> String {
        match self {
            Command::Help => "help".to_string(),
            Command::List => "ls".to_string(),
            Command::Dump { id } => format!("dump {id}"),
            Command::Hexdump { id } => format!("hexdump {id}"),
            Command::Delete { id } => format!("delete {id}"),
            Command::Format => "format".to_string(),
            Command::ConfirmFormat => "yes".to_string(),
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_wire())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{reason} (got {received_command:?})")]
pub struct ParseError {
    pub received_command: String,
    pub reason: String,
}

impl PartialEq for ParseError {
    fn eq(&self, other: &Self) -> bool {
        self.received_command == other.received_command
    }
}

impl Eq for ParseError {}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(command: &str) -> Result<Command, ParseError> {
        let error = |reason: &str| ParseError {
            received_command: command.to_string(),
            reason: reason.to_string(),
        };
        let mut tokens = command.split_whitespace();
        let Some(name) = tokens.next() else {
            return Err(error("empty command"));
        };
        let argument = tokens.next();
        if tokens.next().is_some() {
            return Err(error("too many arguments"));
        }
        match (name, argument) {
            ("help", None) => Ok(Command::Help),
            ("ls", None) => Ok(Command::List),
            ("format", None) => Ok(Command::Format),
            ("yes", None) => Ok(Command::ConfirmFormat),
            ("help" | "ls" | "format" | "yes", Some(_)) => {
                Err(error("command does not take an argument"))
            }
            ("dump" | "hexdump" | "delete", None) => Err(error("missing file id")),
            (name @ ("dump" | "hexdump" | "delete"), Some(id)) => {
                let Ok(id) = i64::from_str(id) else {
                    return Err(error("unable to parse file id"));
                };
                Ok(match name {
                    "dump" => Command::Dump { id },
                    "hexdump" => Command::Hexdump { id },
                    _ => Command::Delete { id },
                })
            }
            _ => Err(error("unknown or unsupported command")),
        }
    }
}

/// Writes the command followed by the newline the console waits for.
pub fn write_command<W: std::io::Write>(writer: &mut W, command: &Command) -> std::io::Result<()> {
    writer.write_all(command.to_wire().as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// A single line of the device's response to a dump command.
#[derive(Debug, PartialEq)]
pub enum ResponseLine {
    /// Our own command, mirrored by the console.
    Echo(String),
    /// A CSV line. The first one is the header.
    Record(String),
    /// End of the dump.
    Blank,
}

/// Classify a line that has already had its surrounding whitespace (including
/// the trailing <CR><LF>) removed.
pub fn classify(line: &str) -> ResponseLine {
    match line {
        "" => ResponseLine::Blank,
        line if line.starts_with(ECHO_PREFIX) => ResponseLine::Echo(line.to_string()),
        line => ResponseLine::Record(line.to_string()),
    }
}

/// The firmware never quotes anything, so a plain split is all we need. Spaces
/// around separators are retained.
pub fn split_fields(line: &str) -> Vec<String> {
    line.split(',').map(str::to_string).collect()
}
