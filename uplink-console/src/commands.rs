//! Console command parsing

use thiserror::Error;
use uplink_types::{
    coerce_baud_rate, coerce_interval_ms, DeviceId, DeviceKind, ParseKindError, ParseModeError,
    SendingMode, COMMON_BAUD_RATES,
};

/// A parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Add a device of the given kind
    Add(DeviceKind),
    /// Add one file-backed device per path
    AddPaths(Vec<String>),
    /// Show the recent path list
    Recent,
    /// Add file-backed devices from the recent list by 1-based index
    AddRecent(Vec<usize>),
    /// Change a device's selection
    Set {
        id: DeviceId,
        selection: String,
        baud_rate: Option<u32>,
    },
    /// Delete a device
    Remove(DeviceId),
    /// List devices, all kinds when `None`
    List(Option<DeviceKind>),
    /// Flip the list sort order
    Sort,
    /// Set the packet interval
    Interval(u64),
    /// Set the bind baud rate
    Baud(u32),
    /// Set the packet source
    Mode(SendingMode),
    /// Set or clear the output device selector
    Target(Option<String>),
    Start,
    Stop,
    Toggle,
    /// Show loop state and counters
    Status,
    /// Show bind candidates
    Ports,
    /// Scan the host's serial ports again and offer them to the backend
    Rescan,
    Help,
    Quit,
}

/// Reasons a console line could not be parsed
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),

    #[error("'{command}' needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error(transparent)]
    InvalidKind(#[from] ParseKindError),

    #[error(transparent)]
    InvalidMode(#[from] ParseModeError),

    #[error("'{0}' is not a device id")]
    InvalidId(String),

    #[error("'{0}' is not a recent path number")]
    InvalidIndex(String),

    #[error("missing closing quote")]
    UnterminatedQuote,
}

/// Usage text printed by `help`
pub const HELP: &str = "\
devices:
  add <kind>                  add a device (serial, aim, teledongle, featherweight, file)
  add-path <path>...          add one file device per path
  recent                      list recently added paths
  add-recent <n>...           add file devices from the recent list
  set <id> <port|path> [baud] choose the port or file for a device, '-' to unset
  rm <id>                     remove a device
  ls [kind]                   list devices
  sort                        flip the list order
  ports                       list ports offered by the backend
  rescan                      scan the host's serial ports again
sending loop:
  interval <ms>               delay between packets (blank or invalid: 500)
  baud <rate>                 baud rate for new bindings (blank or invalid: 115200)
  mode <csv|test>             packet source
  target <id|->               output device, '-' to clear
  start | stop | toggle       control the loop
  status                      loop state and counters
  help | quit
Arguments containing spaces go in double quotes.";

/// `help` output: usage plus the accepted modes and suggested baud rates
pub fn help_text() -> String {
    let mut text = format!("{}\nmodes:\n", HELP);
    for mode in SendingMode::ALL {
        text.push_str(&format!("  {:<27} {}\n", mode.name(), mode.description()));
    }
    let rates: Vec<String> = COMMON_BAUD_RATES.iter().map(|r| r.to_string()).collect();
    text.push_str(&format!("common baud rates: {}", rates.join(", ")));
    text
}

/// Split a line into arguments
///
/// Whitespace separates arguments except inside double quotes, so
/// `"My Flights/a.csv"` is one argument and `""` is an empty one.
fn split_args(line: &str) -> Result<Vec<String>, CommandError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_arg = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            c => {
                current.push(c);
                in_arg = true;
            }
        }
    }

    if quoted {
        return Err(CommandError::UnterminatedQuote);
    }
    if in_arg {
        args.push(current);
    }
    Ok(args)
}

impl ConsoleCommand {
    /// Parse one input line
    ///
    /// Interval and baud arguments are coerced rather than rejected; ids and
    /// recent-path numbers must be plain non-negative integers.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let words = split_args(line)?;
        let (command, args) = words.split_first().ok_or(CommandError::Empty)?;

        match command.to_ascii_lowercase().as_str() {
            "add" => {
                let kind = args.first().ok_or(CommandError::MissingArgument {
                    command: "add",
                    argument: "a device kind",
                })?;
                Ok(ConsoleCommand::Add(kind.parse()?))
            }
            "add-path" => {
                if args.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "add-path",
                        argument: "at least one path",
                    });
                }
                Ok(ConsoleCommand::AddPaths(
                    args.iter().map(|a| a.to_string()).collect(),
                ))
            }
            "recent" => Ok(ConsoleCommand::Recent),
            "add-recent" => {
                if args.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "add-recent",
                        argument: "at least one recent path number",
                    });
                }
                let indices = args
                    .iter()
                    .map(|a| {
                        a.parse::<usize>()
                            .map_err(|_| CommandError::InvalidIndex(a.to_string()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ConsoleCommand::AddRecent(indices))
            }
            "set" => match args {
                [id, selection, rest @ ..] => Ok(ConsoleCommand::Set {
                    id: parse_id(id)?,
                    selection: if selection == "-" {
                        String::new()
                    } else {
                        selection.clone()
                    },
                    baud_rate: rest.first().map(|b| coerce_baud_rate(b)),
                }),
                _ => Err(CommandError::MissingArgument {
                    command: "set",
                    argument: "a device id and a port or path",
                }),
            },
            "rm" | "remove" => {
                let id = args.first().ok_or(CommandError::MissingArgument {
                    command: "rm",
                    argument: "a device id",
                })?;
                Ok(ConsoleCommand::Remove(parse_id(id)?))
            }
            "ls" | "list" => match args.first() {
                Some(kind) => Ok(ConsoleCommand::List(Some(kind.parse()?))),
                None => Ok(ConsoleCommand::List(None)),
            },
            "sort" => Ok(ConsoleCommand::Sort),
            "interval" => Ok(ConsoleCommand::Interval(coerce_interval_ms(
                args.first().map(String::as_str).unwrap_or(""),
            ))),
            "baud" => Ok(ConsoleCommand::Baud(coerce_baud_rate(
                args.first().map(String::as_str).unwrap_or(""),
            ))),
            "mode" => {
                let mode = args.first().ok_or(CommandError::MissingArgument {
                    command: "mode",
                    argument: "csv or test",
                })?;
                Ok(ConsoleCommand::Mode(mode.parse()?))
            }
            "target" => match args.first().map(String::as_str) {
                None | Some("-") => Ok(ConsoleCommand::Target(None)),
                Some(target) => Ok(ConsoleCommand::Target(Some(target.to_string()))),
            },
            "start" => Ok(ConsoleCommand::Start),
            "stop" => Ok(ConsoleCommand::Stop),
            "toggle" => Ok(ConsoleCommand::Toggle),
            "status" => Ok(ConsoleCommand::Status),
            "ports" => Ok(ConsoleCommand::Ports),
            "rescan" => Ok(ConsoleCommand::Rescan),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
            _ => Err(CommandError::Unknown(command.clone())),
        }
    }
}

fn parse_id(text: &str) -> Result<DeviceId, CommandError> {
    text.parse::<u32>()
        .map(DeviceId)
        .map_err(|_| CommandError::InvalidId(text.to_string()))
}
