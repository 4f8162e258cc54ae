/// Command line parsing for the drumbox binary
use std::path::PathBuf;

use drumbox::ConfigurationError;

pub const USAGE: &str = "\
usage:
  drumbox [play] [PATTERN] [--config FILE] [--port PORT] [--bpm BPM] [--monitor]
  drumbox gui [PATTERN] [--config FILE]
  drumbox tune NAME [--config FILE] [--port PORT] [--bpm BPM]
  drumbox ports

PATTERN is a built-in pattern name (funky, four), a file, or - for stdin.
PORT is an output port index or part of its name.
Set DRUMBOX_LOG=debug for more output.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play,
    Gui,
    Tune(String),
    Ports,
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub command: Command,
    pub pattern: Option<String>,
    pub config: Option<PathBuf>,
    pub port: Option<String>,
    pub bpm: Option<f32>,
    pub monitor: bool,
}

impl Args {
    pub fn parse<I>(args: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Args {
            command: Command::Play,
            pattern: None,
            config: None,
            port: None,
            bpm: None,
            monitor: false,
        };
        let mut positional = Vec::new();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => parsed.command = Command::Help,
                "--monitor" => parsed.monitor = true,
                "--config" => parsed.config = Some(value(&mut args, &arg)?.into()),
                "--port" => parsed.port = Some(value(&mut args, &arg)?),
                "--bpm" => {
                    let text = value(&mut args, &arg)?;
                    let bpm = text
                        .parse()
                        .map_err(|_| usage(format!("`{}` is not a tempo", text)))?;
                    parsed.bpm = Some(bpm);
                }
                flag if flag.starts_with("--") => {
                    return Err(usage(format!("unknown option `{}`", flag)));
                }
                _ => positional.push(arg),
            }
        }

        if parsed.command == Command::Help {
            return Ok(parsed);
        }

        let mut positional = positional.into_iter();
        let first = positional.next();
        parsed.command = match first.as_deref() {
            Some("play") => {
                parsed.pattern = positional.next();
                Command::Play
            }
            Some("gui") => {
                parsed.pattern = positional.next();
                Command::Gui
            }
            Some("tune") => {
                let name = positional
                    .next()
                    .ok_or_else(|| usage("tune needs a NAME".to_string()))?;
                Command::Tune(name)
            }
            Some("ports") => Command::Ports,
            _ => {
                parsed.pattern = first;
                Command::Play
            }
        };

        if let Some(extra) = positional.next() {
            return Err(usage(format!("unexpected argument `{}`", extra)));
        }
        Ok(parsed)
    }
}

fn value(
    args: &mut impl Iterator<Item = String>,
    flag: &str,
) -> Result<String, ConfigurationError> {
    args.next()
        .ok_or_else(|| usage(format!("{} needs a value", flag)))
}

fn usage(message: String) -> ConfigurationError {
    ConfigurationError::Usage(format!("{}\n\n{}", message, USAGE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Args, ConfigurationError> {
        Args::parse(line.split_whitespace().map(str::to_string))
    }

    #[test]
    fn test_defaults_to_play() {
        let args = parse("").unwrap();
        assert_eq!(args.command, Command::Play);
        assert_eq!(args.pattern, None);

        let args = parse("groove.txt --monitor").unwrap();
        assert_eq!(args.command, Command::Play);
        assert_eq!(args.pattern.as_deref(), Some("groove.txt"));
        assert!(args.monitor);
    }

    #[test]
    fn test_play_with_options() {
        let args = parse("play funky --config kit.ron --port usb --bpm 96").unwrap();
        assert_eq!(args.pattern.as_deref(), Some("funky"));
        assert_eq!(args.config, Some(PathBuf::from("kit.ron")));
        assert_eq!(args.port.as_deref(), Some("usb"));
        assert_eq!(args.bpm, Some(96.0));
    }

    #[test]
    fn test_subcommands() {
        assert_eq!(parse("ports").unwrap().command, Command::Ports);
        assert_eq!(parse("gui four").unwrap().command, Command::Gui);
        assert_eq!(
            parse("tune ode").unwrap().command,
            Command::Tune("ode".to_string())
        );
        assert_eq!(parse("play --help").unwrap().command, Command::Help);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(parse("tune"), Err(ConfigurationError::Usage(_))));
        assert!(matches!(parse("--port"), Err(ConfigurationError::Usage(_))));
        assert!(matches!(parse("--bpm fast"), Err(ConfigurationError::Usage(_))));
        assert!(matches!(parse("--loud"), Err(ConfigurationError::Usage(_))));
        assert!(matches!(parse("play a b"), Err(ConfigurationError::Usage(_))));
    }
}
