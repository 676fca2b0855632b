use crate::error::Error;
use crate::models::{CycleDuration, NoiseVariant, RestDuration};
use std::str::FromStr;

pub const HELP: &str = "\
commands:
  white | brown | pink   toggle that noise
  off                    turn noise off
  volume <0..1>          set volume
  focus <0|30|40|60>     focus length in minutes (0 = infinite)
  rest <0|5|10|15>       rest length in minutes (0 = no rest)
  login <on|off>         launch at login
  status                 show current state
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Exclusive toggle of a noise variant
    Toggle(NoiseVariant),
    Off,
    /// Master volume (0.0 - 1.0), clamped by the engine
    SetVolume(f64),
    SetFocus(CycleDuration),
    SetRest(RestDuration),
    SetLaunchAtLogin(bool),
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words
            .next()
            .ok_or_else(|| Error::InvalidCommand("empty line".to_string()))?
            .to_ascii_lowercase();
        let arg = words.next();
        if words.next().is_some() {
            return Err(Error::InvalidCommand(format!("too many arguments: '{line}'")));
        }

        let cmd = match (verb.as_str(), arg) {
            ("white" | "brown" | "pink", None) => {
                Command::Toggle(verb.parse().map_err(Error::InvalidCommand)?)
            }
            ("off", None) => Command::Off,
            ("volume" | "vol", Some(v)) => Command::SetVolume(
                v.parse()
                    .map_err(|_| Error::InvalidCommand(format!("bad volume '{v}'")))?,
            ),
            ("focus", Some(m)) => Command::SetFocus(
                parse_minutes(m)
                    .and_then(CycleDuration::from_minutes)
                    .ok_or_else(|| Error::InvalidCommand(format!("focus must be 0, 30, 40 or 60, got '{m}'")))?,
            ),
            ("rest", Some(m)) => Command::SetRest(
                parse_minutes(m)
                    .and_then(RestDuration::from_minutes)
                    .ok_or_else(|| Error::InvalidCommand(format!("rest must be 0, 5, 10 or 15, got '{m}'")))?,
            ),
            ("login", Some("on")) => Command::SetLaunchAtLogin(true),
            ("login", Some("off")) => Command::SetLaunchAtLogin(false),
            ("status", None) => Command::Status,
            ("help" | "?", None) => Command::Help,
            ("quit" | "exit" | "q", None) => Command::Quit,
            _ => return Err(Error::InvalidCommand(format!("'{line}' (try 'help')"))),
        };
        Ok(cmd)
    }
}

fn parse_minutes(raw: &str) -> Option<u32> {
    match raw {
        "inf" | "∞" | "none" => Some(0),
        other => other.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_command() {
        assert_eq!("pink".parse::<Command>().unwrap(), Command::Toggle(NoiseVariant::Pink));
        assert_eq!("WHITE".parse::<Command>().unwrap(), Command::Toggle(NoiseVariant::White));
        assert_eq!("off".parse::<Command>().unwrap(), Command::Off);
        assert_eq!("volume 0.4".parse::<Command>().unwrap(), Command::SetVolume(0.4));
        assert_eq!("focus 30".parse::<Command>().unwrap(), Command::SetFocus(CycleDuration::Thirty));
        assert_eq!("focus inf".parse::<Command>().unwrap(), Command::SetFocus(CycleDuration::Infinite));
        assert_eq!("rest 15".parse::<Command>().unwrap(), Command::SetRest(RestDuration::Fifteen));
        assert_eq!("rest none".parse::<Command>().unwrap(), Command::SetRest(RestDuration::None));
        assert_eq!("login on".parse::<Command>().unwrap(), Command::SetLaunchAtLogin(true));
        assert_eq!("  status ".parse::<Command>().unwrap(), Command::Status);
        assert_eq!("q".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn rejects_bad_input() {
        assert!("".parse::<Command>().is_err());
        assert!("focus 45".parse::<Command>().is_err());
        assert!("volume loud".parse::<Command>().is_err());
        assert!("pink now".parse::<Command>().is_err());
        assert!("login maybe".parse::<Command>().is_err());
        assert!("dance".parse::<Command>().is_err());
    }
}
