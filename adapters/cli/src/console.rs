use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

/// Line-oriented instruction typed by the player.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Input {
    Spin,
    Wait(Duration),
    Auto(bool),
    Heartbeat(bool),
    Restart,
    Status,
    Wheel,
    Help,
    Quit,
}

pub(crate) const HELP: &str = "commands: spin | wait <seconds> | auto on|off | heartbeat on|off | restart | status | wheel | help | quit";

/// Parses one console line; blank lines yield `None`.
pub(crate) fn parse(line: &str) -> Result<Option<Input>> {
    let mut words = line.split_whitespace();
    let Some(keyword) = words.next() else {
        return Ok(None);
    };
    let argument = words.next();
    if words.next().is_some() {
        bail!("too many arguments in `{}`", line.trim());
    }

    let input = match (keyword.to_ascii_lowercase().as_str(), argument) {
        ("spin" | "s", None) => Input::Spin,
        ("wait" | "w", Some(seconds)) => Input::Wait(parse_seconds(seconds)?),
        ("auto", Some(toggle)) => Input::Auto(parse_toggle(toggle)?),
        ("heartbeat", Some(toggle)) => Input::Heartbeat(parse_toggle(toggle)?),
        ("restart", None) => Input::Restart,
        ("status", None) => Input::Status,
        ("wheel", None) => Input::Wheel,
        ("help" | "?", None) => Input::Help,
        ("quit" | "exit" | "q", None) => Input::Quit,
        _ => bail!("unrecognised command `{}`", line.trim()),
    };
    Ok(Some(input))
}

fn parse_seconds(text: &str) -> Result<Duration> {
    let seconds: f64 = text
        .parse()
        .with_context(|| format!("`{text}` is not a number of seconds"))?;
    Duration::try_from_secs_f64(seconds).map_err(|_| anyhow!("`{text}` is not a valid duration"))
}

fn parse_toggle(text: &str) -> Result<bool> {
    match text.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => bail!("expected `on` or `off`, found `{text}`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_case_insensitive() {
        assert_eq!(parse("SPIN").expect("valid"), Some(Input::Spin));
        assert_eq!(parse("Auto ON").expect("valid"), Some(Input::Auto(true)));
        assert_eq!(
            parse("heartbeat off").expect("valid"),
            Some(Input::Heartbeat(false))
        );
    }

    #[test]
    fn wait_accepts_fractional_seconds() {
        assert_eq!(
            parse("wait 1.5").expect("valid"),
            Some(Input::Wait(Duration::from_millis(1_500)))
        );
        assert!(parse("wait -2").is_err());
        assert!(parse("wait soon").is_err());
    }

    #[test]
    fn blank_and_unknown_lines() {
        assert_eq!(parse("   ").expect("blank"), None);
        assert!(parse("dance").is_err());
        assert!(parse("spin twice please").is_err());
    }
}
