use crate::app::{Command, PomodoroAction};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};

pub const HELP: &str = "\
Commands:
  start | pause | resume | toggle | reset | status
  add <text> [@ WHEN]
  remind <id> <WHEN>
  unremind <id>
  done <id>
  delete <id>
  help | quit
WHEN: RFC 3339, 'YYYY-MM-DD HH:MM' (local), or +90s / +10m / +2h";

/// One line of stdin input
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Empty,
    Help,
    Quit,
    Command(Command),
}

/// Parse a line typed while `focusbell run` is active
pub fn parse_line(line: &str, now: DateTime<Utc>) -> Result<Line> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let parsed = match word.to_lowercase().as_str() {
        "" => Line::Empty,
        "help" | "?" => Line::Help,
        "quit" | "exit" | "q" => Line::Quit,
        "start" => Line::Command(Command::Pomodoro(PomodoroAction::Start)),
        "pause" => Line::Command(Command::Pomodoro(PomodoroAction::Pause)),
        "resume" => Line::Command(Command::Pomodoro(PomodoroAction::Resume)),
        "toggle" => Line::Command(Command::Pomodoro(PomodoroAction::TogglePause)),
        "reset" => Line::Command(Command::Pomodoro(PomodoroAction::Reset)),
        "status" => Line::Command(Command::Status),
        "add" => {
            let (text, reminder) = match split_reminder(rest) {
                Some((text, when)) => (text, Some(parse_when(when, now)?)),
                None => (rest, None),
            };
            Line::Command(Command::AddTask {
                text: text.to_string(),
                reminder,
            })
        }
        "remind" => {
            let (id, when) = rest
                .split_once(char::is_whitespace)
                .context("Usage: remind <id> <WHEN>")?;
            Line::Command(Command::SetReminder {
                task_id: parse_task_id(id)?,
                at: parse_when(when, now)?,
            })
        }
        "unremind" => Line::Command(Command::ClearReminder {
            task_id: parse_task_id(rest)?,
        }),
        "done" => Line::Command(Command::ToggleComplete {
            task_id: parse_task_id(rest)?,
        }),
        "delete" | "rm" => Line::Command(Command::DeleteTask {
            task_id: parse_task_id(rest)?,
        }),
        other => anyhow::bail!("Unknown command '{}'. Type 'help' for a list.", other),
    };
    Ok(parsed)
}

/// Split "text @ WHEN"; an '@' without surrounding whitespace is part of the text
fn split_reminder(rest: &str) -> Option<(&str, &str)> {
    let (text, when) = rest.rsplit_once('@')?;
    let delimited = text.ends_with(char::is_whitespace) && when.starts_with(char::is_whitespace);
    delimited.then(|| (text.trim(), when.trim()))
}

pub fn parse_task_id(s: &str) -> Result<i64> {
    let s = s.trim();
    s.parse::<i64>()
        .with_context(|| format!("Invalid task id: '{}'", s))
}

/// Parse an absolute or relative reminder time
pub fn parse_when(s: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Some(offset) = s.strip_prefix('+') {
        return now
            .checked_add_signed(parse_offset(offset)?)
            .with_context(|| format!("Offset '+{}' is too far in the future", offset));
    }

    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Ok(at.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            let local = Local
                .from_local_datetime(&naive)
                .earliest()
                .with_context(|| format!("'{}' does not exist in the local timezone", s))?;
            return Ok(local.with_timezone(&Utc));
        }
    }

    anyhow::bail!(
        "Invalid time '{}'. Use RFC 3339, 'YYYY-MM-DD HH:MM', or +90s / +10m / +2h",
        s
    )
}

fn parse_offset(s: &str) -> Result<Duration> {
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .with_context(|| format!("Missing unit in offset '+{}' (use s, m or h)", s))?;
    let (amount, unit) = s.split_at(split);
    let amount: i64 = amount
        .parse()
        .with_context(|| format!("Invalid offset '+{}'", s))?;

    let offset = match unit {
        "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        _ => anyhow::bail!("Unknown unit '{}' in offset (use s, m or h)", unit),
    };
    offset.with_context(|| format!("Offset '+{}' is out of range", s))
}
