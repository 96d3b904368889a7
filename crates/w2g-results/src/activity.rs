//! Recent agent activity parsed from the plain-text run log.
//!
//! Lines look like
//! `2026-10-18 09:14:03.512  INFO run{run_id=..}:stage{id=reward}: assigning reward reward=robux`.
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::SinkError;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
pub const DEFAULT_ACTIVITY_LIMIT: usize = 100;

const TIMESTAMP_LEN: usize = 23;
const LEVELS: [&str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
const UNKNOWN_AGENT: &str = "system";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub timestamp: NaiveDateTime,
    pub time_ago: String,
    pub level: String,
    pub agent: String,
    pub details: String,
}

/// Parses one log line; `None` for blank lines or lines that do not start
/// with a timestamp and a level.
///
/// The agent is the stage id carried by the `stage{id=..}` span when present,
/// otherwise the first of `agents` mentioned anywhere in the line.
pub fn parse_log_line(line: &str, agents: &[&str]) -> Option<ActivityEntry> {
    let line = line.trim_end();
    let timestamp =
        NaiveDateTime::parse_from_str(line.get(..TIMESTAMP_LEN)?, TIMESTAMP_FORMAT).ok()?;

    let rest = line.get(TIMESTAMP_LEN..)?.trim_start();
    let (level, rest) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    if !LEVELS.contains(&level) {
        return None;
    }
    let rest = rest.trim_start();

    let agent = stage_span_id(rest)
        .and_then(|id| agents.iter().find(|a| **a == id))
        .or_else(|| agents.iter().find(|a| rest.contains(**a)))
        .copied()
        .unwrap_or(UNKNOWN_AGENT);

    Some(ActivityEntry {
        timestamp,
        time_ago: String::new(),
        level: level.to_string(),
        agent: agent.to_string(),
        details: strip_span_prefix(rest).to_string(),
    })
}

fn stage_span_id(rest: &str) -> Option<&str> {
    let start = rest.find("stage{id=")? + "stage{id=".len();
    let len = rest[start..].find(|c: char| c == '}' || c == ' ')?;
    Some(&rest[start..start + len])
}

/// Drops the `span{fields}:span{fields}: ` chain the formatter puts in front
/// of the message.
fn strip_span_prefix(mut rest: &str) -> &str {
    loop {
        let Some(open) = rest.find('{') else {
            return rest;
        };
        let name = &rest[..open];
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return rest;
        }
        let Some(close) = rest[open..].find("}:") else {
            return rest;
        };
        rest = &rest[open + close + 2..];
        if rest.is_empty() || rest.starts_with(' ') {
            return rest.trim_start();
        }
    }
}

/// `N minutes ago` under an hour, `N hours ago` under a day, else the date.
pub fn time_ago(ts: NaiveDateTime, now: NaiveDateTime) -> String {
    let elapsed = now.signed_duration_since(ts);
    let minutes = elapsed.num_minutes().max(0);
    if minutes < 60 {
        format!("{} minutes ago", minutes)
    } else if elapsed.num_hours() < 24 {
        format!("{} hours ago", elapsed.num_hours())
    } else {
        format!("On {}", ts.format("%Y-%m-%d"))
    }
}

/// Newest `limit` entries of the log at `path`, relative to `now`.
///
/// A missing log reads as no activity.
pub fn read_activity(
    path: &Path,
    agents: &[&str],
    limit: usize,
    now: NaiveDateTime,
) -> Result<Vec<ActivityEntry>, SinkError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut entries: Vec<ActivityEntry> = text
        .lines()
        .filter_map(|line| parse_log_line(line, agents))
        .collect();
    entries.reverse();
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries.truncate(limit);

    for entry in &mut entries {
        entry.time_ago = time_ago(entry.timestamp, now);
    }
    Ok(entries)
}
