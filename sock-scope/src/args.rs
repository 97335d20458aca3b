//! Argument grammar parser
//!
//! Converts the flat comma-separated `key[=value]` agent argument string into
//! a [`Config`]. The grammar is shared by launch mode (the embedding host
//! forwards its agent arguments) and attach mode (`-agentargs=` is validated
//! here before the target process is touched).
//!
//! Every malformed token is fatal to the entire string: callers print the
//! targeted error plus [`usage()`] and terminate, so a half-applied
//! configuration can never run. Unknown keys are ignored for forward
//! compatibility (a debug log line is the only trace).

use std::time::Duration;

use crate::domain::{Config, FilterEntry, ParseError};

const HELP: &[&str] = &["-h", "--help", "help", "h"];
const REMOTE_ADDR: &[&str] = &["-raddr", "remote-addr"];
const REMOTE_PORT: &[&str] = &["-rport", "remote-port"];
const LOCAL_PORT: &[&str] = &["-lport", "local-port"];
const FILTER_ENTRY: &[&str] = &["-f", "filter-entry"];
const LOG_INTERVAL: &[&str] = &["-si", "sample-interval"];
const START_DELAYING: &[&str] = &["-start", "start"];
const WORKING_TIME: &[&str] = &["-fin", "finish-after"];
const LOG_PREFIX: &[&str] = &["-lp", "log-prefix"];
const UUID: &[&str] = &["-id", "uuid"];
const IO_MODE: &[&str] = &["-mode"];
const I2O_ENABLING: &[&str] = &["-i2o"];
const O2I_ENABLING: &[&str] = &["-o2i"];
const DEBUG: &[&str] = &["-d", "debug"];

/// Parse an agent argument string into a fresh `Config`.
///
/// # Errors
/// Any malformed token fails the whole string; `ParseError::HelpRequested` is
/// returned as soon as a help key is seen, before any later key is applied.
pub fn parse_arguments(argument_string: &str) -> Result<Config, ParseError> {
    let mut config = Config::default();
    if argument_string.trim().is_empty() {
        return Ok(config);
    }

    for token in argument_string.split(',') {
        let parts: Vec<&str> = token.split('=').collect();
        if parts.len() > 2 {
            return Err(ParseError::BadToken(token.to_string()));
        }
        let key = parts[0];
        let value = parts.get(1).copied();

        if HELP.contains(&key) {
            return Err(ParseError::HelpRequested);
        } else if REMOTE_ADDR.contains(&key) {
            config.filter_entries.push(FilterEntry::remote_addr(require_value(key, value)?));
        } else if LOCAL_PORT.contains(&key) {
            config.filter_entries.push(FilterEntry::local_port(require_value(key, value)?));
        } else if REMOTE_PORT.contains(&key) {
            config.filter_entries.push(FilterEntry::remote_port(require_value(key, value)?));
        } else if FILTER_ENTRY.contains(&key) {
            let value = require_value(key, value)?;
            config.filter_entries.push(parse_filter_entry(&value)?);
        } else if LOG_INTERVAL.contains(&key) {
            config.log_writer_interval = parse_millis(key, value)?;
        } else if START_DELAYING.contains(&key) {
            config.start_delaying = parse_millis(key, value)?;
        } else if WORKING_TIME.contains(&key) {
            config.working_time = parse_millis(key, value)?;
        } else if LOG_PREFIX.contains(&key) {
            config.log_prefix = require_value(key, value)?;
        } else if UUID.contains(&key) {
            config.uuid = require_value(key, value)?;
        } else if I2O_ENABLING.contains(&key) {
            config.i2o_enabled = parse_bool(key, value)?;
        } else if O2I_ENABLING.contains(&key) {
            config.o2i_enabled = parse_bool(key, value)?;
        } else if DEBUG.contains(&key) {
            // Bare `-d` enables debug; an explicit value must be "true".
            if value.is_none_or(|v| v.eq_ignore_ascii_case("true")) {
                config.debug = true;
            }
        } else if IO_MODE.contains(&key) {
            let value = require_value(key, value)?;
            let (i2o, o2i) = match value.as_str() {
                "i2o" => (true, false),
                "o2i" => (false, true),
                "both" => (true, true),
                _ => return Err(ParseError::BadIoMode { key: key.to_string(), value }),
            };
            config.i2o_enabled = i2o;
            config.o2i_enabled = o2i;
        } else {
            log::debug!("ignoring unknown argument key {key:?}");
        }
    }

    Ok(config)
}

fn require_value(key: &str, value: Option<&str>) -> Result<String, ParseError> {
    value.map(str::to_string).ok_or_else(|| ParseError::MissingValue { key: key.to_string() })
}

fn parse_millis(key: &str, value: Option<&str>) -> Result<Duration, ParseError> {
    let value = require_value(key, value)?;
    value
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ParseError::BadNumber { key: key.to_string(), value })
}

fn parse_bool(key: &str, value: Option<&str>) -> Result<bool, ParseError> {
    let value = require_value(key, value)?;
    Ok(value.eq_ignore_ascii_case("true"))
}

/// `<local port>:<remote addr>:<remote port>`; any segment may be empty.
/// Trailing empty segments are dropped before counting, and the remaining
/// count must be 2 or 3.
fn parse_filter_entry(value: &str) -> Result<FilterEntry, ParseError> {
    let mut segments: Vec<&str> = value.split(':').collect();
    while segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }
    if segments.len() < 2 || segments.len() > 3 {
        return Err(ParseError::BadFilterEntry {
            keys: key_list(FILTER_ENTRY),
            value: value.to_string(),
        });
    }
    let field =
        |i: usize| segments.get(i).filter(|s| !s.is_empty()).map(|s| (*s).to_string());
    Ok(FilterEntry::new(field(0), field(1), field(2)))
}

fn key_list(keys: &[&str]) -> String {
    keys.join(" | ")
}

/// Full usage text for the agent argument grammar.
pub fn usage() -> String {
    let row = |keys: &[&str], what: &str| format!("  {:<28} {}\n", key_list(keys), what);
    let mut out = String::from(
        "agent arguments: a comma separated list like arg1,arg2=val2\n\nARGUMENTS:\n",
    );
    out.push_str(&row(HELP, "print this help"));
    out.push_str(&row(REMOTE_ADDR, "add a filter by remote address"));
    out.push_str(&row(REMOTE_PORT, "add a filter by remote port"));
    out.push_str(&row(LOCAL_PORT, "add a filter by local port"));
    out.push_str(&row(
        FILTER_ENTRY,
        "add a filter entry <local port>:<remote addr>:<remote port>, any part may be empty",
    ));
    out.push_str(&row(LOG_INTERVAL, "log sampling interval, in milliseconds"));
    out.push_str(&row(START_DELAYING, "delay before measuring starts, in milliseconds"));
    out.push_str(&row(WORKING_TIME, "how long to keep measuring, in milliseconds"));
    out.push_str(&row(LOG_PREFIX, "log file prefix"));
    out.push_str(&row(UUID, "session identifier (takes <string>)"));
    out.push_str(&row(IO_MODE, "one of i2o, o2i, both (both by default)"));
    out.push_str(&row(DEBUG, "enable debug diagnostics"));
    out
}
