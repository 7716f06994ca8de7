//! Deterministic storage addressing.
//!
//! Every artifact of a run lives at
//! `<zone>/<table>/<year>/<month>/<day>/<table>[_clean]_<token>.csv`, where the
//! token is the run timestamp with separators removed. Nothing here performs
//! I/O; the same `(zone, table, run timestamp)` always yields the same key.

use crate::domain::schema::Table;
use crate::utils::error::{EtlError, Result};
use chrono::{SecondsFormat, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Raw,
    Clean,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Raw => "raw",
            Zone::Clean => "clean",
        }
    }

    /// Object metadata entry carrying the run timestamp for audit.
    pub fn metadata_key(&self) -> &'static str {
        match self {
            Zone::Raw => "ingested_at",
            Zone::Clean => "cleaned_at_ts",
        }
    }

    fn file_suffix(&self) -> &'static str {
        match self {
            Zone::Raw => "",
            Zone::Clean => "_clean",
        }
    }
}

/// The single version marker shared by every stage of one pipeline run.
///
/// Generated once by whoever triggers the run and then only passed around;
/// stages never create their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunTimestamp(String);

impl RunTimestamp {
    /// Accepts an externally supplied timestamp verbatim, as long as it has a
    /// usable date segment and only ISO-8601 characters.
    pub fn parse(value: &str) -> Result<Self> {
        date_parts_of(value)?;
        Ok(Self(value.to_string()))
    }

    /// 現在時間 (UTC)，微秒精度，例如 `2024-03-05T10:20:30.123456+00:00`
    pub fn now() -> Self {
        Self(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Splits the ISO date portion (before `T`) into `(year, month, day)`.
///
/// Rejects anything outside the ISO-8601 character set, so a timestamp can
/// never add path segments to a key.
pub fn date_parts_of(timestamp: &str) -> Result<(String, String, String)> {
    let malformed = |reason: &str| EtlError::MalformedTimestamp {
        value: timestamp.to_string(),
        reason: reason.to_string(),
    };

    // token 會成為路徑的一部分，只允許 ISO-8601 字元
    if let Some(c) = timestamp
        .chars()
        .find(|c| !(c.is_ascii_digit() || matches!(c, '-' | ':' | '.' | '+' | 'T' | 'Z')))
    {
        return Err(malformed(&format!("unexpected character {:?}", c)));
    }

    let date_part = timestamp.split('T').next().unwrap_or_default();
    let parts: Vec<&str> = date_part.split('-').collect();
    if parts.len() != 3 {
        return Err(malformed("expected a YYYY-MM-DD date segment"));
    }

    let widths = [4, 2, 2];
    for (part, width) in parts.iter().zip(widths) {
        if part.len() != width || !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed("date segment must be YYYY-MM-DD"));
        }
    }

    Ok((
        parts[0].to_string(),
        parts[1].to_string(),
        parts[2].to_string(),
    ))
}

/// Key-safe token: drops `:`, `-` and `+`, turns the `T` separator into `_`.
///
/// Injective for timestamps produced by [`RunTimestamp::now`]; arbitrary
/// external strings may collide.
pub fn file_token(timestamp: &str) -> String {
    timestamp
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '+'))
        .map(|c| if c == 'T' { '_' } else { c })
        .collect()
}

pub fn zone_key(zone: Zone, table: Table, timestamp: &str) -> Result<String> {
    let (year, month, day) = date_parts_of(timestamp)?;
    Ok(format!(
        "{zone}/{table}/{year}/{month}/{day}/{table}{suffix}_{token}.csv",
        zone = zone.as_str(),
        table = table.as_str(),
        suffix = zone.file_suffix(),
        token = file_token(timestamp),
    ))
}

pub fn raw_key(table: Table, timestamp: &str) -> Result<String> {
    zone_key(Zone::Raw, table, timestamp)
}

pub fn clean_key(table: Table, timestamp: &str) -> Result<String> {
    zone_key(Zone::Clean, table, timestamp)
}
