// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduling modes and deadline calendar math.

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

/// When and how often a job fires.
///
/// The numeric values are the wire encoding (`sched-mode`). Modes above
/// [`SchedMode::At`] are recurring: they persist a backup document while
/// waiting and re-schedule themselves on fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SchedMode {
    Now = 0,
    At = 1,
    Hourly = 2,
    Daily = 3,
    Weekly = 4,
    EveryX = 5,
}

impl SchedMode {
    pub fn is_recurring(self) -> bool {
        matches!(
            self,
            SchedMode::Hourly | SchedMode::Daily | SchedMode::Weekly | SchedMode::EveryX
        )
    }
}

crate::simple_display! {
    SchedMode {
        Now => "now",
        At => "at",
        Hourly => "hourly",
        Daily => "daily",
        Weekly => "weekly",
        EveryX => "every-x",
    }
}

impl From<SchedMode> for u8 {
    fn from(mode: SchedMode) -> u8 {
        mode as u8
    }
}

impl TryFrom<u8> for SchedMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SchedMode::Now),
            1 => Ok(SchedMode::At),
            2 => Ok(SchedMode::Hourly),
            3 => Ok(SchedMode::Daily),
            4 => Ok(SchedMode::Weekly),
            5 => Ok(SchedMode::EveryX),
            other => Err(format!("unknown sched-mode {other}")),
        }
    }
}

/// The requested schedule 6-tuple `(Y, M, D, h, m, s)`.
///
/// Fields are interpreted per mode: AT reads the full calendar date, DAILY
/// only `h:m:s`, WEEKLY reads `D` as a weekday index (Monday = 0), EVERY_X
/// reads `h:m:s` as a stride. Encoded on the wire as a 6-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "[u32; 6]", from = "[u32; 6]")]
pub struct SchedAt {
    pub year: u32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl SchedAt {
    pub fn zero() -> Self {
        Self::from([0, 0, 0, 0, 0, 0])
    }

    /// `h·3600 + m·60 + s`, the EVERY_X stride in seconds.
    pub fn hms_secs(&self) -> f64 {
        f64::from(self.hour) * 3600.0 + f64::from(self.minute) * 60.0 + f64::from(self.second)
    }
}

impl From<[u32; 6]> for SchedAt {
    fn from(v: [u32; 6]) -> Self {
        Self { year: v[0], month: v[1], day: v[2], hour: v[3], minute: v[4], second: v[5] }
    }
}

impl From<SchedAt> for [u32; 6] {
    fn from(at: SchedAt) -> Self {
        [at.year, at.month, at.day, at.hour, at.minute, at.second]
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedError {
    #[error("invalid calendar date in schedule: {0:?}")]
    InvalidDate([u32; 6]),
    #[error("invalid weekday index {0} (expected 0-6)")]
    InvalidWeekday(u32),
}

/// Stride in seconds between two fires of a recurring mode.
///
/// One-shot modes have no stride and return 0.
pub fn stride_secs(mode: SchedMode, at: SchedAt) -> f64 {
    match mode {
        SchedMode::Hourly => 3600.0,
        SchedMode::Daily => 86_400.0,
        SchedMode::Weekly => 604_800.0,
        SchedMode::EveryX => at.hms_secs(),
        SchedMode::Now | SchedMode::At => 0.0,
    }
}

/// Compute the first deadline (epoch seconds) for a schedule request.
///
/// `now` is the local wall-clock time at schedule time. A recurring mode
/// whose computed deadline already passed is advanced by its stride until
/// it reaches `now`; a one-shot AT in the past fires immediately.
pub fn initial_deadline(
    mode: SchedMode,
    at: SchedAt,
    now: DateTime<Local>,
) -> Result<f64, SchedError> {
    let deadline = match mode {
        SchedMode::Now => now.timestamp_millis() as f64 / 1000.0,
        SchedMode::At => calendar(&at, at.year, at.month, at.day, at.hour, at.minute, at.second)?,
        SchedMode::Hourly => calendar(
            &at,
            now.year() as u32,
            now.month(),
            now.day(),
            now.hour(),
            at.minute,
            at.second,
        )?,
        SchedMode::Daily => calendar(
            &at,
            now.year() as u32,
            now.month(),
            now.day(),
            at.hour,
            at.minute,
            at.second,
        )?,
        SchedMode::Weekly => weekly_deadline(at, now)?,
        SchedMode::EveryX => now.timestamp() as f64 + at.hms_secs(),
    };

    if mode.is_recurring() {
        let now_secs = now.timestamp_millis() as f64 / 1000.0;
        return Ok(advance_past(deadline, now_secs, stride_secs(mode, at)));
    }
    Ok(deadline)
}

/// Advance a deadline by whole strides until it is at or after `now`.
pub fn advance_past(mut deadline: f64, now: f64, stride: f64) -> f64 {
    if stride <= 0.0 {
        return deadline;
    }
    while deadline < now {
        deadline += stride;
    }
    deadline
}

/// Next day at `h:m:s` whose weekday index equals `at.day`, starting today.
fn weekly_deadline(at: SchedAt, now: DateTime<Local>) -> Result<f64, SchedError> {
    if at.day > 6 {
        return Err(SchedError::InvalidWeekday(at.day));
    }
    let mut next = Local
        .with_ymd_and_hms(now.year(), now.month(), now.day(), at.hour, at.minute, at.second)
        .earliest()
        .ok_or(SchedError::InvalidDate(at.into()))?;
    while next.weekday().num_days_from_monday() != at.day {
        next += chrono::Duration::days(1);
    }
    Ok(next.timestamp() as f64)
}

fn calendar(
    at: &SchedAt,
    year: u32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Result<f64, SchedError> {
    Local
        .with_ymd_and_hms(year as i32, month, day, hour, minute, second)
        .earliest()
        .map(|dt| dt.timestamp() as f64)
        .ok_or(SchedError::InvalidDate((*at).into()))
}

#[cfg(test)]
#[path = "sched_tests.rs"]
mod tests;
