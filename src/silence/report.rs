//! Parser for ffmpeg's `silencedetect` diagnostics.
//!
//! ffmpeg writes its findings to stderr, interleaved with banner, stream and
//! progress output:
//!
//! ```text
//!   Duration: 00:01:02.50, start: 0.000000, bitrate: 128 kb/s
//! [silencedetect @ 0x55d0c8] silence_start: 4.2031
//! [silencedetect @ 0x55d0c8] silence_end: 7.9142 | silence_duration: 3.7111
//! ```
//!
//! Anything that is not a silence event or the input duration is ignored.

use serde::Serialize;
use thiserror::Error;

use super::timeline::Span;

const SILENCE_START_TAG: &str = "silence_start:";
const SILENCE_END_TAG: &str = "silence_end:";
const DURATION_TAG: &str = "Duration:";

#[derive(Debug, Error, PartialEq)]
pub enum ReportError {
    #[error("malformed silence report: {0}")]
    MalformedReport(String),

    #[error("silence report does not contain a Duration line")]
    MissingDuration,
}

/// Silences found in one file, plus the file's total length in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SilenceReport {
    pub silences: Vec<Span>,
    pub duration: f64,
}

impl SilenceReport {
    pub fn total_silence(&self) -> f64 {
        self.silences.iter().map(Span::length).sum()
    }
}

/// Result of scanning for silence events.
#[derive(Debug, Clone, PartialEq)]
pub struct SilenceScan {
    pub silences: Vec<Span>,
    /// Start of a silence ffmpeg never closed because it ran to the end of
    /// the stream.
    pub unterminated: Option<f64>,
}

pub fn parse_report<S: AsRef<str>>(lines: &[S]) -> Result<SilenceReport, ReportError> {
    let scan = parse_silence_spans(lines)?;
    let duration = parse_duration(lines)?;

    let mut silences = scan.silences;
    if let Some(start) = scan.unterminated {
        silences.push(Span::new(start, duration.max(start)));
    }

    Ok(SilenceReport {
        silences: merge_overlapping(silences),
        duration,
    })
}

/// Scans for silence events.
///
/// Every `silence_start` opens a pending silence and every `silence_end`
/// closes the most recently opened one. Closed silences come back ordered by
/// start. A start still pending at the end of the scan is the unterminated
/// trailing silence when it begins after every closed silence has ended;
/// pending starts buried under a closed silence are dropped.
pub fn parse_silence_spans<I, S>(lines: I) -> Result<SilenceScan, ReportError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut silences = Vec::new();
    let mut pending: Vec<f64> = Vec::new();

    for (index, line) in lines.into_iter().enumerate() {
        let Some((tag, value)) = tagged_value(line.as_ref()) else {
            continue;
        };
        match tag {
            SILENCE_START_TAG => pending.push(value),
            SILENCE_END_TAG => {
                let Some(start) = pending.pop() else {
                    return Err(ReportError::MalformedReport(format!(
                        "line {}: silence_end at {} before any silence_start",
                        index + 1,
                        value
                    )));
                };
                silences.push(Span::new(start, value));
            }
            _ => {}
        }
    }

    silences.sort_by(|a, b| a.start.total_cmp(&b.start));
    let closed_until = silences
        .iter()
        .map(|silence| silence.end)
        .fold(f64::NEG_INFINITY, f64::max);
    let unterminated = pending.into_iter().find(|&start| start >= closed_until);

    Ok(SilenceScan {
        silences,
        unterminated,
    })
}

// Nested or overlapping silences from unbalanced events collapse into one.
fn merge_overlapping(silences: Vec<Span>) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::with_capacity(silences.len());
    for silence in silences {
        match merged.last_mut() {
            Some(previous) if silence.start <= previous.end => {
                previous.end = previous.end.max(silence.end);
            }
            _ => merged.push(silence),
        }
    }
    merged
}

/// Total input duration, taken from the first parseable `Duration:` line.
pub fn parse_duration<I, S>(lines: I) -> Result<f64, ReportError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .find_map(|line| duration_from_line(line.as_ref()))
        .ok_or(ReportError::MissingDuration)
}

/// Parses `H:M:S(.fraction)` into seconds.
pub fn parse_timestamp(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let hours: u32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || !seconds.is_finite() {
        return None;
    }
    Some(f64::from(hours) * 3600.0 + f64::from(minutes) * 60.0 + seconds)
}

// Silence events carry the tag and value in the fourth and fifth fields.
fn tagged_value(line: &str) -> Option<(&str, f64)> {
    let mut fields = line.split_whitespace().skip(3);
    let tag = fields.next()?;
    let value = fields.next()?.parse().ok()?;
    Some((tag, value))
}

fn duration_from_line(line: &str) -> Option<f64> {
    let mut fields = line.split_whitespace();
    if fields.next()? != DURATION_TAG {
        return None;
    }
    parse_timestamp(fields.next()?.trim_end_matches(','))
}
