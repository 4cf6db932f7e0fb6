//! Keep-timeline computation.
//!
//! Turns the silences reported by ffmpeg into the ordered list of segments
//! that survive the cut. Every step is a pure function over slices:
//!
//! 1. [`segments_to_remove`] applies the intro, interior and outro rules
//! 2. [`invert_segments`] takes the complement of the removal set
//! 3. [`drop_short_segments`] filters keep segments below `min_keep`
//! 4. [`shrink_short_clips`] tightens the padding around short clips
//!
//! Silence spans are expected sorted and non-overlapping, which is what
//! ffmpeg's `silencedetect` filter produces. That is a precondition, not
//! something this module re-validates.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::report::SilenceReport;

/// A closed interval in seconds, used for detected silences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Span {
    pub start: f64,
    pub end: f64,
}

impl Span {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Upper bound of a [`Segment`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SegmentEnd {
    At(f64),
    /// Runs until the end of the media, whatever its exact length.
    EndOfMedia,
}

/// A removal or keep interval. Only the last segment of a timeline can be open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub start: f64,
    pub end: SegmentEnd,
}

impl Segment {
    pub fn closed(start: f64, end: f64) -> Self {
        Self {
            start,
            end: SegmentEnd::At(end),
        }
    }

    pub fn open(start: f64) -> Self {
        Self {
            start,
            end: SegmentEnd::EndOfMedia,
        }
    }

    pub fn end_seconds(&self) -> Option<f64> {
        match self.end {
            SegmentEnd::At(end) => Some(end),
            SegmentEnd::EndOfMedia => None,
        }
    }

    /// Length in seconds, measuring open segments up to `duration`.
    pub fn length(&self, duration: f64) -> f64 {
        self.end_seconds().unwrap_or(duration) - self.start
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            SegmentEnd::At(end) => write!(f, "{}-{}", self.start, end),
            SegmentEnd::EndOfMedia => write!(f, "{}-", self.start),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("{name} must be a finite number of seconds, got {value}")]
    NotFinite { name: &'static str, value: f64 },

    #[error("max pause must be greater than zero, got {0}")]
    NonPositiveMaxPause(f64),

    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },
}

/// How much silence survives around each cut.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PausePolicy {
    /// Longest pause left untouched. Longer pauses are cut down to this.
    pub max_pause: f64,
    /// Silence kept before the first sound. Zero leaves the intro alone.
    pub intro_padding: f64,
    /// Silence kept after the last sound. Zero leaves the outro alone.
    pub outro_padding: f64,
    /// Keep segments shorter than this are dropped. Zero disables the filter.
    pub min_keep: f64,
    pub shrink_short_clips: bool,
}

impl PausePolicy {
    pub fn new(max_pause: f64) -> Self {
        Self {
            max_pause,
            intro_padding: 0.0,
            outro_padding: 0.0,
            min_keep: 0.0,
            shrink_short_clips: false,
        }
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        let fields = [
            ("max pause", self.max_pause),
            ("intro padding", self.intro_padding),
            ("outro padding", self.outro_padding),
            ("min keep", self.min_keep),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(PolicyError::NotFinite { name, value });
            }
        }
        if self.max_pause <= 0.0 {
            return Err(PolicyError::NonPositiveMaxPause(self.max_pause));
        }
        for &(name, value) in &fields[1..] {
            if value < 0.0 {
                return Err(PolicyError::Negative { name, value });
            }
        }
        Ok(())
    }
}

/// Computes the final keep timeline for a parsed report.
///
/// The min-keep filter runs before the padding shrink, so the shrink only
/// ever sees segments that already passed the filter.
pub fn compute_keep_timeline(report: &SilenceReport, policy: &PausePolicy) -> Vec<Segment> {
    let removals = segments_to_remove(&report.silences, report.duration, policy);
    let keep = invert_segments(&removals);
    let keep = drop_short_segments(&keep, report.duration, policy.min_keep);
    if policy.shrink_short_clips {
        shrink_short_clips(&keep, policy.max_pause)
    } else {
        keep
    }
}

/// Applies the intro, interior-pause and outro rules to the detected silences.
///
/// The first silence is never cut by the interior rule: it is only shaved
/// by the intro rule, and only when it starts at or before 0. The trailing
/// silence (last, reaching `duration`) is only shaved by the outro rule.
/// Every other silence longer than `max_pause` loses its middle, keeping
/// `max_pause / 2` on each side of the cut.
pub fn segments_to_remove(silences: &[Span], duration: f64, policy: &PausePolicy) -> Vec<Segment> {
    let mut removals = Vec::new();
    let Some(last_index) = silences.len().checked_sub(1) else {
        return removals;
    };
    let half_pause = policy.max_pause / 2.0;

    for (index, silence) in silences.iter().enumerate() {
        let trailing = index == last_index && silence.end >= duration;

        if index == 0 {
            let intro_end = silence.end - policy.intro_padding;
            // ffmpeg may report a leading silence starting slightly below 0.
            if silence.start <= 0.0
                && policy.intro_padding > 0.0
                && silence.length() > policy.intro_padding
                && intro_end > 0.0
            {
                removals.push(Segment::closed(0.0, intro_end));
            }
            if !trailing {
                continue;
            }
        }

        if trailing {
            if policy.outro_padding > 0.0 && silence.length() > policy.outro_padding {
                push_merged(&mut removals, Segment::open(silence.start + policy.outro_padding));
            }
            continue;
        }

        if silence.length() > policy.max_pause {
            removals.push(Segment::closed(
                silence.start + half_pause,
                silence.end - half_pause,
            ));
        }
    }

    removals
}

// A silence covering the whole file gets both an intro and an outro removal,
// which can overlap.
fn push_merged(removals: &mut Vec<Segment>, next: Segment) {
    if let Some(previous) = removals.last_mut() {
        if let Some(previous_end) = previous.end_seconds() {
            if next.start <= previous_end {
                previous.end = match next.end {
                    SegmentEnd::At(end) => SegmentEnd::At(end.max(previous_end)),
                    SegmentEnd::EndOfMedia => SegmentEnd::EndOfMedia,
                };
                return;
            }
        }
    }
    removals.push(next);
}

/// Complement of an ordered removal set over `[0, end of media)`.
///
/// Zero-length keep segments (a removal starting at 0, or two removals
/// touching) are skipped. Nothing follows an open removal.
pub fn invert_segments(removals: &[Segment]) -> Vec<Segment> {
    let mut keep = Vec::with_capacity(removals.len() + 1);
    let mut cursor = Some(0.0);

    for removal in removals {
        let Some(start) = cursor else {
            break;
        };
        if removal.start > start {
            keep.push(Segment::closed(start, removal.start));
        }
        cursor = removal.end_seconds();
    }

    if let Some(start) = cursor {
        keep.push(Segment::open(start));
    }
    keep
}

pub fn drop_short_segments(keep: &[Segment], duration: f64, min_keep: f64) -> Vec<Segment> {
    if min_keep <= 0.0 {
        return keep.to_vec();
    }
    keep.iter()
        .filter(|segment| segment.length(duration) >= min_keep)
        .copied()
        .collect()
}

/// Tightens the padding around short interior clips.
///
/// An interior keep segment normally carries `max_pause / 2` of silence on
/// each side of its content. When the content is shorter than that padding,
/// both paddings shrink to the content length. The first and last segments
/// border the edges of the file and are returned unchanged, as are segments
/// too short to hold full padding on both sides.
pub fn shrink_short_clips(keep: &[Segment], max_pause: f64) -> Vec<Segment> {
    let padding = max_pause / 2.0;
    let last_index = keep.len().saturating_sub(1);

    keep.iter()
        .enumerate()
        .map(|(index, segment)| {
            if index == 0 || index == last_index {
                return *segment;
            }
            let Some(end) = segment.end_seconds() else {
                return *segment;
            };
            let length = end - segment.start;
            if length >= 2.0 * padding + 1.0 {
                return *segment;
            }
            let content = length - 2.0 * padding;
            if content <= 0.0 || content >= padding {
                return *segment;
            }
            let shift = padding - content;
            Segment::closed(segment.start + shift, end - shift)
        })
        .collect()
}

/// Total seconds covered by `segments`, open segments measured up to `duration`.
pub fn total_length(segments: &[Segment], duration: f64) -> f64 {
    segments
        .iter()
        .map(|segment| segment.length(duration).max(0.0))
        .sum()
}

pub fn format_segments(segments: &[Segment]) -> String {
    let parts: Vec<String> = segments.iter().map(|segment| segment.to_string()).collect();
    format!("[{}]", parts.join(" "))
}
