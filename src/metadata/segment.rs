// Segment strings: "mm:ss-mm:ss"
use crate::error::{CapsError, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

/// A start/end range, in whole seconds, cut out of a source recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    start: u32,
    end: u32,
}

impl Segment {
    pub fn new(start: u32, end: u32) -> Result<Self> {
        if start >= end {
            return Err(CapsError::InvalidSegment(format!(
                "start ({start}s) must precede end ({end}s)"
            )));
        }
        Ok(Self { start, end })
    }

    /// Start, in seconds from the beginning of the recording.
    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn start_offset(&self) -> Duration {
        Duration::from_secs(u64::from(self.start))
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.end - self.start))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start / 60,
            self.start % 60,
            self.end / 60,
            self.end % 60
        )
    }
}

fn segment_regex() -> &'static Regex {
    static SEGMENT_RE: OnceLock<Regex> = OnceLock::new();
    SEGMENT_RE.get_or_init(|| {
        Regex::new(r"^([0-9]{2}):([0-5][0-9])-([0-9]{2}):([0-5][0-9])$").expect("Invalid regex")
    })
}

fn timestamp_regex() -> &'static Regex {
    static TIMESTAMP_RE: OnceLock<Regex> = OnceLock::new();
    TIMESTAMP_RE.get_or_init(|| Regex::new(r"^([0-9]{2}):([0-5][0-9])$").expect("Invalid regex"))
}

/// Combine captured minute and second digits.
fn seconds_from(minutes: &str, seconds: &str, text: &str) -> Result<u32> {
    let bad = || CapsError::InvalidSegment(format!("'{text}' is not mm:ss"));
    let minutes: u32 = minutes.parse().map_err(|_| bad())?;
    let seconds: u32 = seconds.parse().map_err(|_| bad())?;
    minutes
        .checked_mul(60)
        .and_then(|m| m.checked_add(seconds))
        .ok_or_else(bad)
}

/// Convert an "mm:ss" timestamp into seconds.
///
/// Both fields are exactly two digits and seconds stay below 60.
pub fn timestamp_to_seconds(text: &str) -> Result<u32> {
    let caps = timestamp_regex()
        .captures(text)
        .ok_or_else(|| CapsError::InvalidSegment(format!("'{text}' is not mm:ss")))?;

    seconds_from(&caps[1], &caps[2], text)
}

/// Parse a segment string.
///
/// An empty string means "no segmentation" and yields `Ok(None)`; anything
/// else must be `mm:ss-mm:ss` with seconds in `00..=59` and start < end.
pub fn parse_segment(text: &str) -> Result<Option<Segment>> {
    if text.is_empty() {
        return Ok(None);
    }

    let caps = segment_regex().captures(text).ok_or_else(|| {
        CapsError::InvalidSegment(format!("'{text}' does not match mm:ss-mm:ss"))
    })?;

    let start = seconds_from(&caps[1], &caps[2], text)?;
    let end = seconds_from(&caps[3], &caps[4], text)?;

    Segment::new(start, end)
        .map(Some)
        .map_err(|_| CapsError::InvalidSegment(format!("'{text}' ends before it starts")))
}

/// Prompt-level gate: empty input is accepted and left to the caller.
pub fn is_valid_segment(text: &str) -> bool {
    parse_segment(text).is_ok()
}
