use super::segment::{parse_segment, Segment};
use crate::error::Result;
use std::path::{Path, PathBuf};

/// How one raw recording should be titled, attributed and cut.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    filepath: PathBuf,
    pub event_name: String,
    pub title: String,
    pub speakers: Vec<String>,
    /// `mm:ss-mm:ss` strings in playback order. Empty means the whole file.
    pub segments: Vec<String>,
}

/// ID3 fields derived from a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album: String,
}

impl MetadataRecord {
    /// A record that has been discovered but not yet described.
    pub fn new(filepath: impl Into<PathBuf>, event_name: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
            event_name: event_name.into(),
            ..Default::default()
        }
    }

    pub fn filepath(&self) -> &Path {
        &self.filepath
    }

    /// Title and at least one speaker have been filled in.
    pub fn is_complete(&self) -> bool {
        !self.title.is_empty() && !self.speakers.is_empty()
    }

    /// Segments in order, converted to second offsets.
    pub fn parsed_segments(&self) -> Result<Vec<Segment>> {
        let mut parsed = Vec::with_capacity(self.segments.len());
        for text in &self.segments {
            if let Some(segment) = parse_segment(text)? {
                parsed.push(segment);
            }
        }
        Ok(parsed)
    }

    pub fn output_filename(&self) -> String {
        format!("{}.mp3", self.title)
    }

    pub fn artist(&self) -> String {
        self.speakers.join(", ")
    }

    pub fn track_tags(&self) -> TrackTags {
        TrackTags {
            title: self.title.clone(),
            artist: self.artist(),
            album: self.event_name.clone(),
        }
    }
}
