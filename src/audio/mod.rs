pub mod scan;
pub mod sox;
pub mod tag;

pub use scan::{event_name_for, has_allowed_extension, list_audio_files};
pub use sox::{optimise_effects, prepare_effects, SoxEngine};
pub use tag::Id3Tagger;

use crate::error::Result;
use crate::metadata::{Segment, TrackTags};
use std::path::{Path, PathBuf};

/// External tool that does the actual signal processing.
pub trait AudioEngine {
    fn name(&self) -> &'static str;

    /// Downmix and normalise `input` into `output`, cutting out `segment`
    /// with fades when one is given.
    fn prepare(&self, input: &Path, output: &Path, segment: Option<&Segment>) -> Result<()>;

    /// Join `inputs` end to end, in order.
    fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> Result<()>;

    /// Apply the filter, compression and EQ chain.
    fn optimise(&self, input: &Path, output: &Path) -> Result<()>;
}

pub trait TagWriter {
    fn write_tags(&self, path: &Path, tags: &TrackTags) -> Result<()>;
}
