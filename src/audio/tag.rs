use std::path::Path;

use id3::{ErrorKind, Tag, TagLike, Version};
use tracing::debug;

use crate::error::{CapsError, Result};
use crate::metadata::TrackTags;

use super::TagWriter;

/// Writes title, artist and album frames with the `id3` crate.
#[derive(Debug, Clone, Copy)]
pub struct Id3Tagger {
    version: Version,
}

impl Default for Id3Tagger {
    fn default() -> Self {
        Self {
            version: Version::Id3v24,
        }
    }
}

impl Id3Tagger {
    pub fn with_version(version: Version) -> Self {
        Self { version }
    }
}

impl TagWriter for Id3Tagger {
    fn write_tags(&self, path: &Path, tags: &TrackTags) -> Result<()> {
        if !path.exists() {
            return Err(CapsError::FileNotFound(path.display().to_string()));
        }

        let mut tag = match Tag::read_from_path(path) {
            Ok(tag) => tag,
            Err(err) if matches!(err.kind, ErrorKind::NoTag) => {
                debug!("No ID3 header in {}, creating one", path.display());
                Tag::new()
            }
            Err(err) => return Err(err.into()),
        };

        tag.set_title(tags.title.as_str());
        tag.set_artist(tags.artist.as_str());
        tag.set_album(tags.album.as_str());
        tag.write_to_path(path, self.version)?;

        debug!("Tagged {} as '{}'", path.display(), tags.title);
        Ok(())
    }
}
