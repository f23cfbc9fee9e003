use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{CapsError, Result};

/// Find every file under `path` whose extension is in `extensions`.
///
/// `path` may be a single file. Extensions compare case-insensitively and a
/// leading dot in the allow-list is ignored. Results are sorted.
pub fn list_audio_files(path: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        return Err(CapsError::FileNotFound(path.display().to_string()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_file() && has_allowed_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    debug!("Found {} audio files under {}", files.len(), path.display());
    Ok(files)
}

pub fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };

    extensions
        .iter()
        .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// Name of the directory a scan was started from, used as the default event.
pub fn event_name_for(path: &Path) -> String {
    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let dir = if resolved.is_file() {
        resolved.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        resolved
    };

    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn mp3_only() -> Vec<String> {
        vec!["mp3".to_string()]
    }

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_has_allowed_extension() {
        let allowed = vec!["mp3".to_string(), ".wav".to_string()];
        assert!(has_allowed_extension(Path::new("a.mp3"), &allowed));
        assert!(has_allowed_extension(Path::new("a.MP3"), &allowed));
        assert!(has_allowed_extension(Path::new("b.Wav"), &allowed));
        assert!(!has_allowed_extension(Path::new("c.flac"), &allowed));
        assert!(!has_allowed_extension(Path::new("mp3"), &allowed));
    }

    #[test]
    fn test_list_audio_files_recurses_and_sorts() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("b.mp3"));
        touch(&dir.path().join("a.MP3"));
        touch(&dir.path().join("notes.txt"));
        touch(&dir.path().join("day2/c.mp3"));

        let files = list_audio_files(dir.path(), &mp3_only()).unwrap();
        assert_eq!(
            files,
            vec![
                dir.path().join("a.MP3"),
                dir.path().join("b.mp3"),
                dir.path().join("day2/c.mp3"),
            ]
        );
    }

    #[test]
    fn test_list_audio_files_single_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("talk.mp3");
        touch(&file);

        let files = list_audio_files(&file, &mp3_only()).unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn test_list_audio_files_empty_dir() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("readme.md"));
        assert!(list_audio_files(dir.path(), &mp3_only()).unwrap().is_empty());
    }

    #[test]
    fn test_list_audio_files_missing_path() {
        let result = list_audio_files(Path::new("/nonexistent/caps/raw"), &mp3_only());
        assert!(matches!(result, Err(CapsError::FileNotFound(_))));
    }

    #[test]
    fn test_event_name_for() {
        let dir = TempDir::new().unwrap();
        let event_dir = dir.path().join("Conf 2019");
        touch(&event_dir.join("talk.mp3"));

        assert_eq!(event_name_for(&event_dir), "Conf 2019");
        assert_eq!(event_name_for(&event_dir.join("talk.mp3")), "Conf 2019");
    }
}
