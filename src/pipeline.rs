use crate::audio::{AudioEngine, TagWriter};
use crate::error::{CapsError, Result};
use crate::metadata::{MetadataRecord, MetadataStore, Segment};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Extension used for intermediate files handed between engine stages.
const SCRATCH_EXTENSION: &str = "wav";

/// Configuration for the batch processing run.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Directory finished talks are written to. Created if missing.
    pub output_dir: PathBuf,
    /// Parent for per-record scratch directories (system temp dir if unset).
    pub scratch_root: Option<PathBuf>,
    /// Show a progress bar.
    pub show_progress: bool,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("processed"),
            scratch_root: None,
            show_progress: true,
        }
    }
}

/// Statistics from a processing run.
#[derive(Debug, Clone)]
pub struct ProcessStats {
    pub total_time: Duration,
    pub processed: usize,
    pub engine: String,
}

#[derive(Debug)]
pub struct ProcessResult {
    /// Tagged output files, in store order.
    pub outputs: Vec<PathBuf>,
    pub stats: ProcessStats,
}

/// Scratch directory for one record, removed when dropped.
struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("caps-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        debug!("Using scratch directory: {:?}", dir.path());
        Ok(Self { dir })
    }

    fn file(&self, stem: &str) -> PathBuf {
        self.dir
            .path()
            .join(format!("{stem}.{SCRATCH_EXTENSION}"))
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        debug!("Cleaning up scratch directory: {:?}", self.dir.path());
    }
}

/// Process every record in `store`.
///
/// Records are handled one at a time. The first failure, an incomplete
/// record included, aborts the batch; outputs already written are left in
/// place.
pub fn process_store(
    store: &MetadataStore,
    engine: &dyn AudioEngine,
    tagger: &dyn TagWriter,
    config: &ProcessConfig,
) -> Result<ProcessResult> {
    let cancelled = Arc::new(AtomicBool::new(false));
    process_store_with_cancel(store, engine, tagger, config, cancelled)
}

/// Process with cancellation support, checked between records.
pub fn process_store_with_cancel(
    store: &MetadataStore,
    engine: &dyn AudioEngine,
    tagger: &dyn TagWriter,
    config: &ProcessConfig,
    cancelled: Arc<AtomicBool>,
) -> Result<ProcessResult> {
    let start_time = Instant::now();

    fs::create_dir_all(&config.output_dir)?;

    let progress = if config.show_progress {
        let pb = ProgressBar::new(store.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{msg} {percent:>3}%|{wide_bar}| {pos}/{len} ETA {eta}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut outputs = Vec::new();

    for record in store {
        if cancelled.load(Ordering::Relaxed) {
            progress.abandon_with_message("Aborted");
            return Err(CapsError::Cancelled);
        }

        progress.set_message(record.title.clone());

        let output = config.output_dir.join(record.output_filename());
        if let Err(e) = process_record(record, &output, engine, tagger, config.scratch_root.as_deref())
        {
            warn!("Failed on {}: {e}", record.filepath().display());
            progress.abandon_with_message(format!("Failed: {}", record.filepath().display()));
            return Err(e);
        }

        outputs.push(output);
        progress.inc(1);
    }

    progress.finish_with_message("Done");

    let stats = ProcessStats {
        total_time: start_time.elapsed(),
        processed: outputs.len(),
        engine: engine.name().to_string(),
    };

    info!(
        "Processed {} records in {:.2}s",
        stats.processed,
        stats.total_time.as_secs_f64()
    );

    Ok(ProcessResult { outputs, stats })
}

/// Cut, filter and tag one recording into `output`.
pub fn process_record(
    record: &MetadataRecord,
    output: &Path,
    engine: &dyn AudioEngine,
    tagger: &dyn TagWriter,
    scratch_root: Option<&Path>,
) -> Result<()> {
    let input = record.filepath();
    if !input.exists() {
        return Err(CapsError::FileNotFound(input.display().to_string()));
    }

    if !record.is_complete() {
        return Err(CapsError::IncompleteRecord(input.display().to_string()));
    }

    let segments = record.parsed_segments()?;
    info!(
        "Processing {} ({} segments) -> {}",
        input.display(),
        segments.len(),
        output.display()
    );

    let scratch = ScratchDir::create(scratch_root)?;
    let cut_path = cut(input, &segments, engine, &scratch)?;
    engine.optimise(&cut_path, output)?;
    drop(scratch);

    tagger.write_tags(output, &record.track_tags())?;
    Ok(())
}

/// Produce a single prepared file containing `segments` in order, or the
/// whole input when there are none.
fn cut(
    input: &Path,
    segments: &[Segment],
    engine: &dyn AudioEngine,
    scratch: &ScratchDir,
) -> Result<PathBuf> {
    let joined = scratch.file("cut");

    match segments {
        [] => engine.prepare(input, &joined, None)?,
        [segment] => engine.prepare(input, &joined, Some(segment))?,
        _ => {
            let mut parts = Vec::with_capacity(segments.len());
            for (index, segment) in segments.iter().enumerate() {
                let part = scratch.file(&format!("segment_{:03}", index));
                debug!("Cutting segment {}: {}", index, segment);
                engine.prepare(input, &part, Some(segment))?;
                parts.push(part);
            }
            engine.concatenate(&parts, &joined)?;
        }
    }

    Ok(joined)
}

/// Print a summary of the processing results.
pub fn print_summary(result: &ProcessResult) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                       Processing Complete                      ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Processed:  {}", result.stats.processed);
    println!("  Engine:     {}", result.stats.engine);
    println!(
        "  Total:      {:.2}s",
        result.stats.total_time.as_secs_f64()
    );
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::TrackTags;
    use std::cell::RefCell;

    /// Engine that writes text markers instead of audio.
    #[derive(Default)]
    struct FakeEngine {
        calls: RefCell<Vec<String>>,
        fail_optimise: bool,
    }

    impl AudioEngine for FakeEngine {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn prepare(&self, _input: &Path, output: &Path, segment: Option<&Segment>) -> Result<()> {
            let label = segment.map(|s| s.to_string()).unwrap_or_else(|| "all".into());
            self.calls.borrow_mut().push(format!("prepare {label}"));
            fs::write(output, format!("[{label}]"))?;
            Ok(())
        }

        fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
            self.calls
                .borrow_mut()
                .push(format!("concatenate {}", inputs.len()));
            let mut joined = String::new();
            for input in inputs {
                joined.push_str(&fs::read_to_string(input)?);
            }
            fs::write(output, joined)?;
            Ok(())
        }

        fn optimise(&self, input: &Path, output: &Path) -> Result<()> {
            self.calls.borrow_mut().push("optimise".to_string());
            if self.fail_optimise {
                return Err(CapsError::AudioProcessing("engine exploded".to_string()));
            }
            fs::copy(input, output)?;
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeTagger {
        tagged: RefCell<Vec<(PathBuf, TrackTags)>>,
    }

    impl TagWriter for FakeTagger {
        fn write_tags(&self, path: &Path, tags: &TrackTags) -> Result<()> {
            self.tagged
                .borrow_mut()
                .push((path.to_path_buf(), tags.clone()));
            Ok(())
        }
    }

    struct Fixture {
        dir: TempDir,
        config: ProcessConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let scratch = dir.path().join("scratch");
            fs::create_dir_all(&scratch).unwrap();
            let config = ProcessConfig {
                output_dir: dir.path().join("processed"),
                scratch_root: Some(scratch),
                show_progress: false,
            };
            Self { dir, config }
        }

        fn source(&self, name: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, b"raw").unwrap();
            path
        }

        fn record(&self, name: &str, title: &str, segments: &[&str]) -> MetadataRecord {
            let mut record = MetadataRecord::new(self.source(name), "Conf");
            record.title = title.to_string();
            record.speakers = vec!["Ada".to_string(), "Grace".to_string()];
            record.segments = segments.iter().map(|s| s.to_string()).collect();
            record
        }

        fn scratch_is_empty(&self) -> bool {
            let scratch = self.config.scratch_root.as_ref().unwrap();
            fs::read_dir(scratch).unwrap().next().is_none()
        }
    }

    #[test]
    fn test_process_config_default() {
        let config = ProcessConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("processed"));
        assert!(config.scratch_root.is_none());
        assert!(config.show_progress);
    }

    #[test]
    fn test_multi_segment_record() {
        let fx = Fixture::new();
        let mut store = MetadataStore::new();
        store.add_item(fx.record("a.mp3", "Keynote", &["00:00-00:05", "00:10-00:15"]));

        let engine = FakeEngine::default();
        let tagger = FakeTagger::default();
        let result = process_store(&store, &engine, &tagger, &fx.config).unwrap();

        assert_eq!(
            *engine.calls.borrow(),
            vec![
                "prepare 00:00-00:05",
                "prepare 00:10-00:15",
                "concatenate 2",
                "optimise"
            ]
        );

        let output = fx.config.output_dir.join("Keynote.mp3");
        assert_eq!(result.outputs, vec![output.clone()]);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "[00:00-00:05][00:10-00:15]"
        );

        let tagged = tagger.tagged.borrow();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].0, output);
        assert_eq!(tagged[0].1.artist, "Ada, Grace");
        assert_eq!(tagged[0].1.album, "Conf");
        assert!(fx.scratch_is_empty());
    }

    #[test]
    fn test_single_segment_skips_concatenation() {
        let fx = Fixture::new();
        let mut store = MetadataStore::new();
        store.add_item(fx.record("a.mp3", "Talk", &["01:00-02:00"]));

        let engine = FakeEngine::default();
        process_store(&store, &engine, &FakeTagger::default(), &fx.config).unwrap();

        assert_eq!(
            *engine.calls.borrow(),
            vec!["prepare 01:00-02:00", "optimise"]
        );
    }

    #[test]
    fn test_unsegmented_record_uses_whole_file() {
        let fx = Fixture::new();
        let mut store = MetadataStore::new();
        store.add_item(fx.record("a.mp3", "Talk", &[]));

        let engine = FakeEngine::default();
        process_store(&store, &engine, &FakeTagger::default(), &fx.config).unwrap();

        assert_eq!(*engine.calls.borrow(), vec!["prepare all", "optimise"]);
        assert!(fx.config.output_dir.join("Talk.mp3").exists());
    }

    #[test]
    fn test_incomplete_record_aborts_batch() {
        let fx = Fixture::new();
        let mut store = MetadataStore::new();
        store.add_item(MetadataRecord::new(fx.source("draft.mp3"), "Conf"));
        store.add_item(fx.record("b.mp3", "Talk", &[]));

        let engine = FakeEngine::default();
        let tagger = FakeTagger::default();
        let result = process_store(&store, &engine, &tagger, &fx.config);

        assert!(matches!(result, Err(CapsError::IncompleteRecord(_))));
        assert!(engine.calls.borrow().is_empty());
        assert!(tagger.tagged.borrow().is_empty());
        assert!(!fx.config.output_dir.join("Talk.mp3").exists());
    }

    #[test]
    fn test_invalid_segment_aborts_batch() {
        let fx = Fixture::new();
        let mut store = MetadataStore::new();
        store.add_item(fx.record("a.mp3", "Broken", &["02:00-01:00"]));
        store.add_item(fx.record("b.mp3", "Fine", &[]));

        let engine = FakeEngine::default();
        let result = process_store(&store, &engine, &FakeTagger::default(), &fx.config);

        assert!(matches!(result, Err(CapsError::InvalidSegment(_))));
        assert!(engine.calls.borrow().is_empty());
        assert!(!fx.config.output_dir.join("Fine.mp3").exists());
    }

    #[test]
    fn test_engine_failure_cleans_scratch() {
        let fx = Fixture::new();
        let mut store = MetadataStore::new();
        store.add_item(fx.record("a.mp3", "Talk", &["00:00-00:05", "00:10-00:15"]));

        let engine = FakeEngine {
            fail_optimise: true,
            ..Default::default()
        };
        let tagger = FakeTagger::default();
        let result = process_store(&store, &engine, &tagger, &fx.config);

        assert!(matches!(result, Err(CapsError::AudioProcessing(_))));
        assert!(tagger.tagged.borrow().is_empty());
        assert!(fx.scratch_is_empty());
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let fx = Fixture::new();
        let mut record = MetadataRecord::new(fx.dir.path().join("gone.mp3"), "Conf");
        record.title = "Gone".to_string();
        record.speakers = vec!["Ada".to_string()];
        let mut store = MetadataStore::new();
        store.add_item(record);

        let result = process_store(
            &store,
            &FakeEngine::default(),
            &FakeTagger::default(),
            &fx.config,
        );
        assert!(matches!(result, Err(CapsError::FileNotFound(_))));
    }

    #[test]
    fn test_cancelled_before_first_record() {
        let fx = Fixture::new();
        let mut store = MetadataStore::new();
        store.add_item(fx.record("a.mp3", "Talk", &[]));

        let engine = FakeEngine::default();
        let cancelled = Arc::new(AtomicBool::new(true));
        let result = process_store_with_cancel(
            &store,
            &engine,
            &FakeTagger::default(),
            &fx.config,
            cancelled,
        );

        assert!(matches!(result, Err(CapsError::Cancelled)));
        assert!(engine.calls.borrow().is_empty());
    }

    #[test]
    fn test_process_record_rejects_incomplete() {
        let fx = Fixture::new();
        let record = MetadataRecord::new(fx.source("a.mp3"), "Conf");
        let result = process_record(
            &record,
            &fx.dir.path().join("out.mp3"),
            &FakeEngine::default(),
            &FakeTagger::default(),
            None,
        );
        assert!(matches!(result, Err(CapsError::IncompleteRecord(_))));
    }
}
