use crate::error::{CapsError, Result};
use crate::metadata::{is_valid_segment, MetadataRecord, MetadataStore, LIST_DELIMITER};
use crate::ui::Theme;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Typed at a multi-value prompt to drop the previous entry.
pub const UNDO: &str = "-";

/// Field-level check run on every answer before it is accepted.
pub type Validator<'a> = &'a dyn Fn(&str) -> std::result::Result<(), String>;

/// Where answers come from and where status lines go.
pub trait Prompter {
    fn title(&mut self, text: &str);
    fn info(&mut self, text: &str);
    fn error(&mut self, text: &str);
    fn show_record(&mut self, record: &MetadataRecord);

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;

    /// Ask for one line. An empty answer yields `default` when there is one.
    fn text(&mut self, prompt: &str, default: Option<&str>, validate: Validator<'_>)
        -> Result<String>;
}

/// Terminal prompts via dialoguer.
pub struct DialoguerPrompter {
    theme: Theme,
    dialog_theme: ColorfulTheme,
    interrupted: Arc<AtomicBool>,
}

impl DialoguerPrompter {
    pub fn new(theme: Theme, interrupted: Arc<AtomicBool>) -> Self {
        Self {
            theme,
            dialog_theme: ColorfulTheme::default(),
            interrupted,
        }
    }

    /// Turn a Ctrl+C that arrived while blocked on input into a cancellation.
    fn check_interrupt<T>(&self, value: T) -> Result<T> {
        if self.interrupted.load(Ordering::Relaxed) {
            return Err(CapsError::Cancelled);
        }
        Ok(value)
    }
}

impl Prompter for DialoguerPrompter {
    fn title(&mut self, text: &str) {
        println!("\n{}", self.theme.title(text));
    }

    fn info(&mut self, text: &str) {
        println!("{}", self.theme.info(text));
    }

    fn error(&mut self, text: &str) {
        println!("{}", self.theme.error(text));
    }

    fn show_record(&mut self, record: &MetadataRecord) {
        println!("\n{}\n", self.theme.record(record));
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        let answer = Confirm::with_theme(&self.dialog_theme)
            .with_prompt(message)
            .default(default)
            .interact()?;
        self.check_interrupt(answer)
    }

    fn text(
        &mut self,
        prompt: &str,
        default: Option<&str>,
        validate: Validator<'_>,
    ) -> Result<String> {
        let mut input = Input::<String>::with_theme(&self.dialog_theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .validate_with(|answer: &String| validate(answer.as_str()));

        if let Some(default) = default.filter(|d| !d.is_empty()) {
            input = input.default(default.to_string()).show_default(true);
        }

        let answer = input.interact_text()?;
        self.check_interrupt(answer)
    }
}

/// Inputs to one collection run.
#[derive(Debug, Clone)]
pub struct CollectSession {
    /// Audio files to describe, in prompt order.
    pub files: Vec<PathBuf>,
    /// CSV to resume from and write to.
    pub output_csv: PathBuf,
    /// Suggested event name.
    pub default_event: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectOutcome {
    /// Every file was visited.
    Completed,
    /// The user chose not to start.
    Declined,
    /// Ctrl+C, end of input, or the terminal went away.
    Interrupted,
}

#[derive(Debug)]
pub struct CollectReport {
    pub outcome: CollectOutcome,
    pub store: MetadataStore,
    /// Set when the store was written to disk on exit.
    pub saved_to: Option<PathBuf>,
}

/// Prompt for metadata for every file in `session`, resuming from
/// `session.output_csv` when it exists.
///
/// The store is written after each file and once more on every exit path,
/// errors included.
pub fn collect_metadata(
    session: &CollectSession,
    prompter: &mut dyn Prompter,
    interrupted: &AtomicBool,
) -> Result<CollectReport> {
    let mut store = if session.output_csv.exists() {
        let store = MetadataStore::open(&session.output_csv)?;
        info!(
            "Resuming from {} ({} records)",
            session.output_csv.display(),
            store.len()
        );
        store
    } else {
        MetadataStore::new()
    };

    let outcome = match prompt_all(session, &mut store, prompter, interrupted) {
        Ok(outcome) => Ok(outcome),
        Err(CapsError::Prompt(e)) => {
            debug!("Prompt ended: {e}");
            Ok(CollectOutcome::Interrupted)
        }
        Err(CapsError::Cancelled) => Ok(CollectOutcome::Interrupted),
        Err(e) => Err(e),
    };

    let flushed = flush(&store, &session.output_csv);

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Err(save_err) = flushed {
                warn!("Could not save {}: {save_err}", session.output_csv.display());
            }
            return Err(e);
        }
    };

    if outcome == CollectOutcome::Interrupted {
        prompter.error("\nAborted");
    }

    Ok(CollectReport {
        outcome,
        store,
        saved_to: flushed?,
    })
}

fn prompt_all(
    session: &CollectSession,
    store: &mut MetadataStore,
    prompter: &mut dyn Prompter,
    interrupted: &AtomicBool,
) -> Result<CollectOutcome> {
    let message = format!("Found {} audio files. Continue?", session.files.len());
    if !prompter.confirm(&message, true)? {
        return Ok(CollectOutcome::Declined);
    }

    let event_name = prompter.text(
        "Event name",
        Some(session.default_event.as_str()),
        &required("an event name"),
    )?;

    for file in &session.files {
        if interrupted.load(Ordering::Relaxed) {
            return Ok(CollectOutcome::Interrupted);
        }

        prompter.title(&format!("Opening {}", file.display()));

        if let Some(existing) = store.find_by_filepath(file) {
            prompter.show_record(existing);
        }

        if prompter.confirm("Skip this file?", false)? {
            debug!("Skipped {}", file.display());
            continue;
        }

        describe(file, &event_name, store, prompter)?;
        store.save(&session.output_csv)?;
    }

    Ok(CollectOutcome::Completed)
}

/// Fill in one record in place.
fn describe(
    file: &Path,
    event_name: &str,
    store: &mut MetadataStore,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    let record = store.find_or_add(file, || MetadataRecord::new(file, event_name));

    record.title = prompter.text("Title", Some(record.title.as_str()), &required("a title"))?;

    let speakers = record.speakers.clone();
    record.speakers = prompt_list(prompter, "Speaker", &speakers, 1, &list_value)?;

    let segments = record.segments.clone();
    prompter.info("Segments as mm:ss-mm:ss, none for the whole file");
    record.segments = prompt_list(prompter, "Segment", &segments, 0, &segment_value)?;

    Ok(())
}

/// Ask for a list of values, one per line.
///
/// Earlier answers are offered as defaults in order. A blank line finishes
/// once `min` values are in; [`UNDO`] removes the last value and stops
/// offering defaults, so a stored list can be shortened.
pub fn prompt_list(
    prompter: &mut dyn Prompter,
    label: &str,
    defaults: &[String],
    min: usize,
    validate: Validator<'_>,
) -> Result<Vec<String>> {
    prompter.info(&format!("Empty line to continue, '{UNDO}' to undo"));

    let accept = |answer: &str| {
        if answer.is_empty() || answer == UNDO {
            Ok(())
        } else {
            validate(answer)
        }
    };

    let mut values: Vec<String> = Vec::new();
    let mut offer_defaults = true;
    loop {
        let default = if offer_defaults {
            defaults.get(values.len()).map(String::as_str)
        } else {
            None
        };
        let prompt = format!("{} {}", label, values.len() + 1);
        let answer = prompter.text(&prompt, default, &accept)?;

        if answer.is_empty() {
            if values.len() >= min {
                break;
            }
            prompter.error(&format!("You must input at least one {}", label.to_lowercase()));
        } else if answer == UNDO {
            offer_defaults = false;
            if values.pop().is_some() {
                prompter.info(&format!("{}: {}", label, values.join(", ")));
            }
        } else {
            values.push(answer);
        }
    }

    Ok(values)
}

fn required(what: &'static str) -> impl Fn(&str) -> std::result::Result<(), String> {
    move |answer: &str| {
        if answer.trim().is_empty() {
            Err(format!("You must enter {what}"))
        } else {
            Ok(())
        }
    }
}

fn list_value(answer: &str) -> std::result::Result<(), String> {
    if answer.contains(LIST_DELIMITER) {
        return Err(format!("Values cannot contain '{LIST_DELIMITER}'"));
    }
    Ok(())
}

fn segment_value(answer: &str) -> std::result::Result<(), String> {
    list_value(answer)?;
    if !is_valid_segment(answer) {
        return Err(
            "You must input the correct format (mm:ss-mm:ss) and start cut must precede end cut"
                .to_string(),
        );
    }
    Ok(())
}

/// Write the store if it holds anything.
fn flush(store: &MetadataStore, path: &Path) -> Result<Option<PathBuf>> {
    if store.is_empty() {
        return Ok(None);
    }
    store.save(path)?;
    info!("Saved {} records to {}", store.len(), path.display());
    Ok(Some(path.to_path_buf()))
}

/// Default CSV name for a collection run: `<event>.csv` in the working directory.
pub fn default_output_csv(event_name: &str) -> PathBuf {
    PathBuf::from(format!("{event_name}.csv"))
}
