//! Terminal presentation. Nothing in the library core depends on this.

use crate::metadata::MetadataRecord;
use console::Style;

/// Styles for the different kinds of terminal output.
#[derive(Debug, Clone)]
pub struct Theme {
    pub title: Style,
    pub info: Style,
    pub error: Style,
    pub label: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            title: Style::new().bold().green(),
            info: Style::new().blue(),
            error: Style::new().red(),
            label: Style::new().bold(),
        }
    }
}

impl Theme {
    /// No styling at all.
    pub fn plain() -> Self {
        Self {
            title: Style::new(),
            info: Style::new(),
            error: Style::new(),
            label: Style::new(),
        }
    }

    pub fn title(&self, text: &str) -> String {
        self.title.apply_to(text).to_string()
    }

    pub fn info(&self, text: &str) -> String {
        self.info.apply_to(text).to_string()
    }

    pub fn error(&self, text: &str) -> String {
        self.error.apply_to(text).to_string()
    }

    /// A record as a block of labelled lines.
    pub fn record(&self, record: &MetadataRecord) -> String {
        let rows = [
            ("Filepath:", record.filepath().display().to_string()),
            ("Event:", record.event_name.clone()),
            ("Title:", record.title.clone()),
            ("Speakers:", record.speakers.join(", ")),
            ("Segments:", record.segments.join(", ")),
        ];

        rows.iter()
            .map(|(label, value)| {
                format!("{} {}", self.label.apply_to(format!("{label:<10}")), value)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
