use super::record::MetadataRecord;
use crate::error::{CapsError, Result};
use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Column names, in the order they are written.
pub const COLUMNS: [&str; 5] = ["filepath", "event_name", "title", "speakers", "segments"];

/// Separates speakers and segments inside a single CSV field. Values must not
/// contain it; there is no escaping.
pub const LIST_DELIMITER: char = ';';

/// Ordered collection of records for one batch, keyed by file path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataStore {
    records: Vec<MetadataRecord>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a store from a CSV file on disk.
    pub fn open(path: &Path) -> Result<Self> {
        let mut store = Self::new();
        store.load(path)?;
        Ok(store)
    }

    /// Append every row of the CSV at `path`.
    ///
    /// Nothing is appended unless the whole file parses.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(CapsError::FileNotFound(path.display().to_string()));
        }
        let file = std::fs::File::open(path)?;
        let loaded = Self::read_from(file)?;
        debug!("Loaded {} records from {}", loaded.len(), path.display());

        if let Some(dup) = loaded
            .iter()
            .find(|r| self.find_by_filepath(r.filepath()).is_some())
        {
            return Err(CapsError::MalformedCsv(format!(
                "duplicate filepath {}",
                dup.filepath().display()
            )));
        }

        self.records.extend(loaded.records);
        Ok(())
    }

    /// Parse a store from CSV text.
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers = reader.headers().map_err(malformed)?;
        if !headers.iter().eq(COLUMNS.iter().copied()) {
            return Err(CapsError::MalformedCsv(format!(
                "expected columns {}, found {}",
                COLUMNS.join(","),
                headers.iter().collect::<Vec<_>>().join(",")
            )));
        }

        let mut store = Self::new();
        for row in reader.records() {
            let row = row.map_err(malformed)?;
            store.push_unique(record_from_row(&row)?)?;
        }

        Ok(store)
    }

    /// Write the store to `path`, replacing any existing file atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut staged = NamedTempFile::new_in(dir)?;
        self.write_to(&mut staged)?;
        staged.as_file().sync_all()?;
        staged.persist(path)?;

        debug!("Saved {} records to {}", self.len(), path.display());
        Ok(())
    }

    /// Serialize as CSV: header row then one row per record, every field quoted.
    ///
    /// A file path that is not valid UTF-8 cannot be stored as a key and fails
    /// the whole write before anything is emitted.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let filepaths = self
            .records
            .iter()
            .map(|record| {
                record.filepath().to_str().ok_or_else(|| {
                    CapsError::MalformedCsv(format!(
                        "file path is not valid UTF-8: {}",
                        record.filepath().display()
                    ))
                })
            })
            .collect::<Result<Vec<&str>>>()?;

        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .from_writer(writer);

        let delimiter = LIST_DELIMITER.to_string();
        writer.write_record(COLUMNS)?;
        for (record, filepath) in self.records.iter().zip(filepaths) {
            writer.write_record([
                filepath,
                record.event_name.as_str(),
                record.title.as_str(),
                record.speakers.join(delimiter.as_str()).as_str(),
                record.segments.join(delimiter.as_str()).as_str(),
            ])?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Append a record and hand back the stored instance for editing.
    pub fn add_item(&mut self, record: MetadataRecord) -> &mut MetadataRecord {
        let index = self.records.len();
        self.records.push(record);
        &mut self.records[index]
    }

    /// First record whose path matches.
    pub fn find_by_filepath(&self, path: &Path) -> Option<&MetadataRecord> {
        self.records.iter().find(|r| r.filepath() == path)
    }

    pub fn find_by_filepath_mut(&mut self, path: &Path) -> Option<&mut MetadataRecord> {
        self.records.iter_mut().find(|r| r.filepath() == path)
    }

    /// The record for `path`, appending `make()` first if there is none.
    pub fn find_or_add(
        &mut self,
        path: &Path,
        make: impl FnOnce() -> MetadataRecord,
    ) -> &mut MetadataRecord {
        match self.records.iter().position(|r| r.filepath() == path) {
            Some(index) => &mut self.records[index],
            None => self.add_item(make()),
        }
    }

    pub fn records(&self) -> &[MetadataRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MetadataRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn push_unique(&mut self, record: MetadataRecord) -> Result<()> {
        if self.find_by_filepath(record.filepath()).is_some() {
            return Err(CapsError::MalformedCsv(format!(
                "duplicate filepath {}",
                record.filepath().display()
            )));
        }
        self.records.push(record);
        Ok(())
    }
}

impl<'a> IntoIterator for &'a MetadataStore {
    type Item = &'a MetadataRecord;
    type IntoIter = std::slice::Iter<'a, MetadataRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn malformed(err: csv::Error) -> CapsError {
    match err.kind() {
        csv::ErrorKind::UnequalLengths { .. } | csv::ErrorKind::Utf8 { .. } => {
            CapsError::MalformedCsv(err.to_string())
        }
        _ => CapsError::Csv(err),
    }
}

fn record_from_row(row: &StringRecord) -> Result<MetadataRecord> {
    let line = row.position().map(|p| p.line()).unwrap_or_default();
    let field = |i: usize| row.get(i).unwrap_or_default();

    if field(0).is_empty() {
        return Err(CapsError::MalformedCsv(format!(
            "line {line}: filepath is empty"
        )));
    }

    let mut record = MetadataRecord::new(field(0), field(1));
    record.title = field(2).to_string();
    record.speakers = split_list(COLUMNS[3], field(3), line)?;
    record.segments = split_list(COLUMNS[4], field(4), line)?;
    Ok(record)
}

fn split_list(column: &str, value: &str, line: u64) -> Result<Vec<String>> {
    if value.is_empty() {
        return Ok(Vec::new());
    }

    let items: Vec<String> = value.split(LIST_DELIMITER).map(str::to_string).collect();
    if items.iter().any(|item| item.is_empty()) {
        return Err(CapsError::MalformedCsv(format!(
            "line {line}: ambiguous '{LIST_DELIMITER}' in {column} field \"{value}\""
        )));
    }

    Ok(items)
}
