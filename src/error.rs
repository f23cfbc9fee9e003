use thiserror::Error;

#[derive(Error, Debug)]
pub enum CapsError {
    #[error("Invalid segment: {0}")]
    InvalidSegment(String),

    #[error("Malformed metadata CSV: {0}")]
    MalformedCsv(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("No audio files found in {0}")]
    NoAudioFiles(String),

    #[error("Audio processing failed: {0}")]
    AudioProcessing(String),

    #[error("Incomplete record: {0}")]
    IncompleteRecord(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Cancelled by user")]
    Cancelled,

    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Tag error: {0}")]
    Tag(#[from] id3::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to replace file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

pub type Result<T> = std::result::Result<T, CapsError>;
