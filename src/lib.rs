pub mod audio;
pub mod config;
pub mod error;
pub mod interactive;
pub mod metadata;
pub mod pipeline;
pub mod ui;

pub use config::Config;
pub use error::{CapsError, Result};
pub use metadata::{MetadataRecord, MetadataStore, Segment};
pub use pipeline::{
    print_summary, process_store, ProcessConfig, ProcessResult, ProcessStats,
};
