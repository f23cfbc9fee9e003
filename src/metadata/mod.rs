pub mod record;
pub mod segment;
pub mod store;

pub use record::{MetadataRecord, TrackTags};
pub use segment::{is_valid_segment, parse_segment, timestamp_to_seconds, Segment};
pub use store::{MetadataStore, COLUMNS, LIST_DELIMITER};
