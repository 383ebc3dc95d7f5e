pub mod date;
pub mod detection;
pub mod expiry;

pub use date::{DateError, DateFormat, ParsedDate, clean_date_text, parse, parse_format, parse_with};
pub use detection::{AnnotatedDetection, Detection, DetectionPayload, annotate, compact_format};
pub use expiry::{ExpiryVerdict, evaluate};
