//! Reference-string parsing into typed requests
pub mod options;
pub mod parser;
pub mod request;

pub use options::{ParsedOptions, QueryParams, SearchOptions, SearchStrategy};
pub use parser::{ReferenceParser, parse};
pub use request::{ParsedQuery, ParsedRequest, VerseRef};
