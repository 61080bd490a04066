//! NIP document scraping and dataset persistence.
//!
//! - `source` / `github`: where documents come from
//! - `markdown`: heading-delimited segmentation
//! - `scraper`: fetch, segment, filter and emit records
//! - `writer` / `dataset`: JSONL + CSV output and JSONL loading

pub mod dataset;
pub mod github;
pub mod markdown;
pub mod record;
pub mod scraper;
pub mod source;
pub mod writer;

pub use dataset::{load_jsonl, DatasetError};
pub use record::{Dataset, QaRecord, Section, SourceDocument};
pub use scraper::{extract_records, ScrapeReport, Scraper};
pub use source::{DirSource, DocumentSource, FetchError, HttpSource, StaticSource};
pub use writer::{DatasetWriter, WriteError};
