mod batch;
#[cfg(feature = "multi_thread")]
mod batch_mt;
mod cleaner;
mod error;
mod extractor;
mod fetch;
mod matcher;
mod record;
mod run;
mod schema;
mod writer;

pub use batch::{range_len, BatchResult, BatchScraper, ErrorPolicy, PageOutcome};
pub use cleaner::{DefaultCleaner, LineFoldingCleaner, RawCleaner, TextCleaner};
pub use error::{ConfigError, ScrapeError};
pub use extractor::{Extraction, HtmlExtractor, HtmlExtractorBuilder};
pub use fetch::{HttpFetcher, PageFetcher, CHAMBER_ORGANIZER_URL_PREFIX};
pub use matcher::{find_all, LabelMatcher, Matcher};
pub use record::{
    EventRecord, EVENT_CONTACT_PERSON_LABEL, EVENT_DATE_LABEL, EVENT_DESCRIPTION_LABEL,
    EVENT_LOCATION_LABEL, EVENT_NAME_LABEL, EVENT_TIME_LABEL,
};
pub use run::{scrape_events, scrape_events_with, RunOptions};
pub use schema::{AttributeRule, FieldRule, LayoutSchema, RecordSchema};
pub use writer::{write_records, TableWriter};
