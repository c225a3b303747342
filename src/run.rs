use std::{path::PathBuf, time::Duration};

use tracing::info;

use crate::{
    batch::{BatchResult, BatchScraper, ErrorPolicy},
    extractor::HtmlExtractor,
    fetch::{HttpFetcher, PageFetcher, CHAMBER_ORGANIZER_URL_PREFIX},
    record::EventRecord,
    schema::RecordSchema,
    writer::write_records,
    ScrapeError,
};

/// Parameters of one scrape-to-file run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// First page id (inclusive).
    pub lower_id: i64,
    /// Last page id (exclusive).
    pub upper_id: i64,
    pub output: PathBuf,
    pub url_prefix: String,
    /// Schema file or inline schema replacing the built-in event layout.
    pub schema: Option<String>,
    pub policy: ErrorPolicy,
    pub timeout: Option<Duration>,
    #[cfg(feature = "multi_thread")]
    pub concurrency: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            lower_id: 0,
            upper_id: 0,
            output: PathBuf::from("output.csv"),
            url_prefix: CHAMBER_ORGANIZER_URL_PREFIX.to_string(),
            schema: None,
            policy: ErrorPolicy::default(),
            timeout: None,
            #[cfg(feature = "multi_thread")]
            concurrency: 1,
        }
    }
}

/// Scrapes the configured id range over HTTP and writes the events to the output file.
pub fn scrape_events(options: &RunOptions) -> Result<BatchResult<EventRecord>, ScrapeError> {
    let fetcher = HttpFetcher::with_timeout(&options.url_prefix, options.timeout)?;
    scrape_events_with(fetcher, options)
}

/// Same as [`scrape_events`] with a caller supplied page source.
///
/// The output file is only created once the whole range has been scraped.
pub fn scrape_events_with<F: PageFetcher>(
    fetcher: F,
    options: &RunOptions,
) -> Result<BatchResult<EventRecord>, ScrapeError> {
    let mut extractor = HtmlExtractor::new();
    if let Some(config) = &options.schema {
        extractor = extractor.with_schema(EventRecord::from_config(config)?);
    }

    let scraper = BatchScraper::new(fetcher)
        .with_extractor(extractor.build())
        .with_policy(options.policy);
    #[cfg(feature = "multi_thread")]
    let scraper = scraper.with_concurrency(options.concurrency);

    info!(
        "scraping ids {} (inclusive) to {} (exclusive)",
        options.lower_id, options.upper_id
    );
    let batch = scraper.scrape_range::<EventRecord>(options.lower_id, options.upper_id)?;
    write_records(&options.output, &batch)?;
    Ok(batch)
}
