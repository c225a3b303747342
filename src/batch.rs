use std::{collections::HashMap, fmt, str::FromStr};

use tracing::{info, warn};

use crate::{
    extractor::{Extraction, HtmlExtractor},
    fetch::PageFetcher,
    schema::{LayoutSchema, RecordSchema},
    ScrapeError,
};

// Upper bound on slots reserved ahead of scraping; a range may be far larger
// than what will ever be fetched before a fail-fast abort.
pub(crate) const MAX_PREALLOCATED_SLOTS: usize = 1024;

/// What a batch does when a page fails to fetch or is ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Abort the whole range on the first failing page.
    #[default]
    FailFast,
    /// Record the failure in the page's slot and move on.
    Continue,
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail-fast" => Ok(ErrorPolicy::FailFast),
            "continue" => Ok(ErrorPolicy::Continue),
            other => Err(format!("unknown error policy {:?}, expected fail-fast or continue", other)),
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::FailFast => write!(f, "fail-fast"),
            ErrorPolicy::Continue => write!(f, "continue"),
        }
    }
}

#[derive(Debug)]
pub enum PageOutcome<T> {
    Record(T),
    /// The page lacks one of the mandatory labels.
    Skipped { missing: Vec<String> },
    Failed(ScrapeError),
}

impl<T> PageOutcome<T> {
    pub fn record(&self) -> Option<&T> {
        match self {
            PageOutcome::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self, PageOutcome::Record(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, PageOutcome::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PageOutcome::Failed(_))
    }
}

/// Per-page outcomes of a range, slot `i` belonging to page `lower + i`.
#[derive(Debug)]
pub struct BatchResult<T> {
    lower: i64,
    outcomes: Vec<PageOutcome<T>>,
}

impl<T> BatchResult<T> {
    pub fn new(lower: i64, outcomes: Vec<PageOutcome<T>>) -> Self {
        BatchResult { lower, outcomes }
    }

    pub fn lower(&self) -> i64 {
        self.lower
    }

    /// Exclusive upper bound of the scanned range.
    pub fn upper(&self) -> i64 {
        self.lower + self.outcomes.len() as i64
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&PageOutcome<T>> {
        let index = usize::try_from(id.checked_sub(self.lower)?).ok()?;
        self.outcomes.get(index)
    }

    pub fn outcomes(&self) -> &[PageOutcome<T>] {
        &self.outcomes
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &PageOutcome<T>)> {
        let lower = self.lower;
        self.outcomes
            .iter()
            .enumerate()
            .map(move |(i, outcome)| (lower + i as i64, outcome))
    }

    /// Extracted records, in page order.
    pub fn records(&self) -> impl Iterator<Item = &T> {
        self.outcomes.iter().filter_map(PageOutcome::record)
    }

    pub fn into_records(self) -> Vec<T> {
        self.outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                PageOutcome::Record(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    pub fn record_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_record()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }
}

/// Scrapes every page of an id range through one fetcher and extractor.
pub struct BatchScraper<F> {
    fetcher: F,
    extractor: HtmlExtractor,
    policy: ErrorPolicy,
    #[cfg(feature = "multi_thread")]
    pub(crate) concurrency: usize,
}

impl<F: PageFetcher> BatchScraper<F> {
    pub fn new(fetcher: F) -> Self {
        BatchScraper {
            fetcher,
            extractor: HtmlExtractor::default(),
            policy: ErrorPolicy::default(),
            #[cfg(feature = "multi_thread")]
            concurrency: 1,
        }
    }

    pub fn with_extractor(mut self, extractor: HtmlExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Scrapes pages `lower..upper`, in order.
    ///
    /// Under `ErrorPolicy::FailFast` the first failing page ends the batch
    /// with `ScrapeError::Page` and nothing scraped so far is returned.
    pub fn scrape_range<T>(&self, lower: i64, upper: i64) -> Result<BatchResult<T>, ScrapeError>
    where
        T: RecordSchema + Send,
    {
        let len = range_len(lower, upper)?;
        let schema = self.extractor.schema::<T>()?;

        #[cfg(feature = "multi_thread")]
        if self.concurrency > 1 {
            return self.scrape_range_parallel(&schema, lower, upper);
        }

        let mut outcomes = Vec::with_capacity(len.min(MAX_PREALLOCATED_SLOTS));
        for id in lower..upper {
            match self.scrape_page(&schema, id) {
                PageOutcome::Failed(err) if self.policy == ErrorPolicy::FailFast => {
                    return Err(ScrapeError::Page {
                        id,
                        source: Box::new(err),
                    });
                }
                outcome => outcomes.push(outcome),
            }
        }

        let batch = BatchResult::new(lower, outcomes);
        info!(
            "scraped {} pages: {} records, {} skipped, {} failed",
            batch.len(),
            batch.record_count(),
            batch.skipped_count(),
            batch.failed_count()
        );
        Ok(batch)
    }

    /// Fetches and extracts a single page. Never aborts; errors end up in the outcome.
    pub fn scrape_page<T: From<HashMap<String, String>>>(&self, schema: &LayoutSchema, id: i64) -> PageOutcome<T> {
        let location = self.fetcher.locate(id);
        info!("scraping... {}", location);

        let outcome = match self.fetcher.fetch(id) {
            Ok(html) => match self.extractor.extract_with::<T>(schema, &html) {
                Ok(Extraction::Record(record)) => PageOutcome::Record(record),
                Ok(Extraction::Missing(missing)) => PageOutcome::Skipped { missing },
                Err(err) => PageOutcome::Failed(err),
            },
            Err(err) => PageOutcome::Failed(err),
        };

        match &outcome {
            PageOutcome::Record(_) => info!("{} - done", location),
            PageOutcome::Skipped { missing } => info!("{} - invalid, missing {}", location, missing.join(", ")),
            PageOutcome::Failed(err) => warn!("{} - failed: {}", location, err),
        }
        outcome
    }
}

/// Number of pages in `lower..upper`.
pub fn range_len(lower: i64, upper: i64) -> Result<usize, ScrapeError> {
    if lower > upper {
        return Err(ScrapeError::InvalidRange { lower, upper });
    }
    upper
        .checked_sub(lower)
        .and_then(|len| usize::try_from(len).ok())
        .ok_or(ScrapeError::InvalidRange { lower, upper })
}
