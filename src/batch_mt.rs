use std::collections::HashMap;

use rayon::{prelude::*, ThreadPoolBuilder};
use tracing::info;

use crate::{
    batch::{BatchResult, BatchScraper, ErrorPolicy, PageOutcome, MAX_PREALLOCATED_SLOTS},
    fetch::PageFetcher,
    schema::LayoutSchema,
    ScrapeError,
};

impl<F: PageFetcher> BatchScraper<F> {
    /// Number of pages fetched at once. `1` keeps the sequential loop.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    // Slots are filled in id order; under fail-fast the first error wins and
    // pages still in flight are dropped with the rest of the batch.
    pub(crate) fn scrape_range_parallel<T>(
        &self,
        schema: &LayoutSchema,
        lower: i64,
        upper: i64,
    ) -> Result<BatchResult<T>, ScrapeError>
    where
        T: From<HashMap<String, String>> + Send,
    {
        let pool = ThreadPoolBuilder::new().num_threads(self.concurrency).build()?;
        let policy = self.policy();

        // Ids are handed to the pool a chunk at a time so a huge range never
        // reserves all of its slots at once.
        let mut outcomes: Vec<PageOutcome<T>> = Vec::new();
        let mut start = lower;
        while start < upper {
            let end = start.saturating_add(MAX_PREALLOCATED_SLOTS as i64).min(upper);
            let chunk = pool.install(|| {
                (start..end)
                    .into_par_iter()
                    .map(|id| match self.scrape_page::<T>(schema, id) {
                        PageOutcome::Failed(err) if policy == ErrorPolicy::FailFast => Err(ScrapeError::Page {
                            id,
                            source: Box::new(err),
                        }),
                        outcome => Ok(outcome),
                    })
                    .collect::<Result<Vec<_>, ScrapeError>>()
            })?;
            outcomes.extend(chunk);
            start = end;
        }

        let batch = BatchResult::new(lower, outcomes);
        info!(
            "scraped {} pages on {} workers: {} records, {} skipped, {} failed",
            batch.len(),
            self.concurrency,
            batch.record_count(),
            batch.skipped_count(),
            batch.failed_count()
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn page(id: i64) -> String {
        if id % 3 == 0 {
            return "<p>nothing here</p>".to_string();
        }
        format!(
            "<table><tr><td>Event Name:</td><td><font>Event {id}</font></td></tr>\
             <tr><td>Event Date:</td><td><font>June 3</font></td></tr>\
             <tr><td>Contact Person:</td><td><font>Ann</font></td></tr></table>"
        )
    }

    #[test]
    fn parallel_batch_keeps_page_order() {
        let calls = AtomicUsize::new(0);
        let fetcher = |id: i64| -> Result<String, ScrapeError> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(page(id))
        };
        let scraper = BatchScraper::new(&fetcher).with_concurrency(4);
        let batch = scraper.scrape_range::<EventRecord>(1, 11).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 10);
        assert_eq!(batch.len(), 10);
        for (id, outcome) in batch.iter() {
            match outcome.record() {
                Some(record) => assert_eq!(record.name, format!("Event {id}")),
                None => assert_eq!(id % 3, 0),
            }
        }
    }

    #[test]
    fn parallel_fail_fast_returns_error() {
        let fetcher = |id: i64| -> Result<String, ScrapeError> {
            if id == 5 {
                Ok(format!("{}{}", page(1), page(2)))
            } else {
                Ok(page(id))
            }
        };
        let scraper = BatchScraper::new(fetcher).with_concurrency(3);
        let err = scraper.scrape_range::<EventRecord>(1, 9).unwrap_err();
        assert!(matches!(err, ScrapeError::Page { id: 5, .. }));
    }

    #[test]
    fn parallel_huge_range_stops_at_first_chunk() {
        let calls = AtomicUsize::new(0);
        let fetcher = |_id: i64| -> Result<String, ScrapeError> {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ScrapeError::Io(std::io::Error::new(std::io::ErrorKind::Other, "offline")))
        };
        let scraper = BatchScraper::new(&fetcher).with_concurrency(4);
        let err = scraper.scrape_range::<EventRecord>(0, i64::MAX).unwrap_err();

        assert!(matches!(err, ScrapeError::Page { .. }));
        assert!(calls.load(Ordering::SeqCst) <= MAX_PREALLOCATED_SLOTS);
    }

    #[test]
    fn parallel_batch_spans_several_chunks() {
        let upper = MAX_PREALLOCATED_SLOTS as i64 * 2 + 7;
        let fetcher = |id: i64| -> Result<String, ScrapeError> { Ok(page(id)) };
        let batch = BatchScraper::new(fetcher)
            .with_concurrency(4)
            .scrape_range::<EventRecord>(1, upper)
            .unwrap();

        assert_eq!(batch.len() as i64, upper - 1);
        let last = batch.get(upper - 1).and_then(PageOutcome::record).unwrap();
        assert_eq!(last.name, format!("Event {}", upper - 1));
    }
}
