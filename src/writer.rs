use std::{fs::File, io::Write, path::Path};

use csv::WriterBuilder;
use serde::Serialize;
use tracing::info;

use crate::{batch::BatchResult, ScrapeError};

/// Writes the records of a batch as delimited rows, without a header.
///
/// Fields are quoted only when they contain the delimiter, a quote or a line
/// break. Pages without a record produce no row.
#[derive(Debug, Clone, Copy)]
pub struct TableWriter {
    delimiter: u8,
}

impl TableWriter {
    pub fn new() -> Self {
        TableWriter { delimiter: b',' }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Creates (or truncates) `path` and writes the batch to it.
    pub fn write_file<T: Serialize, P: AsRef<Path>>(
        &self,
        path: P,
        batch: &BatchResult<T>,
    ) -> Result<usize, ScrapeError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let rows = self.write_to(file, batch)?;
        info!("wrote {} rows to {}", rows, path.display());
        Ok(rows)
    }

    pub fn write_to<T: Serialize, W: Write>(&self, writer: W, batch: &BatchResult<T>) -> Result<usize, ScrapeError> {
        let mut csv_writer = WriterBuilder::new()
            .has_headers(false)
            .delimiter(self.delimiter)
            .from_writer(writer);

        let mut rows = 0;
        for record in batch.records() {
            csv_writer.serialize(record)?;
            rows += 1;
        }
        csv_writer.flush()?;
        Ok(rows)
    }
}

impl Default for TableWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes `batch` as CSV to `path`, returning the number of rows.
pub fn write_records<T: Serialize, P: AsRef<Path>>(path: P, batch: &BatchResult<T>) -> Result<usize, ScrapeError> {
    TableWriter::new().write_file(path, batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{batch::PageOutcome, EventRecord};

    fn event(name: &str, description: &str) -> EventRecord {
        EventRecord {
            name: name.into(),
            description: description.into(),
            date: "May 1".into(),
            contact_name: "Jo".into(),
            contact_email: "jo@example.com".into(),
            ..EventRecord::default()
        }
    }

    fn render(writer: TableWriter, batch: &BatchResult<EventRecord>) -> String {
        let mut buf = Vec::new();
        writer.write_to(&mut buf, batch).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn skips_absent_pages_and_quotes_on_demand() {
        let batch = BatchResult::new(
            0,
            vec![
                PageOutcome::Record(event("Mixer", "Food, drinks")),
                PageOutcome::Skipped { missing: vec!["Event Date:".into()] },
                PageOutcome::Record(event("Say \"hi\"", "line one\nline two")),
            ],
        );

        assert_eq!(
            render(TableWriter::new(), &batch),
            "Mixer,\"Food, drinks\",May 1,,,Jo,jo@example.com\n\
             \"Say \"\"hi\"\"\",\"line one\nline two\",May 1,,,Jo,jo@example.com\n"
        );
    }

    #[test]
    fn tab_delimiter() {
        let batch = BatchResult::new(3, vec![PageOutcome::Record(event("Mixer", "Food, drinks"))]);
        assert_eq!(
            render(TableWriter::new().with_delimiter(b'\t'), &batch),
            "Mixer\tFood, drinks\tMay 1\t\t\tJo\tjo@example.com\n"
        );
    }

    #[test]
    fn empty_batch_writes_nothing() {
        let batch: BatchResult<EventRecord> = BatchResult::new(9, Vec::new());
        assert_eq!(render(TableWriter::new(), &batch), "");
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let mut path = std::env::temp_dir();
        path.push("event_scraper_no_such_dir");
        path.push("nested");
        path.push("out.csv");
        let batch: BatchResult<EventRecord> = BatchResult::new(0, Vec::new());
        assert!(matches!(write_records(&path, &batch), Err(ScrapeError::Io(_))));
    }
}
