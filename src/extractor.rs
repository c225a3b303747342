use std::{collections::HashMap, fmt::{self, Debug, Formatter}, sync::Arc};

use scraper::{ElementRef, Html};
use tracing::debug;

use crate::{
    cleaner::{DefaultCleaner, TextCleaner},
    matcher::{find_all, is_blank_text, LabelMatcher},
    schema::{AttributeRule, FieldRule, LayoutSchema, RecordSchema},
    ConfigError, ScrapeError,
};

/// Result of extracting one page.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T> {
    Record(T),
    /// Labels of mandatory fields that had no match.
    Missing(Vec<String>),
}

impl<T> Extraction<T> {
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Extraction<U> {
        match self {
            Extraction::Record(record) => Extraction::Record(f(record)),
            Extraction::Missing(labels) => Extraction::Missing(labels),
        }
    }

    pub fn into_record(self) -> Option<T> {
        match self {
            Extraction::Record(record) => Some(record),
            Extraction::Missing(_) => None,
        }
    }
}

/// A builder for the `HtmlExtractor` struct
/// that allows overriding the layout schema
/// and the text cleaner before building it
pub struct HtmlExtractorBuilder {
    config: Option<String>,
    schema: Option<Arc<LayoutSchema>>,
    cleaner: Option<Arc<dyn TextCleaner>>,
}

impl HtmlExtractorBuilder {
    pub fn new() -> Self {
        HtmlExtractorBuilder {
            config: None,
            schema: None,
            cleaner: None,
        }
    }

    /// Schema file path, or an inline JSON/TOML schema.
    ///
    /// The config is read again every time [`HtmlExtractor::schema`] runs;
    /// prefer [`with_schema`](Self::with_schema) when extracting many pages.
    pub fn with_config(mut self, config: &str) -> Self {
        self.config = Some(config.to_string());
        self
    }

    /// An already loaded schema. Takes precedence over `with_config`.
    pub fn with_schema(mut self, schema: LayoutSchema) -> Self {
        self.schema = Some(Arc::new(schema));
        self
    }

    pub fn with_cleaner<T: TextCleaner + 'static>(mut self, cleaner: T) -> Self {
        self.cleaner = Some(Arc::new(cleaner));
        self
    }

    pub fn build(self) -> HtmlExtractor {
        HtmlExtractor {
            config: self.config,
            schema: self.schema,
            cleaner: self.cleaner.unwrap_or_else(|| Arc::new(DefaultCleaner)),
        }
    }
}

impl Default for HtmlExtractorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts records from pages laid out as label/value table rows.
///
/// # Example
///
/// ```
/// use event_scraper::{EventRecord, HtmlExtractor};
///
/// let html = r#"<table>
///   <tr><td>Event Name:</td><td><font>Spring Mixer</font></td></tr>
///   <tr><td>Event Date:</td><td><font>May 1</font></td></tr>
///   <tr><td>Contact Person:</td><td><font><a href="mailto:jo@example.com">Jo</a></font></td></tr>
/// </table>"#;
///
/// let extractor = HtmlExtractor::default();
/// let record = extractor.extract::<EventRecord>(html).unwrap().into_record().unwrap();
/// assert_eq!(record.name, "Spring Mixer");
/// assert_eq!(record.contact_email, "jo@example.com");
/// ```
#[derive(Clone)]
pub struct HtmlExtractor {
    config: Option<String>,
    schema: Option<Arc<LayoutSchema>>,
    cleaner: Arc<dyn TextCleaner>,
}

impl Debug for HtmlExtractor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "HtmlExtractor")
    }
}

impl HtmlExtractor {
    pub fn new() -> HtmlExtractorBuilder {
        HtmlExtractorBuilder::new()
    }

    /// The configured schema, or the record type's default one.
    pub fn schema<T: RecordSchema>(&self) -> Result<LayoutSchema, ConfigError> {
        if let Some(schema) = &self.schema {
            return Ok(schema.as_ref().clone());
        }
        match &self.config {
            Some(config_str) => T::from_config(config_str),
            None => Ok(T::default_schema()),
        }
    }

    /// Resolves the schema, then extracts one page.
    ///
    /// With a `with_config` source that means reading and validating the
    /// config on each call. Loops over many pages should resolve the schema
    /// once and call [`extract_with`](Self::extract_with), as `BatchScraper` does.
    pub fn extract<T: RecordSchema>(&self, html: &str) -> Result<Extraction<T>, ScrapeError> {
        let schema = self.schema::<T>()?;
        self.extract_with(&schema, html)
    }

    /// Extracts a record using an already resolved schema.
    ///
    /// The parsed document lives only for the duration of this call.
    pub fn extract_with<T: From<HashMap<String, String>>>(
        &self,
        schema: &LayoutSchema,
        html: &str,
    ) -> Result<Extraction<T>, ScrapeError> {
        let document = Html::parse_document(html);
        if !document.errors.is_empty() {
            debug!("recovered from {} HTML parse errors", document.errors.len());
        }

        let fields = self.extract_fields(schema, document.root_element())?;
        Ok(fields.map(T::from))
    }

    fn extract_fields(
        &self,
        schema: &LayoutSchema,
        root: ElementRef,
    ) -> Result<Extraction<HashMap<String, String>>, ScrapeError> {
        let cleaner = self.cleaner.as_ref();

        let match_sets: Vec<(&FieldRule, Vec<ElementRef>)> = schema
            .fields()
            .iter()
            .map(|field| {
                let matcher = LabelMatcher::new(&field.label, schema.value_tag(), cleaner);
                let matches = find_all(root, &matcher);
                debug!("{:?}: {} match(es)", matcher.label(), matches.len());
                (field, matches)
            })
            .collect();

        // An absent mandatory field wins over ambiguity elsewhere on the page
        let missing: Vec<String> = match_sets
            .iter()
            .filter(|(field, matches)| field.mandatory && matches.is_empty())
            .map(|(field, _)| field.label.clone())
            .collect();
        if !missing.is_empty() {
            return Ok(Extraction::Missing(missing));
        }

        if let Some((field, matches)) = match_sets.iter().find(|(_, matches)| matches.len() > 1) {
            return Err(ScrapeError::AmbiguousMatch {
                label: field.label.clone(),
                count: matches.len(),
            });
        }

        let mut values = HashMap::new();
        for (field, matches) in &match_sets {
            let text = matches
                .first()
                .map(|element| cleaner.clean_fragments(&mut element.text()))
                .unwrap_or_default();
            values.insert(field.name.clone(), text);
        }

        for rule in schema.attributes() {
            let value = match_sets
                .iter()
                .find(|(field, _)| field.name == rule.field)
                .and_then(|(_, matches)| matches.first())
                .and_then(|element| first_child_attribute(element, rule))
                .unwrap_or_default();
            values.insert(rule.name.clone(), value);
        }

        Ok(Extraction::Record(values))
    }
}

impl Default for HtmlExtractor {
    fn default() -> Self {
        HtmlExtractorBuilder::new().build()
    }
}

fn first_child_attribute(element: &ElementRef, rule: &AttributeRule) -> Option<String> {
    let child = element
        .children()
        .find(|node| !is_blank_text(node.value()))
        .and_then(ElementRef::wrap)?;
    let value = child.value().attr(&rule.attribute)?;
    match &rule.strip_prefix {
        Some(prefix) => value.strip_prefix(prefix.as_str()).map(str::to_string),
        None => Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::RawCleaner;
    use crate::EventRecord;

    fn row(label: &str, value: &str) -> String {
        format!("<tr><td><b>{label}</b></td><td><font>{value}</font></td></tr>")
    }

    fn page(rows: &[String]) -> String {
        format!("<html><body><table>{}</table></body></html>", rows.concat())
    }

    fn schema() -> LayoutSchema {
        LayoutSchema::new(vec![
            FieldRule { name: "title".into(), label: "Title:".into(), mandatory: true },
            FieldRule { name: "venue".into(), label: "Venue:".into(), mandatory: false },
        ])
        .with_attribute(AttributeRule {
            name: "link".into(),
            field: "venue".into(),
            attribute: "href".into(),
            strip_prefix: Some("https://".into()),
        })
    }

    fn extract(html: &str) -> Result<Extraction<HashMap<String, String>>, ScrapeError> {
        HtmlExtractor::default().extract_with(&schema(), html)
    }

    #[test]
    fn optional_fields_default_to_empty() {
        let html = page(&[row("Title:", "Jazz Night")]);
        let values = extract(&html).unwrap().into_record().unwrap();
        assert_eq!(values["title"], "Jazz Night");
        assert_eq!(values["venue"], "");
        assert_eq!(values["link"], "");
    }

    #[test]
    fn missing_mandatory_field_is_not_an_error() {
        let html = page(&[row("Venue:", "Park")]);
        assert_eq!(extract(&html).unwrap(), Extraction::Missing(vec!["Title:".into()]));
    }

    #[test]
    fn missing_check_precedes_ambiguity() {
        let html = page(&[row("Venue:", "A"), row("Venue:", "B")]);
        assert!(matches!(extract(&html).unwrap(), Extraction::Missing(_)));
    }

    #[test]
    fn duplicate_matches_are_fatal() {
        let html = page(&[row("Title:", "A"), row("Venue:", "X"), row("Venue:", "Y")]);
        match extract(&html) {
            Err(ScrapeError::AmbiguousMatch { label, count }) => {
                assert_eq!(label, "Venue:");
                assert_eq!(count, 2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn attribute_prefix_is_stripped() {
        let html = page(&[
            row("Title:", "A"),
            row("Venue:", r#"<a href="https://park.example">Park</a>"#),
        ]);
        let values = extract(&html).unwrap().into_record().unwrap();
        assert_eq!(values["venue"], "Park");
        assert_eq!(values["link"], "park.example");
    }

    #[test]
    fn attribute_without_prefix_is_dropped() {
        let html = page(&[
            row("Title:", "A"),
            row("Venue:", r#"<a href="ftp://park.example">Park</a>"#),
        ]);
        let values = extract(&html).unwrap().into_record().unwrap();
        assert_eq!(values["link"], "");
    }

    #[test]
    fn text_child_has_no_attribute() {
        let html = page(&[row("Title:", "A"), row("Venue:", r#"Park <a href="https://x">x</a>"#)]);
        let values = extract(&html).unwrap().into_record().unwrap();
        assert_eq!(values["link"], "");
    }

    #[test]
    fn custom_cleaner_is_used() {
        let html = page(&[row("Title:", "  spaced  ")]);
        let extractor = HtmlExtractor::new().with_cleaner(RawCleaner).build();
        let values = extractor
            .extract_with::<HashMap<String, String>>(&schema(), &html)
            .unwrap()
            .into_record()
            .unwrap();
        assert_eq!(values["title"], "  spaced  ");
    }

    #[test]
    fn configured_schema_overrides_default() {
        let extractor = HtmlExtractor::new()
            .with_config(r#"{"value_tag": "span", "fields": [{"name": "name", "label": "Event Name:", "mandatory": true}]}"#)
            .build();
        let schema = extractor.schema::<EventRecord>().unwrap();
        assert_eq!(schema.value_tag(), "span");
        assert_eq!(schema.fields().len(), 1);
    }

    #[test]
    fn line_breaks_inside_a_value_survive() {
        let html = page(&[row("Title:", "Line one\nLine two")]);
        let values = extract(&html).unwrap().into_record().unwrap();
        assert_eq!(values["title"], "Line one\nLine two");
    }

    #[test]
    fn loaded_schema_outlives_its_file() {
        let mut path = std::env::temp_dir();
        path.push("event_scraper_extractor_schema.json");
        std::fs::write(&path, r#"{"fields": [{"name": "name", "label": "Title:", "mandatory": true}]}"#).unwrap();
        let config = path.to_str().unwrap().to_string();

        let loaded = LayoutSchema::from_config(&config).unwrap();
        let cached = HtmlExtractor::new().with_schema(loaded).build();
        let lazy = HtmlExtractor::new().with_config(&config).build();
        std::fs::remove_file(&path).unwrap();

        let html = page(&[row("Title:", "Jazz Night")]);
        for _ in 0..2 {
            let record = cached.extract::<EventRecord>(&html).unwrap().into_record().unwrap();
            assert_eq!(record.name, "Jazz Night");
        }
        assert!(matches!(lazy.extract::<EventRecord>(&html), Err(ScrapeError::Config(_))));
    }
}
