use thiserror::Error;

/// Why a layout schema could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read layout schema file: {0}")]
    Io(#[from] std::io::Error),
    #[error("layout schema is not valid JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[cfg(feature = "toml_config")]
    #[error("layout schema is not valid TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("layout schema files must end in .json or .toml")]
    UnsupportedFormat,
    #[error("TOML layout schemas need the 'toml_config' feature")]
    TomlNotEnabled,
    #[error("layout schema rejected: {0}")]
    InvalidSchema(String),
}

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("schema error: {0}")]
    Config(#[from] ConfigError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid range: lower id {lower} is greater than upper id {upper}")]
    InvalidRange { lower: i64, upper: i64 },
    #[error("encountered {count} matches for label {label:?}, expected at most one")]
    AmbiguousMatch { label: String, count: usize },
    #[cfg(feature = "multi_thread")]
    #[error("worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("page {id}: {source}")]
    Page {
        id: i64,
        #[source]
        source: Box<ScrapeError>,
    },
}
