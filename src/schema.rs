use serde::{Deserialize, Serialize};
use std::{collections::HashMap, collections::HashSet, fmt::Display, fs, path::Path};

use crate::ConfigError;

/// A record type that can be assembled from a labelled two-column layout.
///
/// `default_schema` describes where each field lives on the page; the
/// extracted field map (keyed by field and attribute names) is turned into
/// the record through `From`.
pub trait RecordSchema: From<HashMap<String, String>> + Sized {
    fn default_schema() -> LayoutSchema;

    fn from_config(config: &str) -> Result<LayoutSchema, ConfigError> {
        LayoutSchema::from_config(config)
    }
}

/// One labelled value on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    /// Text expected in the label cell preceding the value cell.
    pub label: String,
    /// Pages without a match for a mandatory field hold no record.
    #[serde(default)]
    pub mandatory: bool,
}

/// A column read from an attribute of the first child of another field's match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRule {
    pub name: String,
    pub field: String,
    pub attribute: String,
    /// When set, values without this prefix are discarded.
    #[serde(default)]
    pub strip_prefix: Option<String>,
}

fn default_value_tag() -> String {
    "font".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSchema {
    #[serde(default = "default_value_tag")]
    pub(crate) value_tag: String,
    pub(crate) fields: Vec<FieldRule>,
    #[serde(default)]
    pub(crate) attributes: Vec<AttributeRule>,
}

impl LayoutSchema {
    pub fn new(fields: Vec<FieldRule>) -> Self {
        LayoutSchema {
            value_tag: default_value_tag(),
            fields,
            attributes: Vec::new(),
        }
    }

    pub fn with_value_tag(mut self, tag: &str) -> Self {
        self.value_tag = tag.to_ascii_lowercase();
        self
    }

    pub fn with_attribute(mut self, rule: AttributeRule) -> Self {
        self.attributes.push(rule);
        self
    }

    pub fn value_tag(&self) -> &str {
        &self.value_tag
    }

    pub fn fields(&self) -> &[FieldRule] {
        &self.fields
    }

    pub fn attributes(&self) -> &[AttributeRule] {
        &self.attributes
    }

    /// Loads a schema from a `.json`/`.toml` file, or parses `config` itself
    /// when no such file exists.
    pub fn from_config(config: &str) -> Result<LayoutSchema, ConfigError> {
        let schema: LayoutSchema = if Path::new(config).exists() {
            let config_content = fs::read_to_string(config)?;
            if config.ends_with(".json") {
                serde_json::from_str(&config_content)?
            } else if config.ends_with(".toml") {
                #[cfg(feature = "toml_config")]
                {
                    toml::from_str(&config_content)?
                }
                #[cfg(not(feature = "toml_config"))]
                {
                    return Err(ConfigError::TomlNotEnabled);
                }
            } else {
                return Err(ConfigError::UnsupportedFormat);
            }
        } else {
            // Inline JSON first, then TOML if the feature is enabled
            match serde_json::from_str(config) {
                Ok(schema) => schema,
                Err(json_err) => {
                    #[cfg(feature = "toml_config")]
                    {
                        let _ = json_err;
                        toml::from_str(config)?
                    }
                    #[cfg(not(feature = "toml_config"))]
                    {
                        return Err(json_err.into());
                    }
                }
            }
        };
        schema.validate()?;
        Ok(schema)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.value_tag.trim().is_empty() {
            return Err(ConfigError::InvalidSchema("value_tag is empty".into()));
        }
        if self.fields.is_empty() {
            return Err(ConfigError::InvalidSchema("no fields defined".into()));
        }

        let mut names = HashSet::new();
        for field in &self.fields {
            if field.label.is_empty() {
                return Err(ConfigError::InvalidSchema(format!(
                    "field {:?} has an empty label",
                    field.name
                )));
            }
            if !names.insert(field.name.as_str()) {
                return Err(ConfigError::InvalidSchema(format!(
                    "duplicate column {:?}",
                    field.name
                )));
            }
        }
        for rule in &self.attributes {
            if !self.fields.iter().any(|f| f.name == rule.field) {
                return Err(ConfigError::InvalidSchema(format!(
                    "attribute {:?} refers to unknown field {:?}",
                    rule.name, rule.field
                )));
            }
            if !names.insert(rule.name.as_str()) {
                return Err(ConfigError::InvalidSchema(format!(
                    "duplicate column {:?}",
                    rule.name
                )));
            }
        }
        Ok(())
    }
}

impl Display for LayoutSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", json)
    }
}
