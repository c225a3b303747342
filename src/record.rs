use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::schema::{AttributeRule, FieldRule, LayoutSchema, RecordSchema};

pub const EVENT_NAME_LABEL: &str = "Event Name:";
pub const EVENT_DESCRIPTION_LABEL: &str = "Description:";
pub const EVENT_DATE_LABEL: &str = "Event Date:";
pub const EVENT_TIME_LABEL: &str = "Event Time:";
pub const EVENT_LOCATION_LABEL: &str = "Location:";
pub const EVENT_CONTACT_PERSON_LABEL: &str = "Contact Person:";

/// One calendar event. Field order is the output column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub name: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub contact_name: String,
    pub contact_email: String,
}

fn field(name: &str, label: &str, mandatory: bool) -> FieldRule {
    FieldRule {
        name: name.to_string(),
        label: label.to_string(),
        mandatory,
    }
}

impl RecordSchema for EventRecord {
    fn default_schema() -> LayoutSchema {
        LayoutSchema::new(vec![
            field("name", EVENT_NAME_LABEL, true),
            field("description", EVENT_DESCRIPTION_LABEL, false),
            field("date", EVENT_DATE_LABEL, true),
            field("time", EVENT_TIME_LABEL, false),
            field("location", EVENT_LOCATION_LABEL, false),
            field("contact_name", EVENT_CONTACT_PERSON_LABEL, true),
        ])
        .with_attribute(AttributeRule {
            name: "contact_email".to_string(),
            field: "contact_name".to_string(),
            attribute: "href".to_string(),
            strip_prefix: Some("mailto:".to_string()),
        })
    }
}

impl From<HashMap<String, String>> for EventRecord {
    fn from(mut value: HashMap<String, String>) -> Self {
        let mut take = |key: &str| value.remove(key).unwrap_or_default();
        EventRecord {
            name: take("name"),
            description: take("description"),
            date: take("date"),
            time: take("time"),
            location: take("location"),
            contact_name: take("contact_name"),
            contact_email: take("contact_email"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schema_is_valid() {
        let schema = EventRecord::default_schema();
        schema.validate().unwrap();

        let mandatory: Vec<&str> = schema
            .fields()
            .iter()
            .filter(|f| f.mandatory)
            .map(|f| f.label.as_str())
            .collect();
        assert_eq!(mandatory, [EVENT_NAME_LABEL, EVENT_DATE_LABEL, EVENT_CONTACT_PERSON_LABEL]);
    }

    #[test]
    fn missing_keys_become_empty() {
        let map = HashMap::from([("name".to_string(), "Mixer".to_string())]);
        let record = EventRecord::from(map);
        assert_eq!(record.name, "Mixer");
        assert_eq!(record.contact_email, "");
    }
}
