//! Record kinds, their field schemas and the in-memory record type.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDateTime, Timelike};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::literal;

/// Timestamp layout used in renderings and in the backing file.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Every kind of record the console can manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    BaseModel,
    User,
    State,
    City,
    Amenity,
    Place,
    Review,
}

impl ModelKind {
    pub const ALL: [ModelKind; 7] = [
        ModelKind::BaseModel,
        ModelKind::User,
        ModelKind::State,
        ModelKind::City,
        ModelKind::Amenity,
        ModelKind::Place,
        ModelKind::Review,
    ];

    /// Name under which the kind appears in commands and in `__class__` tags.
    pub fn tag(&self) -> &'static str {
        match self {
            ModelKind::BaseModel => "BaseModel",
            ModelKind::User => "User",
            ModelKind::State => "State",
            ModelKind::City => "City",
            ModelKind::Amenity => "Amenity",
            ModelKind::Place => "Place",
            ModelKind::Review => "Review",
        }
    }

    pub fn from_tag(tag: &str) -> Option<ModelKind> {
        ModelKind::ALL.iter().copied().find(|kind| kind.tag() == tag)
    }

    /// Schema fields of the kind with their default values, in schema order.
    pub fn default_fields(&self) -> Vec<(&'static str, Value)> {
        match self {
            ModelKind::BaseModel => vec![],
            ModelKind::User => vec![
                ("email", json!("")),
                ("password", json!("")),
                ("first_name", json!("")),
                ("last_name", json!("")),
            ],
            ModelKind::State => vec![("name", json!(""))],
            ModelKind::City => vec![("name", json!("")), ("state_id", json!(""))],
            ModelKind::Amenity => vec![("name", json!(""))],
            ModelKind::Place => vec![
                ("city_id", json!("")),
                ("user_id", json!("")),
                ("name", json!("")),
                ("description", json!("")),
                ("number_rooms", json!(0)),
                ("number_bathrooms", json!(0)),
                ("max_guest", json!(0)),
                ("price_by_night", json!(0)),
                ("latitude", json!(0.0)),
                ("longitude", json!(0.0)),
                ("amenity_ids", json!([])),
            ],
            ModelKind::Review => vec![
                ("place_id", json!("")),
                ("user_id", json!("")),
                ("text", json!("")),
            ],
        }
    }
}

/// A live record: identity, timestamps and an open field mapping seeded
/// from the kind's schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub kind: ModelKind,
    pub id: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates a fresh record with a random id, current timestamps and
    /// the schema defaults of `kind`.
    pub fn new(kind: ModelKind) -> Record {
        let now = now();
        let fields = kind
            .default_fields()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        Record {
            kind,
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            fields,
        }
    }

    /// Store key of the record, `<Kind>.<id>`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.kind.tag(), self.id)
    }

    /// Refreshes `updated_at` to the current time.
    pub fn touch(&mut self) {
        self.updated_at = now();
    }

    /// Assigns a field. The identity fields are handled specially: `id`
    /// always becomes the stringified value, the timestamps only accept a
    /// string in the timestamp layout and keep their old value otherwise.
    pub fn set_field(&mut self, name: &str, value: Value) {
        match name {
            "id" => {
                self.id = match value {
                    Value::String(text) => text,
                    other => literal::render_value(&other),
                };
            }
            "created_at" | "updated_at" => {
                let parsed = value.as_str().and_then(parse_timestamp);
                if let Some(stamp) = parsed {
                    if name == "created_at" {
                        self.created_at = stamp;
                    } else {
                        self.updated_at = stamp;
                    }
                }
            }
            _ => {
                self.fields.insert(name.to_string(), value);
            }
        }
    }

    /// Field names in rendering order: identity first, then the kind's
    /// schema order, then any extension fields sorted by name.
    fn field_order(&self) -> Vec<&str> {
        let schema: Vec<&str> = self
            .kind
            .default_fields()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        let mut order = vec!["id", "created_at", "updated_at"];
        for name in schema.iter().copied() {
            if self.fields.contains_key(name) {
                order.push(name);
            }
        }
        for name in self.fields.keys() {
            if !schema.contains(&name.as_str()) {
                order.push(name.as_str());
            }
        }
        order
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        for name in self.field_order() {
            let rendered = match name {
                "id" => literal::render_string(&self.id),
                "created_at" => literal::render_string(&format_timestamp(self.created_at)),
                "updated_at" => literal::render_string(&format_timestamp(self.updated_at)),
                other => match self.fields.get(other) {
                    Some(value) => literal::render_value(value),
                    None => continue,
                },
            };
            parts.push(format!("{}: {}", literal::render_string(name), rendered));
        }
        write!(
            f,
            "[{}] ({}) {{{}}}",
            self.kind.tag(),
            self.id,
            parts.join(", ")
        )
    }
}

/// Current local time, truncated to microsecond precision so that a
/// render/parse round trip reproduces the value exactly.
pub fn now() -> NaiveDateTime {
    let now = chrono::Local::now().naive_local();
    let micros = now.nanosecond() / 1_000 * 1_000;
    now.with_nanosecond(micros).unwrap_or(now)
}

pub fn format_timestamp(stamp: NaiveDateTime) -> String {
    stamp.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_PARSE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for kind in ModelKind::ALL {
            assert_eq!(ModelKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ModelKind::from_tag("Spaceship"), None);
    }

    #[test]
    fn new_record_carries_schema_defaults() {
        let record = Record::new(ModelKind::Place);
        assert_eq!(record.fields.get("name"), Some(&json!("")));
        assert_eq!(record.fields.get("number_rooms"), Some(&json!(0)));
        assert_eq!(record.fields.get("latitude"), Some(&json!(0.0)));
        assert_eq!(record.fields.get("amenity_ids"), Some(&json!([])));
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn key_combines_tag_and_id() {
        let record = Record::new(ModelKind::User);
        assert_eq!(record.key(), format!("User.{}", record.id));
    }

    #[test]
    fn timestamps_round_trip_through_text() {
        let stamp = now();
        let text = format_timestamp(stamp);
        assert_eq!(parse_timestamp(&text), Some(stamp));
    }

    #[test]
    fn set_field_replaces_id_with_string_form() {
        let mut record = Record::new(ModelKind::State);
        record.set_field("id", json!("custom"));
        assert_eq!(record.id, "custom");
        record.set_field("id", json!(42));
        assert_eq!(record.id, "42");
    }

    #[test]
    fn set_field_keeps_timestamp_on_bad_value() {
        let mut record = Record::new(ModelKind::State);
        let created = record.created_at;
        record.set_field("created_at", json!("not a timestamp"));
        assert_eq!(record.created_at, created);
        record.set_field("created_at", json!("2024-03-01T10:20:30.000001"));
        assert_eq!(
            record.created_at,
            parse_timestamp("2024-03-01T10:20:30.000001").unwrap()
        );
    }

    #[test]
    fn display_orders_identity_schema_extras() {
        let mut record = Record::new(ModelKind::City);
        record.id = "c-1".to_string();
        record.set_field("zipcode", json!("75000"));
        let text = record.to_string();
        assert!(text.starts_with("[City] (c-1) {'id': 'c-1', 'created_at': '"));
        let name_at = text.find("'name'").unwrap();
        let state_at = text.find("'state_id'").unwrap();
        let zip_at = text.find("'zipcode'").unwrap();
        assert!(name_at < state_at && state_at < zip_at);
        assert!(text.ends_with("'zipcode': '75000'}"));
    }
}
