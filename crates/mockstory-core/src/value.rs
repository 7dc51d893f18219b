use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// Resolved field values of one record, keyed by field name.
pub type Record = BTreeMap<String, MockValue>;

/// Value produced for a field.
#[derive(Debug, Clone, PartialEq)]
pub enum MockValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    List(Vec<MockValue>),
    Record(Record),
}

impl MockValue {
    pub fn is_null(&self) -> bool {
        matches!(self, MockValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MockValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MockValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MockValue::Int(value) => Some(*value as f64),
            MockValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MockValue::Text(value) | MockValue::Uuid(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            MockValue::Date(value) => Some(*value),
            MockValue::Timestamp(value) => Some(value.date()),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            MockValue::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[MockValue]> {
        match self {
            MockValue::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            MockValue::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Ordering between comparable values; numbers compare across int/float.
    pub fn compare(&self, other: &MockValue) -> Option<Ordering> {
        match (self, other) {
            (MockValue::Int(left), MockValue::Int(right)) => Some(left.cmp(right)),
            (MockValue::Text(left), MockValue::Text(right)) => Some(left.cmp(right)),
            (MockValue::Date(left), MockValue::Date(right)) => Some(left.cmp(right)),
            (MockValue::Timestamp(left), MockValue::Timestamp(right)) => Some(left.cmp(right)),
            (MockValue::Date(left), MockValue::Timestamp(right)) => {
                Some(left.cmp(&right.date()))
            }
            (MockValue::Timestamp(left), MockValue::Date(right)) => {
                Some(left.date().cmp(right))
            }
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(left), Some(right)) => left.partial_cmp(&right),
                _ => None,
            },
        }
    }

    /// Convert into the JSON representation used for fixtures.
    pub fn to_json(&self) -> Value {
        match self {
            MockValue::Null => Value::Null,
            MockValue::Bool(value) => Value::Bool(*value),
            MockValue::Int(value) => Value::Number((*value).into()),
            MockValue::Float(value) => Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            MockValue::Text(value) | MockValue::Uuid(value) => Value::String(value.clone()),
            MockValue::Date(value) => Value::String(value.format("%Y-%m-%d").to_string()),
            MockValue::Timestamp(value) => {
                Value::String(value.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
            MockValue::List(items) => Value::Array(items.iter().map(MockValue::to_json).collect()),
            MockValue::Record(record) => Value::Object(record_to_json(record)),
        }
    }

    /// Build a value from JSON. Strings stay text; dates are not sniffed.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => MockValue::Null,
            Value::Bool(value) => MockValue::Bool(*value),
            Value::Number(number) => match number.as_i64() {
                Some(value) => MockValue::Int(value),
                None => MockValue::Float(number.as_f64().unwrap_or_default()),
            },
            Value::String(value) => MockValue::Text(value.clone()),
            Value::Array(items) => MockValue::List(items.iter().map(MockValue::from_json).collect()),
            Value::Object(map) => MockValue::Record(
                map.iter()
                    .map(|(key, value)| (key.clone(), MockValue::from_json(value)))
                    .collect(),
            ),
        }
    }
}

/// Convert a record into a JSON object.
pub fn record_to_json(record: &Record) -> Map<String, Value> {
    record
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect()
}

impl Serialize for MockValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<bool> for MockValue {
    fn from(value: bool) -> Self {
        MockValue::Bool(value)
    }
}

impl From<i64> for MockValue {
    fn from(value: i64) -> Self {
        MockValue::Int(value)
    }
}

impl From<i32> for MockValue {
    fn from(value: i32) -> Self {
        MockValue::Int(i64::from(value))
    }
}

impl From<u32> for MockValue {
    fn from(value: u32) -> Self {
        MockValue::Int(i64::from(value))
    }
}

impl From<f64> for MockValue {
    fn from(value: f64) -> Self {
        MockValue::Float(value)
    }
}

impl From<&str> for MockValue {
    fn from(value: &str) -> Self {
        MockValue::Text(value.to_string())
    }
}

impl From<String> for MockValue {
    fn from(value: String) -> Self {
        MockValue::Text(value)
    }
}

impl From<NaiveDate> for MockValue {
    fn from(value: NaiveDate) -> Self {
        MockValue::Date(value)
    }
}

impl From<NaiveDateTime> for MockValue {
    fn from(value: NaiveDateTime) -> Self {
        MockValue::Timestamp(value)
    }
}

impl From<Vec<MockValue>> for MockValue {
    fn from(value: Vec<MockValue>) -> Self {
        MockValue::List(value)
    }
}

impl From<Record> for MockValue {
    fn from(value: Record) -> Self {
        MockValue::Record(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_renders_as_json_object() {
        let mut record = Record::new();
        record.insert("age".to_string(), MockValue::Int(30));
        record.insert(
            "birthdate".to_string(),
            MockValue::Date(NaiveDate::from_ymd_opt(1994, 5, 17).expect("valid date")),
        );
        record.insert("tags".to_string(), MockValue::List(vec!["a".into()]));

        let value = MockValue::Record(record).to_json();
        assert_eq!(
            value,
            json!({"age": 30, "birthdate": "1994-05-17", "tags": ["a"]})
        );
    }

    #[test]
    fn compare_mixes_numeric_kinds() {
        assert_eq!(
            MockValue::Int(3).compare(&MockValue::Float(2.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(MockValue::Text("a".into()).compare(&MockValue::Int(1)), None);
    }
}
