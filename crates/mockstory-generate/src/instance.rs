use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};

use mockstory_core::{MockError, MockValue, Record, record_to_json};
use mockstory_schema::Schema;

use crate::effects::value_key;
use crate::errors::GenerationError;
use crate::model::ResolutionReport;

/// One resolved record tied to the schema it came from.
#[derive(Debug, Clone)]
pub struct Instance {
    schema: Schema,
    id: MockValue,
    name: Option<String>,
    values: Record,
    report: ResolutionReport,
}

impl Instance {
    /// Wrap resolved values. Without an id accessor the id is `fallback_id`.
    pub(crate) fn new(
        schema: Schema,
        values: Record,
        report: ResolutionReport,
        fallback_id: MockValue,
    ) -> Self {
        let mut instance = Self {
            schema,
            id: fallback_id,
            name: None,
            values,
            report,
        };
        instance.refresh_identity();
        instance
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn schema_name(&self) -> &str {
        self.schema.name()
    }

    pub fn id(&self) -> &MockValue {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn values(&self) -> &Record {
        &self.values
    }

    pub fn get(&self, field: &str) -> Option<&MockValue> {
        self.values.get(field)
    }

    pub fn report(&self) -> &ResolutionReport {
        &self.report
    }

    /// Replace one declared field and recompute id and name.
    pub fn set(&mut self, field: &str, value: impl Into<MockValue>) -> Result<(), GenerationError> {
        if !self.schema.has_field(field) {
            return Err(MockError::UnknownField {
                schema: self.schema.name().to_string(),
                field: field.to_string(),
            }
            .into());
        }
        self.values.insert(field.to_string(), value.into());
        self.refresh_identity();
        Ok(())
    }

    pub(crate) fn values_mut(&mut self) -> &mut Record {
        &mut self.values
    }

    /// Re-read id and name through the schema accessors.
    pub(crate) fn refresh_identity(&mut self) {
        if let Some(accessor) = self.schema.id_accessor() {
            self.id = accessor.get(&self.values).unwrap_or(MockValue::Null);
        }
        self.name = self
            .schema
            .name_accessor()
            .and_then(|accessor| accessor.get(&self.values))
            .map(|value| value_key(&value));
    }

    /// Default story slot: name, then declared id, then schema name.
    pub(crate) fn default_slot(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        if self.schema.id_accessor().is_some() {
            return value_key(&self.id);
        }
        self.schema.name().to_string()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(record_to_json(&self.values))
    }

    /// Typed view of the values.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, GenerationError> {
        Ok(serde_json::from_value(self.to_json())?)
    }

    /// SHA-256 of the canonical JSON form, hex encoded.
    pub fn fingerprint(&self) -> Result<String, GenerationError> {
        let bytes = serde_json::to_vec(&self.to_json())?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}
