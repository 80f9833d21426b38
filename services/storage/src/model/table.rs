use std::collections::HashMap;

use cumulo_core::hash::{base64_decode, base64_encode};
use cumulo_core::time::{format_rfc3339, parse_rfc3339, DateTime};
use cumulo_core::{Error, Result};
use serde_json::{Map, Number, Value};

/// A table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Table name.
    pub name: String,
}

/// A typed entity property value.
///
/// The wire format is OData JSON: plain JSON for the types JSON can carry
/// natively, plus an `@odata.type` annotation for the ones it cannot
/// (64-bit integers, binary, timestamps, GUIDs).
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// UTF-8 string.
    String(String),
    /// 32-bit integer.
    Int32(i32),
    /// 64-bit integer, annotated as `Edm.Int64` on the wire.
    Int64(i64),
    /// 64-bit float.
    Double(f64),
    /// Boolean.
    Bool(bool),
    /// UTC timestamp, annotated as `Edm.DateTime`.
    DateTime(DateTime),
    /// Raw bytes, base64 on the wire, annotated as `Edm.Binary`.
    Binary(Vec<u8>),
    /// GUID string, annotated as `Edm.Guid`.
    Guid(String),
}

impl PropertyValue {
    fn odata_type(&self) -> Option<&'static str> {
        match self {
            PropertyValue::Int64(_) => Some("Edm.Int64"),
            PropertyValue::DateTime(_) => Some("Edm.DateTime"),
            PropertyValue::Binary(_) => Some("Edm.Binary"),
            PropertyValue::Guid(_) => Some("Edm.Guid"),
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            PropertyValue::String(v) => Value::String(v.clone()),
            PropertyValue::Int32(v) => Value::Number((*v).into()),
            // Int64 travels as a string so 2^53+ values survive JSON.
            PropertyValue::Int64(v) => Value::String(v.to_string()),
            PropertyValue::Double(v) => Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            PropertyValue::Bool(v) => Value::Bool(*v),
            PropertyValue::DateTime(v) => Value::String(format_rfc3339(*v)),
            PropertyValue::Binary(v) => Value::String(base64_encode(v)),
            PropertyValue::Guid(v) => Value::String(v.clone()),
        }
    }

    fn from_json(value: &Value, odata_type: Option<&str>) -> Result<Self> {
        if let Some(ty) = odata_type {
            let s = value
                .as_str()
                .ok_or_else(|| Error::parse(format!("annotated property {ty} must be a string")))?;
            return match ty {
                "Edm.Int64" => s
                    .parse::<i64>()
                    .map(PropertyValue::Int64)
                    .map_err(|e| Error::parse("invalid Edm.Int64 value").with_source(e)),
                "Edm.DateTime" => parse_rfc3339(s).map(PropertyValue::DateTime),
                "Edm.Binary" => base64_decode(s)
                    .map(PropertyValue::Binary)
                    .map_err(|_| Error::parse("invalid Edm.Binary value")),
                "Edm.Guid" => Ok(PropertyValue::Guid(s.to_string())),
                "Edm.String" => Ok(PropertyValue::String(s.to_string())),
                _ => Err(Error::parse(format!("unsupported property type {ty}"))),
            };
        }

        match value {
            Value::String(s) => Ok(PropertyValue::String(s.clone())),
            Value::Bool(b) => Ok(PropertyValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if let Ok(i) = i32::try_from(i) {
                        Ok(PropertyValue::Int32(i))
                    } else {
                        Ok(PropertyValue::Int64(i))
                    }
                } else {
                    Ok(PropertyValue::Double(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            other => Err(Error::parse(format!(
                "unsupported property value: {other}"
            ))),
        }
    }
}

/// A row within a table, identified by its partition key / row key pair.
///
/// Entities fetched from or inserted into a table carry an etag; update,
/// merge, and delete require all three of partition key, row key, and etag
/// and fail locally when any is missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableEntity {
    /// Name of the owning table.
    pub table: String,
    /// Partition key.
    pub partition_key: String,
    /// Row key, unique within the partition.
    pub row_key: String,
    /// Version marker, set by the service on fetch and insert.
    pub etag: Option<String>,
    /// Server-side modification timestamp.
    pub timestamp: Option<DateTime>,
    properties: HashMap<String, PropertyValue>,
}

impl TableEntity {
    /// Create an entity for insertion.
    pub fn new(
        table: impl Into<String>,
        partition_key: impl Into<String>,
        row_key: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            etag: None,
            timestamp: None,
            properties: HashMap::new(),
        }
    }

    /// Set a property value.
    pub fn set(&mut self, name: impl Into<String>, value: PropertyValue) -> &mut Self {
        self.properties.insert(name.into(), value);
        self
    }

    /// Get a property value.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Remove a property, returning the previous value.
    pub fn remove(&mut self, name: &str) -> Option<PropertyValue> {
        self.properties.remove(name)
    }

    /// Iterate over property names and values, in no particular order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Serialize into the OData JSON body for insert, update, and merge.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            "PartitionKey".to_string(),
            Value::String(self.partition_key.clone()),
        );
        map.insert("RowKey".to_string(), Value::String(self.row_key.clone()));
        for (name, value) in &self.properties {
            if let Some(ty) = value.odata_type() {
                map.insert(format!("{name}@odata.type"), Value::String(ty.to_string()));
            }
            map.insert(name.clone(), value.to_json());
        }
        Value::Object(map)
    }

    /// Rebuild an entity from an OData JSON object.
    ///
    /// `PartitionKey`, `RowKey`, `Timestamp`, `odata.etag`, and the
    /// `@odata.type` annotations are lifted out of the property mapping.
    pub fn from_json(table: &str, value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::parse("entity body is not a JSON object"))?;

        let key_of = |name: &str| -> String {
            obj.get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let mut entity = TableEntity::new(table, key_of("PartitionKey"), key_of("RowKey"));
        entity.etag = obj
            .get("odata.etag")
            .and_then(Value::as_str)
            .map(str::to_string);
        entity.timestamp = match obj.get("Timestamp").and_then(Value::as_str) {
            Some(s) => Some(parse_rfc3339(s)?),
            None => None,
        };

        for (name, raw) in obj {
            if name == "PartitionKey"
                || name == "RowKey"
                || name == "Timestamp"
                || name.starts_with("odata.")
                || name.contains("@odata.type")
            {
                continue;
            }
            let annotation = obj
                .get(&format!("{name}@odata.type"))
                .and_then(Value::as_str);
            entity
                .properties
                .insert(name.clone(), PropertyValue::from_json(raw, annotation)?);
        }

        Ok(entity)
    }

    /// Whether the entity carries what update, merge, and delete need.
    pub fn has_update_identity(&self) -> bool {
        !self.partition_key.is_empty() && !self.row_key.is_empty() && self.etag.is_some()
    }
}
