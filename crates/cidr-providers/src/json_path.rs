//! Field-path navigation and CIDR extraction for arbitrary JSON documents

use crate::error::ProviderError;
use crds::JsonFilterSpec;
use serde_json::{Map, Value};

/// Object fields probed for a CIDR, in priority order
pub const CIDR_FIELD_CANDIDATES: [&str; 6] =
    ["ip_prefix", "ipv4Prefix", "ipv6Prefix", "cidr", "ipPrefix", "ip"];

/// Element filter: every condition must hold for an object to be kept
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonFilter {
    conditions: Vec<FieldMatcher>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldMatcher {
    field: String,
    values: Vec<String>,
}

impl JsonFilter {
    /// Compiles a filter; allowed values are trimmed and lowercased
    pub fn from_spec(spec: &JsonFilterSpec) -> Self {
        Self {
            conditions: spec
                .field_conditions
                .iter()
                .map(|condition| FieldMatcher {
                    field: condition.field.clone(),
                    values: condition.values.iter().map(|value| value.trim().to_lowercase()).collect(),
                })
                .collect(),
        }
    }

    /// The field must hold a string; with allowed values it must also equal
    /// one of them, ignoring case and surrounding whitespace.
    pub fn matches(&self, item: &Map<String, Value>) -> bool {
        self.conditions.iter().all(|condition| {
            let Some(value) = item.get(&condition.field).and_then(Value::as_str) else {
                return false;
            };
            condition.values.is_empty() || condition.values.contains(&value.trim().to_lowercase())
        })
    }
}

/// Follows a dot-separated path. Empty segments are skipped and an empty path
/// yields the whole document.
pub fn navigate_field<'a>(input: &'a Value, path: &str) -> Result<&'a Value, ProviderError> {
    let mut current = input;
    for segment in path.split('.').filter(|segment| !segment.is_empty()) {
        let Value::Object(map) = current else {
            return Err(ProviderError::SegmentNotObject(segment.to_string()));
        };
        current = map
            .get(segment)
            .ok_or_else(|| ProviderError::MissingSegment(segment.to_string()))?;
    }
    Ok(current)
}

/// Turns the value found at the field path into raw CIDRs
pub fn interpret_cidrs(value: &Value, filter: Option<&JsonFilter>) -> Result<Vec<String>, ProviderError> {
    match value {
        Value::Array(items) => {
            let mut cidrs = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(cidr) => cidrs.push(cidr.clone()),
                    Value::Object(object) => {
                        if filter.is_some_and(|filter| !filter.matches(object)) {
                            continue;
                        }
                        if let Some(cidr) = extract_cidr(object) {
                            cidrs.push(cidr.to_string());
                        }
                    }
                    other => return Err(ProviderError::UnsupportedArrayElement(other.to_string())),
                }
            }
            Ok(cidrs)
        }
        Value::String(cidr) => Ok(vec![cidr.clone()]),
        other => Err(ProviderError::UnsupportedFieldType(json_type_name(other))),
    }
}

/// First non-empty candidate field of an object
pub fn extract_cidr(object: &Map<String, Value>) -> Option<&str> {
    CIDR_FIELD_CANDIDATES.iter().find_map(|field| {
        object
            .get(*field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|cidr| !cidr.is_empty())
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
