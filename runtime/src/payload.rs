//! Field-by-field reading of JSON request bodies.
//!
//! Deserializing a body straight into a typed struct stops at the first bad
//! attribute. Handlers instead read each attribute through [`Payload`], recording
//! a [`FieldErrors`] entry per offending field, so one response names them all.

use cloudmock_core::error::{FieldErrors, MockError};
use serde_json::{Map, Value};

/// A request body known to be a JSON object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Payload {
    fields: Map<String, Value>,
}

impl Payload {
    /// Wraps a request body. A missing body reads as `{}`.
    ///
    /// # Errors
    ///
    /// [`MockError::Validation`] when the body is not an object.
    pub fn from_body(body: Option<&Value>) -> Result<Self, MockError> {
        match body {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(fields)) => Ok(Self {
                fields: fields.clone(),
            }),
            Some(_) => Err(MockError::rejected("request body must be a JSON object")),
        }
    }

    /// Present and not `null`
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.raw(field).is_some()
    }

    /// The attribute, unless missing or `null`
    #[must_use]
    pub fn raw(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|value| !value.is_null())
    }

    /// A string attribute
    pub fn string(&self, field: &str, errors: &mut FieldErrors) -> Option<String> {
        match self.raw(field)? {
            Value::String(value) => Some(value.clone()),
            _ => {
                errors.push(field, format!("{field} must be a string"));
                None
            },
        }
    }

    /// A non-negative integer attribute
    pub fn unsigned(&self, field: &str, errors: &mut FieldErrors) -> Option<u32> {
        let value = self.raw(field)?;
        match value.as_u64().map(u32::try_from) {
            Some(Ok(number)) => Some(number),
            _ => {
                errors.push(field, format!("{field} must be a non-negative integer"));
                None
            },
        }
    }

    /// A list of strings
    pub fn strings(&self, field: &str, errors: &mut FieldErrors) -> Option<Vec<String>> {
        let Value::Array(items) = self.raw(field)? else {
            errors.push(field, format!("{field} must be a list of strings"));
            return None;
        };
        let strings: Option<Vec<String>> = items
            .iter()
            .map(|item| item.as_str().map(ToString::to_string))
            .collect();
        if strings.is_none() {
            errors.push(field, format!("{field} must be a list of strings"));
        }
        strings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_body_is_empty() {
        let payload = Payload::from_body(None).unwrap();
        assert!(!payload.has("domain"));
    }

    #[test]
    fn non_object_body_is_rejected() {
        assert!(Payload::from_body(Some(&json!([1, 2]))).unwrap_err().is_validation());
    }

    #[test]
    fn every_bad_field_is_reported() {
        let body = json!({
            "domain": 42,
            "ttl_sec": -5,
            "tags": ["ok", 3],
            "description": null,
            "group": "web",
        });
        let payload = Payload::from_body(Some(&body)).unwrap();
        let mut errors = FieldErrors::new();

        assert_eq!(payload.string("domain", &mut errors), None);
        assert_eq!(payload.unsigned("ttl_sec", &mut errors), None);
        assert_eq!(payload.strings("tags", &mut errors), None);
        assert_eq!(payload.string("description", &mut errors), None);
        assert_eq!(payload.string("group", &mut errors), Some("web".to_string()));
        assert_eq!(errors.len(), 3);
    }
}
