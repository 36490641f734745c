//! Response envelopes returned by every handler.
//!
//! ```text
//! single entity   { "data": {...} }
//! collection      { "data": [...], "page": 1, "pages": 3, "results": 61 }
//! empty           {}
//! error           { "errors": [ { "reason": "...", "field": "..." } ] }
//! ```

use crate::error::{FieldError, MockError};
use http::StatusCode;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Envelope of a single entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Single<T> {
    /// The entity
    pub data: T,
}

/// Envelope of one page of a collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items of the requested page (empty past the last page)
    pub data: Vec<T>,
    /// Requested page, 1-based
    pub page: u32,
    /// `ceil(results / page_size)`
    pub pages: u32,
    /// Number of items matching the filter, across all pages
    pub results: usize,
}

impl<T> Page<T> {
    /// Converts the items, keeping the pagination metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            page: self.page,
            pages: self.pages,
            results: self.results,
        }
    }
}

/// Envelope of a failed request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// One entry per problem
    pub errors: Vec<FieldError>,
}

/// What a handler hands back to the interception layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    /// HTTP-style status
    pub status: StatusCode,
    /// JSON body
    pub body: Value,
}

impl Response {
    /// `200 { data: entity }`
    ///
    /// # Errors
    ///
    /// Returns [`MockError::Internal`] if the entity does not serialize.
    pub fn entity<T: Serialize>(entity: &T) -> Result<Self, MockError> {
        Ok(Self {
            status: StatusCode::OK,
            body: serde_json::to_value(Single { data: entity })?,
        })
    }

    /// `200 { data, page, pages, results }`
    ///
    /// # Errors
    ///
    /// Returns [`MockError::Internal`] if an item does not serialize.
    pub fn page<T: Serialize>(page: &Page<T>) -> Result<Self, MockError> {
        Ok(Self {
            status: StatusCode::OK,
            body: serde_json::to_value(page)?,
        })
    }

    /// `200 {}`
    #[must_use]
    pub fn empty() -> Self {
        Self {
            status: StatusCode::OK,
            body: Value::Object(serde_json::Map::new()),
        }
    }

    /// Error envelope for `err`, with its status code
    #[must_use]
    pub fn error(err: &MockError) -> Self {
        let envelope = ErrorEnvelope {
            errors: err.field_errors(),
        };
        Self {
            status: err.status(),
            body: serde_json::to_value(envelope).unwrap_or(Value::Null),
        }
    }

    /// True for 2xx statuses
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The `data` member of a success envelope
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.body.get("data")
    }

    /// Deserializes the whole body, e.g. into `Single<Domain>` or `Page<Domain>`
    ///
    /// # Errors
    ///
    /// Returns the serde error when the body has a different shape.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.body)
    }

    /// Entries of an error envelope (empty for a success)
    #[must_use]
    pub fn errors(&self) -> Vec<FieldError> {
        self.parse::<ErrorEnvelope>()
            .map(|envelope| envelope.errors)
            .unwrap_or_default()
    }
}

impl From<MockError> for Response {
    fn from(err: MockError) -> Self {
        Self::error(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;
    use crate::error::NOT_FOUND_REASON;
    use serde_json::json;

    #[test]
    fn single_wraps_in_data() {
        let response = Response::entity(&json!({"id": 1, "domain": "example.com"}))
            .unwrap_or_else(|e| Response::error(&e));
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, json!({"data": {"id": 1, "domain": "example.com"}}));
    }

    #[test]
    fn not_found_envelope() {
        let response = Response::from(MockError::not_found("domain", EntityId::new(999)));
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.body, json!({"errors": [{"reason": NOT_FOUND_REASON}]}));
    }

    #[test]
    fn validation_envelope_lists_fields() {
        let response = Response::from(MockError::Validation(vec![
            FieldError::new("domain", "domain is required"),
            FieldError::new("type", "type must be master or slave"),
        ]));
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        let errors = response.errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].field.as_deref(), Some("type"));
    }

    #[test]
    fn empty_body_is_an_object() {
        let response = Response::empty();
        assert!(response.is_success());
        assert_eq!(response.body, json!({}));
        assert!(response.errors().is_empty());
    }
}
