//! Error taxonomy shared by the store, the scheduler and every handler.
//!
//! There are exactly three kinds of failure:
//!
//! - [`MockError::NotFound`]: an id or route that does not exist (404)
//! - [`MockError::Validation`]: a malformed payload, one entry per offending field (400)
//! - [`MockError::Internal`]: anything else; fatal to a single request only (500)
//!
//! Errors are values. Handlers propagate them with `?` and the router turns them
//! into an error envelope at the handler boundary.

use crate::entity::EntityId;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reason used by every not-found envelope.
pub const NOT_FOUND_REASON: &str = "Not found";

/// A single field-level validation failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Offending field, or `None` when the failure concerns the payload as a whole
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub field: Option<String>,
    /// Human-readable reason
    pub reason: String,
}

impl FieldError {
    /// Creates an error attached to `field`
    #[must_use]
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            reason: reason.into(),
        }
    }

    /// Creates an error that is not attached to any field
    #[must_use]
    pub fn general(reason: impl Into<String>) -> Self {
        Self {
            field: None,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{field}: {}", self.reason),
            None => write!(f, "{}", self.reason),
        }
    }
}

/// Errors surfaced by store operations and request handlers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MockError {
    /// The referenced entity, collection member or route does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The request payload was rejected. Never empty.
    #[error("validation failed: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    /// Unexpected failure, e.g. a stored record that no longer deserializes.
    #[error("internal error: {0}")]
    Internal(String),
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl MockError {
    /// Not-found error for an entity of `kind` with the given id
    #[must_use]
    pub fn not_found(kind: impl fmt::Display, id: EntityId) -> Self {
        Self::NotFound(format!("{kind} {id}"))
    }

    /// Validation error with a single field entry
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, reason)])
    }

    /// Validation error that is not attached to a field
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::general(reason)])
    }

    /// HTTP-style status code of the error envelope
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this is a [`MockError::NotFound`]
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this is a [`MockError::Validation`]
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Envelope entries for this error
    #[must_use]
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            Self::NotFound(_) => vec![FieldError::general(NOT_FOUND_REASON)],
            Self::Validation(errors) => errors.clone(),
            Self::Internal(_) => vec![FieldError::general("An internal error occurred")],
        }
    }
}

impl From<serde_json::Error> for MockError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("serialization: {err}"))
    }
}

/// Accumulates field errors so a handler can report every offending field at once.
///
/// ```
/// use cloudmock_core::error::FieldErrors;
///
/// let mut errors = FieldErrors::new();
/// errors.check(false, "domain", "domain is required");
/// errors.check(true, "ttl_sec", "must not be negative");
/// assert_eq!(errors.len(), 1);
/// assert!(errors.into_result().is_err());
/// ```
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    /// Creates an empty accumulator
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Records `reason` against `field` unless `ok` holds
    pub fn check(&mut self, ok: bool, field: &str, reason: &str) {
        if !ok {
            self.push(field, reason);
        }
    }

    /// Records `reason` against `field`
    pub fn push(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.0.push(FieldError::new(field, reason));
    }

    /// Number of recorded errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when empty, otherwise a [`MockError::Validation`]
    ///
    /// # Errors
    ///
    /// Returns every recorded field error.
    pub fn into_result(self) -> Result<(), MockError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(MockError::Validation(self.0))
        }
    }
}
