//! # Cloudmock Core
//!
//! Core types for the cloudmock backend simulation engine.
//!
//! The engine stands in for a cloud provider's control-plane API during local
//! development and automated testing. It keeps related resources consistent and
//! reproduces the asynchronous side of the real API: mutating calls return at once
//! and their lifecycle notifications arrive later, in order.
//!
//! This crate holds everything that does no I/O:
//!
//! - **Entities**: typed records with numeric ids, grouped by [`entity::ResourceKind`]
//! - **Relationships**: per-kind [`entity::Dependent`] declarations (cascade or reject)
//! - **Events**: the closed [`event::EventAction`] enum, lifecycle [`event::Stage`]s and
//!   delivered [`event::Event`] records
//! - **Envelopes**: [`envelope::Response`] with the single, page, empty and error shapes
//! - **Queries**: [`query::PageRequest`] and `X-Filter` parsing in [`query::ListQuery`]
//! - **Errors**: the NotFound / Validation / Internal taxonomy in [`error::MockError`]
//! - **Environment**: the injectable [`environment::Clock`]
//!
//! The store, scheduler and request handling live in `cloudmock-runtime`.

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Entity identity, kinds and relationships
pub mod entity;

/// Response envelopes
pub mod envelope;

/// Error taxonomy
pub mod error;

/// Notifications and lifecycle stages
pub mod event;

/// Pagination and `X-Filter` support
pub mod query;

/// Environment module - Dependency injection traits
///
/// All time-dependent behavior (timestamps, stage delays) reads the session
/// clock through [`Clock`], so tests can swap in a virtual one and advance it
/// synchronously.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Production - uses system clock
    /// let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    ///
    /// // Test - virtual time that only moves when told to
    /// let clock = Arc::new(VirtualClock::new(start));
    /// clock.advance(Duration::from_secs(5));
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

pub use entity::{Dependent, DependentPolicy, Entity, EntityId, EntityRef, ResourceKind, Timestamps};
pub use envelope::{ErrorEnvelope, Page, Response, Single};
pub use error::{FieldError, FieldErrors, MockError};
pub use event::{Event, EventAction, EventStatus, Stage, Stages};
pub use query::{Filter, ListQuery, PageRequest};
