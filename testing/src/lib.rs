//! # Cloudmock Testing
//!
//! Testing utilities for cloudmock resources.
//!
//! This crate provides:
//! - [`VirtualClock`]: session time that only moves when a test says so
//! - [`Harness`]: a seeded session plus router, with `advance`/`settle`
//! - [`HandlerTest`]: Given-When-Then tests for a single request
//! - [`assertions`]: envelope and event-log checks
//!
//! ## Example
//!
//! ```ignore
//! use cloudmock_testing::{HandlerTest, assertions::assert_event_chain};
//!
//! #[test]
//! fn create_notifies() {
//!     HandlerTest::new(cloudmock_resources::routes(&MockConfig::default()))
//!         .when(MockRequest::post("/v4/domains", json!({"domain": "example.com", "soa_email": "a@example.com"})))
//!         .then_response(|response| assert!(response.is_success()))
//!         .then_events(|events| {
//!             assert_event_chain(events, EventAction::DomainCreate, EntityId::new(1), &[EventStatus::Notification]);
//!         })
//!         .run();
//! }
//! ```

use chrono::{DateTime, TimeDelta, Utc};
use cloudmock_core::environment::Clock;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, TimeDelta, Utc};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    /// Virtual clock for deterministic tests
    ///
    /// Stands still until [`VirtualClock::advance`] or [`VirtualClock::set`] moves
    /// it, which makes stage delays testable without sleeping.
    ///
    /// # Example
    ///
    /// ```
    /// use cloudmock_testing::mocks::VirtualClock;
    /// use cloudmock_core::environment::Clock;
    /// use chrono::Utc;
    /// use std::time::Duration;
    ///
    /// let clock = VirtualClock::new(Utc::now());
    /// let before = clock.now();
    /// assert_eq!(clock.now(), before);
    /// clock.advance(Duration::from_secs(3));
    /// assert_eq!((clock.now() - before).num_seconds(), 3);
    /// ```
    #[derive(Debug)]
    pub struct VirtualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl VirtualClock {
        /// Create a clock stopped at `start`
        #[must_use]
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(start),
            }
        }

        /// Move time forward
        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock();
            let next = TimeDelta::from_std(by)
                .ok()
                .and_then(|delta| now.checked_add_signed(delta))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            *now = next;
        }

        /// Jump to `at`; never moves backwards
        pub fn set(&self, at: DateTime<Utc>) {
            let mut now = self.now.lock();
            let next = (*now).max(at);
            *now = next;
        }
    }

    impl Clock for VirtualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock()
        }
    }

    /// Create a virtual clock for tests, stopped at 2025-01-01 00:00:00 UTC
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> Arc<VirtualClock> {
        Arc::new(VirtualClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        ))
    }
}

/// Session harness
pub mod harness;


pub use handler_test::{HandlerTest, assertions};
pub use harness::Harness;
pub use mocks::{VirtualClock, test_clock};

/// Installs a `fmt` subscriber honoring `RUST_LOG`, once per process.
///
/// Later calls are no-ops, so every test may call it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_virtual_clock() {
        let clock = test_clock();
        let start = clock.now();
        assert_eq!(clock.now(), start);

        clock.advance(Duration::from_millis(1500));
        assert_eq!((clock.now() - start).num_milliseconds(), 1500);

        clock.set(start);
        assert_eq!((clock.now() - start).num_milliseconds(), 1500);
    }
}
