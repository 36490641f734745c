//! A simulation session wired to a router and a virtual clock.

use crate::mocks::{VirtualClock, test_clock};
use cloudmock_core::envelope::Response;
use cloudmock_core::event::Event;
use cloudmock_runtime::{MockConfig, MockRequest, MockState, Router, Seeder};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on `settle` rounds; follow-ups that keep enqueueing forever are a
/// test bug.
const MAX_SETTLE_ROUNDS: usize = 1_000;

/// Session plus router, driven by a [`VirtualClock`].
///
/// # Example
///
/// ```ignore
/// let harness = Harness::new(routes(&MockConfig::default()));
/// let created = harness.send(MockRequest::post("/v4/domains", body));
/// assert!(harness.events().is_empty());
///
/// harness.settle();
/// assert_eq!(harness.events().len(), 1);
/// ```
pub struct Harness {
    clock: Arc<VirtualClock>,
    state: Arc<MockState>,
    router: Router,
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("clock", &self.clock)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Harness {
    /// Unseeded session with default configuration
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self::seeded(router, MockConfig::default(), &[])
    }

    /// Unseeded session with `config`
    #[must_use]
    pub fn with_config(router: Router, config: MockConfig) -> Self {
        Self::seeded(router, config, &[])
    }

    /// Session initialized with `seeders`
    ///
    /// # Panics
    ///
    /// Panics if a seeder fails.
    #[must_use]
    #[allow(clippy::expect_used)] // Test helper
    pub fn seeded(router: Router, config: MockConfig, seeders: &[Box<dyn Seeder>]) -> Self {
        let clock = test_clock();
        let state = Arc::new(MockState::new(clock.clone(), config));
        state.init(seeders).expect("seeding should succeed");
        Self {
            clock,
            state,
            router,
        }
    }

    /// Dispatches one request
    pub fn send(&self, request: MockRequest) -> Response {
        self.router.dispatch(&self.state, &request)
    }

    /// Moves the clock forward and delivers what fell due
    pub fn advance(&self, by: Duration) -> usize {
        self.clock.advance(by);
        self.state.deliver_due()
    }

    /// Moves the clock forward until no stage is pending, running follow-ups
    /// along the way. Returns the number of events delivered.
    ///
    /// # Panics
    ///
    /// Panics if follow-ups keep the scheduler busy for too many rounds.
    #[allow(clippy::panic)] // Test helper
    pub fn settle(&self) -> usize {
        let mut delivered = 0;
        for _ in 0..MAX_SETTLE_ROUNDS {
            delivered += self.state.deliver_due();
            match self.state.scheduler().next_due() {
                Some(due) => self.clock.set(due),
                None if self.state.scheduler().is_idle() => return delivered,
                None => {},
            }
        }
        panic!("scheduler did not settle after {MAX_SETTLE_ROUNDS} rounds");
    }

    /// Delivered events, oldest first
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.state.events()
    }

    /// The session
    #[must_use]
    pub const fn state(&self) -> &Arc<MockState> {
        &self.state
    }

    /// The session clock
    #[must_use]
    pub const fn clock(&self) -> &Arc<VirtualClock> {
        &self.clock
    }

    /// The router
    #[must_use]
    pub const fn router(&self) -> &Router {
        &self.router
    }
}
