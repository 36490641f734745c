//! Session state shared by every handler.
//!
//! A [`MockState`] bundles the clock, the configuration, the [`EntityStore`] and
//! the [`Scheduler`] of one simulation session. There is no global instance:
//! handlers, seeders and follow-ups receive it explicitly, and tests build a fresh
//! one per case.

use crate::config::MockConfig;
use crate::scheduler::{ChainId, EventChain, Scheduler};
use crate::store::EntityStore;
use chrono::{DateTime, Utc};
use cloudmock_core::environment::Clock;
use cloudmock_core::error::MockError;
use cloudmock_core::event::Event;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Populates the store with initial records at session start.
pub trait Seeder: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Adds records to `state`, typically sized by
    /// [`MockConfig::seed_count`].
    ///
    /// # Errors
    ///
    /// Returns any store error; session initialization stops at the first one.
    fn seed(&self, state: &MockState) -> Result<(), MockError>;
}

/// Entity store, scheduler and settings of one simulation session.
pub struct MockState {
    clock: Arc<dyn Clock>,
    config: MockConfig,
    store: EntityStore,
    scheduler: Scheduler,
    shutdown: AtomicBool,
}

impl std::fmt::Debug for MockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockState")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl MockState {
    /// Creates an empty session
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, config: MockConfig) -> Self {
        Self {
            store: EntityStore::new(Arc::clone(&clock)),
            scheduler: Scheduler::new(),
            clock,
            config,
            shutdown: AtomicBool::new(false),
        }
    }

    /// Resets the session and runs every seeder.
    ///
    /// Must complete before the first request is dispatched.
    ///
    /// # Errors
    ///
    /// Returns the first seeder error; the store may then hold a partial seed.
    pub fn init(&self, seeders: &[Box<dyn Seeder>]) -> Result<(), MockError> {
        self.reset();
        for seeder in seeders {
            seeder.seed(self)?;
            tracing::debug!(seeder = seeder.name(), "Seeded");
        }
        tracing::info!(
            seeders = seeders.len(),
            stage_interval_ms = self.config.stage_interval_ms,
            "Mock session initialized"
        );
        Ok(())
    }

    /// Empties every collection, drops pending stages and restarts id and
    /// sequence counters.
    ///
    /// Follow-ups not yet started are dropped. One already running when `reset`
    /// is called still finishes, against the new session.
    pub fn reset(&self) {
        self.scheduler.clear();
        self.store.clear();
        tracing::debug!("Mock session reset");
    }

    /// The session's entity store
    #[must_use]
    pub const fn store(&self) -> &EntityStore {
        &self.store
    }

    /// The session's scheduler
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Session configuration
    #[must_use]
    pub const fn config(&self) -> &MockConfig {
        &self.config
    }

    /// Current time on the session clock
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Base delay of default stages
    #[must_use]
    pub const fn stage_interval(&self) -> Duration {
        self.config.stage_interval()
    }

    /// Schedules the stages of `chain` from now
    pub fn enqueue(&self, chain: EventChain) -> ChainId {
        self.scheduler.enqueue(chain, self.now(), self.stage_interval())
    }

    /// Delivers every due stage; returns how many events were appended
    pub fn deliver_due(&self) -> usize {
        self.scheduler.deliver_due(self)
    }

    /// Delivered notifications, oldest first
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.store.events()
    }

    /// Spawns a task that delivers stages as they fall due on the session clock.
    ///
    /// The task sleeps until the earliest pending stage and wakes early whenever a
    /// chain is enqueued. It ends after [`MockState::shutdown`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_driver(self: &Arc<Self>) -> JoinHandle<()> {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            tracing::debug!("Scheduler driver started");
            while !state.shutdown.load(Ordering::Acquire) {
                state.deliver_due();

                let wake = state.scheduler.wake().notified();
                match state.scheduler.next_due() {
                    Some(due) => {
                        let wait = (due - state.now()).to_std().unwrap_or(Duration::ZERO);
                        tokio::select! {
                            () = tokio::time::sleep(wait) => {},
                            () = wake => {},
                        }
                    },
                    None => wake.await,
                }
            }
            tracing::debug!("Scheduler driver stopped");
        })
    }

    /// Stops the driver task, if any
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.scheduler.wake().notify_one();
    }
}
