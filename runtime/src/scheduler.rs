//! Delayed, ordered delivery of lifecycle notifications.
//!
//! A handler describes the lifecycle of one mutation as an [`EventChain`]: an
//! action, an entity snapshot and an ordered list of stages. The scheduler keeps
//! every undelivered stage in a single queue ordered by due time, then chain, then
//! stage position. Stage `n` of a chain is due at
//! `max(due(n - 1), enqueued_at + delay(n))`, so a chain can never be observed out
//! of order even when its delays are not monotonic.
//!
//! Delivery is pull-based: [`Scheduler::deliver_due`] emits everything whose due
//! time has passed on the session clock. A driver task (see
//! [`MockState::spawn_driver`](crate::state::MockState::spawn_driver)) can call it
//! on a timer; tests call it after advancing a virtual clock.

use crate::state::MockState;
use chrono::{DateTime, TimeDelta, Utc};
use cloudmock_core::entity::EntityRef;
use cloudmock_core::error::MockError;
use cloudmock_core::event::{Event, EventAction, Stages};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Work to run once every stage of a chain has been delivered.
///
/// A failing follow-up is logged and dropped; it never affects the request that
/// enqueued the chain, which has long since returned.
pub type FollowUp = Box<dyn FnOnce(&MockState) -> Result<(), MockError> + Send>;

/// Identity of one enqueue call, in enqueue order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChainId(u64);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of one mutation, ready to be enqueued.
///
/// # Example
///
/// ```ignore
/// state.enqueue(
///     EventChain::new(EventAction::DomainImport, domain.entity_ref())
///         .then(move |state| {
///             state.store().update::<Domain>(id, &json!({"status": "active"}))?;
///             Ok(())
///         }),
/// );
/// ```
pub struct EventChain {
    action: EventAction,
    entity: EntityRef,
    secondary: Option<EntityRef>,
    stages: Option<Stages>,
    follow_up: Option<FollowUp>,
}

impl fmt::Debug for EventChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChain")
            .field("action", &self.action)
            .field("entity", &self.entity)
            .field("secondary", &self.secondary)
            .field("stages", &self.stages)
            .field("follow_up", &self.follow_up.is_some())
            .finish()
    }
}

impl EventChain {
    /// Chain using the action's default stages
    #[must_use]
    pub const fn new(action: EventAction, entity: EntityRef) -> Self {
        Self {
            action,
            entity,
            secondary: None,
            stages: None,
            follow_up: None,
        }
    }

    /// Replaces the default stages. An empty list delivers nothing.
    #[must_use]
    pub fn with_stages(mut self, stages: Stages) -> Self {
        self.stages = Some(stages);
        self
    }

    /// Second entity involved in the action (e.g. the record of a domain)
    #[must_use]
    pub fn with_secondary(mut self, entity: EntityRef) -> Self {
        self.secondary = Some(entity);
        self
    }

    /// Runs `follow_up` after the last stage has been delivered
    #[must_use]
    pub fn then(
        mut self,
        follow_up: impl FnOnce(&MockState) -> Result<(), MockError> + Send + 'static,
    ) -> Self {
        self.follow_up = Some(Box::new(follow_up));
        self
    }

    /// Action of the chain
    #[must_use]
    pub const fn action(&self) -> EventAction {
        self.action
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct PendingStage {
    due: DateTime<Utc>,
    chain: ChainId,
    position: usize,
}

struct Chain {
    action: EventAction,
    entity: EntityRef,
    secondary: Option<EntityRef>,
    stages: Stages,
    follow_up: Option<FollowUp>,
}

#[derive(Default)]
struct Queue {
    last_chain: u64,
    last_sequence: u64,
    pending: BTreeSet<PendingStage>,
    chains: HashMap<ChainId, Chain>,
    completed: Vec<FollowUp>,
}

/// Pending lifecycle stages of every chain in a session.
pub struct Scheduler {
    queue: Mutex<Queue>,
    wake: Notify,
    /// Bumped by every [`Scheduler::clear`]; follow-ups taken before a clear are dropped
    epoch: AtomicU64,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = self.queue.lock();
        f.debug_struct("Scheduler")
            .field("pending", &queue.pending.len())
            .field("chains", &queue.chains.len())
            .field("last_sequence", &queue.last_sequence)
            .finish_non_exhaustive()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Creates an empty scheduler
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(Queue::default()),
            wake: Notify::new(),
            epoch: AtomicU64::new(0),
        }
    }

    /// Queues every stage of `chain` relative to `now`.
    ///
    /// Chains without explicit stages use
    /// [`EventAction::default_stages`] with `interval`.
    pub fn enqueue(&self, chain: EventChain, now: DateTime<Utc>, interval: Duration) -> ChainId {
        let EventChain {
            action,
            entity,
            secondary,
            stages,
            follow_up,
        } = chain;
        let stages = stages.unwrap_or_else(|| action.default_stages(interval));

        let mut guard = self.queue.lock();
        let queue = &mut *guard;
        queue.last_chain += 1;
        let id = ChainId(queue.last_chain);

        tracing::debug!(
            chain = %id,
            %action,
            entity = %entity.id,
            stages = stages.len(),
            "Enqueued event chain"
        );
        metrics::counter!("mock.scheduler.enqueued").increment(1);

        if stages.is_empty() {
            if let Some(follow_up) = follow_up {
                queue.completed.push(follow_up);
            }
        } else {
            let mut previous = now;
            for (position, stage) in stages.iter().enumerate() {
                let due = offset(now, stage.delay).max(previous);
                queue.pending.insert(PendingStage {
                    due,
                    chain: id,
                    position,
                });
                previous = due;
            }
            queue.chains.insert(
                id,
                Chain {
                    action,
                    entity,
                    secondary,
                    stages,
                    follow_up,
                },
            );
        }
        drop(guard);

        self.wake.notify_one();
        id
    }

    /// Delivers every stage due at or before the state's current time, then runs
    /// the follow-ups of completed chains.
    ///
    /// Follow-ups may enqueue further chains; stages of those that are already
    /// due are delivered in the same call. Follow-ups still waiting when the
    /// scheduler is cleared are dropped. Returns the number of events delivered.
    pub fn deliver_due(&self, state: &MockState) -> usize {
        let mut delivered = 0;
        loop {
            let (epoch, follow_ups) = {
                let mut guard = self.queue.lock();
                let epoch = self.epoch.load(Ordering::Acquire);
                let queue = &mut *guard;
                let now = state.now();
                let mut events = Vec::new();
                let mut follow_ups = std::mem::take(&mut queue.completed);

                while let Some(next) = queue.pending.first().copied() {
                    if next.due > now {
                        break;
                    }
                    queue.pending.pop_first();
                    let Some(chain) = queue.chains.get(&next.chain) else {
                        continue;
                    };
                    let Some(stage) = chain.stages.get(next.position).copied() else {
                        continue;
                    };

                    queue.last_sequence += 1;
                    let sequence = queue.last_sequence;
                    events.push(Event {
                        id: sequence,
                        action: chain.action,
                        entity: chain.entity.clone(),
                        secondary_entity: chain.secondary.clone(),
                        status: stage.status,
                        sequence,
                        created: next.due,
                        percent_complete: stage.percent_complete(next.position, chain.stages.len()),
                    });
                    metrics::counter!("mock.scheduler.delivered", "status" => stage.status.as_str())
                        .increment(1);

                    if next.position + 1 == chain.stages.len() {
                        if let Some(done) = queue.chains.remove(&next.chain) {
                            follow_ups.extend(done.follow_up);
                        }
                    }
                }

                for event in &events {
                    tracing::debug!(
                        sequence = event.sequence,
                        action = %event.action,
                        status = %event.status,
                        entity = %event.entity.id,
                        "Delivered event"
                    );
                }
                delivered += events.len();
                // Appended while the queue is still locked so concurrent deliveries
                // cannot interleave sequence numbers in the log.
                state.store().append_events(events);
                (epoch, follow_ups)
            };

            if follow_ups.is_empty() {
                break;
            }
            for follow_up in follow_ups {
                if self.epoch.load(Ordering::Acquire) != epoch {
                    tracing::debug!("Scheduler cleared; dropping follow-ups of the previous session");
                    break;
                }
                if let Err(err) = follow_up(state) {
                    tracing::warn!(error = %err, "Event follow-up failed");
                    metrics::counter!("mock.scheduler.follow_up_failures").increment(1);
                }
            }
        }
        delivered
    }

    /// Number of stages not yet delivered
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.lock().pending.len()
    }

    /// True when nothing is pending and no follow-up is waiting to run
    #[must_use]
    pub fn is_idle(&self) -> bool {
        let queue = self.queue.lock();
        queue.pending.is_empty() && queue.completed.is_empty()
    }

    /// Due time of the earliest pending stage
    #[must_use]
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.queue.lock().pending.first().map(|stage| stage.due)
    }

    /// Due time of the latest pending stage
    #[must_use]
    pub fn last_due(&self) -> Option<DateTime<Utc>> {
        self.queue.lock().pending.last().map(|stage| stage.due)
    }

    /// Drops everything pending and restarts chain and sequence numbering
    pub fn clear(&self) {
        let mut queue = self.queue.lock();
        *queue = Queue::default();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        drop(queue);
        self.wake.notify_one();
    }

    pub(crate) const fn wake(&self) -> &Notify {
        &self.wake
    }
}

fn offset(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(delay)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
