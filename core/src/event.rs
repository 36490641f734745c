//! Notification types produced by the scheduler.
//!
//! A mutating request describes its lifecycle as an ordered list of [`Stage`]s.
//! The scheduler turns each stage into exactly one [`Event`] once its delay has
//! elapsed. Action names form a closed enum so that adding an action is a
//! compile-checked change: [`EventAction::default_stages`] matches exhaustively.

use crate::entity::EntityRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::fmt;
use std::time::Duration;

/// Stage list of one enqueue call. Most actions have at most four stages.
pub type Stages = SmallVec<[Stage; 4]>;

/// Well-known action kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// A domain was created (also used for clones)
    DomainCreate,
    /// A domain's attributes changed
    DomainUpdate,
    /// A domain was deleted
    DomainDelete,
    /// A domain is being imported from a remote nameserver
    DomainImport,
    /// A record was added to a domain
    DomainRecordCreate,
    /// A record changed
    DomainRecordUpdate,
    /// A record was removed
    DomainRecordDelete,
}

impl EventAction {
    /// Wire name, e.g. `"domain_create"`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DomainCreate => "domain_create",
            Self::DomainUpdate => "domain_update",
            Self::DomainDelete => "domain_delete",
            Self::DomainImport => "domain_import",
            Self::DomainRecordCreate => "domain_record_create",
            Self::DomainRecordUpdate => "domain_record_update",
            Self::DomainRecordDelete => "domain_record_delete",
        }
    }

    /// Lifecycle of the action, stage `i` firing `(i + 1) * interval` after enqueue
    #[must_use]
    pub fn default_stages(self, interval: Duration) -> Stages {
        match self {
            Self::DomainCreate
            | Self::DomainUpdate
            | Self::DomainDelete
            | Self::DomainRecordCreate
            | Self::DomainRecordUpdate
            | Self::DomainRecordDelete => smallvec![Stage::new(EventStatus::Notification, interval)],
            Self::DomainImport => smallvec![
                Stage::new(EventStatus::Scheduled, interval),
                Stage::progress(EventStatus::Started, interval * 2),
                Stage::new(EventStatus::Finished, interval * 3),
            ],
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle stage reported by an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Accepted, not started
    Scheduled,
    /// In progress
    Started,
    /// One-shot informational event
    Notification,
    /// Completed successfully
    Finished,
    /// Completed unsuccessfully
    Failed,
}

impl EventStatus {
    /// Whether no further stage is expected after this one
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Notification | Self::Finished | Self::Failed)
    }

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Started => "started",
            Self::Notification => "notification",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `{status, delay}` entry of an enqueue call.
///
/// `delay` is measured from the enqueue time, not from the previous stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stage {
    /// Status of the event this stage produces
    pub status: EventStatus,
    /// Time from enqueue until the stage fires
    pub delay: Duration,
    /// Whether the event reports `percent_complete`
    pub progress: bool,
}

impl Stage {
    /// A plain stage
    #[must_use]
    pub const fn new(status: EventStatus, delay: Duration) -> Self {
        Self {
            status,
            delay,
            progress: false,
        }
    }

    /// A stage whose event carries a completion percentage
    #[must_use]
    pub const fn progress(status: EventStatus, delay: Duration) -> Self {
        Self {
            status,
            delay,
            progress: true,
        }
    }

    /// Completion percentage reported by this stage at `position` of `total`
    #[must_use]
    pub fn percent_complete(&self, position: usize, total: usize) -> Option<u8> {
        if self.status == EventStatus::Finished {
            return Some(100);
        }
        if !self.progress || total == 0 {
            return None;
        }
        let percent = (position + 1) * 100 / total;
        u8::try_from(percent.min(100)).ok()
    }
}

/// A delivered notification. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event id
    pub id: u64,
    /// What happened
    pub action: EventAction,
    /// Snapshot of the primary entity taken at enqueue time
    pub entity: EntityRef,
    /// Snapshot of a related entity, e.g. the record of a domain record event
    pub secondary_entity: Option<EntityRef>,
    /// Stage this event reports
    pub status: EventStatus,
    /// Delivery order across all chains, strictly increasing
    pub sequence: u64,
    /// Delivery time on the session clock
    pub created: DateTime<Utc>,
    /// Progress of long-running actions
    pub percent_complete: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_actions_notify_once() {
        let stages = EventAction::DomainUpdate.default_stages(Duration::from_secs(1));
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].status, EventStatus::Notification);
        assert_eq!(stages[0].delay, Duration::from_secs(1));
    }

    #[test]
    fn import_runs_through_progress_to_finished() {
        let stages = EventAction::DomainImport.default_stages(Duration::from_millis(500));
        let statuses: Vec<_> = stages.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![EventStatus::Scheduled, EventStatus::Started, EventStatus::Finished]
        );
        assert_eq!(stages[2].delay, Duration::from_millis(1500));
        assert!(stages[1].progress);
    }

    #[test]
    fn percent_complete_by_position() {
        let started = Stage::progress(EventStatus::Started, Duration::ZERO);
        assert_eq!(started.percent_complete(1, 3), Some(66));
        let scheduled = Stage::new(EventStatus::Scheduled, Duration::ZERO);
        assert_eq!(scheduled.percent_complete(0, 3), None);
        let finished = Stage::new(EventStatus::Finished, Duration::ZERO);
        assert_eq!(finished.percent_complete(2, 3), Some(100));
    }

    #[test]
    fn action_wire_names() {
        let json = serde_json::to_value(EventAction::DomainRecordCreate).unwrap_or_default();
        assert_eq!(json, "domain_record_create");
        assert_eq!(EventAction::DomainCreate.to_string(), "domain_create");
    }
}
