//! Property tests for event delivery ordering.
//!
//! Random chains with arbitrary (non-monotonic) stage delays are enqueued at
//! random points in time, and the clock is advanced in random steps. Whatever the
//! interleaving, each chain's events must come out in stage order, exactly once,
//! never early, with gap-free sequence numbers.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use cloudmock_core::entity::{EntityId, EntityRef, ResourceKind};
use cloudmock_core::environment::Clock;
use cloudmock_core::event::{EventAction, EventStatus, Stage, Stages};
use cloudmock_runtime::{EventChain, MockConfig, MockState};
use cloudmock_testing::test_clock;
use proptest::prelude::*;
use std::collections::HashMap;
use std::time::Duration;

const WIDGET: ResourceKind = ResourceKind::new("widget");

const STATUSES: [EventStatus; 4] = [
    EventStatus::Scheduled,
    EventStatus::Started,
    EventStatus::Notification,
    EventStatus::Finished,
];

fn chain_strategy() -> impl Strategy<Value = (u64, Vec<u64>)> {
    // (wait before enqueue in ms, stage delays in ms)
    (0u64..3_000, prop::collection::vec(0u64..5_000, 1..4))
}

proptest! {
    #[test]
    fn delivery_preserves_chain_order(
        chains in prop::collection::vec(chain_strategy(), 1..8),
        steps in prop::collection::vec(1u64..2_000, 1..20),
    ) {
        let clock = test_clock();
        let state = MockState::new(clock.clone(), MockConfig::default());

        // chain index -> (enqueue time, delays) keyed by entity id
        let mut expected: HashMap<EntityId, Vec<(EventStatus, chrono::DateTime<chrono::Utc>)>> =
            HashMap::new();

        for (index, (wait, delays)) in chains.iter().enumerate() {
            clock.advance(Duration::from_millis(*wait));
            state.deliver_due();

            let id = EntityId::new(index as u64 + 1);
            let stages: Stages = delays
                .iter()
                .enumerate()
                .map(|(n, delay)| Stage::new(STATUSES[n % STATUSES.len()], Duration::from_millis(*delay)))
                .collect();

            let enqueued_at = clock.now();
            let mut previous = enqueued_at;
            let mut due = Vec::new();
            for stage in &stages {
                let at = (enqueued_at + chrono::TimeDelta::from_std(stage.delay).unwrap()).max(previous);
                due.push((stage.status, at));
                previous = at;
            }
            expected.insert(id, due);

            state.enqueue(
                EventChain::new(
                    EventAction::DomainUpdate,
                    EntityRef::new(id, format!("w{index}"), WIDGET, format!("/v4/widgets/{index}")),
                )
                .with_stages(stages),
            );
        }

        for step in &steps {
            clock.advance(Duration::from_millis(*step));
            state.deliver_due();

            for event in state.events() {
                prop_assert!(event.created <= clock.now(), "event delivered early");
            }
        }

        // Drain everything
        clock.advance(Duration::from_secs(3_600));
        state.deliver_due();

        let events = state.events();
        let total: usize = expected.values().map(Vec::len).sum();
        prop_assert_eq!(events.len(), total);

        for (n, event) in events.iter().enumerate() {
            prop_assert_eq!(event.sequence, n as u64 + 1);
        }

        for (id, due) in &expected {
            let delivered: Vec<_> = events
                .iter()
                .filter(|e| e.entity.id == *id)
                .map(|e| (e.status, e.created))
                .collect();
            prop_assert_eq!(&delivered, due);
        }
        prop_assert!(state.scheduler().is_idle());
    }
}
