#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

//! Notification feed and seeding.

use cloudmock_core::entity::Entity;
use cloudmock_core::envelope::Page;
use cloudmock_core::event::{Event, EventAction};
use cloudmock_resources::{Domain, DomainRecord, routes, seeders};
use cloudmock_runtime::{MockConfig, MockRequest};
use cloudmock_testing::Harness;
use cloudmock_testing::assertions::{assert_no_events, assert_success, assert_validation_error};
use serde_json::json;

fn create(harness: &Harness, name: &str) {
    assert_success(&harness.send(MockRequest::post("/v4/domains", json!({"domain": name}))));
}

#[test]
fn feed_lists_newest_first() {
    let harness = Harness::new(routes(&MockConfig::default()));
    create(&harness, "a.example.com");
    create(&harness, "b.example.com");
    create(&harness, "c.example.com");

    let empty: Page<Event> = harness
        .send(MockRequest::get("/v4/account/events"))
        .parse()
        .unwrap();
    assert_eq!((empty.results, empty.pages), (0, 0));

    harness.settle();
    let page: Page<Event> = harness
        .send(MockRequest::get("/v4/account/events"))
        .parse()
        .unwrap();

    let sequences: Vec<_> = page.data.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, [3, 2, 1]);
    assert_eq!(page.data[0].entity.label, "c.example.com");
}

#[test]
fn feed_filters_by_action() {
    let harness = Harness::new(routes(&MockConfig::default()));
    create(&harness, "a.example.com");
    create(&harness, "b.example.com");
    assert_success(&harness.send(MockRequest::delete("/v4/domains/1")));
    harness.settle();

    let page: Page<Event> = harness
        .send(
            MockRequest::get("/v4/account/events")
                .with_filter(&json!({"action": "domain_delete"})),
        )
        .parse()
        .unwrap();

    assert_eq!(page.results, 1);
    assert_eq!(page.data[0].action, EventAction::DomainDelete);
    assert_eq!(page.data[0].entity.label, "a.example.com");
}

#[test]
fn feed_validates_paging() {
    let harness = Harness::new(routes(&MockConfig::default()));
    let response = harness.send(MockRequest::get("/v4/account/events?page_size=501"));
    assert_validation_error(&response, &["page_size"]);
}

#[test]
fn seeding_follows_config_without_events() {
    let config = MockConfig::default()
        .with_seed("domain", 3)
        .with_seed("domain_record", 2);
    let harness = Harness::seeded(routes(&config), config, &seeders());

    let store = harness.state().store();
    assert_eq!(store.len(Domain::KIND), 3);
    assert_eq!(store.len(DomainRecord::KIND), 6);
    assert!(harness.state().scheduler().is_idle());
    assert_eq!(harness.settle(), 0);
    assert_no_events(&harness.events());
}

#[test]
fn reset_restarts_session() {
    let config = MockConfig::default().with_seed("domain", 2);
    let harness = Harness::seeded(routes(&config), config, &seeders());
    create(&harness, "extra.example.com");
    harness.settle();

    harness.state().init(&seeders()).unwrap();

    assert_eq!(harness.state().store().len(Domain::KIND), 2);
    assert_no_events(&harness.events());
    create(&harness, "again.example.com");
    let domains = harness.state().store().get_all::<Domain>().unwrap();
    assert_eq!(domains.last().unwrap().id.get(), 3);
}
