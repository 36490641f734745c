//! # Cloudmock Resources
//!
//! Reference resource kinds built on the cloudmock runtime: DNS domains, their
//! records, and the account notification feed.
//!
//! ## Routes
//!
//! | Name | Method + path |
//! |---|---|
//! | `domains.list` | `GET /v4/domains` |
//! | `domains.import` | `POST /v4/domains/import` |
//! | `domains.create` | `POST /v4/domains` |
//! | `domains.get` | `GET /v4/domains/:id` |
//! | `domains.update` | `PUT /v4/domains/:id` |
//! | `domains.delete` | `DELETE /v4/domains/:id` |
//! | `domains.clone` | `POST /v4/domains/:id/clone` |
//! | `domains.records.*` | `/v4/domains/:id/records[/:record_id]` |
//! | `events.list` | `GET /v4/account/events` |
//!
//! ## Example
//!
//! ```ignore
//! use cloudmock_resources::{routes, seeders};
//!
//! let config = MockConfig::from_env();
//! let state = MockState::new(Arc::new(SystemClock), config.clone());
//! state.init(&seeders())?;
//! let router = routes(&config);
//! let response = router.dispatch(&state, &MockRequest::get("/v4/domains?page=2"));
//! ```

/// Domain handlers
pub mod domains;

/// Notification feed
pub mod events;

/// Domain record handlers
pub mod records;

/// Initial data
pub mod seed;

/// Entity types
pub mod types;

use cloudmock_runtime::{MockConfig, Router, Seeder};
use http::Method;

pub use seed::DomainSeeder;
pub use types::{Domain, DomainRecord, DomainStatus, DomainType, RecordType};

/// Every handler of this crate, minus the ones `config` disables
#[must_use]
pub fn routes(config: &MockConfig) -> Router {
    Router::new()
        .route("domains.list", Method::GET, "/v4/domains", domains::list)
        .route("domains.import", Method::POST, "/v4/domains/import", domains::import)
        .route("domains.create", Method::POST, "/v4/domains", domains::create)
        .route("domains.get", Method::GET, "/v4/domains/:id", domains::get)
        .route("domains.update", Method::PUT, "/v4/domains/:id", domains::update)
        .route("domains.delete", Method::DELETE, "/v4/domains/:id", domains::delete)
        .route("domains.clone", Method::POST, "/v4/domains/:id/clone", domains::clone)
        .route("domains.records.list", Method::GET, "/v4/domains/:id/records", records::list)
        .route(
            "domains.records.get",
            Method::GET,
            "/v4/domains/:id/records/:record_id",
            records::get,
        )
        .route(
            "domains.records.create",
            Method::POST,
            "/v4/domains/:id/records",
            records::create,
        )
        .route(
            "domains.records.update",
            Method::PUT,
            "/v4/domains/:id/records/:record_id",
            records::update,
        )
        .route(
            "domains.records.delete",
            Method::DELETE,
            "/v4/domains/:id/records/:record_id",
            records::delete,
        )
        .route("events.list", Method::GET, "/v4/account/events", events::list)
        .without(&config.disabled_handlers)
}

/// Seeders for every seedable kind of this crate
#[must_use]
pub fn seeders() -> Vec<Box<dyn Seeder>> {
    vec![Box::new(DomainSeeder)]
}
