//! # Cloudmock Runtime
//!
//! The moving parts of a simulation session.
//!
//! ## Core Components
//!
//! - **[`EntityStore`]**: keyed collections of typed records with cascade and
//!   reject semantics on delete
//! - **[`Scheduler`]**: delayed, strictly ordered delivery of lifecycle events
//! - **[`MockState`]**: store, scheduler, clock and config of one session, passed
//!   explicitly to every handler
//! - **[`Router`]**: matches intercepted requests to [`Handler`]s and turns their
//!   errors into envelopes
//!
//! ## Example
//!
//! ```ignore
//! use cloudmock_runtime::{MockConfig, MockRequest, MockState};
//!
//! let state = Arc::new(MockState::new(Arc::new(SystemClock), MockConfig::from_env()));
//! state.init(&seeders)?;
//! let driver = state.spawn_driver();
//!
//! let response = router.dispatch(&state, &MockRequest::get("/v4/domains"));
//!
//! state.shutdown();
//! driver.await?;
//! ```

/// Session configuration
pub mod config;

/// Field-by-field body parsing
pub mod payload;

/// Request matching and dispatch
pub mod router;

/// Event chains and delivery
pub mod scheduler;

/// Session state and seeding
pub mod state;

/// Entity collections
pub mod store;

pub use config::{ConfigError, MockConfig};
pub use payload::Payload;
pub use router::{Handler, MatchedRequest, MockRequest, Route, Router};
pub use scheduler::{ChainId, EventChain, FollowUp, Scheduler};
pub use state::{MockState, Seeder};
pub use store::EntityStore;
