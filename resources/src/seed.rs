//! Initial domains and records.

use crate::types::{Domain, DomainRecord, RecordType};
use cloudmock_core::entity::Entity;
use cloudmock_core::error::MockError;
use cloudmock_runtime::{MockState, Seeder};

/// Seeds `seed_count("domain")` zones, each with `seed_count("domain_record")`
/// records. Seeded data produces no events.
#[derive(Clone, Copy, Debug, Default)]
pub struct DomainSeeder;

impl Seeder for DomainSeeder {
    fn name(&self) -> &'static str {
        "domains"
    }

    fn seed(&self, state: &MockState) -> Result<(), MockError> {
        let config = state.config();
        let domains = (1..=config.seed_count(Domain::KIND.as_str()))
            .map(|n| {
                let name = format!("seeded-{n}.example.com");
                Domain {
                    soa_email: format!("admin@{name}"),
                    ttl_sec: 300,
                    ..Domain::new(name)
                }
            })
            .collect();
        let domains = state.store().add_many(domains)?;

        let per_domain = config.seed_count(DomainRecord::KIND.as_str());
        let records = domains
            .iter()
            .flat_map(|domain| {
                (0..per_domain).map(|n| {
                    let kind = RecordType::ALL[n % RecordType::ALL.len()];
                    let last_octet = n % 254 + 1;
                    DomainRecord::new(domain.id, kind, format!("host-{n}"), format!("192.0.2.{last_octet}"))
                })
            })
            .collect();
        let records = state.store().add_many(records)?;

        tracing::debug!(domains = domains.len(), records = records.len(), "Seeded domains");
        Ok(())
    }
}
