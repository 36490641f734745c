//! Domain record handlers.
//!
//! Records live under their domain's path. A record id that exists but belongs
//! to another domain is reported as not found.

use crate::types::{Domain, DomainRecord, RecordType};
use cloudmock_core::entity::Entity;
use cloudmock_core::envelope::Response;
use cloudmock_core::error::{FieldErrors, MockError};
use cloudmock_core::event::EventAction;
use cloudmock_runtime::{EventChain, MatchedRequest, MockState, Payload};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Default, Serialize)]
struct RecordFields {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    record_type: Option<RecordType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    weight: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl_sec: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
}

impl RecordFields {
    fn read(payload: &Payload, errors: &mut FieldErrors) -> Self {
        let record_type = payload.string("type", errors).and_then(|raw| {
            let parsed = RecordType::parse(&raw);
            errors.check(
                parsed.is_some(),
                "type",
                "type must be one of A, AAAA, NS, MX, CNAME, TXT, SRV, CAA",
            );
            parsed
        });

        let target = payload.string("target", errors);
        if let Some(target) = &target {
            errors.check(!target.trim().is_empty(), "target", "target must not be empty");
        }

        Self {
            record_type,
            name: payload.string("name", errors),
            target,
            priority: payload.unsigned("priority", errors),
            weight: payload.unsigned("weight", errors),
            port: payload.unsigned("port", errors),
            ttl_sec: payload.unsigned("ttl_sec", errors),
            service: payload.string("service", errors),
            protocol: payload.string("protocol", errors),
            tag: payload.string("tag", errors),
        }
    }
}

/// The domain named by the `id` path parameter
fn parent(state: &MockState, request: &MatchedRequest<'_>) -> Result<Domain, MockError> {
    state.store().get::<Domain>(request.id("id")?)
}

/// The record named by the `record_id` path parameter, if it belongs to `domain`
fn owned(state: &MockState, request: &MatchedRequest<'_>, domain: &Domain) -> Result<DomainRecord, MockError> {
    let id = request.id("record_id")?;
    let record = state.store().get::<DomainRecord>(id)?;
    if record.domain_id == domain.id {
        Ok(record)
    } else {
        Err(MockError::not_found(DomainRecord::KIND, id))
    }
}

fn chain(action: EventAction, domain: &Domain, record: &DomainRecord) -> EventChain {
    EventChain::new(action, domain.entity_ref()).with_secondary(record.entity_ref())
}

/// `GET /v4/domains/:id/records`
///
/// # Errors
///
/// Not found for an unknown domain; validation errors for bad paging or filters.
pub fn list(state: &MockState, request: &MatchedRequest<'_>) -> Result<Response, MockError> {
    let domain = parent(state, request)?;
    let page = request.page_request(state.config())?;
    let query = request.list_query()?;
    let records = state.store().children::<DomainRecord>("domain_id", domain.id)?;
    Response::page(&page.paginate(query.apply(records)?))
}

/// `GET /v4/domains/:id/records/:record_id`
///
/// # Errors
///
/// Not found for an unknown domain or record.
pub fn get(state: &MockState, request: &MatchedRequest<'_>) -> Result<Response, MockError> {
    let domain = parent(state, request)?;
    Response::entity(&owned(state, request, &domain)?)
}

/// `POST /v4/domains/:id/records`
///
/// # Errors
///
/// Not found for an unknown domain; validation errors naming every offending field.
pub fn create(state: &MockState, request: &MatchedRequest<'_>) -> Result<Response, MockError> {
    let domain = parent(state, request)?;
    let payload = request.payload()?;
    let mut errors = FieldErrors::new();
    if !payload.has("type") {
        errors.push("type", "type is required");
    }
    let fields = RecordFields::read(&payload, &mut errors);
    if !payload.has("target") {
        errors.push("target", "target is required");
    }
    errors.into_result()?;

    let (Some(record_type), Some(target)) = (fields.record_type, fields.target) else {
        return Err(MockError::Internal("record fields read without errors but incomplete".into()));
    };
    let record = state.store().add(DomainRecord {
        priority: fields.priority.unwrap_or_default(),
        weight: fields.weight.unwrap_or_default(),
        port: fields.port.unwrap_or_default(),
        ttl_sec: fields.ttl_sec.unwrap_or_default(),
        service: fields.service,
        protocol: fields.protocol,
        tag: fields.tag,
        ..DomainRecord::new(domain.id, record_type, fields.name.unwrap_or_default(), target)
    })?;

    state.enqueue(chain(EventAction::DomainRecordCreate, &domain, &record));
    tracing::debug!(domain = %domain.id, id = %record.id, kind = record.record_type.as_str(), "Record created");
    Response::entity(&record)
}

/// `PUT /v4/domains/:id/records/:record_id`
///
/// # Errors
///
/// Not found for an unknown domain or record; validation errors naming every
/// offending field.
pub fn update(state: &MockState, request: &MatchedRequest<'_>) -> Result<Response, MockError> {
    let domain = parent(state, request)?;
    let existing = owned(state, request, &domain)?;
    let payload = request.payload()?;
    let mut errors = FieldErrors::new();
    let fields = RecordFields::read(&payload, &mut errors);
    errors.into_result()?;

    let patch: Value = serde_json::to_value(&fields)?;
    let record = state.store().update::<DomainRecord>(existing.id, &patch)?;
    state.enqueue(chain(EventAction::DomainRecordUpdate, &domain, &record));
    Response::entity(&record)
}

/// `DELETE /v4/domains/:id/records/:record_id`
///
/// # Errors
///
/// Not found for an unknown domain or record.
pub fn delete(state: &MockState, request: &MatchedRequest<'_>) -> Result<Response, MockError> {
    let domain = parent(state, request)?;
    let existing = owned(state, request, &domain)?;
    let removed = state.store().delete::<DomainRecord>(existing.id)?;
    state.enqueue(chain(EventAction::DomainRecordDelete, &domain, &removed));
    Ok(Response::empty())
}
