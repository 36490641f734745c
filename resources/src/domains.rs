//! Domain handlers.
//!
//! Every mutating handler validates the whole payload before touching the store
//! and enqueues its event chain only after the store operation succeeded.

use crate::types::{Domain, DomainRecord, DomainStatus, DomainType, is_valid_domain_name};
use cloudmock_core::entity::{Entity, EntityId, Timestamps};
use cloudmock_core::envelope::Response;
use cloudmock_core::error::{FieldErrors, MockError};
use cloudmock_core::event::EventAction;
use cloudmock_runtime::{EventChain, MatchedRequest, MockState, Payload};
use serde::Serialize;
use serde_json::{Value, json};

/// Attributes a client may set on a domain. Absent fields are left alone.
#[derive(Debug, Default, Serialize)]
struct DomainFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    domain_type: Option<DomainType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<DomainStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    soa_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    master_ips: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    axfr_ips: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl_sec: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_sec: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_sec: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expire_sec: Option<u32>,
}

impl DomainFields {
    fn read(payload: &Payload, errors: &mut FieldErrors) -> Self {
        let domain = payload.string("domain", errors);
        if let Some(name) = &domain {
            errors.check(
                is_valid_domain_name(name),
                "domain",
                "domain must be a valid domain name",
            );
        }

        let domain_type = payload.string("type", errors).and_then(|raw| {
            let parsed = DomainType::parse(&raw);
            errors.check(parsed.is_some(), "type", "type must be master or slave");
            parsed
        });

        let status = payload.string("status", errors).and_then(|raw| {
            let parsed = DomainStatus::parse(&raw);
            errors.check(
                parsed.is_some(),
                "status",
                "status must be one of active, disabled, edit_mode, has_errors",
            );
            parsed
        });

        let soa_email = payload.string("soa_email", errors);
        if let Some(email) = &soa_email {
            errors.check(
                email.contains('@'),
                "soa_email",
                "soa_email must be a valid email address",
            );
        }

        Self {
            domain,
            domain_type,
            status,
            soa_email,
            description: payload.string("description", errors),
            group: payload.string("group", errors),
            tags: payload.strings("tags", errors),
            master_ips: payload.strings("master_ips", errors),
            axfr_ips: payload.strings("axfr_ips", errors),
            ttl_sec: payload.unsigned("ttl_sec", errors),
            refresh_sec: payload.unsigned("refresh_sec", errors),
            retry_sec: payload.unsigned("retry_sec", errors),
            expire_sec: payload.unsigned("expire_sec", errors),
        }
    }

    fn patch(&self) -> Result<Value, MockError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// `base` with `patch` merged over it
fn merged(base: &Domain, patch: &Value) -> Result<Domain, MockError> {
    let mut record = serde_json::to_value(base)?;
    if let (Value::Object(target), Value::Object(fields)) = (&mut record, patch) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
    Ok(serde_json::from_value(record)?)
}

/// Rules spanning several attributes, checked on the would-be result
fn check_domain(state: &MockState, candidate: &Domain, errors: &mut FieldErrors) -> Result<(), MockError> {
    errors.check(
        candidate.domain_type != DomainType::Slave || !candidate.master_ips.is_empty(),
        "master_ips",
        "master_ips is required for slave domains",
    );
    if is_valid_domain_name(&candidate.domain) {
        let taken = state
            .store()
            .get_all::<Domain>()?
            .iter()
            .any(|other| other.id != candidate.id && other.domain.eq_ignore_ascii_case(&candidate.domain));
        errors.check(!taken, "domain", "domain already exists");
    }
    Ok(())
}

/// Reads a required, valid, unused `domain` attribute
fn required_name(state: &MockState, payload: &Payload, errors: &mut FieldErrors) -> Result<Option<String>, MockError> {
    let before = errors.len();
    let name = payload.string("domain", errors);
    match &name {
        None if errors.len() == before => errors.push("domain", "domain is required"),
        None => {},
        Some(name) if !is_valid_domain_name(name) => {
            errors.push("domain", "domain must be a valid domain name");
        },
        Some(name) => check_domain(state, &Domain::new(name.clone()), errors)?,
    }
    Ok(name)
}

/// `GET /v4/domains`
///
/// # Errors
///
/// Validation errors for bad paging parameters or filters.
pub fn list(state: &MockState, request: &MatchedRequest<'_>) -> Result<Response, MockError> {
    let page = request.page_request(state.config())?;
    let query = request.list_query()?;
    let domains = query.apply(state.store().get_all::<Domain>()?)?;
    Response::page(&page.paginate(domains))
}

/// `GET /v4/domains/:id`
///
/// # Errors
///
/// Not found for an unknown id.
pub fn get(state: &MockState, request: &MatchedRequest<'_>) -> Result<Response, MockError> {
    let id = request.id("id")?;
    Response::entity(&state.store().get::<Domain>(id)?)
}

/// `POST /v4/domains`
///
/// # Errors
///
/// Validation errors naming every offending field.
pub fn create(state: &MockState, request: &MatchedRequest<'_>) -> Result<Response, MockError> {
    let payload = request.payload()?;
    let mut errors = FieldErrors::new();
    if !payload.has("domain") {
        errors.push("domain", "domain is required");
    }
    let fields = DomainFields::read(&payload, &mut errors);

    let candidate = merged(&Domain::new(String::new()), &fields.patch()?)?;
    check_domain(state, &candidate, &mut errors)?;
    errors.into_result()?;

    let domain = state.store().add(candidate)?;
    state.enqueue(EventChain::new(EventAction::DomainCreate, domain.entity_ref()));
    tracing::info!(id = %domain.id, domain = %domain.domain, "Domain created");
    Response::entity(&domain)
}

/// `PUT /v4/domains/:id`
///
/// # Errors
///
/// Not found for an unknown id; validation errors naming every offending field.
pub fn update(state: &MockState, request: &MatchedRequest<'_>) -> Result<Response, MockError> {
    let id = request.id("id")?;
    let existing = state.store().get::<Domain>(id)?;

    let payload = request.payload()?;
    let mut errors = FieldErrors::new();
    let fields = DomainFields::read(&payload, &mut errors);
    let patch = fields.patch()?;

    let candidate = merged(&existing, &patch)?;
    check_domain(state, &candidate, &mut errors)?;
    errors.into_result()?;

    let domain = state.store().update::<Domain>(id, &patch)?;
    state.enqueue(EventChain::new(EventAction::DomainUpdate, domain.entity_ref()));
    Response::entity(&domain)
}

/// `DELETE /v4/domains/:id`; the domain's records go with it.
///
/// # Errors
///
/// Not found for an unknown id.
pub fn delete(state: &MockState, request: &MatchedRequest<'_>) -> Result<Response, MockError> {
    let id = request.id("id")?;
    let removed = state.store().delete::<Domain>(id)?;
    state.enqueue(EventChain::new(EventAction::DomainDelete, removed.entity_ref()));
    tracing::info!(%id, domain = %removed.domain, "Domain deleted");
    Ok(Response::empty())
}

/// `POST /v4/domains/:id/clone`
///
/// Copies the source's settings and records into a new zone named by the body's
/// `domain`. The event and the response both describe the new zone.
///
/// # Errors
///
/// Not found for an unknown source; validation errors for a missing, malformed
/// or already used name.
pub fn clone(state: &MockState, request: &MatchedRequest<'_>) -> Result<Response, MockError> {
    let id = request.id("id")?;
    let source = state.store().get::<Domain>(id)?;

    let payload = request.payload()?;
    let mut errors = FieldErrors::new();
    let name = required_name(state, &payload, &mut errors)?;
    errors.into_result()?;
    let Some(name) = name else {
        return Err(MockError::invalid("domain", "domain is required"));
    };

    let copy = Domain {
        id: EntityId::UNASSIGNED,
        domain: name,
        timestamps: Timestamps::default(),
        ..source.clone()
    };
    let records: Vec<DomainRecord> = state
        .store()
        .children::<DomainRecord>("domain_id", source.id)?
        .into_iter()
        .map(|record| DomainRecord {
            id: EntityId::UNASSIGNED,
            timestamps: Timestamps::default(),
            ..record
        })
        .collect();
    let (domain, records) = state.store().add_with_children(copy, "domain_id", records)?;
    let copied = records.len();

    state.enqueue(EventChain::new(EventAction::DomainCreate, domain.entity_ref()));
    tracing::info!(source = %source.id, id = %domain.id, records = copied, "Domain cloned");
    Response::entity(&domain)
}

/// `POST /v4/domains/import`
///
/// Creates the zone in `edit_mode`; once the import chain has been delivered the
/// zone becomes `active`.
///
/// # Errors
///
/// Validation errors for a missing, malformed or already used name, or a missing
/// `remote_nameserver`.
pub fn import(state: &MockState, request: &MatchedRequest<'_>) -> Result<Response, MockError> {
    let payload = request.payload()?;
    let mut errors = FieldErrors::new();
    let name = required_name(state, &payload, &mut errors)?;
    let before = errors.len();
    let nameserver = payload.string("remote_nameserver", &mut errors);
    if errors.len() == before {
        errors.check(
            nameserver.as_deref().is_some_and(|ns| !ns.trim().is_empty()),
            "remote_nameserver",
            "remote_nameserver is required",
        );
    }
    errors.into_result()?;
    let Some(name) = name else {
        return Err(MockError::invalid("domain", "domain is required"));
    };

    let domain = state.store().add(Domain {
        soa_email: format!("hostmaster@{name}"),
        status: DomainStatus::EditMode,
        ..Domain::new(name)
    })?;

    let id = domain.id;
    state.enqueue(
        EventChain::new(EventAction::DomainImport, domain.entity_ref()).then(move |state| {
            if !state.store().contains(Domain::KIND, id) {
                tracing::debug!(%id, "Imported domain is gone; leaving it");
                return Ok(());
            }
            state
                .store()
                .update::<Domain>(id, &json!({"status": DomainStatus::Active}))?;
            Ok(())
        }),
    );
    tracing::info!(%id, domain = %domain.domain, "Domain import started");
    Response::entity(&domain)
}
