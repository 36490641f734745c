//! Entity identity, resource kinds and parent/child relationships.
//!
//! Every record held by the store is an [`Entity`]: a serde-serializable struct that
//! belongs to exactly one [`ResourceKind`] and carries a numeric [`EntityId`] unique
//! within that kind. Relationships are expressed by a foreign-key attribute on the
//! child, and each parent kind declares what happens to its children on delete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Numeric identifier, unique within one resource kind.
///
/// `EntityId::UNASSIGNED` (zero) marks a record that has not been stored yet;
/// the store replaces it with a fresh id on `add`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Placeholder id of a record that has not been added yet
    pub const UNASSIGNED: Self = Self(0);

    /// Wraps a raw id
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// True once the store has assigned the id
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Name of a collection in the store (`"domain"`, `"domain_record"`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKind(&'static str);

impl ResourceKind {
    /// Declares a kind by name
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The kind's name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Serialize for ResourceKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

/// What deleting a parent does to children that reference it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DependentPolicy {
    /// Delete every child together with the parent
    Cascade,
    /// Refuse to delete the parent while children exist
    Reject,
}

/// A child kind that points at its parent through `foreign_key`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dependent {
    /// The child collection
    pub kind: ResourceKind,
    /// Attribute on the child holding the parent's id
    pub foreign_key: &'static str,
    /// Policy applied when the parent is deleted
    pub policy: DependentPolicy,
    /// The child's own dependents, followed on cascade
    pub dependents: &'static [Dependent],
}

impl Dependent {
    /// Children deleted along with the parent
    #[must_use]
    pub const fn cascade(kind: ResourceKind, foreign_key: &'static str) -> Self {
        Self {
            kind,
            foreign_key,
            policy: DependentPolicy::Cascade,
            dependents: &[],
        }
    }

    /// Children that block deletion of the parent
    #[must_use]
    pub const fn reject(kind: ResourceKind, foreign_key: &'static str) -> Self {
        Self {
            kind,
            foreign_key,
            policy: DependentPolicy::Reject,
            dependents: &[],
        }
    }

    /// Attaches the child's own declarations (usually `Child::DEPENDENTS`)
    #[must_use]
    pub const fn with_dependents(mut self, dependents: &'static [Dependent]) -> Self {
        self.dependents = dependents;
        self
    }
}

/// Snapshot of an entity as referenced by a notification.
///
/// Taken when the notification chain is enqueued, so a delivered event stays
/// readable after the live entity has changed or been deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity id
    pub id: EntityId,
    /// Display label at snapshot time
    pub label: String,
    /// Resource kind name
    #[serde(rename = "type")]
    pub kind: String,
    /// API path of the entity
    pub url: String,
}

impl EntityRef {
    /// Builds a reference by hand
    #[must_use]
    pub fn new(
        id: EntityId,
        label: impl Into<String>,
        kind: ResourceKind,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            kind: kind.as_str().to_string(),
            url: url.into(),
        }
    }
}

/// A typed record stored in one collection of the entity store.
///
/// The store keeps records in their serialized JSON form, which is what makes
/// partial updates ("merge this patch, keep everything else") possible.
///
/// # Example
///
/// ```
/// use cloudmock_core::entity::{Entity, EntityId, ResourceKind};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Debug, Serialize, Deserialize)]
/// struct Volume {
///     #[serde(default)]
///     id: EntityId,
///     label: String,
/// }
///
/// impl Entity for Volume {
///     const KIND: ResourceKind = ResourceKind::new("volume");
///     const TIMESTAMPED: bool = false;
///
///     fn id(&self) -> EntityId {
///         self.id
///     }
///
///     fn label(&self) -> String {
///         self.label.clone()
///     }
///
///     fn url(&self) -> String {
///         format!("/v4/volumes/{}", self.id)
///     }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection this entity lives in
    const KIND: ResourceKind;

    /// Whether the store maintains `created`/`updated` attributes
    const TIMESTAMPED: bool = true;

    /// Children and their delete policies
    const DEPENDENTS: &'static [Dependent] = &[];

    /// The entity's id (`EntityId::UNASSIGNED` before it is stored)
    fn id(&self) -> EntityId;

    /// Label used in notification snapshots
    fn label(&self) -> String;

    /// API path of this entity
    fn url(&self) -> String;

    /// Snapshot for the scheduler
    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.id(), self.label(), Self::KIND, self.url())
    }
}

/// Creation and last-update times maintained by the store.
///
/// Meant to be `#[serde(flatten)]`-ed into an entity so the attributes sit at the
/// top level of the stored record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timestamps {
    /// Set once, on `add`
    pub created: DateTime<Utc>,
    /// Refreshed on every `update`
    pub updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHILD: ResourceKind = ResourceKind::new("child");
    const GRANDCHILD: ResourceKind = ResourceKind::new("grandchild");
    const CHILD_DEPENDENTS: &[Dependent] = &[Dependent::reject(GRANDCHILD, "child_id")];

    #[test]
    fn entity_id_parses_path_params() {
        assert_eq!("42".parse::<EntityId>(), Ok(EntityId::new(42)));
        assert!("abc".parse::<EntityId>().is_err());
        assert!(!EntityId::UNASSIGNED.is_assigned());
    }

    #[test]
    fn dependents_nest_at_compile_time() {
        const DEPS: &[Dependent] =
            &[Dependent::cascade(CHILD, "parent_id").with_dependents(CHILD_DEPENDENTS)];
        assert_eq!(DEPS[0].policy, DependentPolicy::Cascade);
        assert_eq!(DEPS[0].dependents[0].policy, DependentPolicy::Reject);
    }

    #[test]
    fn entity_ref_serializes_kind_as_type() {
        let entity = EntityRef::new(EntityId::new(3), "example.com", CHILD, "/v4/x/3");
        let json = serde_json::to_value(&entity).unwrap_or_default();
        assert_eq!(json["type"], "child");
        assert_eq!(json["id"], 3);
    }
}
