//! In-memory entity store.
//!
//! One collection per [`ResourceKind`], each an ordered map from [`EntityId`] to the
//! record's JSON form. Every public operation takes the lock exactly once, so no
//! caller ever observes a partially applied write. The notifications log lives
//! here too, next to the collections it describes, so that a session reset clears
//! both together.

use chrono::{DateTime, Utc};
use cloudmock_core::entity::{Dependent, DependentPolicy, Entity, EntityId, ResourceKind};
use cloudmock_core::environment::Clock;
use cloudmock_core::error::MockError;
use cloudmock_core::event::Event;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Attributes a patch can never change.
const READ_ONLY: [&str; 2] = ["id", "created"];

#[derive(Debug, Default)]
struct StoreData {
    collections: HashMap<ResourceKind, BTreeMap<EntityId, Value>>,
    next_ids: HashMap<ResourceKind, u64>,
    events: Vec<Event>,
}

impl StoreData {
    fn collection(&self, kind: ResourceKind) -> Option<&BTreeMap<EntityId, Value>> {
        self.collections.get(&kind)
    }

    fn next_id(&self, kind: ResourceKind) -> u64 {
        self.next_ids.get(&kind).copied().unwrap_or(1)
    }

    /// Assigns ids, stamps and decodes `records` of `E` without writing anything.
    ///
    /// Explicit ids are reserved before any fresh id is handed out, so a batch
    /// mixing both can never assign one id twice.
    fn prepare<E: Entity>(&self, records: Vec<Value>, now: DateTime<Utc>) -> Result<Prepared<E>, MockError> {
        let mut requested = Vec::with_capacity(records.len());
        for record in &records {
            let id = record
                .get("id")
                .and_then(Value::as_u64)
                .map_or(EntityId::UNASSIGNED, EntityId::new);
            if id.is_assigned() {
                let taken = self
                    .collection(E::KIND)
                    .is_some_and(|existing| existing.contains_key(&id))
                    || requested.contains(&id);
                if taken {
                    return Err(MockError::rejected(format!("{} {id} already exists", E::KIND)));
                }
            }
            requested.push(id);
        }

        let mut next = requested
            .iter()
            .filter(|id| id.is_assigned())
            .map(|id| id.get() + 1)
            .fold(self.next_id(E::KIND), u64::max);

        let mut prepared = Prepared {
            next,
            records: Vec::with_capacity(records.len()),
            entities: Vec::with_capacity(records.len()),
        };
        for (requested, mut record) in requested.into_iter().zip(records) {
            let id = if requested.is_assigned() {
                requested
            } else {
                next += 1;
                EntityId::new(next - 1)
            };
            set(&mut record, "id", Value::from(id.get()));
            if E::TIMESTAMPED {
                stamp(&mut record, "created", now);
                stamp(&mut record, "updated", now);
            }
            prepared.entities.push(decode::<E>(&record)?);
            prepared.records.push((id, record));
        }
        prepared.next = next;
        Ok(prepared)
    }

    fn commit<E: Entity>(&mut self, prepared: Prepared<E>) -> Vec<E> {
        self.next_ids.insert(E::KIND, prepared.next);
        let collection = self.collections.entry(E::KIND).or_default();
        for (id, record) in prepared.records {
            collection.insert(id, record);
            tracing::debug!(kind = %E::KIND, %id, "Stored entity");
            metrics::counter!("mock.store.writes", "op" => "add").increment(1);
        }
        prepared.entities
    }

    fn children_of(&self, dependent: &Dependent, parent: EntityId) -> Vec<EntityId> {
        self.collection(dependent.kind)
            .map(|records| {
                records
                    .iter()
                    .filter(|(_, record)| {
                        record.get(dependent.foreign_key).and_then(Value::as_u64) == Some(parent.get())
                    })
                    .map(|(id, _)| *id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Collects everything a delete of `(kind, id)` has to remove, or fails on a
    /// `Reject` dependent. Nothing is modified.
    fn plan_delete(
        &self,
        kind: ResourceKind,
        id: EntityId,
        dependents: &[Dependent],
        plan: &mut Vec<(ResourceKind, EntityId)>,
    ) -> Result<(), MockError> {
        for dependent in dependents {
            let children = self.children_of(dependent, id);
            if children.is_empty() {
                continue;
            }
            match dependent.policy {
                DependentPolicy::Reject => {
                    return Err(MockError::rejected(format!(
                        "Cannot delete a {kind} with {} attached",
                        dependent.kind
                    )));
                },
                DependentPolicy::Cascade => {
                    for child in children {
                        self.plan_delete(dependent.kind, child, dependent.dependents, plan)?;
                        plan.push((dependent.kind, child));
                    }
                },
            }
        }
        Ok(())
    }
}

/// Records of one kind ready to be inserted.
struct Prepared<E> {
    next: u64,
    records: Vec<(EntityId, Value)>,
    entities: Vec<E>,
}

/// Keyed collections of typed records.
pub struct EntityStore {
    clock: Arc<dyn Clock>,
    data: RwLock<StoreData>,
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.data.read();
        f.debug_struct("EntityStore")
            .field("collections", &data.collections.len())
            .field("events", &data.events.len())
            .finish_non_exhaustive()
    }
}

impl EntityStore {
    /// Creates an empty store stamping records with `clock`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            data: RwLock::new(StoreData::default()),
        }
    }

    /// Reads one record.
    ///
    /// # Errors
    ///
    /// [`MockError::NotFound`] if no record of `E::KIND` has this id.
    pub fn get<E: Entity>(&self, id: EntityId) -> Result<E, MockError> {
        let data = self.data.read();
        let record = data
            .collection(E::KIND)
            .and_then(|records| records.get(&id))
            .ok_or_else(|| MockError::not_found(E::KIND, id))?;
        decode(record)
    }

    /// Reads a whole collection in ascending id order. Unknown kinds are empty.
    ///
    /// # Errors
    ///
    /// [`MockError::Internal`] if a stored record no longer fits `E`.
    pub fn get_all<E: Entity>(&self) -> Result<Vec<E>, MockError> {
        let data = self.data.read();
        data.collection(E::KIND)
            .map(|records| records.values().map(decode::<E>).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    /// Children of `parent` in `E`'s collection, found through `foreign_key`.
    ///
    /// # Errors
    ///
    /// [`MockError::Internal`] if a stored record no longer fits `E`.
    pub fn children<E: Entity>(&self, foreign_key: &str, parent: EntityId) -> Result<Vec<E>, MockError> {
        let data = self.data.read();
        let Some(records) = data.collection(E::KIND) else {
            return Ok(Vec::new());
        };
        records
            .values()
            .filter(|record| record.get(foreign_key).and_then(Value::as_u64) == Some(parent.get()))
            .map(decode::<E>)
            .collect()
    }

    /// Number of records of `kind`
    #[must_use]
    pub fn len(&self, kind: ResourceKind) -> usize {
        self.data.read().collection(kind).map_or(0, BTreeMap::len)
    }

    /// Whether `kind` holds no records
    #[must_use]
    pub fn is_empty(&self, kind: ResourceKind) -> bool {
        self.len(kind) == 0
    }

    /// Whether a record of `kind` with `id` exists
    #[must_use]
    pub fn contains(&self, kind: ResourceKind, id: EntityId) -> bool {
        self.data
            .read()
            .collection(kind)
            .is_some_and(|records| records.contains_key(&id))
    }

    /// Stores a new record and returns it as stored.
    ///
    /// An unassigned id is replaced by the next free id of the kind; timestamped
    /// kinds get `created` and `updated` set to now.
    ///
    /// # Errors
    ///
    /// [`MockError::Validation`] if the entity carries an id that is already taken.
    pub fn add<E: Entity>(&self, entity: E) -> Result<E, MockError> {
        let mut added = self.add_many(vec![entity])?;
        added
            .pop()
            .ok_or_else(|| MockError::Internal("add produced no record".to_string()))
    }

    /// Stores several records of one kind in a single write.
    ///
    /// # Errors
    ///
    /// Same as [`EntityStore::add`]; on error nothing is stored.
    pub fn add_many<E: Entity>(&self, entities: Vec<E>) -> Result<Vec<E>, MockError> {
        let now = self.clock.now();
        let mut encoded = Vec::with_capacity(entities.len());
        for entity in entities {
            encoded.push(encode(&entity)?);
        }

        let mut data = self.data.write();
        let prepared = data.prepare::<E>(encoded, now)?;
        Ok(data.commit(prepared))
    }

    /// Stores `parent` and `children` in a single write, pointing each child's
    /// `foreign_key` at the parent's new id.
    ///
    /// # Errors
    ///
    /// Same as [`EntityStore::add`] for either kind; on error nothing is stored.
    pub fn add_with_children<P: Entity, C: Entity>(
        &self,
        parent: P,
        foreign_key: &str,
        children: Vec<C>,
    ) -> Result<(P, Vec<C>), MockError> {
        if P::KIND == C::KIND {
            return Err(MockError::Internal(format!(
                "{} cannot be its own child kind",
                P::KIND
            )));
        }
        let now = self.clock.now();
        let parent = encode(&parent)?;
        let mut encoded = Vec::with_capacity(children.len());
        for child in &children {
            encoded.push(encode(child)?);
        }

        let mut data = self.data.write();
        let parent = data.prepare::<P>(vec![parent], now)?;
        let Some((parent_id, _)) = parent.records.first() else {
            return Err(MockError::Internal("add produced no record".to_string()));
        };
        for record in &mut encoded {
            set(record, foreign_key, Value::from(parent_id.get()));
        }
        let children = data.prepare::<C>(encoded, now)?;

        let mut parent = data.commit(parent);
        let children = data.commit(children);
        let parent = parent
            .pop()
            .ok_or_else(|| MockError::Internal("add produced no record".to_string()))?;
        Ok((parent, children))
    }

    /// Merges `patch` onto an existing record.
    ///
    /// Top-level attributes in `patch` replace the stored ones; everything else is
    /// kept. `id` and `created` cannot be patched. Timestamped kinds get `updated`
    /// refreshed.
    ///
    /// # Errors
    ///
    /// - [`MockError::NotFound`] if the record does not exist
    /// - [`MockError::Validation`] if `patch` is not an object or the merged record
    ///   no longer fits `E`; the stored record is left untouched
    pub fn update<E: Entity>(&self, id: EntityId, patch: &Value) -> Result<E, MockError> {
        let Value::Object(patch) = patch else {
            return Err(MockError::rejected("patch must be a JSON object"));
        };
        let now = self.clock.now();

        let mut data = self.data.write();
        let record = data
            .collections
            .get_mut(&E::KIND)
            .and_then(|records| records.get_mut(&id))
            .ok_or_else(|| MockError::not_found(E::KIND, id))?;

        let mut merged = record.clone();
        if let Value::Object(fields) = &mut merged {
            for (key, value) in patch {
                if !READ_ONLY.contains(&key.as_str()) {
                    fields.insert(key.clone(), value.clone());
                }
            }
        }
        if E::TIMESTAMPED {
            stamp(&mut merged, "updated", now);
        }

        let entity = E::deserialize(&merged)
            .map_err(|e| MockError::rejected(format!("patch does not fit {}: {e}", E::KIND)))?;
        *record = merged;
        tracing::debug!(kind = %E::KIND, %id, "Updated entity");
        metrics::counter!("mock.store.writes", "op" => "update").increment(1);
        Ok(entity)
    }

    /// Removes a record and returns it, applying `E::DEPENDENTS`.
    ///
    /// Cascading children are removed in the same write; a `Reject` dependent with
    /// live children aborts the whole delete.
    ///
    /// # Errors
    ///
    /// - [`MockError::NotFound`] if the record does not exist
    /// - [`MockError::Validation`] if a `Reject` dependent still has children
    pub fn delete<E: Entity>(&self, id: EntityId) -> Result<E, MockError> {
        let mut data = self.data.write();
        let record = data
            .collection(E::KIND)
            .and_then(|records| records.get(&id))
            .ok_or_else(|| MockError::not_found(E::KIND, id))?;
        let entity = decode::<E>(record)?;

        let mut plan = Vec::new();
        data.plan_delete(E::KIND, id, E::DEPENDENTS, &mut plan)?;

        for (kind, child) in &plan {
            if let Some(records) = data.collections.get_mut(kind) {
                records.remove(child);
            }
        }
        if let Some(records) = data.collections.get_mut(&E::KIND) {
            records.remove(&id);
        }

        tracing::debug!(kind = %E::KIND, %id, cascaded = plan.len(), "Deleted entity");
        metrics::counter!("mock.store.writes", "op" => "delete").increment(1);
        Ok(entity)
    }

    /// Appends delivered notifications, in order
    pub fn append_events(&self, events: impl IntoIterator<Item = Event>) {
        self.data.write().events.extend(events);
    }

    /// Every delivered notification in delivery order
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.data.read().events.clone()
    }

    /// Number of delivered notifications
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.data.read().events.len()
    }

    /// Drops every collection, the notifications log and the id counters
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = StoreData::default();
    }
}

fn encode<E: Entity>(entity: &E) -> Result<Value, MockError> {
    match serde_json::to_value(entity)? {
        record @ Value::Object(_) => Ok(record),
        other => Err(MockError::Internal(format!(
            "{} must serialize to an object, got {other}",
            E::KIND
        ))),
    }
}

fn decode<E: Entity>(record: &Value) -> Result<E, MockError> {
    E::deserialize(record)
        .map_err(|e| MockError::Internal(format!("stored {} is corrupt: {e}", E::KIND)))
}

fn set(record: &mut Value, key: &str, value: Value) {
    if let Value::Object(fields) = record {
        fields.insert(key.to_string(), value);
    }
}

fn stamp(record: &mut Value, key: &str, at: DateTime<Utc>) {
    set(record, key, Value::String(at.to_rfc3339()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudmock_core::entity::Timestamps;
    use cloudmock_testing::test_clock;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Parent {
        #[serde(default)]
        id: EntityId,
        label: String,
        #[serde(default)]
        size: u32,
        #[serde(flatten)]
        timestamps: Timestamps,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Child {
        #[serde(default)]
        id: EntityId,
        parent_id: EntityId,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Grandchild {
        #[serde(default)]
        id: EntityId,
        child_id: EntityId,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Guarded {
        #[serde(default)]
        id: EntityId,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Lock {
        #[serde(default)]
        id: EntityId,
        guarded_id: EntityId,
    }

    impl Entity for Parent {
        const KIND: ResourceKind = ResourceKind::new("parent");
        const DEPENDENTS: &'static [Dependent] =
            &[Dependent::cascade(Child::KIND, "parent_id").with_dependents(Child::DEPENDENTS)];

        fn id(&self) -> EntityId {
            self.id
        }
        fn label(&self) -> String {
            self.label.clone()
        }
        fn url(&self) -> String {
            format!("/v4/parents/{}", self.id)
        }
    }

    impl Entity for Child {
        const KIND: ResourceKind = ResourceKind::new("child");
        const TIMESTAMPED: bool = false;
        const DEPENDENTS: &'static [Dependent] = &[Dependent::cascade(Grandchild::KIND, "child_id")];

        fn id(&self) -> EntityId {
            self.id
        }
        fn label(&self) -> String {
            format!("child-{}", self.id)
        }
        fn url(&self) -> String {
            format!("/v4/children/{}", self.id)
        }
    }

    impl Entity for Grandchild {
        const KIND: ResourceKind = ResourceKind::new("grandchild");
        const TIMESTAMPED: bool = false;

        fn id(&self) -> EntityId {
            self.id
        }
        fn label(&self) -> String {
            String::new()
        }
        fn url(&self) -> String {
            String::new()
        }
    }

    impl Entity for Guarded {
        const KIND: ResourceKind = ResourceKind::new("guarded");
        const TIMESTAMPED: bool = false;
        const DEPENDENTS: &'static [Dependent] = &[Dependent::reject(Lock::KIND, "guarded_id")];

        fn id(&self) -> EntityId {
            self.id
        }
        fn label(&self) -> String {
            String::new()
        }
        fn url(&self) -> String {
            String::new()
        }
    }

    impl Entity for Lock {
        const KIND: ResourceKind = ResourceKind::new("lock");
        const TIMESTAMPED: bool = false;

        fn id(&self) -> EntityId {
            self.id
        }
        fn label(&self) -> String {
            String::new()
        }
        fn url(&self) -> String {
            String::new()
        }
    }

    fn parent(label: &str) -> Parent {
        Parent {
            id: EntityId::UNASSIGNED,
            label: label.to_string(),
            size: 1,
            timestamps: Timestamps::default(),
        }
    }

    #[test]
    fn add_assigns_ids_and_timestamps() {
        let clock = test_clock();
        let store = EntityStore::new(clock.clone());

        let first = store.add(parent("a")).unwrap();
        let second = store.add(parent("b")).unwrap();

        assert_eq!(first.id, EntityId::new(1));
        assert_eq!(second.id, EntityId::new(2));
        assert_eq!(first.timestamps.created, clock.now());
        assert_eq!(first.timestamps.updated, clock.now());
        assert_eq!(store.get::<Parent>(first.id).unwrap(), first);
    }

    #[test]
    fn add_keeps_supplied_id_and_skips_past_it() {
        let store = EntityStore::new(test_clock());
        let mut seeded = parent("seeded");
        seeded.id = EntityId::new(7);

        assert_eq!(store.add(seeded.clone()).unwrap().id, EntityId::new(7));
        assert_eq!(store.add(parent("next")).unwrap().id, EntityId::new(8));
        assert!(store.add(seeded).unwrap_err().is_validation());
        assert_eq!(store.len(Parent::KIND), 2);
    }

    #[test]
    fn mixed_batch_never_reuses_an_explicit_id() {
        let store = EntityStore::new(test_clock());
        let mut explicit = parent("explicit");
        explicit.id = EntityId::new(1);

        let added = store.add_many(vec![parent("auto"), explicit]).unwrap();

        let ids: Vec<_> = added.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![EntityId::new(2), EntityId::new(1)]);
        assert_eq!(store.len(Parent::KIND), 2);
        assert_eq!(store.get::<Parent>(EntityId::new(1)).unwrap().label, "explicit");
        assert_eq!(store.get::<Parent>(EntityId::new(2)).unwrap().label, "auto");
        assert_eq!(store.add(parent("next")).unwrap().id, EntityId::new(3));
    }

    #[test]
    fn rejected_batch_stores_nothing() {
        let store = EntityStore::new(test_clock());
        let mut twice = parent("twice");
        twice.id = EntityId::new(4);

        let err = store
            .add_many(vec![parent("auto"), twice.clone(), twice])
            .unwrap_err();

        assert!(err.is_validation());
        assert!(store.is_empty(Parent::KIND));
        assert_eq!(store.add(parent("first")).unwrap().id, EntityId::new(1));
    }

    #[test]
    fn add_with_children_links_in_one_write() {
        let store = EntityStore::new(test_clock());
        store.add(parent("other")).unwrap();
        let orphans = vec![
            Child { id: EntityId::UNASSIGNED, parent_id: EntityId::UNASSIGNED },
            Child { id: EntityId::UNASSIGNED, parent_id: EntityId::new(1) },
        ];

        let (stored, children) = store
            .add_with_children(parent("new"), "parent_id", orphans)
            .unwrap();

        assert_eq!(stored.id, EntityId::new(2));
        assert!(children.iter().all(|c| c.parent_id == stored.id));
        assert_eq!(store.children::<Child>("parent_id", stored.id).unwrap(), children);
        assert!(store.children::<Child>("parent_id", EntityId::new(1)).unwrap().is_empty());
    }

    #[test]
    fn add_with_children_failure_stores_neither() {
        let store = EntityStore::new(test_clock());
        store.add(Child { id: EntityId::UNASSIGNED, parent_id: EntityId::new(9) }).unwrap();
        let clash = vec![Child { id: EntityId::new(1), parent_id: EntityId::UNASSIGNED }];

        let err = store
            .add_with_children(parent("new"), "parent_id", clash)
            .unwrap_err();

        assert!(err.is_validation());
        assert!(store.is_empty(Parent::KIND));
        assert_eq!(store.len(Child::KIND), 1);
    }

    #[test]
    fn get_all_on_unknown_kind_is_empty() {
        let store = EntityStore::new(test_clock());
        assert!(store.get_all::<Parent>().unwrap().is_empty());
        assert!(store.is_empty(Parent::KIND));
    }

    #[test]
    fn update_merges_and_refreshes_updated() {
        let clock = test_clock();
        let store = EntityStore::new(clock.clone());
        let stored = store.add(parent("before")).unwrap();

        clock.advance(Duration::from_secs(60));
        let updated: Parent = store
            .update(stored.id, &json!({"label": "after", "id": 99, "created": "1999-01-01T00:00:00Z"}))
            .unwrap();

        assert_eq!(updated.id, stored.id);
        assert_eq!(updated.label, "after");
        assert_eq!(updated.size, 1);
        assert_eq!(updated.timestamps.created, stored.timestamps.created);
        assert!(updated.timestamps.updated > stored.timestamps.updated);
        assert_eq!(store.get::<Parent>(stored.id).unwrap(), updated);
    }

    #[test]
    fn update_that_breaks_the_type_is_not_persisted() {
        let store = EntityStore::new(test_clock());
        let stored = store.add(parent("p")).unwrap();

        let err = store.update::<Parent>(stored.id, &json!({"size": "huge"})).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(store.get::<Parent>(stored.id).unwrap(), stored);
    }

    #[test]
    fn missing_ids_are_not_found_and_change_nothing() {
        let store = EntityStore::new(test_clock());
        store.add(parent("p")).unwrap();
        let missing = EntityId::new(999);

        assert!(store.get::<Parent>(missing).unwrap_err().is_not_found());
        assert!(store.update::<Parent>(missing, &json!({"label": "x"})).unwrap_err().is_not_found());
        assert!(store.delete::<Parent>(missing).unwrap_err().is_not_found());
        assert_eq!(store.len(Parent::KIND), 1);
        assert_eq!(store.get::<Parent>(EntityId::new(1)).unwrap().label, "p");
    }

    #[test]
    fn delete_cascades_through_declared_dependents() {
        let store = EntityStore::new(test_clock());
        let keep = store.add(parent("keep")).unwrap();
        let doomed = store.add(parent("doomed")).unwrap();
        let child = store
            .add(Child { id: EntityId::UNASSIGNED, parent_id: doomed.id })
            .unwrap();
        store
            .add(Child { id: EntityId::UNASSIGNED, parent_id: keep.id })
            .unwrap();
        store
            .add(Grandchild { id: EntityId::UNASSIGNED, child_id: child.id })
            .unwrap();

        let removed: Parent = store.delete(doomed.id).unwrap();

        assert_eq!(removed.label, "doomed");
        assert_eq!(store.len(Parent::KIND), 1);
        assert_eq!(store.len(Child::KIND), 1);
        assert_eq!(store.len(Grandchild::KIND), 0);
        assert_eq!(store.children::<Child>("parent_id", keep.id).unwrap().len(), 1);
    }

    #[test]
    fn delete_rejects_when_policy_says_so() {
        let store = EntityStore::new(test_clock());
        let guarded = store.add(Guarded { id: EntityId::UNASSIGNED }).unwrap();
        let lock = store
            .add(Lock { id: EntityId::UNASSIGNED, guarded_id: guarded.id })
            .unwrap();

        let err = store.delete::<Guarded>(guarded.id).unwrap_err();
        assert_eq!(
            err,
            MockError::rejected("Cannot delete a guarded with lock attached")
        );
        assert!(store.contains(Guarded::KIND, guarded.id));

        store.delete::<Lock>(lock.id).unwrap();
        store.delete::<Guarded>(guarded.id).unwrap();
        assert!(store.is_empty(Guarded::KIND));
    }

    #[test]
    fn clear_resets_counters() {
        let store = EntityStore::new(test_clock());
        store.add(parent("a")).unwrap();
        store.clear();
        assert!(store.is_empty(Parent::KIND));
        assert_eq!(store.add(parent("b")).unwrap().id, EntityId::new(1));
    }
}
