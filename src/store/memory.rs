use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::{DocumentStore, GroupRow, StoreError};
use crate::config::{CollectionSchema, IndexDefinition};
use crate::query::{Filter, FindOptions, ID_FIELD, Projection, SortKey, SortOrder, VERSION_FIELD};

/// In-memory document store.
///
/// Collections live in one process-wide map behind a mutex; every trait
/// operation takes the lock once, so individual operations are atomic but
/// nothing spans two operations (concurrent review mutations against the
/// same tour can still interleave between the triggering write and the
/// statistics recomputation).
#[derive(Debug, Clone)]
pub struct MemoryStore {
    collections: Arc<Mutex<HashMap<String, Vec<Value>>>>,
    indexes: Arc<HashMap<String, Vec<IndexDefinition>>>,
}

impl MemoryStore {
    /// Create a store with one empty collection per schema, registering the
    /// schemas' unique indexes for enforcement on insert and update.
    pub fn new(catalog: &[CollectionSchema]) -> Self {
        let mut collections = HashMap::new();
        let mut indexes = HashMap::new();
        for schema in catalog {
            collections.insert(schema.name.to_string(), Vec::new());
            indexes.insert(schema.name.to_string(), schema.indexes.clone());
        }
        Self {
            collections: Arc::new(Mutex::new(collections)),
            indexes: Arc::new(indexes),
        }
    }

    fn unique_indexes(&self, collection: &str) -> &[IndexDefinition] {
        self.indexes
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Check a candidate document against every unique index, ignoring the
    /// document with `skip_id` (the candidate itself on updates).
    fn check_unique(
        &self,
        collection: &str,
        docs: &[Value],
        candidate: &Map<String, Value>,
        skip_id: Option<&str>,
    ) -> Result<(), StoreError> {
        for index in self.unique_indexes(collection) {
            if !index.unique {
                continue;
            }

            let candidate_values: Vec<&Value> = index
                .fields
                .iter()
                .filter_map(|field| candidate.get(*field))
                .collect();
            if candidate_values.len() != index.fields.len() {
                // Index fields absent from the candidate: nothing to collide on
                continue;
            }

            let collides = docs.iter().any(|doc| {
                if let Some(skip) = skip_id {
                    if doc.get(ID_FIELD).and_then(Value::as_str) == Some(skip) {
                        return false;
                    }
                }
                index
                    .fields
                    .iter()
                    .zip(&candidate_values)
                    .all(|(field, value)| doc.get(*field) == Some(*value))
            });

            if collides {
                return Err(StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    fields: index.fields.join(", "),
                });
            }
        }
        Ok(())
    }

    fn project(document: Value, projection: &Projection) -> Value {
        let Value::Object(obj) = document else {
            return document;
        };
        match projection {
            Projection::Include(fields) => {
                let mut result = Map::new();
                for field in fields {
                    if let Some(value) = obj.get(field) {
                        result.insert(field.clone(), value.clone());
                    }
                }
                Value::Object(result)
            }
            Projection::Exclude(fields) => {
                let mut obj = obj;
                for field in fields {
                    obj.remove(field);
                }
                Value::Object(obj)
            }
        }
    }

    /// Stable multi-key sort: keys are applied left to right, so earlier
    /// keys take precedence and ties fall through to the next key.
    fn sort_documents(docs: &mut [Value], keys: &[SortKey]) {
        docs.sort_by(|a, b| {
            for key in keys {
                let ordering = order_values(a.get(&key.field), b.get(&key.field));
                let ordering = match key.order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }
}

/// Total order over optional document values for sorting: missing sorts
/// before present, numbers numerically, strings lexicographically.
fn order_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            _ => Ordering::Equal,
        },
    }
}

impl DocumentStore for MemoryStore {
    fn find(&self, collection: &str, options: &FindOptions) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.lock().unwrap();
        let docs = collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;

        let mut matched: Vec<Value> = docs
            .iter()
            .filter(|doc| options.filter.matches(doc))
            .cloned()
            .collect();
        drop(collections);

        Self::sort_documents(&mut matched, &options.sort);

        let mut matched: Vec<Value> = matched.into_iter().skip(options.skip).collect();
        if let Some(limit) = options.limit {
            matched.truncate(limit);
        }

        Ok(matched
            .into_iter()
            .map(|doc| Self::project(doc, &options.projection))
            .collect())
    }

    fn find_by_id(
        &self,
        collection: &str,
        id: &str,
        base: &Filter,
    ) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.lock().unwrap();
        let docs = collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;

        Ok(docs
            .iter()
            .find(|doc| {
                doc.get(ID_FIELD).and_then(Value::as_str) == Some(id) && base.matches(doc)
            })
            .cloned())
    }

    fn insert(&self, collection: &str, document: Map<String, Value>) -> Result<Value, StoreError> {
        let mut collections = self.collections.lock().unwrap();
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;

        let mut document = document;
        if !document.contains_key(ID_FIELD) {
            document.insert(
                ID_FIELD.to_string(),
                Value::String(Uuid::new_v4().to_string()),
            );
        }
        if !document.contains_key(VERSION_FIELD) {
            document.insert(VERSION_FIELD.to_string(), Value::from(0));
        }

        self.check_unique(collection, docs, &document, None)?;

        let value = Value::Object(document);
        docs.push(value.clone());
        tracing::debug!(collection, "document inserted");
        Ok(value)
    }

    fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        patch: &Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        let mut collections = self.collections.lock().unwrap();
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;

        let Some(position) = docs
            .iter()
            .position(|doc| doc.get(ID_FIELD).and_then(Value::as_str) == Some(id))
        else {
            return Ok(None);
        };

        let mut merged = docs[position]
            .as_object()
            .cloned()
            .unwrap_or_default();
        for (key, value) in patch {
            merged.insert(key.clone(), value.clone());
        }

        self.check_unique(collection, docs, &merged, Some(id))?;

        let value = Value::Object(merged);
        docs[position] = value.clone();
        tracing::debug!(collection, id, "document updated");
        Ok(Some(value))
    }

    fn delete_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let mut collections = self.collections.lock().unwrap();
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;

        let Some(position) = docs
            .iter()
            .position(|doc| doc.get(ID_FIELD).and_then(Value::as_str) == Some(id))
        else {
            return Ok(None);
        };

        let removed = docs.remove(position);
        tracing::debug!(collection, id, "document deleted");
        Ok(Some(removed))
    }

    fn group_stats(
        &self,
        collection: &str,
        filter: &Filter,
        group_by: &str,
        avg_fields: &[&str],
    ) -> Result<Vec<GroupRow>, StoreError> {
        let collections = self.collections.lock().unwrap();
        let docs = collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;

        // Groups keep first-seen order; collections are small enough that a
        // linear key lookup beats hashing arbitrary JSON values
        let mut groups: Vec<(Value, u64, HashMap<String, (f64, u64)>)> = Vec::new();

        for doc in docs.iter().filter(|doc| filter.matches(doc)) {
            let Some(key) = doc.get(group_by) else {
                continue;
            };

            let position = groups.iter().position(|(k, _, _)| k == key);
            let entry = match position {
                Some(position) => &mut groups[position],
                None => {
                    groups.push((key.clone(), 0, HashMap::new()));
                    groups.last_mut().unwrap()
                }
            };

            entry.1 += 1;
            for field in avg_fields {
                if let Some(number) = doc.get(*field).and_then(Value::as_f64) {
                    let acc = entry.2.entry(field.to_string()).or_insert((0.0, 0));
                    acc.0 += number;
                    acc.1 += 1;
                }
            }
        }

        Ok(groups
            .into_iter()
            .map(|(key, count, sums)| GroupRow {
                key,
                count,
                averages: sums
                    .into_iter()
                    .map(|(field, (sum, n))| (field, sum / n as f64))
                    .collect(),
            })
            .collect())
    }
}
