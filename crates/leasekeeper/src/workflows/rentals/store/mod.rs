//! Document store contract the rental workflows persist through.
//!
//! Records live in named collections as JSON maps. Every record carries a version that starts
//! at [`INITIAL_VERSION`] on insert and increases by one on each update, so callers can make an
//! update conditional on the version they last read.

mod memory;
mod records;

use std::cmp::Ordering;
use std::fmt;

use serde_json::{Map, Value};

pub use memory::MemoryEntityStore;
pub use records::{Record, Stored};
pub(crate) use records::{encode, fetch, find, insert, patch_fields};

/// Version assigned to a record by `insert`.
pub const INITIAL_VERSION: u64 = 1;

pub type Document = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Properties,
    Applications,
    Leases,
    Payments,
    Maintenance,
}

impl Collection {
    pub const fn name(self) -> &'static str {
        match self {
            Collection::Properties => "properties",
            Collection::Applications => "applications",
            Collection::Leases => "leases",
            Collection::Payments => "payments",
            Collection::Maintenance => "maintenance",
        }
    }

    /// Singular noun used in error messages.
    pub const fn entity(self) -> &'static str {
        match self {
            Collection::Properties => "property",
            Collection::Applications => "application",
            Collection::Leases => "lease",
            Collection::Payments => "payment",
            Collection::Maintenance => "maintenance request",
        }
    }

    /// Prefix for identifiers minted by stores that generate their own keys.
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Collection::Properties => "property",
            Collection::Applications => "application",
            Collection::Leases => "lease",
            Collection::Payments => "payment",
            Collection::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A record as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub version: u64,
    pub body: Document,
}

/// Conjunctive query clause over a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq {
        field: &'static str,
        value: Value,
    },
    In {
        field: &'static str,
        values: Vec<Value>,
    },
    /// Inclusive bounds; a missing bound is open.
    Range {
        field: &'static str,
        min: Option<Value>,
        max: Option<Value>,
    },
}

impl Predicate {
    pub fn eq(field: &'static str, value: impl Into<Value>) -> Self {
        Predicate::Eq {
            field,
            value: value.into(),
        }
    }

    pub fn within<I, V>(field: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::In {
            field,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn range(field: &'static str, min: Option<Value>, max: Option<Value>) -> Self {
        Predicate::Range { field, min, max }
    }

    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Predicate::Eq { field, value } => document.get(*field) == Some(value),
            Predicate::In { field, values } => document
                .get(*field)
                .map(|found| values.contains(found))
                .unwrap_or(false),
            Predicate::Range { field, min, max } => {
                let Some(found) = document.get(*field) else {
                    return false;
                };
                let above_min = match min {
                    Some(bound) => matches!(
                        compare_values(found, bound),
                        Some(Ordering::Greater | Ordering::Equal)
                    ),
                    None => true,
                };
                let below_max = match max {
                    Some(bound) => matches!(
                        compare_values(found, bound),
                        Some(Ordering::Less | Ordering::Equal)
                    ),
                    None => true,
                };
                above_min && below_max
            }
        }
    }
}

/// Orders two JSON scalars. Numeric strings compare as numbers so decimal amounts (which
/// serialize as strings) sort by value; other strings, such as ISO dates, compare lexically.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (as_number(left), as_number(right)) {
        (Some(l), Some(r)) => l.partial_cmp(&r),
        _ => match (left, right) {
            (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
            (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
            _ => None,
        },
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{collection} record {id} not found")]
    NotFound { collection: Collection, id: String },
    #[error("{collection} record {id} changed concurrently (expected version {expected}, found {actual})")]
    VersionConflict {
        collection: Collection,
        id: String,
        expected: u64,
        actual: u64,
    },
    #[error("{collection} record could not be encoded: {source}")]
    Encoding {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },
    #[error("{collection} record {id} is malformed: {source}")]
    Decoding {
        collection: Collection,
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("entity store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence collaborator consumed by every rental workflow.
pub trait EntityStore: Send + Sync {
    fn get(&self, collection: Collection, id: &str) -> Result<StoredDocument, StoreError>;

    fn query(
        &self,
        collection: Collection,
        predicates: &[Predicate],
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// Persist a new record and return its identifier.
    fn insert(&self, collection: Collection, document: Document) -> Result<String, StoreError>;

    /// Merge `patch` into the record. With `expected_version` set the write only commits when
    /// the stored version still matches; otherwise it fails with `VersionConflict`.
    fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Document,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> Document {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn range_compares_decimal_strings_numerically() {
        let doc = document(json!({ "monthly_rent": "950.00" }));
        let band = Predicate::range("monthly_rent", Some(json!("900")), Some(json!("1000")));
        assert!(band.matches(&doc));
        assert!(!Predicate::range("monthly_rent", Some(json!("1000")), None).matches(&doc));
    }

    #[test]
    fn range_compares_dates_lexically() {
        let doc = document(json!({ "due_date": "2025-10-01" }));
        assert!(Predicate::range("due_date", Some(json!("2025-09-30")), None).matches(&doc));
        assert!(!Predicate::range("due_date", None, Some(json!("2025-09-30"))).matches(&doc));
    }

    #[test]
    fn in_predicate_requires_field_presence() {
        let doc = document(json!({ "status": "signed" }));
        assert!(Predicate::within("status", ["active", "signed"]).matches(&doc));
        assert!(!Predicate::within("missing", ["signed"]).matches(&doc));
    }
}
