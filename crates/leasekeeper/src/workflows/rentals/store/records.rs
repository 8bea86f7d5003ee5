use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{
    Collection, Document, EntityStore, Predicate, StoreError, StoredDocument, INITIAL_VERSION,
};
use crate::workflows::rentals::domain::{
    Application, ApplicationId, Lease, LeaseId, MaintenanceRequest, MaintenanceRequestId,
    PaymentId, Property, PropertyId, RentPayment,
};

/// Typed schema for a collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync {
    type Id: Clone
        + fmt::Debug
        + fmt::Display
        + PartialEq
        + Serialize
        + From<String>
        + AsRef<str>
        + Send
        + Sync;

    const COLLECTION: Collection;
}

impl Record for Property {
    type Id = PropertyId;
    const COLLECTION: Collection = Collection::Properties;
}

impl Record for Application {
    type Id = ApplicationId;
    const COLLECTION: Collection = Collection::Applications;
}

impl Record for Lease {
    type Id = LeaseId;
    const COLLECTION: Collection = Collection::Leases;
}

impl Record for RentPayment {
    type Id = PaymentId;
    const COLLECTION: Collection = Collection::Payments;
}

impl Record for MaintenanceRequest {
    type Id = MaintenanceRequestId;
    const COLLECTION: Collection = Collection::Maintenance;
}

/// A decoded record together with its identifier and the version it was read at.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(bound(serialize = "T: Record"))]
pub struct Stored<T: Record> {
    pub id: T::Id,
    pub version: u64,
    #[serde(flatten)]
    pub record: T,
}

pub(crate) fn encode<T: Record>(record: &T) -> Result<Document, StoreError> {
    let encoding = |source| StoreError::Encoding {
        collection: T::COLLECTION,
        source,
    };
    match serde_json::to_value(record).map_err(encoding)? {
        Value::Object(map) => Ok(map),
        _ => Err(encoding(serde::ser::Error::custom(
            "record did not serialize to an object",
        ))),
    }
}

fn decode<T: Record>(document: StoredDocument) -> Result<Stored<T>, StoreError> {
    let StoredDocument { id, version, body } = document;
    let record =
        serde_json::from_value(Value::Object(body)).map_err(|source| StoreError::Decoding {
            collection: T::COLLECTION,
            id: id.clone(),
            source,
        })?;
    Ok(Stored {
        id: T::Id::from(id),
        version,
        record,
    })
}

fn decode_all<T: Record>(
    documents: Vec<StoredDocument>,
) -> Result<Vec<Stored<T>>, StoreError> {
    documents.into_iter().map(decode).collect()
}

pub(crate) fn fetch<T, S>(store: &S, id: &T::Id) -> Result<Stored<T>, StoreError>
where
    T: Record,
    S: EntityStore + ?Sized,
{
    decode(store.get(T::COLLECTION, id.as_ref())?)
}

pub(crate) fn find<T, S>(store: &S, predicates: &[Predicate]) -> Result<Vec<Stored<T>>, StoreError>
where
    T: Record,
    S: EntityStore + ?Sized,
{
    decode_all(store.query(T::COLLECTION, predicates)?)
}

pub(crate) fn insert<T, S>(store: &S, record: T) -> Result<Stored<T>, StoreError>
where
    T: Record,
    S: EntityStore + ?Sized,
{
    let id = store.insert(T::COLLECTION, encode(&record)?)?;
    Ok(Stored {
        id: T::Id::from(id),
        version: INITIAL_VERSION,
        record,
    })
}

/// Narrow an encoded record down to the fields a transition touched.
pub(crate) fn patch_fields(document: &Document, fields: &[&str]) -> Document {
    fields
        .iter()
        .map(|field| {
            let value = document.get(*field).cloned().unwrap_or(Value::Null);
            (field.to_string(), value)
        })
        .collect()
}
