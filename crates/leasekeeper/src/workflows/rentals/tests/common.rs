use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::config::RulesConfig;
use crate::workflows::rentals::applications::ApplicationSubmission;
use crate::workflows::rentals::desk::RentalDesk;
use crate::workflows::rentals::documents::MemoryDocumentStorage;
use crate::workflows::rentals::domain::{
    Application, ApplicationDecision, Caller, EmploymentInfo, EmploymentStatus, Lease, Property,
    PropertyId, Reference, UserId,
};
use crate::workflows::rentals::leases::LeaseOptions;
use crate::workflows::rentals::properties::NewProperty;
use crate::workflows::rentals::store::{
    Collection, Document, EntityStore, MemoryEntityStore, Predicate, StoreError, Stored,
    StoredDocument,
};

pub(super) const LANDLORD: &str = "landlord-1";
pub(super) const TENANT: &str = "tenant-1";
pub(super) const OTHER_TENANT: &str = "tenant-2";

pub(super) fn landlord() -> Caller {
    Caller::landlord(LANDLORD)
}

pub(super) fn tenant() -> Caller {
    Caller::tenant(TENANT)
}

pub(super) fn other_tenant() -> Caller {
    Caller::tenant(OTHER_TENANT)
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn rent(amount: i64) -> Decimal {
    Decimal::new(amount * 100, 2)
}

pub(super) type MemoryDesk = RentalDesk<MemoryEntityStore, MemoryDocumentStorage>;

pub(super) struct Rig<S = MemoryEntityStore> {
    pub(super) store: Arc<S>,
    pub(super) documents: Arc<MemoryDocumentStorage>,
    pub(super) desk: RentalDesk<S, MemoryDocumentStorage>,
}

pub(super) fn rig() -> Rig {
    rig_with(MemoryEntityStore::new(), RulesConfig::default())
}

pub(super) fn rig_with<S: EntityStore + 'static>(store: S, rules: RulesConfig) -> Rig<S> {
    let store = Arc::new(store);
    let documents = Arc::new(MemoryDocumentStorage::default());
    let desk = RentalDesk::new(Arc::clone(&store), Arc::clone(&documents), rules);
    Rig {
        store,
        documents,
        desk,
    }
}

pub(super) fn p101() -> NewProperty {
    NewProperty {
        name: "P101".to_string(),
        address: "101 Harbor Way".to_string(),
        city: "Springfield".to_string(),
        monthly_rent: rent(1200),
        occupant_id: None,
    }
}

pub(super) fn register<S: EntityStore + 'static>(
    desk: &RentalDesk<S, MemoryDocumentStorage>,
    property: NewProperty,
) -> Stored<Property> {
    desk.properties
        .register(&landlord(), property)
        .expect("property registers")
}

pub(super) fn employment() -> EmploymentInfo {
    EmploymentInfo {
        status: EmploymentStatus::FullTime,
        employer: "Harbor Logistics".to_string(),
        monthly_income: rent(4200),
        employment_length: "3 years".to_string(),
        previous_address: "9 Dock St".to_string(),
    }
}

pub(super) fn submission(property_id: &PropertyId, tenant_id: &str) -> ApplicationSubmission {
    ApplicationSubmission {
        property_id: property_id.clone(),
        tenant_id: UserId::from(tenant_id),
        employment: employment(),
        references: vec![Reference {
            name: "Dana Reyes".to_string(),
            relationship: "previous landlord".to_string(),
            phone: "555-0100".to_string(),
        }],
        additional_info: Some("Moving for work".to_string()),
    }
}

pub(super) fn approved_application<S: EntityStore + 'static>(
    desk: &RentalDesk<S, MemoryDocumentStorage>,
    property_id: &PropertyId,
) -> Stored<Application> {
    let application = desk
        .applications
        .submit(&tenant(), submission(property_id, TENANT))
        .expect("application submits");
    desk.applications
        .resolve(&landlord(), &application.id, ApplicationDecision::Approved)
        .expect("application approves")
}

pub(super) fn lease_options() -> LeaseOptions {
    LeaseOptions {
        tenant_id: None,
        application_id: None,
        terms: "12 month lease, no smoking".to_string(),
        monthly_rent: rent(1200),
        security_deposit: rent(1200),
        start_date: date(2025, 10, 1),
        end_date: date(2026, 9, 30),
    }
}

/// Lease for `TENANT` on the property, moved to pending_signature.
pub(super) fn pending_lease<S: EntityStore + 'static>(
    desk: &RentalDesk<S, MemoryDocumentStorage>,
    property_id: &PropertyId,
) -> Stored<Lease> {
    let options = LeaseOptions {
        tenant_id: Some(UserId::from(TENANT)),
        ..lease_options()
    };
    let draft = desk
        .leases
        .create(&landlord(), property_id, options)
        .expect("lease drafts");
    desk.leases
        .attach_document(&landlord(), &draft.id, "memory://documents/lease.pdf")
        .expect("document attaches")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

type Hook = Box<dyn FnOnce() + Send>;

/// Runs a hook between the read and the first conditional write, simulating another writer
/// committing in that window.
pub(super) struct InterleavingStore {
    inner: Arc<MemoryEntityStore>,
    before_update: Mutex<Option<Hook>>,
}

impl InterleavingStore {
    pub(super) fn new(inner: Arc<MemoryEntityStore>) -> Self {
        Self {
            inner,
            before_update: Mutex::new(None),
        }
    }

    pub(super) fn interleave(&self, hook: impl FnOnce() + Send + 'static) {
        *self.before_update.lock().expect("hook mutex poisoned") = Some(Box::new(hook));
    }
}

impl EntityStore for InterleavingStore {
    fn get(&self, collection: Collection, id: &str) -> Result<StoredDocument, StoreError> {
        self.inner.get(collection, id)
    }

    fn query(
        &self,
        collection: Collection,
        predicates: &[Predicate],
    ) -> Result<Vec<StoredDocument>, StoreError> {
        self.inner.query(collection, predicates)
    }

    fn insert(&self, collection: Collection, document: Document) -> Result<String, StoreError> {
        self.inner.insert(collection, document)
    }

    fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Document,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        if expected_version.is_some() {
            let hook = self.before_update.lock().expect("hook mutex poisoned").take();
            if let Some(hook) = hook {
                hook();
            }
        }
        self.inner.update(collection, id, patch, expected_version)
    }
}

/// Every conditional write loses to a phantom concurrent writer.
#[derive(Default)]
pub(super) struct ContendedStore {
    inner: MemoryEntityStore,
    pub(super) conditional_writes: AtomicU32,
}

impl EntityStore for ContendedStore {
    fn get(&self, collection: Collection, id: &str) -> Result<StoredDocument, StoreError> {
        self.inner.get(collection, id)
    }

    fn query(
        &self,
        collection: Collection,
        predicates: &[Predicate],
    ) -> Result<Vec<StoredDocument>, StoreError> {
        self.inner.query(collection, predicates)
    }

    fn insert(&self, collection: Collection, document: Document) -> Result<String, StoreError> {
        self.inner.insert(collection, document)
    }

    fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Document,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        match expected_version {
            Some(expected) => {
                self.conditional_writes.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::VersionConflict {
                    collection,
                    id: id.to_string(),
                    expected,
                    actual: expected + 1,
                })
            }
            None => self.inner.update(collection, id, patch, None),
        }
    }
}

/// Backend that is down for every call.
pub(super) struct UnavailableStore;

impl EntityStore for UnavailableStore {
    fn get(&self, _collection: Collection, _id: &str) -> Result<StoredDocument, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    fn query(
        &self,
        _collection: Collection,
        _predicates: &[Predicate],
    ) -> Result<Vec<StoredDocument>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    fn insert(&self, _collection: Collection, _document: Document) -> Result<String, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    fn update(
        &self,
        _collection: Collection,
        _id: &str,
        _patch: Document,
        _expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}
