use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use super::commit::{commit_with_retry, Transition};
use super::documents::{lease_document_path, require_pdf, DocumentStorage};
use super::domain::{
    Application, ApplicationId, ApplicationStatus, Caller, Lease, LeaseId, LeaseStatus, Property,
    PropertyId, Role, Signatures, UserId,
};
use super::error::RentalError;
use super::store::{fetch, find, insert, EntityStore, Predicate, Stored};
use crate::config::RulesConfig;

const TENANT_FIELDS: &[&str] = &["tenant_id", "updated_at"];
const DOCUMENT_FIELDS: &[&str] = &["document_url", "status", "updated_at"];
const SIGNATURE_FIELDS: &[&str] = &["signatures", "status", "updated_at"];
const STATUS_FIELDS: &[&str] = &["status", "updated_at"];

/// Terms a landlord supplies when drafting a lease.
#[derive(Debug, Clone, Deserialize)]
pub struct LeaseOptions {
    #[serde(default)]
    pub tenant_id: Option<UserId>,
    #[serde(default)]
    pub application_id: Option<ApplicationId>,
    pub terms: String,
    pub monthly_rent: Decimal,
    pub security_deposit: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl LeaseOptions {
    fn validate(&self) -> Result<(), RentalError> {
        if self.start_date >= self.end_date {
            return Err(RentalError::validation(format!(
                "lease must end after it starts ({} >= {})",
                self.start_date, self.end_date
            )));
        }
        if self.monthly_rent <= Decimal::ZERO {
            return Err(RentalError::validation("monthly rent must be positive"));
        }
        if self.security_deposit <= Decimal::ZERO {
            return Err(RentalError::validation("security deposit must be positive"));
        }
        if self.terms.trim().is_empty() {
            return Err(RentalError::validation("lease terms must not be empty"));
        }
        Ok(())
    }
}

/// Drafting, countersigning, and activation of leases.
///
/// Every transition re-reads the lease and commits only against the version it read, so a
/// concurrent rejection is never overwritten and concurrent signatures both land.
pub struct LeaseLifecycleService<S, D> {
    store: Arc<S>,
    documents: Arc<D>,
    rules: RulesConfig,
}

impl<S, D> LeaseLifecycleService<S, D>
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    pub fn new(store: Arc<S>, documents: Arc<D>, rules: RulesConfig) -> Self {
        Self {
            store,
            documents,
            rules,
        }
    }

    /// Draft a lease for a property the caller owns. The draft carries no document yet.
    pub fn create(
        &self,
        caller: &Caller,
        property_id: &PropertyId,
        options: LeaseOptions,
    ) -> Result<Stored<Lease>, RentalError> {
        let property = fetch::<Property, S>(self.store.as_ref(), property_id)?;
        if !caller.is(Role::Landlord, &property.record.landlord_id) {
            return Err(RentalError::unauthorized(
                "only the property's landlord may draft a lease",
            ));
        }
        options.validate()?;

        let tenant_id = match &options.application_id {
            Some(application_id) => {
                let application = fetch::<Application, S>(self.store.as_ref(), application_id)?;
                self.tenant_from_application(&property, &application, options.tenant_id.as_ref())?
            }
            None => options
                .tenant_id
                .clone()
                .or_else(|| property.record.occupant_id.clone()),
        };

        if let Some(application_id) = &options.application_id {
            self.require_unleased_application(application_id)?;
        }
        self.require_unheld(&property.id, None)?;

        let now = Utc::now();
        let lease = Lease {
            property_id: property.id.clone(),
            tenant_id,
            landlord_id: property.record.landlord_id.clone(),
            application_id: options.application_id,
            status: LeaseStatus::Draft,
            start_date: options.start_date,
            end_date: options.end_date,
            monthly_rent: options.monthly_rent,
            security_deposit: options.security_deposit,
            terms: options.terms,
            document_url: None,
            signatures: Signatures::default(),
            created_at: now,
            updated_at: now,
        };

        let stored = insert(self.store.as_ref(), lease)?;
        info!(
            lease_id = %stored.id,
            property_id = %stored.record.property_id,
            tenant_bound = stored.record.tenant_id.is_some(),
            "lease drafted"
        );
        Ok(stored)
    }

    /// Fails when a lease other than `except` already occupies the property.
    fn require_unheld(
        &self,
        property_id: &PropertyId,
        except: Option<&LeaseId>,
    ) -> Result<(), RentalError> {
        let occupying = find::<Lease, S>(
            self.store.as_ref(),
            &[
                Predicate::eq("property_id", property_id.as_str()),
                Predicate::within("status", LeaseStatus::OCCUPYING.map(LeaseStatus::label)),
            ],
        )?;
        match occupying.iter().find(|lease| Some(&lease.id) != except) {
            Some(existing) => Err(RentalError::invalid_state(format!(
                "property {} is already held by lease {} ({})",
                property_id,
                existing.id,
                existing.record.status.label()
            ))),
            None => Ok(()),
        }
    }

    /// An approved application backs at most one lease until that lease is rejected.
    fn require_unleased_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<(), RentalError> {
        let leases = find::<Lease, S>(
            self.store.as_ref(),
            &[Predicate::eq("application_id", application_id.as_str())],
        )?;
        match leases
            .iter()
            .find(|lease| lease.record.status != LeaseStatus::Rejected)
        {
            Some(existing) => Err(RentalError::invalid_state(format!(
                "application {} already backs lease {} ({})",
                application_id,
                existing.id,
                existing.record.status.label()
            ))),
            None => Ok(()),
        }
    }

    fn tenant_from_application(
        &self,
        property: &Stored<Property>,
        application: &Stored<Application>,
        explicit_tenant: Option<&UserId>,
    ) -> Result<Option<UserId>, RentalError> {
        let record = &application.record;
        if record.property_id != property.id || record.landlord_id != property.record.landlord_id
        {
            return Err(RentalError::validation(format!(
                "application {} was not made for property {}",
                application.id, property.id
            )));
        }
        if record.status != ApplicationStatus::Approved {
            return Err(RentalError::invalid_state(format!(
                "application {} is {}, not approved",
                application.id,
                record.status.label()
            )));
        }
        if let Some(tenant) = explicit_tenant {
            if tenant != &record.tenant_id {
                return Err(RentalError::validation(format!(
                    "tenant {} does not match applicant {} of application {}",
                    tenant, record.tenant_id, application.id
                )));
            }
        }
        Ok(Some(record.tenant_id.clone()))
    }

    /// Bind a tenant to a draft lease.
    pub fn assign_tenant(
        &self,
        caller: &Caller,
        lease_id: &LeaseId,
        tenant_id: &UserId,
    ) -> Result<Stored<Lease>, RentalError> {
        let stored = commit_with_retry(
            self.store.as_ref(),
            lease_id,
            self.rules.max_commit_attempts,
            |current: &Stored<Lease>| {
                let lease = &current.record;
                require_landlord(caller, current)?;
                require_status(current, LeaseStatus::Draft)?;
                if lease.tenant_id.as_ref() == Some(tenant_id) {
                    return Ok(Transition::Unchanged);
                }
                if lease.application_id.is_some() && lease.tenant_id.is_some() {
                    return Err(RentalError::validation(format!(
                        "lease {} is bound to the applicant of its application",
                        current.id
                    )));
                }

                let mut record = lease.clone();
                record.tenant_id = Some(tenant_id.clone());
                record.updated_at = Utc::now();
                Ok(Transition::Apply {
                    record,
                    fields: TENANT_FIELDS,
                })
            },
        )?;

        info!(lease_id = %stored.id, tenant_id = %tenant_id, "tenant assigned to lease");
        Ok(stored)
    }

    /// Attach the lease document and open the lease for signatures.
    pub fn attach_document(
        &self,
        caller: &Caller,
        lease_id: &LeaseId,
        locator: &str,
    ) -> Result<Stored<Lease>, RentalError> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(RentalError::validation("document locator must not be empty"));
        }

        let stored = commit_with_retry(
            self.store.as_ref(),
            lease_id,
            self.rules.max_commit_attempts,
            |current: &Stored<Lease>| {
                require_landlord(caller, current)?;
                require_status(current, LeaseStatus::Draft)?;
                require_tenant(current)?;

                let mut record = current.record.clone();
                record.document_url = Some(locator.to_string());
                record.status = LeaseStatus::PendingSignature;
                record.updated_at = Utc::now();
                Ok(Transition::Apply {
                    record,
                    fields: DOCUMENT_FIELDS,
                })
            },
        )?;

        info!(lease_id = %stored.id, "lease document attached, awaiting signatures");
        Ok(stored)
    }

    /// Store a PDF through document storage and attach the resulting locator.
    pub fn upload_document(
        &self,
        caller: &Caller,
        lease_id: &LeaseId,
        file_name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<Stored<Lease>, RentalError> {
        let content_type = require_pdf(content_type).map_err(RentalError::validation)?;

        let current = fetch::<Lease, S>(self.store.as_ref(), lease_id)?;
        require_landlord(caller, &current)?;
        require_status(&current, LeaseStatus::Draft)?;
        require_tenant(&current)?;

        let path = lease_document_path(lease_id, file_name);
        let locator = self.documents.store(&path, bytes, &content_type)?;
        info!(lease_id = %lease_id, %path, size = bytes.len(), "lease document stored");

        self.attach_document(caller, lease_id, &locator)
    }

    /// Record the caller's signature. Both signatures move the lease to `signed`.
    pub fn sign(&self, caller: &Caller, lease_id: &LeaseId) -> Result<Stored<Lease>, RentalError> {
        let stored = commit_with_retry(
            self.store.as_ref(),
            lease_id,
            self.rules.max_commit_attempts,
            |current: &Stored<Lease>| {
                let lease = &current.record;
                if !lease.is_party(caller) {
                    return Err(RentalError::unauthorized(format!(
                        "{} {} is not a party to lease {}",
                        caller.role.label(),
                        caller.user_id,
                        current.id
                    )));
                }

                let already_signed = lease.signatures.has_signed(caller.role);
                match lease.status {
                    LeaseStatus::PendingSignature | LeaseStatus::Signed if already_signed => {
                        return Ok(Transition::Unchanged)
                    }
                    LeaseStatus::PendingSignature => {}
                    _ => {
                        return Err(RentalError::invalid_state(format!(
                            "lease {} is {}, not awaiting signatures",
                            current.id,
                            lease.status.label()
                        )))
                    }
                }

                let mut record = lease.clone();
                record.signatures.mark(caller.role);
                if record.signatures.complete() {
                    self.require_unheld(&lease.property_id, Some(&current.id))?;
                    record.status = LeaseStatus::Signed;
                }
                record.updated_at = Utc::now();
                Ok(Transition::Apply {
                    record,
                    fields: SIGNATURE_FIELDS,
                })
            },
        )?;

        info!(
            lease_id = %stored.id,
            role = caller.role.label(),
            status = stored.record.status.label(),
            "lease signature recorded"
        );
        Ok(stored)
    }

    /// Decline the lease. Either party may reject while signatures are pending.
    pub fn reject(
        &self,
        caller: &Caller,
        lease_id: &LeaseId,
    ) -> Result<Stored<Lease>, RentalError> {
        let stored = commit_with_retry(
            self.store.as_ref(),
            lease_id,
            self.rules.max_commit_attempts,
            |current: &Stored<Lease>| {
                if !current.record.is_party(caller) {
                    return Err(RentalError::unauthorized(format!(
                        "{} {} is not a party to lease {}",
                        caller.role.label(),
                        caller.user_id,
                        current.id
                    )));
                }
                require_status(current, LeaseStatus::PendingSignature)?;

                let mut record = current.record.clone();
                record.status = LeaseStatus::Rejected;
                record.updated_at = Utc::now();
                Ok(Transition::Apply {
                    record,
                    fields: STATUS_FIELDS,
                })
            },
        )?;

        info!(lease_id = %stored.id, role = caller.role.label(), "lease rejected");
        Ok(stored)
    }

    /// Move a signed lease to `active` once its start date has arrived.
    pub fn activate(
        &self,
        caller: &Caller,
        lease_id: &LeaseId,
        today: NaiveDate,
    ) -> Result<Stored<Lease>, RentalError> {
        let stored = commit_with_retry(
            self.store.as_ref(),
            lease_id,
            self.rules.max_commit_attempts,
            |current: &Stored<Lease>| {
                require_landlord(caller, current)?;
                require_status(current, LeaseStatus::Signed)?;
                if today < current.record.start_date {
                    return Err(RentalError::invalid_state(format!(
                        "lease {} starts on {}",
                        current.id, current.record.start_date
                    )));
                }

                let mut record = current.record.clone();
                record.status = LeaseStatus::Active;
                record.updated_at = Utc::now();
                Ok(Transition::Apply {
                    record,
                    fields: STATUS_FIELDS,
                })
            },
        )?;

        info!(lease_id = %stored.id, %today, "lease activated");
        Ok(stored)
    }

    pub fn get(&self, caller: &Caller, lease_id: &LeaseId) -> Result<Stored<Lease>, RentalError> {
        let stored = fetch::<Lease, S>(self.store.as_ref(), lease_id)?;
        if stored.record.is_party(caller) {
            Ok(stored)
        } else {
            Err(RentalError::unauthorized(format!(
                "lease {} belongs to another party",
                lease_id
            )))
        }
    }

    /// Leases the caller is party to, newest first.
    pub fn list_for(&self, caller: &Caller) -> Result<Vec<Stored<Lease>>, RentalError> {
        let field = match caller.role {
            Role::Tenant => "tenant_id",
            Role::Landlord => "landlord_id",
        };
        let mut leases = find::<Lease, S>(
            self.store.as_ref(),
            &[Predicate::eq(field, caller.user_id.as_str())],
        )?;
        leases.sort_by(|a, b| {
            b.record
                .created_at
                .cmp(&a.record.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(leases)
    }
}

fn require_landlord(caller: &Caller, lease: &Stored<Lease>) -> Result<(), RentalError> {
    if caller.is(Role::Landlord, &lease.record.landlord_id) {
        Ok(())
    } else {
        Err(RentalError::unauthorized(format!(
            "only the landlord of record may change lease {}",
            lease.id
        )))
    }
}

fn require_tenant(lease: &Stored<Lease>) -> Result<(), RentalError> {
    if lease.record.tenant_id.is_some() {
        Ok(())
    } else {
        Err(RentalError::validation(format!(
            "lease {} has no tenant to sign it",
            lease.id
        )))
    }
}

fn require_status(lease: &Stored<Lease>, expected: LeaseStatus) -> Result<(), RentalError> {
    if lease.record.status == expected {
        Ok(())
    } else {
        Err(RentalError::invalid_state(format!(
            "lease {} is {}, expected {}",
            lease.id,
            lease.record.status.label(),
            expected.label()
        )))
    }
}
