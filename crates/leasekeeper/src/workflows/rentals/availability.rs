use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Lease, LeaseId, LeaseStatus, Property,
    PropertyId,
};
use super::error::RentalError;
use super::store::{fetch, find, EntityStore, Predicate};

/// Point-in-time view of what holds a property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilitySnapshot {
    pub property_id: PropertyId,
    pub available: bool,
    pub approved_applications: Vec<ApplicationId>,
    pub occupying_leases: Vec<LeaseId>,
    pub checked_at: DateTime<Utc>,
}

/// Derives availability from applications and leases on every call; nothing is cached or stored.
pub struct AvailabilityResolver<S> {
    store: Arc<S>,
}

impl<S> Clone for AvailabilityResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> AvailabilityResolver<S>
where
    S: EntityStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// True when the property has no approved application and no signed or active lease.
    pub fn is_available(&self, property_id: &PropertyId) -> Result<bool, RentalError> {
        Ok(self.snapshot(property_id)?.available)
    }

    pub fn snapshot(&self, property_id: &PropertyId) -> Result<AvailabilitySnapshot, RentalError> {
        fetch::<Property, S>(self.store.as_ref(), property_id)?;
        self.derive(property_id)
    }

    /// Availability for a property the caller has already loaded.
    pub(crate) fn derive(
        &self,
        property_id: &PropertyId,
    ) -> Result<AvailabilitySnapshot, RentalError> {
        let approved_applications = find::<Application, S>(
            self.store.as_ref(),
            &[
                Predicate::eq("property_id", property_id.as_str()),
                Predicate::eq("status", ApplicationStatus::Approved.label()),
            ],
        )?
        .into_iter()
        .map(|stored| stored.id)
        .collect::<Vec<_>>();

        let occupying_leases = find::<Lease, S>(
            self.store.as_ref(),
            &[
                Predicate::eq("property_id", property_id.as_str()),
                Predicate::within("status", LeaseStatus::OCCUPYING.map(LeaseStatus::label)),
            ],
        )?
        .into_iter()
        .map(|stored| stored.id)
        .collect::<Vec<_>>();

        Ok(AvailabilitySnapshot {
            property_id: property_id.clone(),
            available: approved_applications.is_empty() && occupying_leases.is_empty(),
            approved_applications,
            occupying_leases,
            checked_at: Utc::now(),
        })
    }
}
