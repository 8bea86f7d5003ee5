use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use super::commit::{commit_with_retry, Transition};
use super::domain::{
    Caller, Lease, LeaseStatus, MaintenancePriority, MaintenanceRequest, MaintenanceRequestId,
    MaintenanceStatus, Property, PropertyId, Role,
};
use super::error::RentalError;
use super::store::{fetch, find, insert, EntityStore, Predicate, Stored};
use crate::config::RulesConfig;

const STATUS_FIELDS: &[&str] = &["status", "updated_at"];

fn default_priority() -> MaintenancePriority {
    MaintenancePriority::Normal
}

/// Details a tenant files with a maintenance request.
#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceTicket {
    pub title: String,
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: MaintenancePriority,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Tenant-raised maintenance requests tracked through to completion.
pub struct MaintenanceDesk<S> {
    store: Arc<S>,
    rules: RulesConfig,
}

impl<S> MaintenanceDesk<S>
where
    S: EntityStore + 'static,
{
    pub fn new(store: Arc<S>, rules: RulesConfig) -> Self {
        Self { store, rules }
    }

    pub fn submit(
        &self,
        caller: &Caller,
        property_id: &PropertyId,
        ticket: MaintenanceTicket,
    ) -> Result<Stored<MaintenanceRequest>, RentalError> {
        if caller.role != Role::Tenant {
            return Err(RentalError::unauthorized(
                "maintenance requests are raised by tenants",
            ));
        }
        if ticket.title.trim().is_empty() || ticket.description.trim().is_empty() {
            return Err(RentalError::validation(
                "maintenance requests need a title and a description",
            ));
        }

        let property = fetch::<Property, S>(self.store.as_ref(), property_id)?;
        if !self.resides(caller, &property)? {
            return Err(RentalError::unauthorized(format!(
                "tenant {} does not live at property {}",
                caller.user_id, property_id
            )));
        }

        let now = Utc::now();
        let request = MaintenanceRequest {
            property_id: property.id.clone(),
            tenant_id: caller.user_id.clone(),
            landlord_id: property.record.landlord_id.clone(),
            title: ticket.title.trim().to_string(),
            description: ticket.description.trim().to_string(),
            priority: ticket.priority,
            category: ticket.category,
            images: ticket.images,
            status: MaintenanceStatus::Open,
            created_at: now,
            updated_at: now,
        };

        let stored = insert(self.store.as_ref(), request)?;
        info!(
            request_id = %stored.id,
            property_id = %property_id,
            priority = ?stored.record.priority,
            "maintenance request opened"
        );
        Ok(stored)
    }

    fn resides(&self, caller: &Caller, property: &Stored<Property>) -> Result<bool, RentalError> {
        if property.record.occupant_id.as_ref() == Some(&caller.user_id) {
            return Ok(true);
        }
        let leases = find::<Lease, S>(
            self.store.as_ref(),
            &[
                Predicate::eq("property_id", property.id.as_str()),
                Predicate::eq("tenant_id", caller.user_id.as_str()),
                Predicate::within("status", LeaseStatus::OCCUPYING.map(LeaseStatus::label)),
            ],
        )?;
        Ok(!leases.is_empty())
    }

    /// Advance a request. Status only moves forward.
    pub fn update_status(
        &self,
        caller: &Caller,
        request_id: &MaintenanceRequestId,
        status: MaintenanceStatus,
    ) -> Result<Stored<MaintenanceRequest>, RentalError> {
        let stored = commit_with_retry(
            self.store.as_ref(),
            request_id,
            self.rules.max_commit_attempts,
            |current: &Stored<MaintenanceRequest>| {
                if !caller.is(Role::Landlord, &current.record.landlord_id) {
                    return Err(RentalError::unauthorized(format!(
                        "maintenance request {} belongs to another landlord",
                        current.id
                    )));
                }
                if status == current.record.status {
                    return Ok(Transition::Unchanged);
                }
                if status < current.record.status {
                    return Err(RentalError::invalid_state(format!(
                        "maintenance request {} cannot move from {} back to {}",
                        current.id,
                        current.record.status.label(),
                        status.label()
                    )));
                }

                let mut record = current.record.clone();
                record.status = status;
                record.updated_at = Utc::now();
                Ok(Transition::Apply {
                    record,
                    fields: STATUS_FIELDS,
                })
            },
        )?;

        info!(
            request_id = %stored.id,
            status = stored.record.status.label(),
            "maintenance request updated"
        );
        Ok(stored)
    }

    /// Requests raised by the tenant or addressed to the landlord, newest first.
    pub fn list_for(
        &self,
        caller: &Caller,
    ) -> Result<Vec<Stored<MaintenanceRequest>>, RentalError> {
        let field = match caller.role {
            Role::Tenant => "tenant_id",
            Role::Landlord => "landlord_id",
        };
        let mut requests = find::<MaintenanceRequest, S>(
            self.store.as_ref(),
            &[Predicate::eq(field, caller.user_id.as_str())],
        )?;
        requests.sort_by(|a, b| {
            b.record
                .created_at
                .cmp(&a.record.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(requests)
    }
}
