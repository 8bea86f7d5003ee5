use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use super::availability::AvailabilityResolver;
use super::commit::{commit_with_retry, Transition};
use super::domain::{
    Application, ApplicationDecision, ApplicationId, ApplicationStatus, Caller, EmploymentInfo,
    Property, PropertyId, Reference, Role, UserId,
};
use super::error::RentalError;
use super::store::{fetch, find, insert, EntityStore, Predicate, Stored};
use crate::config::RulesConfig;

const DECISION_FIELDS: &[&str] = &["status", "updated_at"];

/// Payload a tenant provides when applying for a property.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSubmission {
    pub property_id: PropertyId,
    pub tenant_id: UserId,
    pub employment: EmploymentInfo,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(default)]
    pub additional_info: Option<String>,
}

impl ApplicationSubmission {
    fn validate(&self) -> Result<(), RentalError> {
        if self.employment.monthly_income < Decimal::ZERO {
            return Err(RentalError::validation(
                "monthly income must not be negative",
            ));
        }
        if let Some(position) = self
            .references
            .iter()
            .position(|reference| reference.name.trim().is_empty())
        {
            return Err(RentalError::validation(format!(
                "reference {} is missing a name",
                position + 1
            )));
        }
        Ok(())
    }
}

/// Intake and landlord review of rental applications.
pub struct ApplicationReviewService<S> {
    store: Arc<S>,
    availability: AvailabilityResolver<S>,
    rules: RulesConfig,
}

impl<S> ApplicationReviewService<S>
where
    S: EntityStore + 'static,
{
    pub fn new(store: Arc<S>, rules: RulesConfig) -> Self {
        let availability = AvailabilityResolver::new(Arc::clone(&store));
        Self {
            store,
            availability,
            rules,
        }
    }

    /// Record a pending application from the tenant named in the submission.
    pub fn submit(
        &self,
        caller: &Caller,
        submission: ApplicationSubmission,
    ) -> Result<Stored<Application>, RentalError> {
        if !caller.is(Role::Tenant, &submission.tenant_id) {
            return Err(RentalError::unauthorized(
                "applications can only be submitted by the applying tenant",
            ));
        }
        submission.validate()?;

        let property = fetch::<Property, S>(self.store.as_ref(), &submission.property_id)?;
        if !self.availability.derive(&property.id)?.available {
            return Err(RentalError::invalid_state(format!(
                "property {} is not available",
                property.id
            )));
        }

        if !self.rules.allow_duplicate_applications {
            let pending = find::<Application, S>(
                self.store.as_ref(),
                &[
                    Predicate::eq("property_id", property.id.as_str()),
                    Predicate::eq("tenant_id", submission.tenant_id.as_str()),
                    Predicate::eq("status", ApplicationStatus::Pending.label()),
                ],
            )?;
            if let Some(existing) = pending.first() {
                return Err(RentalError::validation(format!(
                    "tenant {} already has pending application {} for property {}",
                    submission.tenant_id, existing.id, property.id
                )));
            }
        }

        let now = Utc::now();
        let application = Application {
            property_id: property.id.clone(),
            tenant_id: submission.tenant_id,
            landlord_id: property.record.landlord_id,
            employment: submission.employment,
            references: submission.references,
            additional_info: submission.additional_info,
            status: ApplicationStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let stored = insert(self.store.as_ref(), application)?;
        info!(
            application_id = %stored.id,
            property_id = %stored.record.property_id,
            tenant_id = %stored.record.tenant_id,
            "application submitted"
        );
        Ok(stored)
    }

    /// Approve or reject a pending application. Approval does not create a lease.
    pub fn resolve(
        &self,
        caller: &Caller,
        application_id: &ApplicationId,
        decision: ApplicationDecision,
    ) -> Result<Stored<Application>, RentalError> {
        let stored = commit_with_retry(
            self.store.as_ref(),
            application_id,
            self.rules.max_commit_attempts,
            |current: &Stored<Application>| {
                let application = &current.record;
                if !caller.is(Role::Landlord, &application.landlord_id) {
                    return Err(RentalError::unauthorized(
                        "only the property's landlord may resolve an application",
                    ));
                }
                if application.status != ApplicationStatus::Pending {
                    return Err(RentalError::invalid_state(format!(
                        "application {} is already {}",
                        current.id,
                        application.status.label()
                    )));
                }

                let mut record = application.clone();
                record.status = decision.into();
                record.updated_at = Utc::now();
                Ok(Transition::Apply {
                    record,
                    fields: DECISION_FIELDS,
                })
            },
        )?;

        info!(
            application_id = %stored.id,
            status = stored.record.status.label(),
            "application resolved"
        );
        Ok(stored)
    }

    /// Fetch an application visible to its tenant or landlord.
    pub fn get(
        &self,
        caller: &Caller,
        application_id: &ApplicationId,
    ) -> Result<Stored<Application>, RentalError> {
        let stored = fetch::<Application, S>(self.store.as_ref(), application_id)?;
        let application = &stored.record;
        if caller.is(Role::Tenant, &application.tenant_id)
            || caller.is(Role::Landlord, &application.landlord_id)
        {
            Ok(stored)
        } else {
            Err(RentalError::unauthorized(format!(
                "application {} belongs to another party",
                application_id
            )))
        }
    }

    /// Applications where the caller is the applicant or the reviewing landlord, newest first.
    pub fn list_for(&self, caller: &Caller) -> Result<Vec<Stored<Application>>, RentalError> {
        let field = match caller.role {
            Role::Tenant => "tenant_id",
            Role::Landlord => "landlord_id",
        };
        let mut applications = find::<Application, S>(
            self.store.as_ref(),
            &[Predicate::eq(field, caller.user_id.as_str())],
        )?;
        applications.sort_by(|a, b| {
            b.record
                .created_at
                .cmp(&a.record.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(applications)
    }
}
