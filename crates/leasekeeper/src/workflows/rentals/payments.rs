use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::info;

use super::commit::{commit_with_retry, Transition};
use super::domain::{Caller, Lease, LeaseId, PaymentId, PaymentStatus, RentPayment, Role};
use super::error::RentalError;
use super::store::{fetch, find, insert, EntityStore, Predicate, Stored};
use crate::config::RulesConfig;

const PAYMENT_FIELDS: &[&str] = &["status", "paid_at", "updated_at"];

/// Rent due on signed and active leases.
pub struct RentLedger<S> {
    store: Arc<S>,
    rules: RulesConfig,
}

impl<S> RentLedger<S>
where
    S: EntityStore + 'static,
{
    pub fn new(store: Arc<S>, rules: RulesConfig) -> Self {
        Self { store, rules }
    }

    /// Open a pending payment for one month of rent on the lease.
    pub fn schedule(
        &self,
        caller: &Caller,
        lease_id: &LeaseId,
        due_date: NaiveDate,
    ) -> Result<Stored<RentPayment>, RentalError> {
        let lease = fetch::<Lease, S>(self.store.as_ref(), lease_id)?;
        let record = &lease.record;
        if !caller.is(Role::Landlord, &record.landlord_id) {
            return Err(RentalError::unauthorized(format!(
                "only the landlord of lease {} may schedule rent",
                lease_id
            )));
        }
        if !record.status.is_occupying() {
            return Err(RentalError::invalid_state(format!(
                "lease {} is {}; rent is only due on signed or active leases",
                lease_id,
                record.status.label()
            )));
        }
        let tenant_id = record.tenant_id.clone().ok_or_else(|| {
            RentalError::invalid_state(format!("lease {} has no tenant", lease_id))
        })?;

        let now = Utc::now();
        let payment = RentPayment {
            lease_id: lease.id.clone(),
            property_id: record.property_id.clone(),
            tenant_id,
            landlord_id: record.landlord_id.clone(),
            amount: record.monthly_rent,
            due_date,
            status: PaymentStatus::Pending,
            paid_at: None,
            created_at: now,
            updated_at: now,
        };

        let stored = insert(self.store.as_ref(), payment)?;
        info!(
            payment_id = %stored.id,
            lease_id = %lease_id,
            amount = %stored.record.amount,
            %due_date,
            "rent scheduled"
        );
        Ok(stored)
    }

    /// Settle a pending payment on behalf of its tenant.
    pub fn pay(
        &self,
        caller: &Caller,
        payment_id: &PaymentId,
    ) -> Result<Stored<RentPayment>, RentalError> {
        let stored = commit_with_retry(
            self.store.as_ref(),
            payment_id,
            self.rules.max_commit_attempts,
            |current: &Stored<RentPayment>| {
                if !caller.is(Role::Tenant, &current.record.tenant_id) {
                    return Err(RentalError::unauthorized(format!(
                        "payment {} is owed by another tenant",
                        current.id
                    )));
                }
                if current.record.status != PaymentStatus::Pending {
                    return Err(RentalError::invalid_state(format!(
                        "payment {} is already {}",
                        current.id,
                        current.record.status.label()
                    )));
                }

                let now = Utc::now();
                let mut record = current.record.clone();
                record.status = PaymentStatus::Completed;
                record.paid_at = Some(now);
                record.updated_at = now;
                Ok(Transition::Apply {
                    record,
                    fields: PAYMENT_FIELDS,
                })
            },
        )?;

        info!(payment_id = %stored.id, "rent paid");
        Ok(stored)
    }

    /// Payments owed by or to the caller, earliest due first.
    pub fn list_for(&self, caller: &Caller) -> Result<Vec<Stored<RentPayment>>, RentalError> {
        let field = match caller.role {
            Role::Tenant => "tenant_id",
            Role::Landlord => "landlord_id",
        };
        let mut payments = find::<RentPayment, S>(
            self.store.as_ref(),
            &[Predicate::eq(field, caller.user_id.as_str())],
        )?;
        payments.sort_by(|a, b| {
            a.record
                .due_date
                .cmp(&b.record.due_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(payments)
    }
}
