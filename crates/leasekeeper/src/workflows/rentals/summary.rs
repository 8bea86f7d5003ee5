use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::domain::{
    Caller, Lease, LeaseId, LeaseStatus, MaintenanceRequest, MaintenanceStatus, PaymentStatus,
    Property, PropertyId, RentPayment, Role, UserId,
};
use super::error::RentalError;
use super::store::{find, EntityStore, Predicate, Stored};

/// Calendar months covered by the landlord revenue series, current month included.
pub const REVENUE_MONTHS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OccupancyView {
    pub total_properties: usize,
    pub occupied: usize,
    pub vacant: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaintenanceLoadEntry {
    pub status: MaintenanceStatus,
    pub status_label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyRevenueEntry {
    /// `YYYY-MM`
    pub month: String,
    pub collected: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LandlordSummary {
    pub landlord_id: UserId,
    pub as_of: NaiveDate,
    pub occupancy: OccupancyView,
    pub maintenance: Vec<MaintenanceLoadEntry>,
    pub revenue: Vec<MonthlyRevenueEntry>,
    pub total_collected: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenantSummary {
    pub tenant_id: UserId,
    pub active_lease: Option<Stored<Lease>>,
    pub pending_payments: Vec<Stored<RentPayment>>,
    pub pending_total: Decimal,
    pub open_maintenance: Vec<Stored<MaintenanceRequest>>,
}

/// One row of a landlord's tenant roster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenancyEntry {
    pub tenant_id: UserId,
    pub lease_id: LeaseId,
    pub property_id: PropertyId,
    pub property_name: String,
    pub property_address: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: Decimal,
}

/// Read-only rollups over a caller's properties, leases, rent, and maintenance.
pub struct PortfolioReports<S> {
    store: Arc<S>,
}

impl<S> PortfolioReports<S>
where
    S: EntityStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Occupancy, maintenance load, and collected rent for the landlord's portfolio.
    ///
    /// A property counts as occupied while it has an active lease. Revenue buckets completed
    /// payments by the month they were paid, oldest month first.
    pub fn landlord_summary(
        &self,
        caller: &Caller,
        today: NaiveDate,
    ) -> Result<LandlordSummary, RentalError> {
        require_role(caller, Role::Landlord, "portfolio summary")?;
        let landlord = caller.user_id.as_str();

        let properties = find::<Property, S>(
            self.store.as_ref(),
            &[Predicate::eq("landlord_id", landlord)],
        )?;
        let owned: HashSet<&PropertyId> = properties.iter().map(|stored| &stored.id).collect();
        let occupied = self
            .active_leases("landlord_id", landlord)?
            .into_iter()
            .map(|lease| lease.record.property_id)
            .filter(|property_id| owned.contains(property_id))
            .collect::<HashSet<_>>()
            .len();

        let requests = find::<MaintenanceRequest, S>(
            self.store.as_ref(),
            &[Predicate::eq("landlord_id", landlord)],
        )?;
        let maintenance = [
            MaintenanceStatus::Open,
            MaintenanceStatus::InProgress,
            MaintenanceStatus::Completed,
        ]
        .into_iter()
        .map(|status| MaintenanceLoadEntry {
            status,
            status_label: status.label(),
            count: requests
                .iter()
                .filter(|request| request.record.status == status)
                .count(),
        })
        .collect();

        let collected = find::<RentPayment, S>(
            self.store.as_ref(),
            &[
                Predicate::eq("landlord_id", landlord),
                Predicate::eq("status", PaymentStatus::Completed.label()),
            ],
        )?;
        let total_collected = collected.iter().map(|payment| payment.record.amount).sum();
        let revenue = revenue_series(today, &collected);

        debug!(
            landlord_id = landlord,
            properties = properties.len(),
            occupied,
            payments = collected.len(),
            "landlord summary computed"
        );
        Ok(LandlordSummary {
            landlord_id: caller.user_id.clone(),
            as_of: today,
            occupancy: OccupancyView {
                total_properties: properties.len(),
                occupied,
                vacant: properties.len().saturating_sub(occupied),
            },
            maintenance,
            revenue,
            total_collected,
        })
    }

    /// The tenant's active lease, unpaid rent by due date, and unresolved maintenance.
    pub fn tenant_summary(&self, caller: &Caller) -> Result<TenantSummary, RentalError> {
        require_role(caller, Role::Tenant, "tenant summary")?;
        let tenant = caller.user_id.as_str();

        let mut leases = self.active_leases("tenant_id", tenant)?;
        leases.sort_by(|a, b| b.record.start_date.cmp(&a.record.start_date));

        let mut pending_payments = find::<RentPayment, S>(
            self.store.as_ref(),
            &[
                Predicate::eq("tenant_id", tenant),
                Predicate::eq("status", PaymentStatus::Pending.label()),
            ],
        )?;
        pending_payments.sort_by(|a, b| {
            a.record
                .due_date
                .cmp(&b.record.due_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        let pending_total = pending_payments
            .iter()
            .map(|payment| payment.record.amount)
            .sum();

        let mut open_maintenance = find::<MaintenanceRequest, S>(
            self.store.as_ref(),
            &[
                Predicate::eq("tenant_id", tenant),
                Predicate::within(
                    "status",
                    [MaintenanceStatus::Open, MaintenanceStatus::InProgress]
                        .map(MaintenanceStatus::label),
                ),
            ],
        )?;
        open_maintenance.sort_by(|a, b| b.record.created_at.cmp(&a.record.created_at));

        Ok(TenantSummary {
            tenant_id: caller.user_id.clone(),
            active_lease: leases.into_iter().next(),
            pending_payments,
            pending_total,
            open_maintenance,
        })
    }

    /// Tenants holding active leases on the landlord's properties, ordered by property name.
    pub fn tenants_for(&self, caller: &Caller) -> Result<Vec<TenancyEntry>, RentalError> {
        require_role(caller, Role::Landlord, "tenant roster")?;
        let landlord = caller.user_id.as_str();

        let properties: HashMap<PropertyId, Property> = find::<Property, S>(
            self.store.as_ref(),
            &[Predicate::eq("landlord_id", landlord)],
        )?
        .into_iter()
        .map(|stored| (stored.id, stored.record))
        .collect();

        let mut roster: Vec<TenancyEntry> = self
            .active_leases("landlord_id", landlord)?
            .into_iter()
            .filter_map(|lease| {
                let property = properties.get(&lease.record.property_id)?;
                let tenant_id = lease.record.tenant_id?;
                Some(TenancyEntry {
                    tenant_id,
                    lease_id: lease.id,
                    property_id: lease.record.property_id,
                    property_name: property.name.clone(),
                    property_address: property.address.clone(),
                    start_date: lease.record.start_date,
                    end_date: lease.record.end_date,
                    monthly_rent: lease.record.monthly_rent,
                })
            })
            .collect();
        roster.sort_by(|a, b| {
            a.property_name
                .cmp(&b.property_name)
                .then_with(|| a.tenant_id.cmp(&b.tenant_id))
        });
        Ok(roster)
    }

    fn active_leases(
        &self,
        field: &'static str,
        user_id: &str,
    ) -> Result<Vec<Stored<Lease>>, RentalError> {
        Ok(find::<Lease, S>(
            self.store.as_ref(),
            &[
                Predicate::eq(field, user_id),
                Predicate::eq("status", LeaseStatus::Active.label()),
            ],
        )?)
    }
}

fn require_role(caller: &Caller, role: Role, view: &str) -> Result<(), RentalError> {
    if caller.role == role {
        Ok(())
    } else {
        Err(RentalError::unauthorized(format!(
            "the {} is only available to a {}",
            view,
            role.label()
        )))
    }
}

fn revenue_series(today: NaiveDate, payments: &[Stored<RentPayment>]) -> Vec<MonthlyRevenueEntry> {
    let Some(current) = today.with_day(1) else {
        return Vec::new();
    };

    (0..REVENUE_MONTHS)
        .rev()
        .filter_map(|back| current.checked_sub_months(Months::new(back)))
        .map(|month| {
            let collected = payments
                .iter()
                .filter_map(|payment| {
                    let paid = payment.record.paid_at?.date_naive();
                    (paid.year() == month.year() && paid.month() == month.month())
                        .then_some(payment.record.amount)
                })
                .sum();
            MonthlyRevenueEntry {
                month: month.format("%Y-%m").to_string(),
                collected,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revenue_series_spans_year_boundary_oldest_first() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 14).expect("valid date");
        let months: Vec<_> = revenue_series(today, &[])
            .into_iter()
            .map(|entry| entry.month)
            .collect();

        assert_eq!(
            months,
            vec!["2025-09", "2025-10", "2025-11", "2025-12", "2026-01", "2026-02"]
        );
    }
}
