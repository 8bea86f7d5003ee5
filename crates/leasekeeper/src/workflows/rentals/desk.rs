use std::sync::Arc;

use super::applications::ApplicationReviewService;
use super::availability::AvailabilityResolver;
use super::documents::DocumentStorage;
use super::leases::LeaseLifecycleService;
use super::maintenance::MaintenanceDesk;
use super::payments::RentLedger;
use super::properties::PropertyDirectory;
use super::store::EntityStore;
use super::summary::PortfolioReports;
use crate::config::RulesConfig;

/// Every rental workflow wired against one entity store and one document storage backend.
pub struct RentalDesk<S, D> {
    pub availability: AvailabilityResolver<S>,
    pub properties: PropertyDirectory<S>,
    pub applications: ApplicationReviewService<S>,
    pub leases: LeaseLifecycleService<S, D>,
    pub payments: RentLedger<S>,
    pub maintenance: MaintenanceDesk<S>,
    pub reports: PortfolioReports<S>,
}

impl<S, D> RentalDesk<S, D>
where
    S: EntityStore + 'static,
    D: DocumentStorage + 'static,
{
    pub fn new(store: Arc<S>, documents: Arc<D>, rules: RulesConfig) -> Self {
        Self {
            availability: AvailabilityResolver::new(Arc::clone(&store)),
            properties: PropertyDirectory::new(Arc::clone(&store), rules),
            applications: ApplicationReviewService::new(Arc::clone(&store), rules),
            leases: LeaseLifecycleService::new(Arc::clone(&store), documents, rules),
            payments: RentLedger::new(Arc::clone(&store), rules),
            maintenance: MaintenanceDesk::new(Arc::clone(&store), rules),
            reports: PortfolioReports::new(store),
        }
    }
}
