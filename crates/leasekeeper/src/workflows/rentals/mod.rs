//! Property rental rules: listings, applications, leases, rent, and maintenance.
//!
//! Every operation takes the acting [`Caller`] explicitly and persists through an
//! [`EntityStore`]. State transitions are conditional on the record version that was read,
//! so concurrent writers either both land (signatures) or the loser re-reads and re-validates.
//! Availability is never stored; [`AvailabilityResolver`] derives it from approved
//! applications and signed or active leases on each call.

pub mod applications;
pub mod availability;
mod commit;
pub mod desk;
pub mod documents;
pub mod domain;
pub mod error;
pub mod import;
pub mod leases;
pub mod maintenance;
pub mod payments;
pub mod properties;
pub mod router;
pub mod store;
pub mod summary;

#[cfg(test)]
mod tests;

pub use applications::{ApplicationReviewService, ApplicationSubmission};
pub use availability::{AvailabilityResolver, AvailabilitySnapshot};
pub use desk::RentalDesk;
pub use documents::{
    lease_document_path, require_pdf, DocumentStorage, MemoryDocumentStorage, StorageError,
};
pub use domain::{
    Application, ApplicationDecision, ApplicationId, ApplicationStatus, Caller, EmploymentInfo,
    EmploymentStatus, Lease, LeaseId, LeaseStatus, ListingStatus, MaintenancePriority,
    MaintenanceRequest, MaintenanceRequestId, MaintenanceStatus, PaymentId, PaymentStatus,
    Property, PropertyId, Reference, RentPayment, Role, Signatures, UserId,
};
pub use error::{ErrorKind, RentalError};
pub use import::{ImportError, PortfolioImporter};
pub use leases::{LeaseLifecycleService, LeaseOptions};
pub use maintenance::{MaintenanceDesk, MaintenanceTicket};
pub use payments::RentLedger;
pub use properties::{ListingFilter, NewProperty, PropertyDirectory, PropertyListing};
pub use router::{caller_from_headers, error_response, rentals_router, status_for};
pub use store::{
    Collection, Document, EntityStore, MemoryEntityStore, Predicate, Record, StoreError, Stored,
    StoredDocument, INITIAL_VERSION,
};
pub use summary::{
    LandlordSummary, MaintenanceLoadEntry, MonthlyRevenueEntry, OccupancyView, PortfolioReports,
    TenancyEntry, TenantSummary,
};
