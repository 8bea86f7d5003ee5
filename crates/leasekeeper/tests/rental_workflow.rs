//! End-to-end rental scenarios driven through the public desk facade and HTTP router.
//!
//! A single property moves from listing through application approval, lease drafting,
//! signatures, activation, rent, and maintenance.

mod common {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use leasekeeper::config::RulesConfig;
    use leasekeeper::workflows::rentals::{
        ApplicationSubmission, Caller, EmploymentInfo, EmploymentStatus, LeaseOptions,
        MemoryDocumentStorage, MemoryEntityStore, NewProperty, PropertyId, Reference, RentalDesk,
        UserId,
    };

    pub(super) type Desk = RentalDesk<MemoryEntityStore, MemoryDocumentStorage>;

    pub(super) fn desk() -> (Desk, Arc<MemoryDocumentStorage>) {
        let documents = Arc::new(MemoryDocumentStorage::default());
        let desk = RentalDesk::new(
            Arc::new(MemoryEntityStore::new()),
            Arc::clone(&documents),
            RulesConfig::default(),
        );
        (desk, documents)
    }

    pub(super) fn landlord() -> Caller {
        Caller::landlord("landlord-1")
    }

    pub(super) fn applicant() -> Caller {
        Caller::tenant("tenant-1")
    }

    pub(super) fn rival_applicant() -> Caller {
        Caller::tenant("tenant-2")
    }

    pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    pub(super) fn p101() -> NewProperty {
        NewProperty {
            name: "P101".to_string(),
            address: "101 Harbor Way".to_string(),
            city: "Springfield".to_string(),
            monthly_rent: Decimal::new(120000, 2),
            occupant_id: None,
        }
    }

    pub(super) fn submission(property_id: &PropertyId, tenant: &Caller) -> ApplicationSubmission {
        ApplicationSubmission {
            property_id: property_id.clone(),
            tenant_id: tenant.user_id.clone(),
            employment: EmploymentInfo {
                status: EmploymentStatus::FullTime,
                employer: "Harbor Logistics".to_string(),
                monthly_income: Decimal::new(420000, 2),
                employment_length: "3 years".to_string(),
                previous_address: "9 Dock St".to_string(),
            },
            references: vec![Reference {
                name: "Dana Reyes".to_string(),
                relationship: "previous landlord".to_string(),
                phone: "555-0100".to_string(),
            }],
            additional_info: None,
        }
    }

    pub(super) fn lease_terms(application_id: Option<String>) -> LeaseOptions {
        LeaseOptions {
            tenant_id: None::<UserId>,
            application_id: application_id.map(Into::into),
            terms: "12 month lease, no smoking, tenant pays utilities".to_string(),
            monthly_rent: Decimal::new(120000, 2),
            security_deposit: Decimal::new(120000, 2),
            start_date: date(2025, 10, 1),
            end_date: date(2026, 9, 30),
        }
    }
}

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use common::*;
use leasekeeper::workflows::rentals::{
    rentals_router, ApplicationDecision, ApplicationStatus, Caller, LeaseOptions, LeaseStatus,
    MaintenancePriority, MaintenanceStatus, MaintenanceTicket, PaymentStatus, RentalError,
};

#[test]
fn p101_moves_from_listing_to_occupied() {
    let (desk, documents) = desk();
    let property = desk
        .properties
        .register(&landlord(), p101())
        .expect("property registers");
    assert!(desk.availability.is_available(&property.id).unwrap());

    let application = desk
        .applications
        .submit(&applicant(), submission(&property.id, &applicant()))
        .expect("application submits");
    let rival = desk
        .applications
        .submit(&rival_applicant(), submission(&property.id, &rival_applicant()))
        .expect("rival application submits");
    assert!(
        desk.availability.is_available(&property.id).unwrap(),
        "pending applications do not hold the property"
    );

    desk.applications
        .resolve(&landlord(), &application.id, ApplicationDecision::Approved)
        .expect("approves");
    assert!(!desk.availability.is_available(&property.id).unwrap());

    match desk.applications.submit(
        &Caller::tenant("tenant-3"),
        submission(&property.id, &Caller::tenant("tenant-3")),
    ) {
        Err(RentalError::InvalidState(_)) => {}
        other => panic!("expected unavailable property, got {other:?}"),
    }
    let rejected = desk
        .applications
        .resolve(&landlord(), &rival.id, ApplicationDecision::Rejected)
        .expect("rejects rival");
    assert_eq!(rejected.record.status, ApplicationStatus::Rejected);

    let draft = desk
        .leases
        .create(
            &landlord(),
            &property.id,
            lease_terms(Some(application.id.to_string())),
        )
        .expect("lease drafts");
    assert_eq!(draft.record.status, LeaseStatus::Draft);
    assert_eq!(draft.record.tenant_id.as_ref(), Some(&applicant().user_id));

    let pending = desk
        .leases
        .upload_document(
            &landlord(),
            &draft.id,
            "P101 lease.pdf",
            b"%PDF-1.7 lease",
            "application/pdf",
        )
        .expect("document uploads");
    assert_eq!(pending.record.status, LeaseStatus::PendingSignature);
    assert_eq!(documents.objects().len(), 1);

    let tenant_signed = desk.leases.sign(&applicant(), &draft.id).expect("tenant signs");
    assert_eq!(tenant_signed.record.status, LeaseStatus::PendingSignature);
    let signed = desk.leases.sign(&landlord(), &draft.id).expect("landlord signs");
    assert_eq!(signed.record.status, LeaseStatus::Signed);

    match desk.leases.activate(&landlord(), &draft.id, date(2025, 9, 15)) {
        Err(RentalError::InvalidState(detail)) => assert!(detail.contains("2025-10-01")),
        other => panic!("expected early activation to fail, got {other:?}"),
    }
    let active = desk
        .leases
        .activate(&landlord(), &draft.id, date(2025, 10, 1))
        .expect("activates");
    assert_eq!(active.record.status, LeaseStatus::Active);

    let snapshot = desk.availability.snapshot(&property.id).expect("snapshot");
    assert!(!snapshot.available);
    assert_eq!(snapshot.occupying_leases, vec![draft.id.clone()]);

    match desk
        .leases
        .create(&landlord(), &property.id, lease_terms(None))
    {
        Err(RentalError::InvalidState(_)) => {}
        other => panic!("expected second lease to be refused, got {other:?}"),
    }

    let payment = desk
        .payments
        .schedule(&landlord(), &draft.id, date(2025, 10, 1))
        .expect("rent scheduled");
    let paid = desk.payments.pay(&applicant(), &payment.id).expect("rent paid");
    assert_eq!(paid.record.status, PaymentStatus::Completed);

    let request = desk
        .maintenance
        .submit(
            &applicant(),
            &property.id,
            MaintenanceTicket {
                title: "Heater out".to_string(),
                description: "No heat in the bedroom".to_string(),
                priority: MaintenancePriority::High,
                category: "hvac".to_string(),
                images: Vec::new(),
            },
        )
        .expect("maintenance opens");
    let completed = desk
        .maintenance
        .update_status(&landlord(), &request.id, MaintenanceStatus::Completed)
        .expect("maintenance completes");
    assert_eq!(completed.record.status, MaintenanceStatus::Completed);
}

#[test]
fn rejected_lease_releases_nothing_it_never_held() {
    let (desk, _) = desk();
    let property = desk
        .properties
        .register(&landlord(), p101())
        .expect("property registers");
    let draft = desk
        .leases
        .create(
            &landlord(),
            &property.id,
            LeaseOptions {
                tenant_id: Some(applicant().user_id),
                ..lease_terms(None)
            },
        )
        .expect("lease drafts");
    desk.leases
        .attach_document(&landlord(), &draft.id, "memory://documents/p101.pdf")
        .expect("attaches");

    assert!(desk.availability.is_available(&property.id).unwrap());
    let rejected = desk.leases.reject(&applicant(), &draft.id).expect("rejects");
    assert_eq!(rejected.record.status, LeaseStatus::Rejected);
    assert!(desk.availability.is_available(&property.id).unwrap());

    match desk.leases.sign(&landlord(), &draft.id) {
        Err(RentalError::InvalidState(_)) => {}
        other => panic!("expected rejected lease to refuse signatures, got {other:?}"),
    }
}

#[tokio::test]
async fn availability_route_reflects_approvals() {
    let (desk, _) = desk();
    let property = desk
        .properties
        .register(&landlord(), p101())
        .expect("property registers");
    let application = desk
        .applications
        .submit(&applicant(), submission(&property.id, &applicant()))
        .expect("application submits");
    desk.applications
        .resolve(&landlord(), &application.id, ApplicationDecision::Approved)
        .expect("approves");

    let router = rentals_router(Arc::new(desk));
    let response = router
        .oneshot(
            Request::get(format!("/api/v1/properties/{}/availability", property.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    let payload: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
    assert_eq!(payload["available"], false);
    assert_eq!(
        payload["approved_applications"][0],
        application.id.as_str()
    );
}
