use super::common::*;
use crate::workflows::rentals::domain::{ApplicationDecision, LeaseStatus, PropertyId};
use crate::workflows::rentals::error::RentalError;
use crate::workflows::rentals::store::{Collection, EntityStore};

#[test]
fn fresh_property_is_available() {
    let rig = rig();
    let property = register(&rig.desk, p101());

    assert!(rig
        .desk
        .availability
        .is_available(&property.id)
        .expect("availability resolves"));
}

#[test]
fn unknown_property_is_not_found() {
    let rig = rig();

    match rig
        .desk
        .availability
        .is_available(&PropertyId::from("property-404"))
    {
        Err(RentalError::NotFound { entity, id }) => {
            assert_eq!(entity, "property");
            assert_eq!(id, "property-404");
        }
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn pending_and_rejected_applications_do_not_hold_the_property() {
    let rig = rig();
    let property = register(&rig.desk, p101());

    let application = rig
        .desk
        .applications
        .submit(&tenant(), submission(&property.id, TENANT))
        .expect("submits");
    assert!(rig.desk.availability.is_available(&property.id).unwrap());

    rig.desk
        .applications
        .resolve(&landlord(), &application.id, ApplicationDecision::Rejected)
        .expect("rejects");
    assert!(rig.desk.availability.is_available(&property.id).unwrap());
}

#[test]
fn approval_makes_property_unavailable_and_keeps_it_so() {
    let rig = rig();
    let property = register(&rig.desk, p101());
    let application = approved_application(&rig.desk, &property.id);

    let snapshot = rig
        .desk
        .availability
        .snapshot(&property.id)
        .expect("snapshot");
    assert!(!snapshot.available);
    assert_eq!(snapshot.approved_applications, vec![application.id.clone()]);
    assert!(snapshot.occupying_leases.is_empty());

    // unrelated activity on the property never flips it back
    rig.desk
        .properties
        .set_listing(
            &landlord(),
            &property.id,
            crate::workflows::rentals::domain::ListingStatus::Delisted,
        )
        .expect("delists");
    assert!(!rig.desk.availability.is_available(&property.id).unwrap());
}

#[test]
fn signed_lease_holds_property_but_draft_and_rejected_do_not() {
    let rig = rig();
    let property = register(&rig.desk, p101());

    let lease = pending_lease(&rig.desk, &property.id);
    assert!(rig.desk.availability.is_available(&property.id).unwrap());

    rig.desk.leases.sign(&tenant(), &lease.id).expect("tenant signs");
    let signed = rig
        .desk
        .leases
        .sign(&landlord(), &lease.id)
        .expect("landlord signs");
    assert_eq!(signed.record.status, LeaseStatus::Signed);

    let snapshot = rig.desk.availability.snapshot(&property.id).unwrap();
    assert!(!snapshot.available);
    assert_eq!(snapshot.occupying_leases, vec![lease.id]);
}

#[test]
fn stored_availability_fields_are_ignored() {
    let rig = rig();
    let property = register(&rig.desk, p101());
    approved_application(&rig.desk, &property.id);

    let mut patch = serde_json::Map::new();
    patch.insert("available".to_string(), serde_json::Value::Bool(true));
    rig.store
        .update(Collection::Properties, property.id.as_str(), patch, None)
        .expect("stray field written");

    assert!(!rig.desk.availability.is_available(&property.id).unwrap());
}
