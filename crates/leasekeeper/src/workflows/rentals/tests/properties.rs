use rust_decimal::Decimal;

use super::common::*;
use crate::workflows::rentals::domain::{Caller, ListingStatus, UserId};
use crate::workflows::rentals::error::RentalError;
use crate::workflows::rentals::properties::{ListingFilter, NewProperty};
use crate::workflows::rentals::store::Collection;

fn portfolio(rig: &Rig) {
    for (name, city, amount) in [
        ("P101", "Springfield", 1200),
        ("P102", "Springfield", 950),
        ("P103", "Shelbyville", 1100),
    ] {
        register(
            &rig.desk,
            NewProperty {
                name: name.to_string(),
                city: city.to_string(),
                monthly_rent: rent(amount),
                ..p101()
            },
        );
    }
}

fn names(filter: &ListingFilter, rig: &Rig) -> Vec<String> {
    rig.desk
        .properties
        .search(filter)
        .expect("search runs")
        .into_iter()
        .map(|listing| listing.property.record.name)
        .collect()
}

#[test]
fn register_requires_landlord_role_and_valid_fields() {
    let rig = rig();

    match rig.desk.properties.register(&tenant(), p101()) {
        Err(RentalError::Unauthorized(_)) => {}
        other => panic!("expected unauthorized, got {other:?}"),
    }

    let invalid = [
        NewProperty {
            name: " ".to_string(),
            ..p101()
        },
        NewProperty {
            address: String::new(),
            ..p101()
        },
        NewProperty {
            monthly_rent: Decimal::ZERO,
            ..p101()
        },
    ];
    for property in invalid {
        match rig.desk.properties.register(&landlord(), property) {
            Err(RentalError::ValidationFailed(_)) => {}
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    let stored = register(&rig.desk, p101());
    assert_eq!(stored.id.as_str(), "property-000001");
    assert_eq!(stored.record.listing, ListingStatus::Listed);
    assert_eq!(stored.record.landlord_id.as_str(), LANDLORD);
}

#[test]
fn search_filters_conjunctively() {
    let rig = rig();
    portfolio(&rig);

    let springfield = ListingFilter {
        city: Some("Springfield".to_string()),
        ..ListingFilter::default()
    };
    assert_eq!(names(&springfield, &rig), vec!["P101", "P102"]);

    let affordable_springfield = ListingFilter {
        max_rent: Some(rent(1000)),
        ..springfield.clone()
    };
    assert_eq!(names(&affordable_springfield, &rig), vec!["P102"]);

    let mid_range = ListingFilter {
        min_rent: Some(rent(1000)),
        max_rent: Some(rent(1200)),
        ..ListingFilter::default()
    };
    assert_eq!(names(&mid_range, &rig), vec!["P101", "P103"]);

    let other_landlord = ListingFilter {
        landlord_id: Some(UserId::from("landlord-2")),
        ..ListingFilter::default()
    };
    assert!(names(&other_landlord, &rig).is_empty());
}

#[test]
fn search_reports_derived_availability() {
    let rig = rig();
    portfolio(&rig);
    let listings = rig
        .desk
        .properties
        .search(&ListingFilter::default())
        .expect("search runs");
    let p101 = &listings[0].property;
    approved_application(&rig.desk, &p101.id);

    let listings = rig
        .desk
        .properties
        .search(&ListingFilter::default())
        .expect("search runs");
    let availability: Vec<_> = listings
        .iter()
        .map(|listing| (listing.property.record.name.as_str(), listing.available))
        .collect();
    assert_eq!(
        availability,
        vec![("P101", false), ("P102", true), ("P103", true)]
    );

    let open_only = ListingFilter {
        available_only: true,
        ..ListingFilter::default()
    };
    assert_eq!(names(&open_only, &rig), vec!["P102", "P103"]);
}

#[test]
fn delisting_hides_from_listed_search_without_touching_availability() {
    let rig = rig();
    let property = register(&rig.desk, p101());

    match rig.desk.properties.set_listing(
        &Caller::landlord("landlord-2"),
        &property.id,
        ListingStatus::Delisted,
    ) {
        Err(RentalError::Unauthorized(_)) => {}
        other => panic!("expected unauthorized, got {other:?}"),
    }

    let delisted = rig
        .desk
        .properties
        .set_listing(&landlord(), &property.id, ListingStatus::Delisted)
        .expect("delists");
    assert_eq!(delisted.record.listing, ListingStatus::Delisted);

    let listed_only = ListingFilter {
        listed_only: true,
        ..ListingFilter::default()
    };
    assert!(names(&listed_only, &rig).is_empty());
    assert!(rig.desk.availability.is_available(&property.id).unwrap());
}

#[test]
fn import_registers_every_row_or_none() {
    let rig = rig();

    let bad = "name,address,city,monthly_rent\nP101,101 Harbor Way,Springfield,1200\nP102,,Springfield,950\n";
    match rig.desk.properties.import_csv(&landlord(), bad.as_bytes()) {
        Err(RentalError::ValidationFailed(detail)) => assert!(detail.contains("P102")),
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert_eq!(rig.store.len(Collection::Properties), 0);

    let good = "name,address,city,monthly_rent\nP101,101 Harbor Way,Springfield,1200\nP102,102 Harbor Way,Springfield,$950.00\n";
    let imported = rig
        .desk
        .properties
        .import_csv(&landlord(), good.as_bytes())
        .expect("imports");
    assert_eq!(imported.len(), 2);
    assert_eq!(imported[1].record.monthly_rent, rent(950));
    assert!(imported
        .iter()
        .all(|stored| stored.record.landlord_id.as_str() == LANDLORD));

    match rig.desk.properties.import_csv(&tenant(), good.as_bytes()) {
        Err(RentalError::Unauthorized(_)) => {}
        other => panic!("expected unauthorized, got {other:?}"),
    }
}
