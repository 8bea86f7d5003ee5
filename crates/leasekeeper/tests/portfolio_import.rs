use std::sync::Arc;

use leasekeeper::config::RulesConfig;
use leasekeeper::workflows::rentals::{
    Caller, ImportError, ListingFilter, MemoryDocumentStorage, MemoryEntityStore,
    PortfolioImporter, RentalDesk, RentalError, UserId,
};
use rust_decimal::Decimal;

#[test]
fn importer_reads_full_portfolio_export() {
    let data = include_bytes!("../Harbor_Portfolio.csv");

    let rows = PortfolioImporter::from_reader(&data[..]).expect("portfolio parses");

    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].name, "P101");
    assert_eq!(rows[0].monthly_rent, Decimal::new(120000, 2));
    assert_eq!(rows[2].occupant_id, Some(UserId::from("tenant-7")));
    assert_eq!(rows[3].monthly_rent, Decimal::new(147550, 2));
    assert!(rows[4].city.is_empty());
    assert!(rows.iter().all(|row| row.monthly_rent > Decimal::ZERO));
}

#[test]
fn importer_reports_line_of_unparseable_rent() {
    let csv = "name,address,city,monthly_rent\n\
P101,101 Harbor Way,Springfield,1200\n\
P102,102 Harbor Way,Springfield,call us\n";

    match PortfolioImporter::from_reader(csv.as_bytes()) {
        Err(ImportError::InvalidRent { line, value }) => {
            assert_eq!(line, 3);
            assert_eq!(value, "call us");
        }
        other => panic!("expected invalid rent, got {other:?}"),
    }
}

#[test]
fn imported_portfolio_is_searchable() {
    let desk = RentalDesk::new(
        Arc::new(MemoryEntityStore::new()),
        Arc::new(MemoryDocumentStorage::default()),
        RulesConfig::default(),
    );
    let landlord = Caller::landlord("landlord-1");
    let data = include_bytes!("../Harbor_Portfolio.csv");

    let imported = desk
        .properties
        .import_csv(&landlord, &data[..])
        .expect("portfolio imports");
    assert_eq!(imported.len(), 5);

    let shelbyville = desk
        .properties
        .search(&ListingFilter {
            city: Some("Shelbyville".to_string()),
            ..ListingFilter::default()
        })
        .expect("search runs");
    let names: Vec<_> = shelbyville
        .iter()
        .map(|listing| listing.property.record.name.as_str())
        .collect();
    assert_eq!(names, vec!["P103", "P104"]);

    match desk
        .properties
        .import_csv(&Caller::tenant("tenant-7"), &data[..])
    {
        Err(RentalError::Unauthorized(_)) => {}
        other => panic!("expected unauthorized, got {other:?}"),
    }
}
