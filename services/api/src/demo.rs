use crate::infra::{memory_desk, MemoryDesk};
use chrono::{Local, NaiveDate};
use clap::Args;
use leasekeeper::config::RulesConfig;
use leasekeeper::error::AppError;
use leasekeeper::workflows::rentals::{
    ApplicationDecision, ApplicationSubmission, Caller, EmploymentInfo, EmploymentStatus,
    LeaseOptions, ListingFilter, MaintenancePriority, MaintenanceStatus, MaintenanceTicket,
    NewProperty, PortfolioImporter, PropertyId, Reference,
};
use rust_decimal::Decimal;
use std::path::PathBuf;

const DEMO_LANDLORD: &str = "landlord-1";
const DEMO_TENANT: &str = "tenant-1";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Lease start date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Date used to activate the lease (defaults to the lease start).
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Stop once both parties have signed.
    #[arg(long)]
    pub(crate) skip_rent: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// Portfolio CSV export with name, address, city, monthly_rent, and optional occupant_id columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Landlord that owns the imported properties
    #[arg(long, default_value = DEMO_LANDLORD)]
    pub(crate) landlord: String,
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let ImportArgs { csv, landlord } = args;

    let rows = PortfolioImporter::from_path(&csv)?;
    println!("Portfolio preview for {} ({} rows)", csv.display(), rows.len());

    let desk = memory_desk(RulesConfig::default());
    let owner = Caller::landlord(landlord.as_str());
    for row in rows {
        let name = row.name.clone();
        match desk.properties.register(&owner, row) {
            Ok(stored) => println!(
                "- {} -> {} | {} | {}",
                name, stored.id, stored.record.address, stored.record.monthly_rent
            ),
            Err(err) => println!("- {} skipped: {}", name, err),
        }
    }

    let listings = desk.properties.search(&ListingFilter::default())?;
    let open = listings.iter().filter(|listing| listing.available).count();
    println!("{} of {} properties open for applications", open, listings.len());
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        start,
        today,
        skip_rent,
    } = args;

    let start = start.unwrap_or_else(|| Local::now().date_naive());
    let end = start + chrono::Duration::days(364);
    let today = today.unwrap_or(start);

    let desk = memory_desk(RulesConfig::default());
    let landlord = Caller::landlord(DEMO_LANDLORD);
    let tenant = Caller::tenant(DEMO_TENANT);

    println!("Leasekeeper rental demo");
    let property = desk.properties.register(&landlord, demo_property())?;
    println!(
        "- Registered {} ({}) at {} / month",
        property.record.name, property.id, property.record.monthly_rent
    );
    print_availability(&desk, &property.id)?;

    let application = desk
        .applications
        .submit(&tenant, demo_submission(&property.id))?;
    println!(
        "- {} applied -> {} is {}",
        DEMO_TENANT,
        application.id,
        application.record.status.label()
    );
    let approved =
        desk.applications
            .resolve(&landlord, &application.id, ApplicationDecision::Approved)?;
    println!(
        "- Landlord approved {} (version {})",
        approved.id, approved.version
    );
    print_availability(&desk, &property.id)?;

    let draft = desk.leases.create(
        &landlord,
        &property.id,
        LeaseOptions {
            tenant_id: None,
            application_id: Some(application.id.clone()),
            terms: "12 month lease, no smoking, tenant pays utilities".to_string(),
            monthly_rent: property.record.monthly_rent,
            security_deposit: property.record.monthly_rent,
            start_date: start,
            end_date: end,
        },
    )?;
    println!(
        "- Drafted lease {} for {} ({} to {})",
        draft.id, DEMO_TENANT, draft.record.start_date, draft.record.end_date
    );

    let pending = desk.leases.upload_document(
        &landlord,
        &draft.id,
        "P101 lease.pdf",
        b"%PDF-1.7 demo lease",
        "application/pdf",
    )?;
    println!(
        "- Uploaded lease document -> {}",
        pending.record.document_url.as_deref().unwrap_or("(none)")
    );

    for signer in [&tenant, &landlord] {
        let lease = desk.leases.sign(signer, &draft.id)?;
        println!(
            "- {} {} signed -> lease {}",
            signer.role.label(),
            signer.user_id,
            lease.record.status.label()
        );
    }

    match desk.leases.activate(&landlord, &draft.id, today) {
        Ok(active) => println!("- Lease {} is {}", active.id, active.record.status.label()),
        Err(err) => println!("- Activation deferred: {}", err),
    }
    print_availability(&desk, &property.id)?;

    if skip_rent {
        return Ok(());
    }

    let payment = desk.payments.schedule(&landlord, &draft.id, start)?;
    let paid = desk.payments.pay(&tenant, &payment.id)?;
    println!(
        "- Rent {} due {} -> {}",
        paid.record.amount,
        paid.record.due_date,
        paid.record.status.label()
    );

    let request = desk.maintenance.submit(
        &tenant,
        &property.id,
        MaintenanceTicket {
            title: "Leaky faucet".to_string(),
            description: "Kitchen faucet drips overnight".to_string(),
            priority: MaintenancePriority::Low,
            category: "plumbing".to_string(),
            images: Vec::new(),
        },
    )?;
    let request =
        desk.maintenance
            .update_status(&landlord, &request.id, MaintenanceStatus::InProgress)?;
    println!(
        "- Maintenance {} '{}' is {}",
        request.id,
        request.record.title,
        request.record.status.label()
    );

    let summary = desk.reports.landlord_summary(&landlord, today)?;
    println!(
        "- Portfolio: {} occupied, {} vacant, {} collected",
        summary.occupancy.occupied, summary.occupancy.vacant, summary.total_collected
    );
    for tenancy in desk.reports.tenants_for(&landlord)? {
        println!(
            "  tenant {} in {} until {}",
            tenancy.tenant_id, tenancy.property_name, tenancy.end_date
        );
    }

    match serde_json::to_string_pretty(&desk.leases.get(&tenant, &draft.id)?) {
        Ok(json) => println!("  Lease payload:\n{}", json),
        Err(err) => println!("  Lease payload unavailable: {}", err),
    }

    Ok(())
}

fn print_availability(desk: &MemoryDesk, property_id: &PropertyId) -> Result<(), AppError> {
    let snapshot = desk.availability.snapshot(property_id)?;
    println!(
        "  availability: {} (approved applications: {}, occupying leases: {})",
        if snapshot.available { "open" } else { "held" },
        snapshot.approved_applications.len(),
        snapshot.occupying_leases.len()
    );
    Ok(())
}

fn demo_property() -> NewProperty {
    NewProperty {
        name: "P101".to_string(),
        address: "101 Harbor Way".to_string(),
        city: "Springfield".to_string(),
        monthly_rent: Decimal::new(120000, 2),
        occupant_id: None,
    }
}

fn demo_submission(property_id: &PropertyId) -> ApplicationSubmission {
    ApplicationSubmission {
        property_id: property_id.clone(),
        tenant_id: DEMO_TENANT.into(),
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
        additional_info: Some("Relocating for work".to_string()),
    }
}
