use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identity of an authenticated tenant or landlord.
    UserId
);
string_id!(PropertyId);
string_id!(ApplicationId);
string_id!(LeaseId);
string_id!(PaymentId);
string_id!(MaintenanceRequestId);

/// Party a caller acts as for the duration of a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Tenant,
    Landlord,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Tenant => "tenant",
            Role::Landlord => "landlord",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tenant" => Some(Role::Tenant),
            "landlord" => Some(Role::Landlord),
            _ => None,
        }
    }
}

/// Authenticated identity passed explicitly into every rental operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn tenant(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Tenant,
        }
    }

    pub fn landlord(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Landlord,
        }
    }

    pub fn is(&self, role: Role, user_id: &UserId) -> bool {
        self.role == role && &self.user_id == user_id
    }
}

/// Whether a property shows up in public listings. Never used to decide availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Listed,
    Delisted,
}

impl ListingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ListingStatus::Listed => "listed",
            ListingStatus::Delisted => "delisted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub landlord_id: UserId,
    #[serde(default)]
    pub occupant_id: Option<UserId>,
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub city: String,
    pub monthly_rent: Decimal,
    pub listing: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

/// Landlord verdict on a pending application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationDecision {
    Approved,
    Rejected,
}

impl From<ApplicationDecision> for ApplicationStatus {
    fn from(decision: ApplicationDecision) -> Self {
        match decision {
            ApplicationDecision::Approved => ApplicationStatus::Approved,
            ApplicationDecision::Rejected => ApplicationStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    FullTime,
    PartTime,
    SelfEmployed,
    Unemployed,
}

/// Employment and financial attributes declared by the applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmploymentInfo {
    pub status: EmploymentStatus,
    #[serde(default)]
    pub employer: String,
    pub monthly_income: Decimal,
    #[serde(default)]
    pub employment_length: String,
    #[serde(default)]
    pub previous_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    #[serde(default)]
    pub relationship: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub property_id: PropertyId,
    pub tenant_id: UserId,
    pub landlord_id: UserId,
    pub employment: EmploymentInfo,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(default)]
    pub additional_info: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseStatus {
    Draft,
    PendingSignature,
    Signed,
    Active,
    Rejected,
}

impl LeaseStatus {
    /// Statuses under which the lease holds the property.
    pub const OCCUPYING: [LeaseStatus; 2] = [LeaseStatus::Active, LeaseStatus::Signed];

    pub const fn label(self) -> &'static str {
        match self {
            LeaseStatus::Draft => "draft",
            LeaseStatus::PendingSignature => "pending_signature",
            LeaseStatus::Signed => "signed",
            LeaseStatus::Active => "active",
            LeaseStatus::Rejected => "rejected",
        }
    }

    pub const fn is_occupying(self) -> bool {
        matches!(self, LeaseStatus::Active | LeaseStatus::Signed)
    }
}

/// Per-party confirmation flags. Both start unset when a lease is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signatures {
    pub tenant: bool,
    pub landlord: bool,
}

impl Signatures {
    pub fn has_signed(&self, role: Role) -> bool {
        match role {
            Role::Tenant => self.tenant,
            Role::Landlord => self.landlord,
        }
    }

    pub fn mark(&mut self, role: Role) {
        match role {
            Role::Tenant => self.tenant = true,
            Role::Landlord => self.landlord = true,
        }
    }

    pub fn complete(&self) -> bool {
        self.tenant && self.landlord
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lease {
    pub property_id: PropertyId,
    #[serde(default)]
    pub tenant_id: Option<UserId>,
    pub landlord_id: UserId,
    #[serde(default)]
    pub application_id: Option<ApplicationId>,
    pub status: LeaseStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: Decimal,
    pub security_deposit: Decimal,
    pub terms: String,
    #[serde(default)]
    pub document_url: Option<String>,
    #[serde(default)]
    pub signatures: Signatures,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lease {
    /// Whether `caller` is the party of record for the role they act as.
    pub fn is_party(&self, caller: &Caller) -> bool {
        match caller.role {
            Role::Landlord => caller.user_id == self.landlord_id,
            Role::Tenant => self.tenant_id.as_ref() == Some(&caller.user_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentPayment {
    pub lease_id: LeaseId,
    pub property_id: PropertyId,
    pub tenant_id: UserId,
    pub landlord_id: UserId,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: PaymentStatus,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenancePriority {
    Low,
    Normal,
    High,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    Open,
    InProgress,
    Completed,
}

impl MaintenanceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            MaintenanceStatus::Open => "open",
            MaintenanceStatus::InProgress => "in_progress",
            MaintenanceStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRequest {
    pub property_id: PropertyId,
    pub tenant_id: UserId,
    pub landlord_id: UserId,
    pub title: String,
    pub description: String,
    pub priority: MaintenancePriority,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub status: MaintenanceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
